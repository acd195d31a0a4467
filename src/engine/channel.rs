//! The engine's message inbox.
//!
//! External callers append to the back. Follow-up messages from synchronous
//! commands go to the front so they run next, ahead of anything other
//! producers queued during the same turn. Only one drain loop runs at a time;
//! injections made while it runs just wait in the inbox.

use super::Reentry;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;

pub(crate) struct MessageChannel<M> {
    inbox: RefCell<VecDeque<M>>,
    draining: Cell<bool>,
    closed: Cell<bool>,
}

impl<M> MessageChannel<M> {
    pub(crate) fn new() -> Self {
        Self {
            inbox: RefCell::new(VecDeque::new()),
            draining: Cell::new(false),
            closed: Cell::new(false),
        }
    }

    /// Appends a message. Returns `false` once the channel is closed.
    pub(crate) fn push_back(&self, message: M) -> bool {
        if self.closed.get() {
            return false;
        }
        self.inbox.borrow_mut().push_back(message);
        true
    }

    /// Queues messages ahead of everything else, keeping their order.
    pub(crate) fn push_front(&self, messages: Vec<M>) {
        if self.closed.get() {
            return;
        }
        let mut inbox = self.inbox.borrow_mut();
        for message in messages.into_iter().rev() {
            inbox.push_front(message);
        }
    }

    pub(crate) fn pop(&self) -> Option<M> {
        self.inbox.borrow_mut().pop_front()
    }

    /// Claims the drain loop. `None` means a drain is already running.
    pub(crate) fn begin_drain(&self) -> Option<Reentry<'_>> {
        Reentry::enter(&self.draining)
    }

    /// Closes the channel and discards anything still queued.
    ///
    /// Returns how many messages were discarded.
    pub(crate) fn close(&self) -> usize {
        self.closed.set(true);
        let mut inbox = self.inbox.borrow_mut();
        let discarded = inbox.len();
        inbox.clear();
        discarded
    }

    pub(crate) fn len(&self) -> usize {
        self.inbox.borrow().len()
    }
}
