//! Replay-latest state broadcaster.
//!
//! The publisher holds exactly one value, the latest state. Observers get that
//! value as soon as they subscribe and every state accepted afterwards, in
//! subscription order. Once the engine stops or fails the publisher is
//! terminal and only ever hands out the terminal signal.
//!
//! Signals raised while a notification pass is running (for example an
//! observer stopping the engine) are queued and delivered after the pass, so
//! every observer sees the same sequence.

use super::Reentry;
use crate::domain::EngineError;
use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::fmt;
use std::rc::{Rc, Weak};

/// Receives state updates from a [`StateStream`].
///
/// Any `FnMut(&S)` closure is an observer that ignores terminal signals.
pub trait Observer<S> {
    /// Called with the replayed state on subscribe and with every publish.
    fn next(&mut self, state: &S);

    /// Called once when the engine stops.
    fn complete(&mut self) {}

    /// Called once when the engine hits a fatal error.
    fn error(&mut self, error: &EngineError) {
        let _ = error;
    }
}

impl<S, F> Observer<S> for F
where
    F: FnMut(&S),
{
    fn next(&mut self, state: &S) {
        self(state);
    }
}

/// Lifecycle of a state stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamStatus {
    /// Accepting new states.
    Active,
    /// The engine was stopped.
    Completed,
    /// The engine failed.
    Errored,
}

type SharedObserver<S> = Rc<RefCell<dyn Observer<S>>>;

enum Signal<S> {
    Next(Rc<S>),
    Complete,
    Error(Rc<EngineError>),
}

impl<S> Signal<S> {
    const fn is_terminal(&self) -> bool {
        !matches!(self, Self::Next(_))
    }
}

/// Holds the latest state and fans signals out to observers.
pub(crate) struct StatePublisher<S> {
    /// Latest accepted state, replayed to new observers.
    value: RefCell<Rc<S>>,
    /// Attached observers in subscription order, keyed by subscription id.
    observers: RefCell<Vec<(u64, SharedObserver<S>)>>,
    /// Signals raised during a notification pass, delivered after it.
    queue: RefCell<VecDeque<Signal<S>>>,
    /// Set while a notification pass (or a replay) is running.
    delivering: Cell<bool>,
    /// Active until the first terminal signal.
    status: Cell<StreamStatus>,
    /// The error that closed the stream, kept for late subscribers.
    failure: RefCell<Option<Rc<EngineError>>>,
    /// Id handed to the next subscription.
    next_id: Cell<u64>,
    /// Runs each time the outermost notification pass ends.
    on_idle: RefCell<Option<Box<dyn Fn()>>>,
}

impl<S: 'static> StatePublisher<S> {
    pub(crate) fn new(initial: Rc<S>) -> Self {
        Self {
            value: RefCell::new(initial),
            observers: RefCell::new(Vec::new()),
            queue: RefCell::new(VecDeque::new()),
            delivering: Cell::new(false),
            status: Cell::new(StreamStatus::Active),
            failure: RefCell::new(None),
            next_id: Cell::new(1),
            on_idle: RefCell::new(None),
        }
    }

    /// Registers the hook run after the outermost notification pass.
    ///
    /// Work deferred while observers were being notified (such as messages
    /// an observer sent) is picked up from here.
    pub(crate) fn on_idle(&self, hook: impl Fn() + 'static) {
        *self.on_idle.borrow_mut() = Some(Box::new(hook));
    }

    /// Returns `true` while observers are being notified.
    pub(crate) fn is_delivering(&self) -> bool {
        self.delivering.get()
    }

    /// Replaces the held state and notifies observers.
    ///
    /// Returns `false` without doing anything once the stream is terminal.
    pub(crate) fn next(&self, state: Rc<S>) -> bool {
        if self.status.get() != StreamStatus::Active {
            return false;
        }
        *self.value.borrow_mut() = Rc::clone(&state);
        self.emit(Signal::Next(state));
        true
    }

    /// Ends the stream normally. Only the first terminal signal counts.
    pub(crate) fn complete(&self) {
        if self.status.get() != StreamStatus::Active {
            return;
        }
        self.status.set(StreamStatus::Completed);
        self.emit(Signal::Complete);
    }

    /// Ends the stream with an error, kept for late subscribers.
    pub(crate) fn fail(&self, error: EngineError) {
        if self.status.get() != StreamStatus::Active {
            return;
        }
        let error = Rc::new(error);
        self.status.set(StreamStatus::Errored);
        *self.failure.borrow_mut() = Some(Rc::clone(&error));
        self.emit(Signal::Error(error));
    }

    pub(crate) fn value(&self) -> Rc<S> {
        Rc::clone(&self.value.borrow())
    }

    pub(crate) fn status(&self) -> StreamStatus {
        self.status.get()
    }

    fn emit(&self, signal: Signal<S>) {
        self.queue.borrow_mut().push_back(signal);
        self.flush();
    }

    fn flush(&self) {
        let Some(guard) = Reentry::enter(&self.delivering) else {
            return;
        };
        loop {
            let Some(signal) = self.queue.borrow_mut().pop_front() else {
                break;
            };
            let snapshot: Vec<SharedObserver<S>> = self
                .observers
                .borrow()
                .iter()
                .map(|(_, observer)| Rc::clone(observer))
                .collect();
            for observer in &snapshot {
                Self::deliver(observer, &signal);
            }
            if signal.is_terminal() {
                self.observers.borrow_mut().clear();
            }
        }
        drop(guard);
        if let Some(hook) = self.on_idle.borrow().as_ref() {
            hook();
        }
    }

    fn deliver(observer: &SharedObserver<S>, signal: &Signal<S>) {
        let Ok(mut observer) = observer.try_borrow_mut() else {
            tracing::warn!("observer is already running, signal skipped");
            return;
        };
        match signal {
            Signal::Next(state) => observer.next(state),
            Signal::Complete => observer.complete(),
            Signal::Error(error) => observer.error(error),
        }
    }

    fn subscribe(self: &Rc<Self>, mut observer: impl Observer<S> + 'static) -> Subscription<S> {
        match self.status.get() {
            StreamStatus::Completed => {
                observer.complete();
                return Subscription::detached();
            }
            StreamStatus::Errored => {
                if let Some(error) = self.failure.borrow().as_ref() {
                    observer.error(error);
                }
                return Subscription::detached();
            }
            StreamStatus::Active => {}
        }

        let id = self.next_id.get();
        self.next_id.set(id + 1);
        let observer: SharedObserver<S> = Rc::new(RefCell::new(observer));
        self.observers.borrow_mut().push((id, Rc::clone(&observer)));
        tracing::debug!(subscription = id, "observer subscribed");

        let guard = Reentry::enter(&self.delivering);
        Self::deliver(&observer, &Signal::Next(self.value()));
        if guard.is_some() {
            drop(guard);
            self.flush();
        }

        Subscription {
            id,
            publisher: Rc::downgrade(self),
        }
    }

    fn unsubscribe(&self, id: u64) -> bool {
        let mut observers = self.observers.borrow_mut();
        let before = observers.len();
        observers.retain(|(existing, _)| *existing != id);
        before != observers.len()
    }
}

/// Observable handle over the engine's latest state.
///
/// Cloning the handle is cheap; every clone observes the same publisher.
pub struct StateStream<S> {
    publisher: Rc<StatePublisher<S>>,
}

impl<S: 'static> StateStream<S> {
    pub(crate) fn new(publisher: Rc<StatePublisher<S>>) -> Self {
        Self { publisher }
    }

    /// Subscribes an observer.
    ///
    /// An active stream replays the latest state to the observer before this
    /// returns. A terminal stream only delivers its terminal signal and the
    /// returned subscription is already inactive.
    pub fn subscribe(&self, observer: impl Observer<S> + 'static) -> Subscription<S> {
        self.publisher.subscribe(observer)
    }

    /// The most recently published state.
    #[must_use]
    pub fn value(&self) -> Rc<S> {
        self.publisher.value()
    }

    /// Current lifecycle status.
    #[must_use]
    pub fn status(&self) -> StreamStatus {
        self.publisher.status()
    }

    /// Returns `true` once the stream completed or errored.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.status() != StreamStatus::Active
    }

    /// The fatal error that closed the stream, if any.
    #[must_use]
    pub fn failure(&self) -> Option<Rc<EngineError>> {
        self.publisher.failure.borrow().clone()
    }
}

impl<S> Clone for StateStream<S> {
    fn clone(&self) -> Self {
        Self {
            publisher: Rc::clone(&self.publisher),
        }
    }
}

impl<S: fmt::Debug + 'static> fmt::Debug for StateStream<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStream")
            .field("value", &self.value())
            .field("status", &self.status())
            .finish_non_exhaustive()
    }
}

/// Handle returned by [`StateStream::subscribe`].
///
/// Dropping the handle keeps the observer subscribed; call
/// [`Subscription::unsubscribe`] to detach it.
pub struct Subscription<S> {
    id: u64,
    publisher: Weak<StatePublisher<S>>,
}

impl<S: 'static> Subscription<S> {
    fn detached() -> Self {
        Self {
            id: 0,
            publisher: Weak::new(),
        }
    }

    /// Detaches the observer. Returns `false` if it was no longer attached.
    pub fn unsubscribe(self) -> bool {
        self.publisher
            .upgrade()
            .is_some_and(|publisher| publisher.unsubscribe(self.id))
    }

    /// Returns `true` while the observer is still attached.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.publisher.upgrade().is_some_and(|publisher| {
            publisher
                .observers
                .borrow()
                .iter()
                .any(|(existing, _)| *existing == self.id)
        })
    }
}

impl<S> fmt::Debug for Subscription<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
