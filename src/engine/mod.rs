//! The message-driven state engine.
//!
//! This module wires the parts of the update loop together. Data flows one
//! way:
//!
//! ```text
//! send(msg) → MessageChannel → Accumulator (update logic) → UpdateResult
//!                  ↑                                            │
//!                  │                                     into_parts()
//!                  │                                            ▼
//!                  └──── Command dispatch ◄──── StatePublisher.next(state)
//! ```
//!
//! # Modules
//!
//! - `channel`: FIFO inbox shared by external callers and the dispatcher
//! - [`dispatch`]: Update logic (single function or pattern table) and the accumulator
//! - [`update`]: [`UpdateResult`] and its classification into state plus [`Command`]
//! - [`pending`]: [`PendingMessage`] for asynchronous commands
//! - [`publisher`]: Replay-latest [`StateStream`]
//! - [`inspect`]: Debug-mode [`Inspector`] side channel
//! - [`program`]: [`Engine`] lifecycle (`begin`, `send`, `stop`)

mod channel;
pub mod dispatch;
pub mod inspect;
pub mod pending;
pub mod program;
pub mod publisher;
pub mod update;

pub use dispatch::{PatternTable, UpdateLogic};
pub use inspect::{Inspector, TracingInspector};
pub use pending::PendingMessage;
pub use program::{Engine, EngineBuilder, EngineStatus};
pub use publisher::{Observer, StateStream, StreamStatus, Subscription};
pub use update::{Command, ResultKind, UpdateResult};

use std::cell::Cell;

/// Marks a flag as busy for the lifetime of the guard.
///
/// Used to turn re-entrant calls into queued work: only the outermost caller
/// acquires the guard and drains, inner callers just enqueue. The flag is
/// released on drop, so a panicking observer or reducer does not wedge the
/// engine.
pub(crate) struct Reentry<'a> {
    flag: &'a Cell<bool>,
}

impl<'a> Reentry<'a> {
    /// Returns `None` if the flag is already held.
    pub(crate) fn enter(flag: &'a Cell<bool>) -> Option<Self> {
        if flag.replace(true) {
            None
        } else {
            Some(Self { flag })
        }
    }
}

impl Drop for Reentry<'_> {
    fn drop(&mut self) {
        self.flag.set(false);
    }
}
