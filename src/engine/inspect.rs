//! Debug-mode side channel.
//!
//! An [`Inspector`] sees every incoming message before the update logic runs
//! and every [`UpdateResult`] before its state is published. It cannot change
//! either, and the engine does not wait on it for anything.

use super::update::{ResultKind, UpdateResult};
use std::fmt;

/// Observes `(message, result)` pairs flowing through the engine.
pub trait Inspector<S, M> {
    /// Called with each message before it is folded.
    fn message(&self, message: &M);

    /// Called with each result before its state is published.
    fn result(&self, result: &UpdateResult<S, M>);
}

/// Inspector that reports through `tracing` at debug level.
///
/// This is what `debug = true` installs.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingInspector;

impl<S: fmt::Debug, M: fmt::Debug> Inspector<S, M> for TracingInspector {
    fn message(&self, message: &M) {
        tracing::debug!(target: "elmloop::inspect", message = ?message, "message");
    }

    fn result(&self, result: &UpdateResult<S, M>) {
        match result.kind() {
            ResultKind::Bare => {
                tracing::debug!(target: "elmloop::inspect", state = ?result.state_ref(), "state");
            }
            kind => {
                tracing::debug!(
                    target: "elmloop::inspect",
                    state = ?result.state_ref(),
                    ?kind,
                    result = ?result,
                    "state with command"
                );
            }
        }
    }
}
