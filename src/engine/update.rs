//! Update results and their classification into state plus command.
//!
//! Every reducer returns an [`UpdateResult`]. The variant alone decides how
//! the follow-up is dispatched, so a state that happens to be a tuple or a
//! vector can never be mistaken for a command pair.

use super::pending::PendingMessage;
use std::fmt;

/// The value returned by update logic for one message.
///
/// Only the state component is ever published. The command component is
/// dispatched after the publish.
///
/// # Examples
///
/// ```
/// use elmloop::{ResultKind, UpdateResult};
///
/// #[derive(Debug, PartialEq)]
/// enum Msg { Refresh }
///
/// let plain: UpdateResult<u32, Msg> = 7.into();
/// assert_eq!(plain.kind(), ResultKind::Bare);
///
/// let chained = UpdateResult::with_message(8, Msg::Refresh);
/// assert_eq!(chained.kind(), ResultKind::Immediate);
///
/// // A state shaped like a pair is still just a state.
/// let pair: UpdateResult<(u32, u32), Msg> = UpdateResult::state((1, 2));
/// assert_eq!(pair.kind(), ResultKind::Bare);
/// ```
pub enum UpdateResult<S, M> {
    /// A new state with no follow-up.
    State(S),
    /// A new state plus one message dispatched right after the publish.
    WithMessage(S, M),
    /// A new state plus an ordered batch dispatched right after the publish.
    WithMessages(S, Vec<M>),
    /// A new state plus a computation that will yield the follow-up message.
    WithPending(S, PendingMessage<M>),
}

/// Classification of an [`UpdateResult`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResultKind {
    /// Bare state.
    Bare,
    /// State plus one synchronous message.
    Immediate,
    /// State plus several synchronous messages.
    Batch,
    /// State plus an asynchronous message.
    Deferred,
}

/// The follow-up part of an update result.
pub enum Command<M> {
    /// Nothing to dispatch.
    None,
    /// Inject this message immediately after the publish.
    Immediate(M),
    /// Inject these messages, in order, immediately after the publish.
    Batch(Vec<M>),
    /// Inject the resolved message once the computation completes.
    Deferred(PendingMessage<M>),
}

impl<S, M> UpdateResult<S, M> {
    /// A bare state.
    pub const fn state(state: S) -> Self {
        Self::State(state)
    }

    /// State followed by one synchronous message.
    pub const fn with_message(state: S, message: M) -> Self {
        Self::WithMessage(state, message)
    }

    /// State followed by a batch of synchronous messages.
    ///
    /// An empty batch collapses to a bare state and a single message to
    /// [`UpdateResult::WithMessage`].
    pub fn with_messages(state: S, messages: impl IntoIterator<Item = M>) -> Self {
        let mut messages: Vec<M> = messages.into_iter().collect();
        match messages.len() {
            0 => Self::State(state),
            1 => match messages.pop() {
                Some(message) => Self::WithMessage(state, message),
                None => Self::State(state),
            },
            _ => Self::WithMessages(state, messages),
        }
    }

    /// State followed by an asynchronous message.
    pub const fn with_pending(state: S, pending: PendingMessage<M>) -> Self {
        Self::WithPending(state, pending)
    }

    /// Classifies the result without consuming it.
    #[must_use]
    pub const fn kind(&self) -> ResultKind {
        match self {
            Self::State(_) => ResultKind::Bare,
            Self::WithMessage(..) => ResultKind::Immediate,
            Self::WithMessages(..) => ResultKind::Batch,
            Self::WithPending(..) => ResultKind::Deferred,
        }
    }

    /// Borrows the state component.
    pub const fn state_ref(&self) -> &S {
        match self {
            Self::State(state)
            | Self::WithMessage(state, _)
            | Self::WithMessages(state, _)
            | Self::WithPending(state, _) => state,
        }
    }

    /// Splits the result into its state and command.
    pub fn into_parts(self) -> (S, Command<M>) {
        match self {
            Self::State(state) => (state, Command::None),
            Self::WithMessage(state, message) => (state, Command::Immediate(message)),
            Self::WithMessages(state, messages) => (state, Command::Batch(messages)),
            Self::WithPending(state, pending) => (state, Command::Deferred(pending)),
        }
    }
}

impl<S, M> From<S> for UpdateResult<S, M> {
    fn from(state: S) -> Self {
        Self::State(state)
    }
}

impl<S: fmt::Debug, M: fmt::Debug> fmt::Debug for UpdateResult<S, M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::State(state) => f.debug_tuple("State").field(state).finish(),
            Self::WithMessage(state, message) => f
                .debug_tuple("WithMessage")
                .field(state)
                .field(message)
                .finish(),
            Self::WithMessages(state, messages) => f
                .debug_tuple("WithMessages")
                .field(state)
                .field(messages)
                .finish(),
            Self::WithPending(state, pending) => f
                .debug_tuple("WithPending")
                .field(state)
                .field(pending)
                .finish(),
        }
    }
}

impl<M: fmt::Debug> fmt::Debug for Command<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::None => f.write_str("None"),
            Self::Immediate(message) => f.debug_tuple("Immediate").field(message).finish(),
            Self::Batch(messages) => f.debug_tuple("Batch").field(messages).finish(),
            Self::Deferred(pending) => f.debug_tuple("Deferred").field(pending).finish(),
        }
    }
}
