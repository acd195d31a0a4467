//! Deferred computations that eventually yield a message.

use crate::domain::PendingError;
use futures_util::future::LocalBoxFuture;
use futures_util::FutureExt;
use std::fmt;
use std::future::Future;

/// A pending computation attached to an asynchronous command.
///
/// Wraps a boxed, non-`Send` future. The engine owns it from the moment the
/// reducer returns until it resolves; a resolution that arrives after the
/// engine stopped is discarded.
///
/// # Examples
///
/// ```
/// use elmloop::PendingMessage;
///
/// #[derive(Debug)]
/// enum Msg { Loaded(String) }
///
/// let infallible = PendingMessage::new(async { Msg::Loaded("ok".into()) });
/// let fallible = PendingMessage::fallible(async {
///     "42".parse::<u32>().map(|n| Msg::Loaded(n.to_string()))
/// });
/// # let _ = (infallible, fallible);
/// ```
pub struct PendingMessage<M> {
    future: LocalBoxFuture<'static, Result<M, PendingError>>,
}

impl<M: 'static> PendingMessage<M> {
    /// Wraps a future that always produces a message.
    pub fn new<F>(future: F) -> Self
    where
        F: Future<Output = M> + 'static,
    {
        Self {
            future: future.map(Ok).boxed_local(),
        }
    }

    /// Wraps a future that may fail; the error is kept as a [`PendingError`].
    pub fn fallible<F, E>(future: F) -> Self
    where
        F: Future<Output = Result<M, E>> + 'static,
        E: fmt::Display,
    {
        Self {
            future: future
                .map(|outcome| outcome.map_err(PendingError::new))
                .boxed_local(),
        }
    }

    /// A pending message that is already resolved.
    pub fn ready(message: M) -> Self {
        Self::new(std::future::ready(message))
    }

    /// A pending message that is already rejected.
    pub fn failed(reason: impl fmt::Display) -> Self {
        Self {
            future: std::future::ready(Err(PendingError::new(reason))).boxed_local(),
        }
    }

    pub(crate) fn into_future(self) -> LocalBoxFuture<'static, Result<M, PendingError>> {
        self.future
    }
}

impl<M> fmt::Debug for PendingMessage<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingMessage").finish_non_exhaustive()
    }
}
