//! Error types for the engine.
//!
//! [`EngineError`] covers everything that can stop an engine instance or fail
//! while configuring it. [`PendingError`] is the failure side of an
//! asynchronous command and never stops the engine on its own.

use thiserror::Error;

/// The main error type for engine operations.
///
/// The first three variants are fatal when they occur inside a processing
/// turn: the engine moves to its failed state and observers receive the error
/// signal. The remaining variants only surface from configuration and tracing
/// setup.
///
/// # Examples
///
/// ```
/// use elmloop::EngineError;
///
/// fn parse_amount(raw: &str) -> Result<i64, EngineError> {
///     raw.parse().map_err(EngineError::reducer)
/// }
///
/// assert!(parse_amount("x").is_err());
/// ```
#[derive(Debug, Error)]
pub enum EngineError {
    /// No case of a pattern table accepted the message.
    ///
    /// A missing case is a programming error, so this is never recovered from.
    #[error("Unmatched message: {message}")]
    UnmatchedMessage {
        /// Debug rendering of the rejected message.
        message: String,
    },

    /// The update logic itself reported a failure.
    #[error("Reducer error: {0}")]
    Reducer(String),

    /// A deferred command could not be handed to the executor.
    #[error("Spawn error: {0}")]
    Spawn(String),

    /// Configuration is invalid or could not be parsed.
    #[error("Configuration error: {0}")]
    Config(String),

    /// Filesystem or I/O operation failed.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError {
    /// Wraps any displayable failure raised by update logic.
    pub fn reducer(err: impl std::fmt::Display) -> Self {
        Self::Reducer(err.to_string())
    }

    /// Returns `true` for errors that terminate a running engine.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::UnmatchedMessage { .. } | Self::Reducer(_) | Self::Spawn(_)
        )
    }
}

/// Failure of a pending computation attached to an asynchronous command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("pending command failed: {reason}")]
pub struct PendingError {
    reason: String,
}

impl PendingError {
    /// Creates a pending failure from any displayable reason.
    pub fn new(reason: impl std::fmt::Display) -> Self {
        Self {
            reason: reason.to_string(),
        }
    }

    /// Human-readable description of the failure.
    #[must_use]
    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// A specialized `Result` type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
