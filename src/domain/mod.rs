//! Domain layer: error types and the message discriminant trait.
//!
//! Nothing here depends on the engine runtime, so application crates can
//! name these types without pulling in the rest of the engine.
//!
//! # Organization
//!
//! - [`error`]: Error types and result aliases
//! - [`message`]: [`MessageTag`] discriminant access

pub mod error;
pub mod message;

pub use error::{EngineError, PendingError, Result};
pub use message::MessageTag;
