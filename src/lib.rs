//! Elmloop: a single-threaded Elm-architecture state engine.
//!
//! Application code describes state transitions as update logic over an
//! immutable state value. The engine feeds messages through that logic one
//! at a time, publishes each new state to observers, and dispatches the
//! follow-up messages the logic asked for:
//! - synchronously, right after the state is published
//! - asynchronously, when a pending computation resolves

#![allow(clippy::multiple_crate_versions)]

//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │  Host Adapter (service.rs)                          │  ← model / send / destroy
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Engine (engine/)                                   │  ← Update loop
//! │  - Message channel                                  │
//! │  - Accumulator (function or pattern table)          │
//! │  - Result classification + command dispatch         │
//! │  - Replay-latest state publisher                    │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Domain & Infrastructure                            │
//! │  - Error types, message tags (domain/)              │
//! │  - Data directory paths (infrastructure/)           │
//! └─────────────────────────────────────────────────────┘
//!                        │
//! ┌─────────────────────────────────────────────────────┐
//! │  Observability (observability/)                     │  ← Optional
//! │  - OpenTelemetry tracing                            │
//! │  - Rotating JSON span file                          │
//! └─────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`engine`]: The update loop and its parts
//! - [`domain`]: Error types and the [`MessageTag`] trait
//! - [`service`]: Host-framework adapter over an engine
//! - [`infrastructure`]: Platform paths
//! - `observability`: Tracing setup with file export
//!
//! # Ordering Guarantees
//!
//! - Messages from one producer are processed in injection order.
//! - A command's message is processed strictly after its triggering state
//!   reached every observer, and before anything other producers injected
//!   during that turn.
//! - A deferred command's message is processed only after the pending
//!   computation resolved, and never after `stop`.
//!
//! # Example
//!
//! ```rust
//! use elmloop::{Engine, PendingMessage, UpdateLogic, UpdateResult};
//! use futures::executor::LocalPool;
//!
//! #[derive(Debug, Clone, PartialEq)]
//! struct Model { a: i64, b: String }
//!
//! #[derive(Debug)]
//! enum Msg { SetA(i64), SetB(String), Load }
//!
//! let update = UpdateLogic::from_fn(|model: &Model, msg: Msg| match msg {
//!     Msg::SetA(a) => Model { a, ..model.clone() }.into(),
//!     Msg::SetB(b) => match b.parse() {
//!         Ok(n) => UpdateResult::with_message(Model { b, ..model.clone() }, Msg::SetA(n)),
//!         Err(_) => Model { b, ..model.clone() }.into(),
//!     },
//!     Msg::Load => UpdateResult::with_pending(
//!         model.clone(),
//!         PendingMessage::new(async { Msg::SetB("9".into()) }),
//!     ),
//! });
//!
//! let mut pool = LocalPool::new();
//! let engine = Engine::builder(Model { a: 0, b: String::new() }, update)
//!     .spawner(pool.spawner())
//!     .begin();
//!
//! engine.send(Msg::SetB("7".into()));
//! assert_eq!(engine.model().a, 7);
//!
//! engine.send(Msg::Load);
//! pool.run_until_stalled();
//! assert_eq!(engine.model().a, 9);
//!
//! engine.stop();
//! ```

pub mod domain;
pub mod engine;
pub mod infrastructure;
pub mod service;

pub mod observability;

pub use domain::{EngineError, MessageTag, PendingError, Result};
pub use engine::{
    Command, Engine, EngineBuilder, EngineStatus, Inspector, Observer, PatternTable,
    PendingMessage, ResultKind, StateStream, StreamStatus, Subscription, TracingInspector,
    UpdateLogic, UpdateResult,
};
pub use service::{Application, Service};

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Runtime configuration for an engine and its tracing.
///
/// Can be built from a string map (for hosts that hand over key/value
/// settings) or read from a TOML file.
///
/// # Example
///
/// ```toml
/// debug = true
/// trace_level = "debug"
/// trace_file = "~/.local/share/elmloop/traces.json"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Report every message and update result through the tracing inspector.
    ///
    /// Default: `false`
    pub debug: bool,

    /// Filter directive for the tracing subscriber.
    ///
    /// Options: `trace`, `debug`, `info`, `warn`, `error`, or any
    /// `EnvFilter` directive. Default: `"info"` when unset.
    pub trace_level: Option<String>,

    /// Where finished spans are written.
    ///
    /// A leading `~` is expanded. Default: `traces.json` in the data
    /// directory.
    pub trace_file: Option<PathBuf>,
}

impl Config {
    /// Parses configuration from a string map.
    ///
    /// # Parsing Rules
    ///
    /// - `debug`: `true`/`1`/`yes`/`on` (case-insensitive) enable it, anything else disables it
    /// - `trace_level`: used as-is, ignored when blank
    /// - `trace_file`: tilde-expanded path, ignored when blank
    ///
    /// # Example
    ///
    /// ```rust
    /// use std::collections::BTreeMap;
    /// use elmloop::Config;
    ///
    /// let mut map = BTreeMap::new();
    /// map.insert("debug".to_string(), "yes".to_string());
    /// map.insert("trace_level".to_string(), "debug".to_string());
    ///
    /// let config = Config::from_map(&map);
    /// assert!(config.debug);
    /// assert_eq!(config.trace_level.as_deref(), Some("debug"));
    /// ```
    #[must_use]
    pub fn from_map(config: &BTreeMap<String, String>) -> Self {
        let debug = config.get("debug").is_some_and(|raw| {
            matches!(
                raw.trim().to_ascii_lowercase().as_str(),
                "true" | "1" | "yes" | "on"
            )
        });

        let non_blank = |key: &str| {
            config
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
                .map(String::from)
        };

        Self {
            debug,
            trace_level: non_blank("trace_level"),
            trace_file: non_blank("trace_file")
                .map(|path| PathBuf::from(infrastructure::expand_tilde(&path))),
        }
    }

    /// Reads configuration from a TOML file.
    ///
    /// Missing keys take their defaults; a `trace_file` with a leading `~` is
    /// expanded.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::Io`] if the file cannot be read and
    /// [`EngineError::Config`] if it is not valid TOML for this structure.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&raw)
            .map_err(|e| EngineError::Config(format!("{}: {e}", path.display())))?;
        config.trace_file = config
            .trace_file
            .map(|file| PathBuf::from(infrastructure::expand_tilde(&file.to_string_lossy())));
        tracing::debug!(path = %path.display(), "configuration loaded");
        Ok(config)
    }

    /// Trace filter directive, falling back to `"info"`.
    #[must_use]
    pub fn trace_level(&self) -> &str {
        self.trace_level.as_deref().unwrap_or("info")
    }

    /// Trace output file, falling back to the data directory.
    #[must_use]
    pub fn trace_file(&self) -> PathBuf {
        self.trace_file
            .clone()
            .unwrap_or_else(|| infrastructure::get_data_dir().join("traces.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn from_map_applies_defaults() {
        let config = Config::from_map(&BTreeMap::new());
        assert_eq!(config, Config::default());
        assert_eq!(config.trace_level(), "info");
    }

    #[test]
    fn from_map_ignores_blank_values() {
        let mut map = BTreeMap::new();
        map.insert("debug".to_string(), "nope".to_string());
        map.insert("trace_level".to_string(), "   ".to_string());
        map.insert("trace_file".to_string(), "/tmp/t.json".to_string());
        let config = Config::from_map(&map);
        assert!(!config.debug);
        assert!(config.trace_level.is_none());
        assert_eq!(config.trace_file(), PathBuf::from("/tmp/t.json"));
    }

    #[test]
    fn from_file_reads_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug = true\ntrace_level = \"warn\"").unwrap();
        let config = Config::from_file(file.path()).unwrap();
        assert!(config.debug);
        assert_eq!(config.trace_level(), "warn");
        assert!(config.trace_file.is_none());
    }

    #[test]
    fn from_file_rejects_bad_types() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "debug = \"sometimes\"").unwrap();
        let err = Config::from_file(file.path()).unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn from_file_missing_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::from_file(dir.path().join("absent.toml")).unwrap_err();
        assert!(matches!(err, EngineError::Io(_)));
    }
}
