//! OpenTelemetry-based observability with file-based span export.
//!
//! Engine turns are `tracing` spans. This module routes them through
//! `tracing-opentelemetry` into a tracer provider whose exporter writes one
//! JSON object per finished span:
//!
//! ```text
//! tracing spans → tracing-opentelemetry → TracerProvider → JsonLinesExporter → RotatingFile
//! ```
//!
//! # Configuration
//!
//! - `trace_level`: filter directive, default `"info"`
//! - `trace_file`: output path, default `traces.json` in the data directory
//! - `debug`: also print events to stderr
//!
//! # Modules
//!
//! - `init`: Subscriber setup
//! - `exporter`: JSON-lines span exporter and tracer provider
//! - `rotating`: Size-capped file with numbered backups

mod exporter;
mod init;
mod rotating;

pub use init::init_tracing;
