//! OpenTelemetry span exporter writing JSON lines.
//!
//! Each finished span becomes one self-contained JSON object on its own
//! line, tagged with the resource attributes. The format is meant for `jq`
//! and ad hoc inspection of engine turns, not for an OTLP collector.

use super::rotating::RotatingFile;
use futures_util::future::BoxFuture;
use opentelemetry::trace::{SpanId, Status, TraceError};
use opentelemetry::{KeyValue, Value};
use opentelemetry_sdk::export::trace::{ExportResult, SpanData, SpanExporter};
use opentelemetry_sdk::resource::Resource;
use opentelemetry_sdk::trace::TracerProvider;
use serde_json::{json, Map, Value as JsonValue};
use std::path::PathBuf;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Span exporter backed by a [`RotatingFile`].
#[derive(Debug)]
struct JsonLinesExporter {
    /// Destination of the JSON lines.
    file: RotatingFile,
    /// Resource attributes, pre-rendered and attached to every span.
    resource: JsonValue,
    /// Set by `shutdown`; later exports fail.
    closed: bool,
}

impl JsonLinesExporter {
    fn new(path: PathBuf, resource: &Resource) -> Self {
        let resource = resource
            .iter()
            .map(|(key, value)| (key.to_string(), attribute_value(value)))
            .collect::<Map<String, JsonValue>>();
        Self {
            file: RotatingFile::new(path),
            resource: JsonValue::Object(resource),
            closed: false,
        }
    }

    fn write_batch(&self, batch: &[SpanData]) -> std::io::Result<()> {
        for span in batch {
            let mut line = span_json(span);
            if let Some(object) = line.as_object_mut() {
                object.insert("resource".to_string(), self.resource.clone());
            }
            self.file.write_line(&line.to_string())?;
        }
        Ok(())
    }
}

impl SpanExporter for JsonLinesExporter {
    fn export(&mut self, batch: Vec<SpanData>) -> BoxFuture<'static, ExportResult> {
        let result = if self.closed {
            Err(TraceError::from("exporter is shut down"))
        } else {
            self.write_batch(&batch)
                .map_err(|e| TraceError::from(e.to_string()))
        };
        Box::pin(std::future::ready(result))
    }

    fn shutdown(&mut self) {
        self.closed = true;
    }
}

/// Builds a tracer provider exporting every span to `path` as it ends.
pub fn create_tracer_provider(path: PathBuf, resource: Resource) -> TracerProvider {
    let exporter = JsonLinesExporter::new(path, &resource);
    TracerProvider::builder()
        .with_config(opentelemetry_sdk::trace::Config::default().with_resource(resource))
        .with_simple_exporter(exporter)
        .build()
}

fn span_json(span: &SpanData) -> JsonValue {
    let parent = if span.parent_span_id == SpanId::INVALID {
        JsonValue::Null
    } else {
        JsonValue::String(format!("{:016x}", span.parent_span_id))
    };
    let events: Vec<JsonValue> = span
        .events
        .iter()
        .map(|event| {
            json!({
                "name": event.name,
                "time_unix_nano": unix_nanos(event.timestamp),
                "attributes": attributes(&event.attributes),
            })
        })
        .collect();

    json!({
        "trace_id": format!("{:032x}", span.span_context.trace_id()),
        "span_id": format!("{:016x}", span.span_context.span_id()),
        "parent_span_id": parent,
        "name": span.name,
        "start_unix_nano": unix_nanos(span.start_time),
        "duration_nanos": span
            .end_time
            .duration_since(span.start_time)
            .map_or(0, saturating_nanos),
        "attributes": attributes(&span.attributes),
        "events": events,
        "status": status(&span.status),
    })
}

fn attributes(attributes: &[KeyValue]) -> JsonValue {
    JsonValue::Object(
        attributes
            .iter()
            .map(|kv| (kv.key.to_string(), attribute_value(&kv.value)))
            .collect(),
    )
}

fn attribute_value(value: &Value) -> JsonValue {
    match value {
        Value::Bool(b) => json!(b),
        Value::I64(i) => json!(i),
        Value::F64(f) => json!(f),
        Value::String(s) => json!(s.as_str()),
        Value::Array(_) => json!(value.to_string()),
    }
}

fn status(status: &Status) -> JsonValue {
    match status {
        Status::Unset => JsonValue::Null,
        Status::Ok => json!("ok"),
        Status::Error { description } => json!({ "error": description.to_string() }),
    }
}

fn unix_nanos(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH).map_or(0, saturating_nanos)
}

fn saturating_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
