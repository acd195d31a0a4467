//! Tracing initialization and subscriber setup.

use super::exporter;
use crate::Config;
use opentelemetry::trace::TracerProvider as _;
use opentelemetry_sdk::resource::Resource;
use tracing_opentelemetry::OpenTelemetryLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Service name attached to every exported span.
const SERVICE_NAME: &str = "elmloop";

/// Installs the global tracing subscriber.
///
/// The subscriber stack is:
/// 1. An `EnvFilter` built from [`Config::trace_level`]
/// 2. A stderr `fmt` layer, only when `config.debug` is set
/// 3. An OpenTelemetry layer exporting finished spans to
///    [`Config::trace_file`] as JSON lines
///
/// # Initialization Behavior
///
/// - Creates the trace file's directory if needed
/// - Silently returns if that directory cannot be created
/// - Only the first successful call installs a subscriber; later calls are no-ops
///
/// # Example
///
/// ```rust,no_run
/// use elmloop::observability::init_tracing;
/// use elmloop::Config;
///
/// let config = Config {
///     trace_level: Some("debug".to_string()),
///     ..Default::default()
/// };
/// init_tracing(&config);
/// tracing::debug!("tracing is now active");
/// ```
pub fn init_tracing(config: &Config) {
    let trace_file = config.trace_file();
    if let Some(dir) = trace_file.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        if std::fs::create_dir_all(dir).is_err() {
            return;
        }
    }

    let resource = Resource::new(vec![opentelemetry::KeyValue::new(
        "service.name",
        SERVICE_NAME,
    )]);
    let provider = exporter::create_tracer_provider(trace_file, resource);
    let otel_layer = OpenTelemetryLayer::new(provider.tracer(SERVICE_NAME));

    let fmt_layer = config.debug.then(|| {
        tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(true)
    });

    let _ = tracing_subscriber::registry()
        .with(EnvFilter::new(config.trace_level()))
        .with(fmt_layer)
        .with(otel_layer)
        .try_init();
}
