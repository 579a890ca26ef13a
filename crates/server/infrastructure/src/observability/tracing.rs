//! Tracing Module - subscriber setup for text or JSON log lines

use launcher_shared::config::{LogFormat, LoggingConfig};
use tracing::info;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Layer;
use tracing_subscriber::layer::SubscriberExt;

/// Result of tracing initialization
#[derive(Debug, Default)]
pub struct TracingResult {
    pub initialized: bool,
    pub errors: Vec<String>,
}

impl TracingResult {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Filter from the configured directive, falling back to `info` when it
/// does not parse
pub fn build_filter(level: &str) -> (EnvFilter, Option<String>) {
    match EnvFilter::try_new(level) {
        Ok(filter) => (filter, None),
        Err(e) => (
            EnvFilter::new("info"),
            Some(format!("invalid log filter '{}': {}", level, e)),
        ),
    }
}

/// Initialize tracing
///
/// Only the first call installs a subscriber; later calls report the
/// failure in `errors`.
pub fn init_tracing(service_name: &str, config: &LoggingConfig) -> TracingResult {
    let mut result = TracingResult::new();
    let (env_filter, filter_error) = build_filter(&config.level);
    result.errors.extend(filter_error);

    let logging_layer = match config.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_current_span(true)
            .with_span_list(false)
            .with_writer(std::io::stderr)
            .with_filter(env_filter)
            .boxed(),
    };

    let subscriber = tracing_subscriber::Registry::default().with(logging_layer);
    match tracing::subscriber::set_global_default(subscriber) {
        Ok(()) => {
            result.initialized = true;
            info!(
                "Tracing initialized for {} (level: {}, format: {:?})",
                service_name, config.level, config.format
            );
        }
        Err(e) => result.errors.push(e.to_string()),
    }

    result
}
