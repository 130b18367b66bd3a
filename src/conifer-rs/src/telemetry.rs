//! Tracing setup for applications built on the client
//!
//! Provides structured logging with:
//! - Console output for development
//! - Optional JSON formatted logs to file
//! - Size-based and daily rotation of the log file

use anyhow::Result;
use conifer_core::TelemetryConfig;
use rolling_file::{RollingConditionBasic, RollingFileAppender};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

/// Rotated files kept per day (conifer.log.1 .. conifer.log.9)
const MAX_ROTATED_FILES: usize = 9;

/// Initialize the global subscriber.
///
/// Returns a guard that must be kept alive to ensure file logs are flushed;
/// `None` when file logging is disabled.
pub fn init_telemetry(config: &TelemetryConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.filter.as_str()));

    let (file_layer, guard) = match &config.log_dir {
        Some(dir) => {
            let log_dir = Path::new(dir);
            std::fs::create_dir_all(log_dir)?;

            let file_appender = RollingFileAppender::new(
                log_dir.join("conifer.log"),
                RollingConditionBasic::new()
                    .daily()
                    .max_size(config.max_file_bytes),
                MAX_ROTATED_FILES,
            )?;
            let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

            let layer = fmt::layer()
                .json()
                .with_writer(non_blocking_file)
                .with_span_events(FmtSpan::CLOSE)
                .with_current_span(true)
                .with_target(true)
                .with_thread_ids(true)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let console_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .try_init()?;

    match &config.log_dir {
        Some(dir) => tracing::info!(
            "Telemetry initialized with file logging to {:?} (rotation at {} bytes, daily)",
            dir,
            config.max_file_bytes
        ),
        None => tracing::info!("Telemetry initialized (console only)"),
    }

    Ok(guard)
}
