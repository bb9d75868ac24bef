//! Tracing setup: stdout always, plus a daily-rotated file when `LOG_DIR` is set.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

pub const LOG_FILE_PREFIX: &str = "heva-chat.log";

/// Appender writing `<dir>/heva-chat.log.<date>`, rolling over at midnight UTC.
pub fn daily_appender(dir: &str) -> Result<RollingFileAppender, InitError> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .build(dir)
}

/// Install the global subscriber.
///
/// The returned guard flushes the file writer on drop, so `main` holds it
/// until shutdown. A log dir that cannot be opened leaves stdout logging in
/// place and is reported once the subscriber is up.
pub fn init(log_dir: Option<&str>) -> Option<WorkerGuard> {
    let (appender, failure) = match log_dir.map(daily_appender) {
        Some(Ok(appender)) => (Some(appender), None),
        Some(Err(e)) => (None, Some(e)),
        None => (None, None),
    };
    let (writer, guard) = appender.map(tracing_appender::non_blocking).unzip();
    let file_layer = writer.map(|w| fmt::layer().with_ansi(false).with_writer(w));

    tracing_subscriber::registry()
        .with(LevelFilter::INFO)
        .with(fmt::layer())
        .with(file_layer)
        .init();

    match (log_dir, failure) {
        (Some(dir), Some(e)) => tracing::warn!(%dir, error = %e, "log dir unusable, logging to stdout only"),
        (Some(dir), None) => tracing::info!(%dir, "writing daily log files"),
        _ => {}
    }
    guard
}

#[cfg(test)]
#[path = "logging_test.rs"]
mod tests;
