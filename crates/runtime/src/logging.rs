use std::sync::OnceLock;

use chrono::Local;
use log::{LevelFilter, Log, Metadata, Record, SetLoggerError};

use crate::config::PROGRAM_LOG_LEVEL;

/// Stderr logger with a threshold fixed at installation time.
pub struct Logger {
    filter: LevelFilter,
}

impl Logger {
    fn new(filter: LevelFilter) -> Self {
        Logger { filter }
    }
}

impl Log for Logger {
    fn enabled(&self, metadata: &Metadata<'_>) -> bool {
        metadata.level() <= self.filter
    }

    fn log(&self, record: &Record<'_>) {
        if !self.enabled(record.metadata()) {
            return;
        }

        eprintln!(
            "{} {} [{}] {}",
            Local::now().format("%Y-%m-%d %H:%M:%S%.3f"),
            record.level(),
            record.target(),
            record.args()
        );
    }

    fn flush(&self) {}
}

/// `off` is honoured; anything unparseable falls back to warnings.
fn env_filter() -> LevelFilter {
    std::env::var(PROGRAM_LOG_LEVEL)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(LevelFilter::Warn)
}

/// Install the process-wide logger with the threshold taken from the
/// environment.
pub fn init() -> Result<(), SetLoggerError> {
    init_with(env_filter())
}

/// Repeat calls are no-ops: the first caller's filter wins, and the max
/// level registered with `log` must stay in step with the stored logger.
pub fn init_with(filter: LevelFilter) -> Result<(), SetLoggerError> {
    static LOGGER: OnceLock<Logger> = OnceLock::new();

    if LOGGER.set(Logger::new(filter)).is_ok()
        && let Some(logger) = LOGGER.get()
    {
        log::set_logger(logger)?;
        log::set_max_level(filter);
    }

    Ok(())
}

#[cfg(test)]
#[path = "logging_tests.rs"]
mod tests;
