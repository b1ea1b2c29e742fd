mod config;
mod error;
mod log;
mod object;

pub use config::{LogFileConfig, LoggerConfig};
pub use error::{LoggerError, LoggerResult};
pub use object::LoggerFormat;
pub use object::LoggerLevel;
pub use object::{LoggerRfc3339, LoggerTimeZone, init_local_offset};

use tracing_appender::non_blocking::WorkerGuard;

/// Keeps the background file writer alive.
///
/// Hold it in `main` for the lifetime of the process. Dropping it flushes
/// buffered lines and stops the writer thread.
#[must_use = "dropping the guard stops file logging"]
#[derive(Debug, Default)]
pub struct LoggerGuard {
    file: Option<WorkerGuard>,
}

impl LoggerGuard {
    /// Whether log lines are also written to a rolling file.
    pub fn writes_file(&self) -> bool {
        self.file.is_some()
    }
}

/// Initializes the global tracing subscriber with the given configuration.
///
/// Once initialized, all `tracing` macros (`info!`, `debug!`, etc.) go through
/// this subscriber. When [`LoggerConfig::file`] is set, every line is also
/// appended to a daily-rolling file in that directory.
///
/// # Important: Local Timezone
/// For `LoggerTimeZone::Local`, call [`init_local_offset`] in `main()` before
/// the tokio runtime spawns its worker threads.
///
/// # Examples
/// ```rust
/// use drover_observe::{LoggerConfig, init_logger};
///
/// let config = LoggerConfig::default();
/// let _guard = init_logger(&config).expect("Failed to initialize logger");
///
/// tracing::info!("Logger initialized successfully");
/// ```
pub fn init_logger(cfg: &LoggerConfig) -> LoggerResult<LoggerGuard> {
    let file = match cfg.format {
        LoggerFormat::Text => log::logger_text(cfg)?,
        LoggerFormat::Json => log::logger_json(cfg)?,
        LoggerFormat::Journald => log::logger_journald(cfg)?,
    };
    Ok(LoggerGuard { file })
}
