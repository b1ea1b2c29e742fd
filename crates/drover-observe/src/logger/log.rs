use tracing::Subscriber;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt};

use crate::logger::{
    config::LoggerConfig,
    error::{LoggerError, LoggerResult},
    object::LoggerRfc3339,
};

/// Initializes text logger.
pub fn logger_text(cfg: &LoggerConfig) -> LoggerResult<Option<WorkerGuard>> {
    let filter = cfg.level.to_env_filter();
    let timer = LoggerRfc3339::new(cfg.tz);
    let fmt_layer = fmt::layer()
        .with_ansi(cfg.should_use_color())
        .with_target(cfg.with_targets)
        .with_timer(timer);

    let (writer, guard) = file_sink(cfg)?.unzip();
    let file_layer = writer.map(|w| {
        fmt::layer()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(timer)
            .with_writer(w)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer);
    init_subscriber(subscriber)?;
    Ok(guard)
}

/// Initializes JSON (structured) logger.
pub fn logger_json(cfg: &LoggerConfig) -> LoggerResult<Option<WorkerGuard>> {
    let filter = cfg.level.to_env_filter();
    let timer = LoggerRfc3339::new(cfg.tz);
    let fmt_layer = fmt::layer()
        .json()
        .with_ansi(false)
        .with_target(cfg.with_targets)
        .with_timer(timer);

    let (writer, guard) = file_sink(cfg)?.unzip();
    let file_layer = writer.map(|w| {
        fmt::layer()
            .json()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(timer)
            .with_writer(w)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .with(file_layer);
    init_subscriber(subscriber)?;
    Ok(guard)
}

/// Initializes journald logger (Linux only).
#[cfg(target_os = "linux")]
pub fn logger_journald(cfg: &LoggerConfig) -> LoggerResult<Option<WorkerGuard>> {
    let filter = cfg.level.to_env_filter();
    let journald =
        tracing_journald::layer().map_err(|e| LoggerError::JournaldInitFailed(e.to_string()))?;

    let (writer, guard) = file_sink(cfg)?.unzip();
    let file_layer = writer.map(|w| {
        fmt::layer()
            .with_ansi(false)
            .with_target(cfg.with_targets)
            .with_timer(LoggerRfc3339::new(cfg.tz))
            .with_writer(w)
    });

    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(journald)
        .with(file_layer);
    init_subscriber(subscriber)?;
    Ok(guard)
}

/// Stub for journald on non-Linux platforms.
#[cfg(not(target_os = "linux"))]
pub fn logger_journald(_cfg: &LoggerConfig) -> LoggerResult<Option<WorkerGuard>> {
    Err(LoggerError::JournaldNotSupported)
}

/// Opens the daily-rolling appender when file output is configured.
fn file_sink(cfg: &LoggerConfig) -> LoggerResult<Option<(NonBlocking, WorkerGuard)>> {
    let Some(file) = &cfg.file else {
        return Ok(None);
    };
    std::fs::create_dir_all(&file.dir).map_err(|source| LoggerError::LogDir {
        dir: file.dir.clone(),
        source,
    })?;

    let appender = tracing_appender::rolling::daily(&file.dir, &file.prefix);
    Ok(Some(tracing_appender::non_blocking(appender)))
}

/// Installs the subscriber as the global default.
fn init_subscriber<S>(subscriber: S) -> LoggerResult<()>
where
    S: Subscriber + Send + Sync + 'static,
{
    subscriber
        .try_init()
        .map_err(|_| LoggerError::AlreadyInitialized)
}
