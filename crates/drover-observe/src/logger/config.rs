use std::{io::IsTerminal, path::PathBuf};

use serde::{Deserialize, Serialize};

use crate::logger::object::{LoggerFormat, LoggerLevel, LoggerTimeZone};

/// Logger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Output format.
    pub format: LoggerFormat,
    /// Log level filter expression (e.g., "info", "drover_rpc=debug,info").
    pub level: LoggerLevel,
    /// Timezone for timestamps.
    pub tz: LoggerTimeZone,
    /// Whether to include module/target names in log output.
    pub with_targets: bool,
    /// Whether to use colored output.
    pub use_color: bool,
    /// Optional rolling file output, in addition to the main sink.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<LogFileConfig>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            format: LoggerFormat::default(),
            level: LoggerLevel::default(),
            tz: LoggerTimeZone::default(),
            with_targets: true,
            use_color: true,
            file: None,
        }
    }
}

/// Daily-rolling log files: `<dir>/<prefix>.YYYY-MM-DD`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogFileConfig {
    pub dir: PathBuf,
    #[serde(default = "LogFileConfig::default_prefix")]
    pub prefix: String,
}

impl LogFileConfig {
    fn default_prefix() -> String {
        "drover.log".to_string()
    }
}

impl LoggerConfig {
    /// Color is used only when `use_color` is set and stdout is a terminal.
    ///
    /// Call this at initialization time, not while parsing config, so the
    /// terminal check reflects where output actually goes.
    pub fn should_use_color(&self) -> bool {
        self.use_color && std::io::stdout().is_terminal()
    }
}
