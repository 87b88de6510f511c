use serde::Deserialize;

use crate::log_contracts::LogLevel;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogType {
    Console,
    File,
    /// Discard everything.
    None,
}

/// The `[logging]` table of the host configuration file.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    #[serde(rename = "type", default = "default_log_type")]
    pub log_type: LogType,
    #[serde(default)]
    pub file_path: Option<String>,
    #[serde(default)]
    pub max_file_size_mb: Option<u64>,
    #[serde(default = "default_threshold")]
    pub threshold: LogLevel,
}

fn default_log_type() -> LogType {
    LogType::Console
}

fn default_threshold() -> LogLevel {
    LogLevel::Info
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_type: default_log_type(),
            file_path: None,
            max_file_size_mb: None,
            threshold: default_threshold(),
        }
    }
}
