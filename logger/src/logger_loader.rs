use std::io;
use std::sync::Arc;

use thiserror::Error;

use crate::file_log_destination::{FileLogDestination, DEFAULT_MAX_SIZE};
use crate::log_config::{LogType, LoggingConfig};
use crate::log_contracts::{LogDestination, Logger, NullLogger};
use crate::{ConsoleLogDestination, LogWriter};

#[derive(Debug, Error)]
pub enum LoggerConfigError {
    #[error("logging type 'file' requires 'file_path'")]
    MissingFilePath,

    #[error("cannot open log file '{path}': {source}")]
    OpenFile {
        path: String,
        #[source]
        source: io::Error,
    },
}

pub struct LoggerLoader;

impl LoggerLoader {
    pub fn load(config: &LoggingConfig) -> Result<Arc<dyn Logger>, LoggerConfigError> {
        let destination: Arc<dyn LogDestination> = match config.log_type {
            LogType::None => return Ok(Arc::new(NullLogger)),
            LogType::Console => Arc::new(ConsoleLogDestination::new()),
            LogType::File => {
                let path = config
                    .file_path
                    .as_ref()
                    .ok_or(LoggerConfigError::MissingFilePath)?;
                let max_size = config
                    .max_file_size_mb
                    .map_or(DEFAULT_MAX_SIZE, |mb| mb.saturating_mul(1024 * 1024));
                let file = FileLogDestination::new(path.into(), max_size).map_err(|source| {
                    LoggerConfigError::OpenFile {
                        path: path.clone(),
                        source,
                    }
                })?;
                Arc::new(file)
            }
        };

        Ok(Arc::new(LogWriter::new(config.threshold, destination)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_type_requires_path() {
        let config = LoggingConfig {
            log_type: LogType::File,
            ..LoggingConfig::default()
        };
        assert!(matches!(
            LoggerLoader::load(&config),
            Err(LoggerConfigError::MissingFilePath)
        ));
    }

    #[test]
    fn file_logger_writes_to_configured_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("host.log");
        let config = LoggingConfig {
            log_type: LogType::File,
            file_path: Some(path.to_string_lossy().into_owned()),
            ..LoggingConfig::default()
        };

        let logger = LoggerLoader::load(&config).unwrap();
        logger.debug("below threshold");
        logger.info("plugin loaded");

        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("plugin loaded"));
        assert!(!contents.contains("below threshold"));
    }

    #[test]
    fn oversized_file_limit_saturates() {
        let dir = tempfile::tempdir().unwrap();
        let config = LoggingConfig {
            log_type: LogType::File,
            file_path: Some(dir.path().join("host.log").to_string_lossy().into_owned()),
            max_file_size_mb: Some(u64::MAX),
            ..LoggingConfig::default()
        };

        let logger = LoggerLoader::load(&config).unwrap();
        logger.info("still logging");
        let contents = std::fs::read_to_string(dir.path().join("host.log")).unwrap();
        assert!(contents.contains("still logging"));
    }
}
