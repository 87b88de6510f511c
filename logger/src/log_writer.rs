use std::sync::Arc;

use chrono::Utc;

use crate::log_contracts::{LogDestination, LogEntry, LogLevel, Logger};

/// Threshold-filtering logger writing to a single destination.
pub struct LogWriter {
    threshold: LogLevel,
    destination: Arc<dyn LogDestination>,
}

impl LogWriter {
    pub fn new(threshold: LogLevel, destination: Arc<dyn LogDestination>) -> Self {
        Self { threshold, destination }
    }

    pub fn threshold(&self) -> LogLevel {
        self.threshold
    }

    fn build_entry(&self, level: LogLevel, message: &str) -> LogEntry {
        LogEntry {
            timestamp: Utc::now().to_rfc3339(),
            level: level.to_string(),
            message: message.to_string(),
        }
    }
}

impl Logger for LogWriter {
    fn log(&self, level: LogLevel, message: &str) {
        if level < self.threshold {
            return;
        }
        let entry = self.build_entry(level, message);
        self.destination.write_log(&entry);
    }
}
