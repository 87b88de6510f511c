use std::io::{self, Write};

use crate::log_contracts::{LogDestination, LogEntry};

/// Writes `timestamp [LEVEL] message` lines to stderr.
#[derive(Debug, Default)]
pub struct ConsoleLogDestination;

impl ConsoleLogDestination {
    pub fn new() -> Self {
        Self
    }
}

impl LogDestination for ConsoleLogDestination {
    fn write_log(&self, entry: &LogEntry) {
        let mut stderr = io::stderr().lock();
        let _ = writeln!(stderr, "{} [{}] {}", entry.timestamp, entry.level, entry.message);
    }
}
