use std::sync::Mutex;

use crate::log_contracts::{LogDestination, LogEntry};

/// Keeps entries in memory. Meant for tests asserting on what was logged.
#[derive(Debug, Default)]
pub struct MemoryLogDestination {
    entries: Mutex<Vec<LogEntry>>,
}

impl MemoryLogDestination {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries().is_empty()
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.entries().iter().any(|e| e.message.contains(needle))
    }
}

impl LogDestination for MemoryLogDestination {
    fn write_log(&self, entry: &LogEntry) {
        let mut entries = match self.entries.lock() {
            Ok(entries) => entries,
            Err(poisoned) => poisoned.into_inner(),
        };
        entries.push(entry.clone());
    }
}
