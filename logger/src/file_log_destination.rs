use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::log_contracts::{LogDestination, LogEntry};

pub const DEFAULT_MAX_SIZE: u64 = 10 * 1024 * 1024;

/// Appends JSON lines to a file, rotating it to `<name>.log.bak` once it
/// grows past `max_size` bytes.
pub struct FileLogDestination {
    file: Mutex<File>,
    path: PathBuf,
    max_size: u64,
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

impl FileLogDestination {
    pub fn new(path: PathBuf, max_size: u64) -> io::Result<Self> {
        let file = open_append(&path)?;
        Ok(Self {
            file: Mutex::new(file),
            path,
            max_size,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn lock(&self) -> MutexGuard<'_, File> {
        match self.file.lock() {
            Ok(file) => file,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn rotate(&self, file: &mut File) -> io::Result<()> {
        if file.metadata()?.len() <= self.max_size {
            return Ok(());
        }
        fs::rename(&self.path, self.path.with_extension("log.bak"))?;
        *file = open_append(&self.path)?;
        Ok(())
    }
}

impl LogDestination for FileLogDestination {
    fn write_log(&self, entry: &LogEntry) {
        let Ok(json) = serde_json::to_string(entry) else {
            return;
        };
        let mut file = self.lock();
        let _ = self.rotate(&mut file);
        let _ = writeln!(file, "{}", json);
    }
}
