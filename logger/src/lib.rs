pub mod console_log_destination;
pub mod file_log_destination;
pub mod log_config;
pub mod log_contracts;
pub mod log_writer;
pub mod logger_loader;
pub mod memory_log_destination;

pub use console_log_destination::ConsoleLogDestination;
pub use file_log_destination::FileLogDestination;
pub use log_config::{LogType, LoggingConfig};
pub use log_contracts::{LogDestination, LogEntry, LogLevel, Logger, NullLogger};
pub use log_writer::LogWriter;
pub use logger_loader::{LoggerConfigError, LoggerLoader};
pub use memory_log_destination::MemoryLogDestination;
