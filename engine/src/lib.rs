pub mod host_options;
pub mod plugin_manager;

pub use host_options::{HostOptions, HOST_GROUP};
pub use plugin_manager::{PluginManager, Startup};
