//! Host side of the plugin lifecycle: loading modules, driving
//! `init -> get_options -> parse -> apply -> destroy`, and unloading.

pub mod config_parser;
pub mod error;
pub mod host_config;
pub mod module_loader;
pub mod option_registry;
pub mod plugin;
pub mod plugin_loader;
pub mod plugin_registry;

pub use config_parser::{ConfigParser, ParseOutcome};
pub use error::{
    ApplyError, ContractViolation, ErrorDomain, LifecycleError, LoadError, MergeError, ParseError, ParseErrorKind,
    StartupError,
};
pub use host_config::{split_plugin_list, HostConfig, HostConfigError, HostSection};
pub use module_loader::{resolve_plugin_filename, LibraryLoader, Module, ModuleLoader, StaticModuleLoader};
pub use option_registry::{
    OptionBinding, OptionGroup, OptionRegistry, OptionSchema, OptionValue, TypeMismatch, RESERVED_LONG,
    RESERVED_SHORT,
};
pub use plugin::{Plugin, PluginState};
pub use plugin_loader::PluginLoader;
pub use plugin_registry::{LoadPolicy, PluginRegistry};
