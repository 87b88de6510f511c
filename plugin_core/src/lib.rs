//! ABI shared between the host engine and its plugins.
//!
//! A plugin is a dynamic library exporting one symbol, [`ENTRY_SYMBOL`],
//! which returns a pointer to a static [`PluginDescriptor`]. The descriptor
//! exposes three required slots (`init`, `destroy`, `get_options`) and an
//! optional `apply_config` hook. Plugins written in Rust normally never touch
//! these slots directly: they implement [`PluginOptions`] for their config
//! type and invoke [`declare_plugin!`].

pub mod option_entry;
pub mod plugin;
pub mod plugin_macros;
pub mod plugin_options;
pub mod string_slot;

pub use option_entry::{OptionArg, OptionEntry};
pub use plugin::{PluginConfigHandle, PluginDescriptor, PluginEntry, ENTRY_SYMBOL};
pub use plugin_options::{config_mut, config_ref, OptionSpec, OptionTarget, PluginOptions};
pub use string_slot::StringSlot;

pub use libc::c_int;
