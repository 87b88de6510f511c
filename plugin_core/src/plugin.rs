use std::ffi::CStr;
use std::marker::{PhantomData, PhantomPinned};
use std::os::raw::c_char;

use crate::plugin_options::{self, PluginOptions};
use crate::OptionEntry;

/// Name of the symbol every plugin library must export.
pub const ENTRY_SYMBOL: &[u8] = b"create_plugin\0";

/// Signature of the exported entry point.
pub type PluginEntry = unsafe extern "C" fn() -> *const PluginDescriptor;

/// Opaque plugin-private configuration object.
///
/// Created by the `init` slot, released by the `destroy` slot. The host only
/// ever holds a pointer to it.
#[repr(C)]
pub struct PluginConfigHandle {
    _private: [u8; 0],
    _marker: PhantomData<(*mut u8, PhantomPinned)>,
}

/// The contract a loaded plugin satisfies.
///
/// Returned by the plugin's `create_plugin()` entry point and expected to
/// live as long as the library stays loaded. The required slots are nullable
/// on the wire so the host can report a missing slot instead of calling
/// through a null pointer.
#[repr(C)]
pub struct PluginDescriptor {
    /// Human-readable summary used as the help heading of the plugin's
    /// option group. May be null.
    pub description: *const c_char,

    /// Allocates a fresh config object. Returns null on allocation failure.
    pub init: Option<extern "C" fn() -> *mut PluginConfigHandle>,

    /// Releases a config object previously returned by `init`.
    /// Called exactly once per successful `init`; the handle is dead afterwards.
    pub destroy: Option<extern "C" fn(config: *mut PluginConfigHandle)>,

    /// Returns a table of [`OptionEntry`] terminated by
    /// [`OptionEntry::SENTINEL`], whose targets point into `config`.
    pub get_options: Option<extern "C" fn(config: *mut PluginConfigHandle) -> *const OptionEntry>,

    /// Optional hook run once after options have been parsed into `config`.
    /// Returns `0` on success and a plugin-defined non-zero code otherwise.
    pub apply_config: Option<extern "C" fn(config: *mut PluginConfigHandle) -> libc::c_int>,
}

// The descriptor is immutable static data shared by every caller.
unsafe impl Sync for PluginDescriptor {}

impl PluginDescriptor {
    /// Builds a descriptor whose slots are backed by the config type `T`.
    pub const fn of<T: PluginOptions>(description: &'static CStr) -> Self {
        Self {
            description: description.as_ptr(),
            init: Some(plugin_options::init_config::<T>),
            destroy: Some(plugin_options::destroy_config::<T>),
            get_options: Some(plugin_options::get_options::<T>),
            apply_config: Some(plugin_options::apply_config::<T>),
        }
    }

    /// Returns the names of the required slots that are absent.
    pub fn missing_slots(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.init.is_none() {
            missing.push("init");
        }
        if self.destroy.is_none() {
            missing.push("destroy");
        }
        if self.get_options.is_none() {
            missing.push("get_options");
        }
        missing
    }
}
