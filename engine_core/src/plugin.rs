use std::ffi::CStr;
use std::fmt;
use std::path::Path;
use std::ptr::NonNull;

use plugin_core::{OptionEntry, PluginConfigHandle, PluginDescriptor};

use crate::error::{ApplyError, LifecycleError, MergeError};
use crate::module_loader::Module;
use crate::option_registry::OptionGroup;

/// Where a loaded plugin is in its lifecycle.
///
/// `Loaded -> Initialized -> Destroyed`; a plugin is unloaded by consuming it
/// in [`PluginLoader::unload`](crate::PluginLoader::unload) or dropping it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PluginState {
    Loaded,
    Initialized,
    Destroyed,
}

impl fmt::Display for PluginState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            PluginState::Loaded => "loaded",
            PluginState::Initialized => "initialized",
            PluginState::Destroyed => "destroyed",
        };
        write!(f, "{}", state)
    }
}

/// Descriptor slots, checked non-null when the plugin was loaded.
#[derive(Clone, Copy)]
pub(crate) struct PluginSlots {
    pub(crate) init: extern "C" fn() -> *mut PluginConfigHandle,
    pub(crate) destroy: extern "C" fn(*mut PluginConfigHandle),
    pub(crate) get_options: extern "C" fn(*mut PluginConfigHandle) -> *const OptionEntry,
    pub(crate) apply_config: Option<extern "C" fn(*mut PluginConfigHandle) -> libc::c_int>,
}

impl PluginSlots {
    /// Returns `None` when a required slot is missing.
    pub(crate) fn from_descriptor(descriptor: &PluginDescriptor) -> Option<Self> {
        Some(Self {
            init: descriptor.init?,
            destroy: descriptor.destroy?,
            get_options: descriptor.get_options?,
            apply_config: descriptor.apply_config,
        })
    }
}

/// Host-side record of a loaded plugin: its module, bound slots and config.
///
/// Dropping a `Plugin` that is still initialized destroys its config before
/// the module is released.
pub struct Plugin {
    name: String,
    description: Option<String>,
    slots: PluginSlots,
    config: Option<NonNull<PluginConfigHandle>>,
    state: PluginState,
    // Declared last: the library must outlive every call through `slots`.
    module: Module,
}

impl Plugin {
    /// # Safety
    /// `descriptor` must have been returned by `module`'s entry point and
    /// stay valid while `module` is alive.
    pub(crate) unsafe fn new(module: Module, descriptor: &PluginDescriptor, slots: PluginSlots) -> Self {
        let description = if descriptor.description.is_null() {
            None
        } else {
            Some(CStr::from_ptr(descriptor.description).to_string_lossy().into_owned())
        };

        Self {
            name: module.name().to_string(),
            description,
            slots,
            config: None,
            state: PluginState::Loaded,
            module,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn state(&self) -> PluginState {
        self.state
    }

    pub fn module_path(&self) -> Option<&Path> {
        self.module.path()
    }

    pub fn has_apply_hook(&self) -> bool {
        self.slots.apply_config.is_some()
    }

    /// Raw config handle while initialized.
    pub fn config_handle(&self) -> Option<NonNull<PluginConfigHandle>> {
        self.config
    }

    fn require(&self, state: PluginState, operation: &'static str) -> Result<(), LifecycleError> {
        if self.state == state {
            return Ok(());
        }
        Err(LifecycleError::InvalidState {
            plugin: self.name.clone(),
            state: self.state,
            operation,
        })
    }

    fn initialized_handle(&self, operation: &'static str) -> Result<NonNull<PluginConfigHandle>, LifecycleError> {
        self.require(PluginState::Initialized, operation)?;
        self.config.ok_or_else(|| LifecycleError::InvalidState {
            plugin: self.name.clone(),
            state: self.state,
            operation,
        })
    }

    /// Creates the plugin's config. On allocation failure the plugin stays
    /// `Loaded` and `init` may be retried.
    pub fn init(&mut self) -> Result<(), LifecycleError> {
        self.require(PluginState::Loaded, "init")?;
        match NonNull::new((self.slots.init)()) {
            Some(handle) => {
                self.config = Some(handle);
                self.state = PluginState::Initialized;
                Ok(())
            }
            None => Err(LifecycleError::AllocationFailed {
                plugin: self.name.clone(),
            }),
        }
    }

    /// Calls `get_options` and binds the returned table as an option group
    /// named after the plugin. The group borrows the plugin mutably, so the
    /// config cannot be destroyed while the group is alive.
    pub fn option_group(&mut self) -> Result<OptionGroup<'_>, MergeError> {
        let handle = self.initialized_handle("get options")?;
        let table = (self.slots.get_options)(handle.as_ptr());
        if table.is_null() {
            return Err(MergeError::NoOptionTable {
                group: self.name.clone(),
            });
        }
        let description = self
            .description
            .clone()
            .unwrap_or_else(|| format!("Options for the {} plugin", self.name));
        // The table stays valid until the next get_options or destroy, both of
        // which need `&mut self` again.
        unsafe { OptionGroup::from_raw_table(self.name.clone(), description, table) }
    }

    /// Runs the optional `apply_config` hook; plugins without one succeed.
    pub fn apply_config(&mut self) -> Result<(), ApplyError> {
        let handle = self.initialized_handle("apply config")?;
        let Some(apply) = self.slots.apply_config else {
            return Ok(());
        };
        match apply(handle.as_ptr()) {
            0 => Ok(()),
            code => Err(ApplyError::Rejected {
                plugin: self.name.clone(),
                code,
            }),
        }
    }

    /// Releases the config. This is the last use of the handle.
    pub fn destroy(&mut self) -> Result<(), LifecycleError> {
        let handle = self.initialized_handle("destroy")?;
        self.config = None;
        self.state = PluginState::Destroyed;
        (self.slots.destroy)(handle.as_ptr());
        Ok(())
    }
}

impl Drop for Plugin {
    fn drop(&mut self) {
        if let Some(handle) = self.config.take() {
            (self.slots.destroy)(handle.as_ptr());
            self.state = PluginState::Destroyed;
        }
    }
}

impl fmt::Debug for Plugin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plugin")
            .field("name", &self.name)
            .field("state", &self.state)
            .field("module", &self.module)
            .finish()
    }
}
