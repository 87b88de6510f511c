use std::sync::Arc;

use logger::Logger;

use crate::error::{ContractViolation, LoadError};
use crate::module_loader::ModuleLoader;
use crate::plugin::{Plugin, PluginSlots, PluginState};

/// Resolves plugin modules, validates their descriptors and hands out
/// [`Plugin`] records in the `Loaded` state.
///
/// Diagnostics go to the injected logger only; the loader never prints.
pub struct PluginLoader {
    modules: Box<dyn ModuleLoader>,
    logger: Arc<dyn Logger>,
}

impl PluginLoader {
    pub fn new(modules: impl ModuleLoader + 'static, logger: Arc<dyn Logger>) -> Self {
        Self {
            modules: Box::new(modules),
            logger,
        }
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    /// Loads `name` and checks that its descriptor fills every required slot.
    /// No plugin code other than the entry point runs here.
    pub fn load(&self, name: &str) -> Result<Plugin, LoadError> {
        self.try_load(name).map_err(|e| {
            self.logger.warn(&format!("Failed to load plugin: {}", e));
            e
        })
    }

    fn try_load(&self, name: &str) -> Result<Plugin, LoadError> {
        let module = self.modules.resolve(name)?;
        let entry = module.entry();

        // Safety: the entry point was resolved from `module`, which is still alive.
        let descriptor = unsafe { entry() };
        if descriptor.is_null() {
            return Err(LoadError::BadContract {
                name: name.to_string(),
                reason: ContractViolation::NullDescriptor,
            });
        }
        // Safety: non-null and owned by the module for as long as it is loaded.
        let descriptor = unsafe { &*descriptor };

        let Some(slots) = PluginSlots::from_descriptor(descriptor) else {
            return Err(LoadError::BadContract {
                name: name.to_string(),
                reason: ContractViolation::MissingSlots(descriptor.missing_slots()),
            });
        };

        let plugin = unsafe { Plugin::new(module, descriptor, slots) };
        match plugin.module_path() {
            Some(path) => self.logger.debug(&format!("Loaded plugin '{}' from {}", name, path.display())),
            None => self.logger.debug(&format!("Loaded built-in plugin '{}'", name)),
        }
        Ok(plugin)
    }

    /// Releases a plugin's module. A plugin that still holds a config is
    /// destroyed first.
    pub fn unload(&self, mut plugin: Plugin) {
        if plugin.state() == PluginState::Initialized {
            self.logger.warn(&format!(
                "Plugin '{}' unloaded while initialized; destroying its config first",
                plugin.name()
            ));
            // Cannot fail: the state was checked above.
            let _ = plugin.destroy();
        }
        self.logger.debug(&format!("Unloaded plugin '{}'", plugin.name()));
        drop(plugin);
    }
}
