use serde::Deserialize;

use crate::error::{ApplyError, LifecycleError, LoadError, MergeError};
use crate::option_registry::{OptionRegistry, OptionSchema};
use crate::plugin::{Plugin, PluginState};
use crate::plugin_loader::PluginLoader;

/// What `load_all` does when one plugin fails to load.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadPolicy {
    /// Stop at the first failure.
    #[default]
    Abort,
    /// Log the failure and keep loading the rest.
    SkipFailed,
}

/// Owns every loaded plugin in load order and tears them down in reverse.
///
/// Dropping the registry runs [`shutdown`](Self::shutdown).
pub struct PluginRegistry {
    loader: PluginLoader,
    plugins: Vec<Plugin>,
}

impl PluginRegistry {
    pub fn new(loader: PluginLoader) -> Self {
        Self {
            loader,
            plugins: Vec::new(),
        }
    }

    pub fn loader(&self) -> &PluginLoader {
        &self.loader
    }

    pub fn load(&mut self, name: &str) -> Result<(), LoadError> {
        if self.get(name).is_some() {
            let err = LoadError::AlreadyLoaded { name: name.to_string() };
            self.loader.logger().warn(&format!("Failed to load plugin: {}", err));
            return Err(err);
        }
        let plugin = self.loader.load(name)?;
        self.plugins.push(plugin);
        Ok(())
    }

    /// Loads `names` in order. With [`LoadPolicy::SkipFailed`] the failures
    /// are returned instead of aborting.
    pub fn load_all<I, S>(&mut self, names: I, policy: LoadPolicy) -> Result<Vec<LoadError>, LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut skipped = Vec::new();
        for name in names {
            match (self.load(name.as_ref()), policy) {
                (Ok(()), _) => {}
                (Err(e), LoadPolicy::Abort) => return Err(e),
                (Err(e), LoadPolicy::SkipFailed) => skipped.push(e),
            }
        }
        if !skipped.is_empty() {
            self.loader
                .logger()
                .warn(&format!("Skipped {} plugin(s) that failed to load", skipped.len()));
        }
        Ok(skipped)
    }

    /// Initializes every plugin that is still `Loaded`, in load order.
    pub fn init_all(&mut self) -> Result<(), LifecycleError> {
        for plugin in self.plugins.iter_mut() {
            if plugin.state() == PluginState::Loaded {
                plugin.init()?;
                self.loader.logger().debug(&format!("Initialized plugin '{}'", plugin.name()));
            }
        }
        Ok(())
    }

    /// One option group per initialized plugin, in load order.
    pub fn option_schema(&mut self) -> Result<OptionSchema<'_>, MergeError> {
        OptionRegistry::merge(self.plugins.iter_mut())
    }

    /// Appends the plugin groups after those already in `schema`.
    pub fn extend_schema<'a>(&'a mut self, schema: &mut OptionSchema<'a>) -> Result<(), MergeError> {
        OptionRegistry::merge_into(schema, self.plugins.iter_mut())
    }

    /// Runs each initialized plugin's `apply_config` hook, stopping at the
    /// first rejection.
    pub fn apply_all(&mut self) -> Result<(), ApplyError> {
        for plugin in self.plugins.iter_mut() {
            if plugin.state() == PluginState::Initialized {
                plugin.apply_config()?;
            }
        }
        Ok(())
    }

    /// Destroys initialized plugins in reverse load order, then unloads every
    /// module, also in reverse. Calling it again does nothing.
    pub fn shutdown(&mut self) {
        if self.plugins.is_empty() {
            return;
        }
        for plugin in self.plugins.iter_mut().rev() {
            if plugin.state() == PluginState::Initialized {
                // Cannot fail: the state was checked above.
                let _ = plugin.destroy();
                self.loader.logger().debug(&format!("Destroyed plugin '{}'", plugin.name()));
            }
        }
        while let Some(plugin) = self.plugins.pop() {
            self.loader.unload(plugin);
        }
        self.loader.logger().info("All plugins unloaded");
    }

    /// Plugin names in load order.
    pub fn names(&self) -> Vec<&str> {
        self.plugins.iter().map(Plugin::name).collect()
    }

    pub fn len(&self) -> usize {
        self.plugins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Plugin> {
        self.plugins.iter().find(|p| p.name() == name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut Plugin> {
        self.plugins.iter_mut().find(|p| p.name() == name)
    }
}

impl Drop for PluginRegistry {
    fn drop(&mut self) {
        self.shutdown();
    }
}
