//! Name-to-module resolution.
//!
//! This is the only place that opens shared libraries or looks up symbols.
//! Everything above it works with a [`Module`], which keeps the library
//! mapped for as long as it lives.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use libloading::{Library, Symbol};
use plugin_core::{PluginEntry, ENTRY_SYMBOL};

use crate::error::{ContractViolation, LoadError};

/// Resolves a plugin name to a module exposing the plugin entry point.
pub trait ModuleLoader {
    fn resolve(&self, name: &str) -> Result<Module, LoadError>;
}

enum ModuleHandle {
    /// Entry point compiled into the host itself.
    Static,
    /// Held only to keep the library mapped.
    Library(#[allow(dead_code)] Library),
}

/// A resolved plugin module and its bound entry point.
///
/// The entry point (and anything it hands out) is only valid while the
/// module is alive; dropping the module unmaps the library.
pub struct Module {
    name: String,
    path: Option<PathBuf>,
    entry: PluginEntry,
    _handle: ModuleHandle,
}

impl Module {
    /// Wraps an entry point that is linked into the running binary.
    pub fn from_static(name: impl Into<String>, entry: PluginEntry) -> Self {
        Self {
            name: name.into(),
            path: None,
            entry,
            _handle: ModuleHandle::Static,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// File the module was loaded from; `None` for in-process modules.
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub(crate) fn entry(&self) -> PluginEntry {
        self.entry
    }
}

impl fmt::Debug for Module {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Module")
            .field("name", &self.name)
            .field("path", &self.path)
            .finish()
    }
}

/// Returns the filename of the plugin based on platform (e.g., libfoo.so, foo.dll, libfoo.dylib)
pub fn resolve_plugin_filename(name: &str) -> String {
    if cfg!(target_os = "windows") {
        format!("{}.dll", name)
    } else if cfg!(target_os = "macos") {
        format!("lib{}.dylib", name)
    } else {
        format!("lib{}.so", name)
    }
}

fn is_plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(['/', '\\']) && name != "." && name != ".."
}

/// Loads plugins from shared libraries found in a list of directories.
///
/// `name` resolves to the first `<dir>/<platform filename>` that exists, in
/// directory order.
#[derive(Debug, Clone, Default)]
pub struct LibraryLoader {
    search_dirs: Vec<PathBuf>,
}

impl LibraryLoader {
    pub fn new<I, P>(search_dirs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            search_dirs: search_dirs.into_iter().map(Into::into).collect(),
        }
    }

    pub fn search_dirs(&self) -> &[PathBuf] {
        &self.search_dirs
    }

    /// Candidate paths for `name`, in the order they are tried.
    pub fn candidates(&self, name: &str) -> Vec<PathBuf> {
        if !is_plain_name(name) {
            return Vec::new();
        }
        let filename = resolve_plugin_filename(name);
        self.search_dirs.iter().map(|dir| dir.join(&filename)).collect()
    }
}

impl ModuleLoader for LibraryLoader {
    fn resolve(&self, name: &str) -> Result<Module, LoadError> {
        let candidates = self.candidates(name);
        let Some(path) = candidates.iter().find(|p| p.is_file()).cloned() else {
            return Err(LoadError::NotFound {
                name: name.to_string(),
                searched: candidates,
            });
        };

        let library = unsafe { Library::new(&path) }.map_err(|source| LoadError::Open {
            name: name.to_string(),
            path: path.clone(),
            source,
        })?;

        let entry = unsafe {
            let symbol: Symbol<PluginEntry> = library.get(ENTRY_SYMBOL).map_err(|e| LoadError::BadContract {
                name: name.to_string(),
                reason: ContractViolation::MissingEntryPoint(e.to_string()),
            })?;
            *symbol
        };

        Ok(Module {
            name: name.to_string(),
            path: Some(path),
            entry,
            _handle: ModuleHandle::Library(library),
        })
    }
}

/// Resolves names against entry points registered in-process.
///
/// Used for plugins linked statically into the host, and by tests.
#[derive(Default)]
pub struct StaticModuleLoader {
    entries: HashMap<String, PluginEntry>,
}

impl StaticModuleLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, entry: PluginEntry) -> &mut Self {
        self.entries.insert(name.into(), entry);
        self
    }

    pub fn with(mut self, name: impl Into<String>, entry: PluginEntry) -> Self {
        self.register(name, entry);
        self
    }
}

impl ModuleLoader for StaticModuleLoader {
    fn resolve(&self, name: &str) -> Result<Module, LoadError> {
        match self.entries.get(name) {
            Some(entry) => Ok(Module::from_static(name, *entry)),
            None => Err(LoadError::NotFound {
                name: name.to_string(),
                searched: Vec::new(),
            }),
        }
    }
}
