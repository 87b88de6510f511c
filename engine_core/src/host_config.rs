use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use logger::LoggingConfig;
use serde::Deserialize;
use thiserror::Error;

use crate::plugin_registry::LoadPolicy;

/// Host configuration file.
///
/// ```toml
/// [host]
/// plugin_dir = "target/debug"
/// plugins = ["plugin_demo"]
/// load_policy = "abort"
///
/// [logging]
/// type = "console"
/// threshold = "info"
///
/// [options.plugin_demo]
/// demo-repeat = 3
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostConfig {
    #[serde(default)]
    pub host: HostSection,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// `[options.<group>]` tables, applied through the option schema.
    #[serde(default)]
    pub options: toml::Table,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct HostSection {
    pub plugin_dir: Option<PathBuf>,
    #[serde(default)]
    pub plugins: Vec<String>,
    #[serde(default)]
    pub load_policy: LoadPolicy,
}

#[derive(Debug, Error)]
pub enum HostConfigError {
    #[error("cannot read config file {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid host configuration: {0}")]
    Invalid(String),
}

impl HostConfig {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, HostConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| HostConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config: HostConfig = toml::from_str(&content).map_err(|source| HostConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_toml(content: &str) -> Result<Self, HostConfigError> {
        let config: HostConfig = toml::from_str(content).map_err(|source| HostConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), HostConfigError> {
        let mut seen = HashSet::new();
        for (idx, name) in self.host.plugins.iter().enumerate() {
            if name.trim().is_empty() {
                return Err(HostConfigError::Invalid(format!("plugin at index {} has an empty name", idx)));
            }
            if !seen.insert(name.as_str()) {
                return Err(HostConfigError::Invalid(format!("plugin '{}' is listed twice", name)));
            }
        }
        for (group, value) in &self.options {
            if !value.is_table() {
                return Err(HostConfigError::Invalid(format!("[options.{}] must be a table", group)));
            }
        }
        Ok(())
    }
}

/// Splits a comma separated `--plugins` value, dropping empty entries.
pub fn split_plugin_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
