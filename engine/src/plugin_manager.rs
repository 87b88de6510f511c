//! Startup and shutdown of the plugin set.
//!
//! Startup runs in two phases. The host options are parsed first with
//! unknown options skipped, which is enough to find the config file, the
//! plugin directory and the plugin list. The plugins are then loaded and
//! initialized, and the full command line is parsed against the host group
//! plus every plugin group. Values from the config file's `[options.*]`
//! tables are written before the command line, which therefore wins.

use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::Context;
use engine_core::{
    split_plugin_list, ConfigParser, ErrorDomain, HostConfig, LibraryLoader, OptionSchema, ParseError,
    ParseErrorKind, PluginLoader, PluginRegistry,
};
use logger::{LogLevel, Logger, LoggerLoader};

use crate::host_options::{HostOptions, HOST_GROUP};

const PROGRAM: &str = "engine";
const SUMMARY: &str = "Loads plugins, configures them from the command line and runs until interrupted.";

/// Result of [`PluginManager::start`].
pub enum Startup {
    /// Every plugin is loaded, initialized and configured.
    Ready(PluginManager),
    /// `--check-config` was given and the configuration is valid.
    Checked(PluginManager),
    /// `--help` was given; the rendered help text.
    Help(String),
}

/// Owns the plugin registry for the lifetime of the engine.
pub struct PluginManager {
    registry: PluginRegistry,
    logger: Arc<dyn Logger>,
    remaining: Vec<String>,
}

impl PluginManager {
    /// Runs the full startup sequence for `args` (program name first).
    ///
    /// On error every plugin loaded so far has already been torn down.
    pub fn start(args: &[String]) -> anyhow::Result<Startup> {
        let mut cli = HostOptions::default();
        first_pass(&mut cli, args, &toml::Table::new())?;

        let config = match &cli.config {
            Some(path) => HostConfig::from_file(path)?,
            None => HostConfig::default(),
        };

        // Again with `[options.host]` applied first, so file values are in
        // effect before the logger and plugins are set up.
        let mut host = HostOptions::default();
        first_pass(&mut host, args, &host_table(&config.options)?)?;

        let mut logging = config.logging.clone();
        if let Some(level) = &host.log_level {
            logging.threshold = LogLevel::from_str(level).map_err(anyhow::Error::msg)?;
        }
        let logger = LoggerLoader::load(&logging)?;

        let plugin_dir = match (&host.plugin_dir, &config.host.plugin_dir) {
            (Some(dir), _) => PathBuf::from(dir),
            (None, Some(dir)) => dir.clone(),
            (None, None) => default_plugin_dir(),
        };
        let plugins = match &host.plugins {
            Some(list) => split_plugin_list(list),
            None => config.host.plugins.clone(),
        };
        logger.info(&format!(
            "Loading {} plugin(s) from {}",
            plugins.len(),
            plugin_dir.display()
        ));

        let loader = PluginLoader::new(LibraryLoader::new([plugin_dir]), logger.clone());
        let mut registry = PluginRegistry::new(loader);
        for skipped in registry.load_all(&plugins, config.host.load_policy)? {
            logger.warn(&format!("Continuing without '{}'", skipped.plugin_name()));
        }
        registry.init_all()?;

        let parser = ConfigParser::new(PROGRAM).summary(SUMMARY);
        let outcome = {
            let mut schema = OptionSchema::new();
            schema.add_group(host.group())?;
            registry.extend_schema(&mut schema)?;
            parser.apply_table(&mut schema, &config.options)?;
            match parser.parse(&mut schema, args.iter().cloned()) {
                Ok(outcome) => outcome,
                Err(e) if e.is_help() => return Ok(Startup::Help(e.message)),
                Err(e) => return Err(e.into()),
            }
        };
        registry.apply_all()?;

        logger.info(&format!("Plugins ready: {}", registry.names().join(", ")));
        if !outcome.remaining.is_empty() {
            logger.warn(&format!(
                "Ignoring positional arguments: {}",
                outcome.remaining.join(" ")
            ));
        }

        let manager = PluginManager {
            registry,
            logger,
            remaining: outcome.remaining,
        };
        if host.check_config {
            manager.logger.info("Configuration is valid");
            return Ok(Startup::Checked(manager));
        }
        Ok(Startup::Ready(manager))
    }

    pub fn logger(&self) -> &Arc<dyn Logger> {
        &self.logger
    }

    pub fn registry(&self) -> &PluginRegistry {
        &self.registry
    }

    /// Positional arguments left after option parsing.
    pub fn remaining(&self) -> &[String] {
        &self.remaining
    }

    /// Destroys and unloads every plugin in reverse load order.
    pub fn shutdown(&mut self) {
        self.logger.info("Shutting down plugins");
        self.registry.shutdown();
    }
}

/// Parses only the host options, skipping everything else. `file_options`
/// is written first so the command line wins. `--help` is left for the
/// second pass so the help text can list plugin options.
fn first_pass(host: &mut HostOptions, args: &[String], file_options: &toml::Table) -> anyhow::Result<()> {
    let args = args.iter().filter(|a| *a != "--help" && *a != "-h").cloned();
    let parser = ConfigParser::new(PROGRAM).ignore_unknown(true);
    let mut schema = OptionSchema::new();
    schema.add_group(host.group())?;
    parser.apply_table(&mut schema, file_options)?;
    parser.parse(&mut schema, args).context("invalid host options")?;
    Ok(())
}

/// The `[options.host]` table alone, as a one-entry group table.
fn host_table(options: &toml::Table) -> Result<toml::Table, ParseError> {
    let mut tables = toml::Table::new();
    let Some(host) = options.get(HOST_GROUP) else {
        return Ok(tables);
    };
    if host.get("config").is_some() {
        return Err(ParseError::new(
            ErrorDomain::ConfigFile,
            ParseErrorKind::BadValue,
            format!("option '{}.config' can only be given on the command line", HOST_GROUP),
        )
        .with_token(format!("{}.config", HOST_GROUP)));
    }
    tables.insert(HOST_GROUP.to_string(), host.clone());
    Ok(tables)
}

/// The directory holding the engine binary, where cargo also places the
/// plugin libraries of the workspace.
fn default_plugin_dir() -> PathBuf {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(PathBuf::from))
        .unwrap_or_else(|| PathBuf::from("."))
}
