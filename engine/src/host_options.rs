use engine_core::{OptionBinding, OptionGroup};

/// Name of the host's own option group, also its `[options.host]` table.
pub const HOST_GROUP: &str = "host";

/// Options the engine itself understands. They are parsed twice: once
/// before any plugin is loaded (unknown options skipped), then again as part
/// of the full schema.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct HostOptions {
    pub config: Option<String>,
    pub plugin_dir: Option<String>,
    pub plugins: Option<String>,
    pub log_level: Option<String>,
    pub check_config: bool,
}

impl HostOptions {
    pub fn group(&mut self) -> OptionGroup<'_> {
        OptionGroup::new(HOST_GROUP, "Host options")
            .option(
                OptionBinding::string("config", &mut self.config)
                    .short('c')
                    .help("Host configuration file")
                    .value_name("FILE"),
            )
            .option(
                OptionBinding::string("plugin-dir", &mut self.plugin_dir)
                    .help("Directory searched for plugin libraries")
                    .value_name("DIR"),
            )
            .option(
                OptionBinding::string("plugins", &mut self.plugins)
                    .help("Comma separated plugins to load, replacing the config file list")
                    .value_name("NAMES"),
            )
            .option(
                OptionBinding::string("log-level", &mut self.log_level)
                    .help("trace, debug, info, warn or error")
                    .value_name("LEVEL"),
            )
            .option(
                OptionBinding::flag("check-config", &mut self.check_config)
                    .help("Load and configure every plugin, then exit"),
            )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use engine_core::{ConfigParser, OptionSchema};

    #[test]
    fn first_pass_skips_plugin_options() {
        let mut options = HostOptions::default();
        let mut schema = OptionSchema::new();
        schema.add_group(options.group()).unwrap();
        ConfigParser::new("engine")
            .ignore_unknown(true)
            .parse(
                &mut schema,
                ["engine", "--demo-repeat=3", "-c", "host.toml", "--plugins", "a,b", "--check-config"],
            )
            .unwrap();
        drop(schema);

        assert_eq!(options.config.as_deref(), Some("host.toml"));
        assert_eq!(options.plugins.as_deref(), Some("a,b"));
        assert!(options.check_config);
        assert_eq!(options.log_level, None);
    }
}
