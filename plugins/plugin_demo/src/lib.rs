//! Sample plugin exposing one option of every kind.

use plugin_core::{declare_plugin, OptionSpec, PluginOptions, StringSlot};

/// `apply_config` code returned when `--demo-repeat` is negative.
pub const ERR_NEGATIVE_REPEAT: i32 = 1;
/// `apply_config` code returned when `--demo-ratio` is outside `0.0..=1.0`.
pub const ERR_RATIO_RANGE: i32 = 2;

#[derive(Debug)]
pub struct DemoConfig {
    pub greeting: StringSlot,
    pub repeat: i64,
    pub shout: bool,
    pub enabled: bool,
    pub ratio: f64,
}

impl Default for DemoConfig {
    fn default() -> Self {
        Self {
            greeting: StringSlot::new(),
            repeat: 1,
            shout: false,
            enabled: true,
            ratio: 1.0,
        }
    }
}

impl DemoConfig {
    /// The greeting as it would be printed, once per repeat.
    pub fn render(&self) -> Vec<String> {
        if !self.enabled {
            return Vec::new();
        }
        let greeting = self.greeting.get().unwrap_or("hello");
        let line = if self.shout {
            greeting.to_uppercase()
        } else {
            greeting.to_string()
        };
        (0..self.repeat.max(0)).map(|_| line.clone()).collect()
    }
}

impl PluginOptions for DemoConfig {
    fn options(&mut self) -> Vec<OptionSpec<'_>> {
        vec![
            OptionSpec::string(c"demo-greeting", &mut self.greeting)
                .short(b'g')
                .description(c"Text to print")
                .arg_description(c"TEXT"),
            OptionSpec::int(c"demo-repeat", &mut self.repeat)
                .description(c"How many times to print the greeting")
                .arg_description(c"N"),
            OptionSpec::flag(c"demo-shout", &mut self.shout).description(c"Print in upper case"),
            OptionSpec::boolean(c"demo-enabled", &mut self.enabled).description(c"Turn the plugin on or off"),
            OptionSpec::double(c"demo-ratio", &mut self.ratio)
                .description(c"Fraction of output to keep, 0.0 to 1.0")
                .arg_description(c"RATIO"),
        ]
    }

    fn apply(&mut self) -> Result<(), plugin_core::c_int> {
        if self.repeat < 0 {
            return Err(ERR_NEGATIVE_REPEAT);
        }
        if !(0.0..=1.0).contains(&self.ratio) {
            return Err(ERR_RATIO_RANGE);
        }
        Ok(())
    }
}

declare_plugin!(DemoConfig, c"Demo plugin options");
