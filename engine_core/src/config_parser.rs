//! Command-line parsing against a merged [`OptionSchema`].
//!
//! A `clap::Command` is built from the schema on every call and dropped
//! afterwards; nothing is cached between parses. Values are converted by clap
//! before any slot is touched, so a rejected command line writes nothing.

use clap::builder::BoolishValueParser;
use clap::error::{ContextKind, ContextValue, ErrorKind};
use clap::parser::ValueSource;
use clap::{value_parser, Arg, ArgAction, ArgMatches, ColorChoice, Command};
use plugin_core::OptionArg;

use crate::error::{ErrorDomain, ParseError, ParseErrorKind};
use crate::option_registry::{OptionBinding, OptionSchema, OptionValue};

/// Id of the hidden positional collecting non-option arguments.
const REMAINING: &str = "::remaining";

/// What is left of the command line after options were consumed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParseOutcome {
    /// Positional arguments, in order, for the host to handle.
    pub remaining: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct ConfigParser {
    program: String,
    summary: Option<String>,
    ignore_unknown: bool,
}

impl ConfigParser {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            summary: None,
            ignore_unknown: false,
        }
    }

    /// One-line description shown at the top of `--help`.
    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    /// Skip options the schema does not know instead of failing.
    pub fn ignore_unknown(mut self, ignore_unknown: bool) -> Self {
        self.ignore_unknown = ignore_unknown;
        self
    }

    /// Parses `argv` (program name first) and writes every recognised
    /// option into its slot.
    pub fn parse<I, T>(&self, schema: &mut OptionSchema<'_>, argv: I) -> Result<ParseOutcome, ParseError>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut args: Vec<String> = argv.into_iter().map(Into::into).collect();
        if args.is_empty() {
            args.push(self.program.clone());
        }
        if self.ignore_unknown {
            args = retain_known(schema, args);
        }

        let mut matches = self
            .command(schema)
            .try_get_matches_from(args)
            .map_err(option_error)?;

        for group in schema.groups_mut() {
            for binding in group.options_mut() {
                if matches.value_source(&binding.long) != Some(ValueSource::CommandLine) {
                    continue;
                }
                let Some(value) = take_value(&mut matches, binding) else {
                    continue;
                };
                binding.write(value).map_err(|e| {
                    ParseError::new(ErrorDomain::Option, ParseErrorKind::Failed, format!("--{}: {}", binding.long, e))
                        .with_token(format!("--{}", binding.long))
                })?;
            }
        }

        let remaining = matches
            .remove_many::<String>(REMAINING)
            .map(Iterator::collect)
            .unwrap_or_default();
        Ok(ParseOutcome { remaining })
    }

    /// Writes values from `[options.<group>]` tables of the host config file.
    ///
    /// `tables` maps group names to tables of `option = value`. Values must
    /// match the option type; a flag takes a boolean.
    pub fn apply_table(&self, schema: &mut OptionSchema<'_>, tables: &toml::Table) -> Result<(), ParseError> {
        for (group_name, entries) in tables {
            let group = schema.group_mut(group_name).ok_or_else(|| {
                config_error(ParseErrorKind::UnknownOption, format!("unknown option group [options.{}]", group_name))
                    .with_token(group_name.clone())
            })?;
            let toml::Value::Table(entries) = entries else {
                return Err(config_error(
                    ParseErrorKind::BadValue,
                    format!("[options.{}] must be a table", group_name),
                )
                .with_token(group_name.clone()));
            };

            for (key, raw) in entries {
                let token = format!("{}.{}", group_name, key);
                let binding = group.find_mut(key).ok_or_else(|| {
                    config_error(
                        ParseErrorKind::UnknownOption,
                        format!("unknown option '{}' in [options.{}]", key, group_name),
                    )
                    .with_token(token.clone())
                })?;
                let value = match (binding.arg, raw) {
                    (OptionArg::None | OptionArg::Bool, toml::Value::Boolean(b)) => OptionValue::Bool(*b),
                    (OptionArg::Int, toml::Value::Integer(i)) => OptionValue::Int(*i),
                    (OptionArg::Double, toml::Value::Float(f)) => OptionValue::Double(*f),
                    (OptionArg::Double, toml::Value::Integer(i)) => OptionValue::Double(*i as f64),
                    (OptionArg::String, toml::Value::String(s)) => OptionValue::String(s.clone()),
                    (arg, other) => {
                        return Err(config_error(
                            ParseErrorKind::BadValue,
                            format!("option '{}' expects {} but got {}", token, arg.as_str(), other.type_str()),
                        )
                        .with_token(token));
                    }
                };
                binding
                    .write(value)
                    .map_err(|e| config_error(ParseErrorKind::Failed, format!("{}: {}", token, e)).with_token(token.clone()))?;
            }
        }
        Ok(())
    }

    /// Help text for the schema, one section per group in schema order.
    pub fn render_help(&self, schema: &OptionSchema<'_>) -> String {
        self.command(schema).render_help().to_string()
    }

    fn command(&self, schema: &OptionSchema<'_>) -> Command {
        let mut command = Command::new(self.program.clone())
            .disable_version_flag(true)
            .args_override_self(true)
            .color(ColorChoice::Never)
            .arg(
                Arg::new(REMAINING)
                    .num_args(0..)
                    .action(ArgAction::Append)
                    .value_parser(value_parser!(String))
                    .hide(true),
            );
        if let Some(summary) = &self.summary {
            command = command.about(summary.clone());
        }

        for group in schema.groups() {
            command = command.next_help_heading(group.description().to_string());
            for binding in group.options() {
                command = command.arg(arg_for(binding));
            }
        }
        command
    }
}

fn arg_for(binding: &OptionBinding<'_>) -> Arg {
    let mut arg = Arg::new(binding.long.clone()).long(binding.long.clone());
    if let Some(short) = binding.short {
        arg = arg.short(short);
    }
    if let Some(description) = &binding.description {
        arg = arg.help(description.clone());
    }

    arg = match binding.arg {
        OptionArg::None => arg.action(ArgAction::SetTrue),
        OptionArg::Bool => arg.action(ArgAction::Set).value_parser(BoolishValueParser::new()),
        OptionArg::Int => arg
            .action(ArgAction::Set)
            .value_parser(value_parser!(i64))
            .allow_negative_numbers(true),
        OptionArg::Double => arg
            .action(ArgAction::Set)
            .value_parser(value_parser!(f64))
            .allow_negative_numbers(true),
        OptionArg::String => arg.action(ArgAction::Set).value_parser(value_parser!(String)),
    };

    if binding.arg.takes_value() {
        let value_name = binding
            .arg_description
            .clone()
            .unwrap_or_else(|| binding.arg.as_str().to_string());
        arg = arg.value_name(value_name);
    }
    arg
}

fn take_value(matches: &mut ArgMatches, binding: &OptionBinding<'_>) -> Option<OptionValue> {
    let id = binding.long.as_str();
    match binding.arg {
        OptionArg::None | OptionArg::Bool => matches.remove_one::<bool>(id).map(OptionValue::Bool),
        OptionArg::Int => matches.remove_one::<i64>(id).map(OptionValue::Int),
        OptionArg::Double => matches.remove_one::<f64>(id).map(OptionValue::Double),
        OptionArg::String => matches.remove_one::<String>(id).map(OptionValue::String),
    }
}

/// Drops options the schema does not define, keeping positionals and the
/// values of known options.
fn retain_known(schema: &OptionSchema<'_>, args: Vec<String>) -> Vec<String> {
    let mut kept = Vec::with_capacity(args.len());
    let mut args = args.into_iter();
    if let Some(program) = args.next() {
        kept.push(program);
    }

    while let Some(arg) = args.next() {
        if arg == "--" {
            kept.push(arg);
            kept.extend(args);
            break;
        }

        // Some(needs the following argument as its value) for known options.
        let known = if let Some(long) = arg.strip_prefix("--") {
            let (name, inline) = match long.split_once('=') {
                Some((name, _)) => (name, true),
                None => (long, false),
            };
            schema.find_long(name).map(|b| b.arg.takes_value() && !inline)
        } else if arg.len() > 1 && arg.starts_with('-') {
            let mut chars = arg.chars().skip(1);
            let attached = arg.chars().count() > 2;
            chars
                .next()
                .and_then(|c| schema.find_short(c))
                .map(|b| b.arg.takes_value() && !attached)
        } else {
            kept.push(arg);
            continue;
        };

        if let Some(needs_value) = known {
            kept.push(arg);
            if needs_value {
                if let Some(value) = args.next() {
                    kept.push(value);
                }
            }
        }
    }
    kept
}

fn context_string(err: &clap::Error, kind: ContextKind) -> Option<String> {
    match err.get(kind) {
        Some(ContextValue::String(value)) => Some(value.clone()),
        _ => None,
    }
}

fn option_error(err: clap::Error) -> ParseError {
    let kind = match err.kind() {
        ErrorKind::DisplayHelp | ErrorKind::DisplayHelpOnMissingArgumentOrSubcommand => ParseErrorKind::HelpRequested,
        ErrorKind::UnknownArgument => ParseErrorKind::UnknownOption,
        ErrorKind::InvalidValue
            if context_string(&err, ContextKind::InvalidValue).is_some_and(|v| v.is_empty()) =>
        {
            ParseErrorKind::MissingValue
        }
        ErrorKind::InvalidValue | ErrorKind::ValueValidation => ParseErrorKind::BadValue,
        ErrorKind::NoEquals | ErrorKind::TooFewValues | ErrorKind::WrongNumberOfValues => {
            ParseErrorKind::MissingValue
        }
        _ => ParseErrorKind::Failed,
    };

    let rendered = err.render().to_string();
    let message = if kind == ParseErrorKind::HelpRequested {
        rendered.trim_end().to_string()
    } else {
        let first = rendered.lines().next().unwrap_or_default();
        first.strip_prefix("error: ").unwrap_or(first).to_string()
    };

    let mut error = ParseError::new(ErrorDomain::Option, kind, message);
    error.token = context_string(&err, ContextKind::InvalidArg);
    error
}

fn config_error(kind: ParseErrorKind, message: String) -> ParseError {
    ParseError::new(ErrorDomain::ConfigFile, kind, message)
}
