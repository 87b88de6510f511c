//! Error taxonomy of the plugin lifecycle.
//!
//! Every failure is returned to the caller as a value; none of them aborts
//! the process. The host decides which ones are fatal.

use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::plugin::PluginState;

/// Ways a module can resolve but still violate the plugin contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContractViolation {
    /// The well-known entry symbol is not exported.
    MissingEntryPoint(String),
    /// The entry point returned a null descriptor.
    NullDescriptor,
    /// One or more required slots are null.
    MissingSlots(Vec<&'static str>),
}

impl fmt::Display for ContractViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ContractViolation::MissingEntryPoint(detail) => {
                write!(f, "missing entry point 'create_plugin' ({})", detail)
            }
            ContractViolation::NullDescriptor => write!(f, "entry point returned a null descriptor"),
            ContractViolation::MissingSlots(slots) => {
                write!(f, "descriptor is missing required slots: {}", slots.join(", "))
            }
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("plugin '{name}' not found (searched: {})", display_paths(.searched))]
    NotFound { name: String, searched: Vec<PathBuf> },

    #[error("plugin '{name}' could not be opened from {}: {source}", .path.display())]
    Open {
        name: String,
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("plugin '{name}' violates the plugin contract: {reason}")]
    BadContract { name: String, reason: ContractViolation },

    #[error("plugin '{name}' is already loaded")]
    AlreadyLoaded { name: String },
}

impl LoadError {
    /// Name of the plugin the failed load was attempted for.
    pub fn plugin_name(&self) -> &str {
        match self {
            LoadError::NotFound { name, .. }
            | LoadError::Open { name, .. }
            | LoadError::BadContract { name, .. }
            | LoadError::AlreadyLoaded { name } => name,
        }
    }
}

fn display_paths(paths: &[PathBuf]) -> String {
    if paths.is_empty() {
        return "nothing".to_string();
    }
    paths
        .iter()
        .map(|p| p.display().to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    #[error("plugin '{plugin}': cannot {operation} while {state}")]
    InvalidState {
        plugin: String,
        state: PluginState,
        operation: &'static str,
    },

    #[error("plugin '{plugin}': init failed to allocate a config")]
    AllocationFailed { plugin: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MergeError {
    #[error("option '--{option}' of group '{second_group}' is already registered by group '{first_group}'")]
    DuplicateOption {
        option: String,
        first_group: String,
        second_group: String,
    },

    #[error("short option '-{short}' of group '{second_group}' is already registered by group '{first_group}'")]
    DuplicateShortOption {
        short: char,
        first_group: String,
        second_group: String,
    },

    #[error("option '{option}' of group '{group}' is reserved by the parser")]
    ReservedOption { option: String, group: String },

    #[error("option group '{group}' is already registered")]
    DuplicateGroup { group: String },

    #[error("group '{group}': option #{index} is invalid: {reason}")]
    InvalidOption {
        group: String,
        index: usize,
        reason: String,
    },

    #[error("group '{group}': get_options returned no table")]
    NoOptionTable { group: String },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Which layer produced a [`ParseError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    /// Command-line option parsing.
    Option,
    /// Option values read from the host configuration file.
    ConfigFile,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ErrorDomain::Option => write!(f, "option parsing failed"),
            ErrorDomain::ConfigFile => write!(f, "config file"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ParseErrorKind {
    UnknownOption,
    BadValue,
    MissingValue,
    /// `--help` was given; the message holds the rendered help text.
    HelpRequested,
    Failed,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{domain}: {message}")]
pub struct ParseError {
    pub domain: ErrorDomain,
    pub kind: ParseErrorKind,
    /// Offending argument or key, when known.
    pub token: Option<String>,
    pub message: String,
}

impl ParseError {
    pub fn new(domain: ErrorDomain, kind: ParseErrorKind, message: impl Into<String>) -> Self {
        Self {
            domain,
            kind,
            token: None,
            message: message.into(),
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    pub fn is_help(&self) -> bool {
        self.kind == ParseErrorKind::HelpRequested
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ApplyError {
    #[error("plugin '{plugin}' rejected its configuration (code {code})")]
    Rejected { plugin: String, code: i32 },

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),
}

/// Any failure of the startup sequence, for hosts that treat them alike.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error(transparent)]
    Load(#[from] LoadError),

    #[error(transparent)]
    Lifecycle(#[from] LifecycleError),

    #[error(transparent)]
    Merge(#[from] MergeError),

    #[error(transparent)]
    Parse(#[from] ParseError),

    #[error(transparent)]
    Apply(#[from] ApplyError),
}
