//! Precedence resolution for configuration.
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI flags (passed at runtime)
//! 2. Environment variables (`ROT_USER` for the acting user)
//! 3. Workspace config.kdl
//! 4. Built-in defaults

use crate::Result;
use crate::config::{OutputFormat, load_config};
use crate::storage::Storage;

/// Environment variable selecting the acting user.
pub const USER_ENV: &str = "ROT_USER";

/// Duration given to new dated items when nothing else is configured.
pub const DEFAULT_DURATION_MONTHS: u32 = 1;

/// Tracks where a resolved value came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValueSource {
    /// Value from environment variable
    EnvVar(String),
    /// Value from the workspace config.kdl
    Session,
    /// Value from CLI flag
    CliFlag,
    /// Built-in default value
    Default,
}

impl std::fmt::Display for ValueSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValueSource::EnvVar(name) => write!(f, "env:{}", name),
            ValueSource::Session => write!(f, "session"),
            ValueSource::CliFlag => write!(f, "cli"),
            ValueSource::Default => write!(f, "default"),
        }
    }
}

/// A resolved value with its source.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub value: T,
    pub source: ValueSource,
}

impl<T> Resolved<T> {
    pub fn new(value: T, source: ValueSource) -> Self {
        Self { value, source }
    }
}

/// Fully resolved configuration with source tracking.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub output_format: Resolved<OutputFormat>,
    /// Email of the acting user, if any
    pub user: Option<Resolved<String>>,
    pub default_product: Option<Resolved<String>>,
    pub default_duration_months: Resolved<u32>,
    pub action_log_enabled: Resolved<bool>,
}

impl Default for ResolvedConfig {
    fn default() -> Self {
        Self {
            output_format: Resolved::new(OutputFormat::default(), ValueSource::Default),
            user: None,
            default_product: None,
            default_duration_months: Resolved::new(DEFAULT_DURATION_MONTHS, ValueSource::Default),
            action_log_enabled: Resolved::new(true, ValueSource::Default),
        }
    }
}

impl ResolvedConfig {
    pub fn user(&self) -> Option<&str> {
        self.user.as_ref().map(|r| r.value.as_str())
    }

    pub fn is_human(&self) -> bool {
        self.output_format.value == OutputFormat::Human
    }
}

/// Runtime overrides taken from CLI flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub output_format: Option<OutputFormat>,
    pub user: Option<String>,
}

impl ConfigOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_output_format(mut self, format: OutputFormat) -> Self {
        self.output_format = Some(format);
        self
    }

    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }
}

/// Resolve configuration with the full precedence chain.
pub fn resolve_config(storage: &Storage, overrides: &ConfigOverrides) -> Result<ResolvedConfig> {
    let session = load_config(storage)?;
    Ok(resolve_with(&session, overrides, std::env::var(USER_ENV).ok()))
}

fn resolve_with(
    session: &crate::config::RoteiroConfig,
    overrides: &ConfigOverrides,
    env_user: Option<String>,
) -> ResolvedConfig {
    let mut result = ResolvedConfig::default();

    if let Some(ref format) = overrides.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::CliFlag);
    } else if let Some(ref format) = session.output_format {
        result.output_format = Resolved::new(format.clone(), ValueSource::Session);
    }

    let env_user = env_user.filter(|u| !u.trim().is_empty());
    if let Some(ref user) = overrides.user {
        result.user = Some(Resolved::new(user.clone(), ValueSource::CliFlag));
    } else if let Some(user) = env_user {
        result.user = Some(Resolved::new(user, ValueSource::EnvVar(USER_ENV.to_string())));
    } else if let Some(ref user) = session.default_user {
        result.user = Some(Resolved::new(user.clone(), ValueSource::Session));
    }

    if let Some(ref product) = session.default_product {
        result.default_product = Some(Resolved::new(product.clone(), ValueSource::Session));
    }
    if let Some(months) = session.default_duration_months {
        result.default_duration_months = Resolved::new(months, ValueSource::Session);
    }
    if let Some(enabled) = session.action_log_enabled {
        result.action_log_enabled = Resolved::new(enabled, ValueSource::Session);
    }

    result
}
