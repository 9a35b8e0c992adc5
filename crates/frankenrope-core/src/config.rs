#![forbid(unsafe_code)]

//! Rope tuning knobs, loaded from the environment.
//!
//! | Variable | Meaning | Default |
//! |----------|---------|---------|
//! | `FRANKENROPE_BALANCE_FACTOR` | multiplier in the depth bound, `>= 1` | `2` |
//! | `FRANKENROPE_SMALL_CONCAT_BYTES` | pieces up to this combined size are merged into one leaf (`0` disables) | `0` |
//! | `FRANKENROPE_REBALANCE` | `rebalance`, `flatten` or `never` | `rebalance` |
//!
//! Invalid values keep the default and are reported as [`RopeConfigError`]
//! diagnostics.

use std::env;
use std::fmt;

use crate::concat::{BalancePolicy, DEFAULT_BALANCE_FACTOR};

const ENV_BALANCE_FACTOR: &str = "FRANKENROPE_BALANCE_FACTOR";
const ENV_SMALL_CONCAT_BYTES: &str = "FRANKENROPE_SMALL_CONCAT_BYTES";
const ENV_REBALANCE: &str = "FRANKENROPE_REBALANCE";

/// How a [`crate::RopeBuilder`] keeps its depth down while appending.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RebalanceStrategy {
    /// Join equal-sized balanced subtrees with concat nodes.
    #[default]
    Rebalance,
    /// Join equal-sized subtrees by copying them into one leaf.
    Flatten,
    /// Append onto a left-deep chain.
    Never,
}

impl RebalanceStrategy {
    /// Parse from a string value (case-insensitive).
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "rebalance" | "balance" | "rebuild" => Some(Self::Rebalance),
            "flatten" | "flat" => Some(Self::Flatten),
            "never" | "off" | "none" => Some(Self::Never),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Rebalance => "rebalance",
            Self::Flatten => "flatten",
            Self::Never => "never",
        }
    }
}

impl fmt::Display for RebalanceStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Rope tuning configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RopeConfig {
    /// Multiplier in `depth <= factor * bit_length(byte_len)`.
    pub balance_factor: usize,
    /// Merge adjacent pieces into one leaf while their combined size stays at
    /// or below this many bytes. Zero disables merging.
    pub small_concat_bytes: usize,
    /// Reaction to an unbalanced append.
    pub rebalance: RebalanceStrategy,
}

impl Default for RopeConfig {
    fn default() -> Self {
        Self {
            balance_factor: DEFAULT_BALANCE_FACTOR,
            small_concat_bytes: 0,
            rebalance: RebalanceStrategy::Rebalance,
        }
    }
}

/// Configuration parse diagnostics (env + validation).
#[derive(Debug, Clone)]
pub struct RopeConfigParse {
    pub config: RopeConfig,
    pub errors: Vec<RopeConfigError>,
}

/// Configuration error with field context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RopeConfigError {
    pub field: &'static str,
    pub value: String,
    pub message: String,
}

impl RopeConfigError {
    fn new(field: &'static str, value: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field,
            value: value.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for RopeConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}={} ({})", self.field, self.value, self.message)
    }
}

impl std::error::Error for RopeConfigError {}

impl RopeConfigParse {
    /// Log each diagnostic as a warning and keep the config.
    fn logged(self) -> RopeConfig {
        for err in &self.errors {
            tracing::warn!(
                field = err.field,
                value = %err.value,
                "ignoring rope config value: {}",
                err.message
            );
        }
        self.config
    }
}

impl RopeConfig {
    /// Parse config from environment variables, logging any diagnostics.
    #[must_use]
    pub fn from_env() -> RopeConfig {
        Self::from_env_with_diagnostics().logged()
    }

    /// Parse config from environment variables and return diagnostics.
    #[must_use]
    pub fn from_env_with_diagnostics() -> RopeConfigParse {
        from_env_with(|key| env::var(key).ok())
    }

    /// Validate config constraints and return all violations.
    pub fn validate(&self) -> Result<(), Vec<RopeConfigError>> {
        let mut errors = Vec::new();
        if self.balance_factor == 0 {
            errors.push(RopeConfigError::new(
                "balance_factor",
                self.balance_factor.to_string(),
                "must be at least 1",
            ));
        }
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Short human-readable summary for logs.
    #[must_use]
    pub fn summary_short(&self) -> String {
        let merge = if self.small_concat_bytes == 0 {
            "merge off".to_string()
        } else {
            format!("merge <= {}B", self.small_concat_bytes)
        };
        format!(
            "Rope: factor {} · {merge} · {}",
            self.balance_factor, self.rebalance
        )
    }

    /// Balance criterion implied by this config.
    #[must_use]
    pub const fn balance_policy(&self) -> BalancePolicy {
        BalancePolicy::new(self.balance_factor)
    }
}

fn from_env_with<F>(mut get: F) -> RopeConfigParse
where
    F: FnMut(&str) -> Option<String>,
{
    let mut config = RopeConfig::default();
    let mut errors = Vec::new();

    if let Some(value) = get(ENV_BALANCE_FACTOR) {
        match parse_usize(&value) {
            Some(parsed) if parsed >= 1 => config.balance_factor = parsed,
            _ => errors.push(RopeConfigError::new(
                "balance_factor",
                value,
                "expected positive integer",
            )),
        }
    }

    if let Some(value) = get(ENV_SMALL_CONCAT_BYTES) {
        match parse_usize(&value) {
            Some(parsed) => config.small_concat_bytes = parsed,
            None => errors.push(RopeConfigError::new(
                "small_concat_bytes",
                value,
                "expected non-negative integer",
            )),
        }
    }

    if let Some(value) = get(ENV_REBALANCE) {
        match RebalanceStrategy::parse(&value) {
            Some(parsed) => config.rebalance = parsed,
            None => errors.push(RopeConfigError::new(
                "rebalance",
                value,
                "expected rebalance|flatten|never",
            )),
        }
    }

    if let Err(mut validation) = config.validate() {
        errors.append(&mut validation);
    }

    RopeConfigParse { config, errors }
}

#[inline]
fn parse_usize(value: &str) -> Option<usize> {
    value.trim().parse::<usize>().ok()
}
