//! Ledger deployment configuration.
//!
//! A [`LedgerConfig`] is loaded from a TOML, JSON or YAML file with the
//! `config` crate, with `COINAGE__*` environment variables layered on top
//! (`COINAGE__STRATEGY__INCREMENT=1.05`). Ray values are decimal strings.
//! [`LedgerConfig::validate`] turns the raw form into [`LedgerParams`].

use std::path::Path;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use coinage_accrual::AccrualStrategy;
use coinage_core::constants::CONFIG_ENV_PREFIX;
use coinage_core::error::ConfigError;
use coinage_core::math::{format_ray, parse_ray};
use coinage_core::traits::FactorAdvance;
use coinage_core::types::{Factor, StrategyKind};

use crate::shares::ApprovalPolicy;

const ENV_SEPARATOR: &str = "__";

fn default_true() -> bool {
    true
}

/// Strategy section of a ledger configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum StrategyConfig {
    Auto {
        initial_factor: String,
        increment: String,
    },
    Fixed {
        initial_factor: String,
        seigniorage_per_block: String,
    },
    Custom {
        initial_factor: String,
    },
}

impl StrategyConfig {
    fn initial_factor(&self) -> &str {
        match self {
            Self::Auto { initial_factor, .. }
            | Self::Fixed { initial_factor, .. }
            | Self::Custom { initial_factor } => initial_factor,
        }
    }
}

/// Raw, unvalidated ledger configuration.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct LedgerConfig {
    pub name: String,
    pub symbol: String,
    pub strategy: StrategyConfig,
    /// Keep point-in-time history (enables `*_at` queries and cloning).
    #[serde(default = "default_true")]
    pub history: bool,
    #[serde(default = "default_true")]
    pub transfers_enabled: bool,
    /// Overrides the default approval policy for the strategy.
    #[serde(default)]
    pub approval_policy: Option<ApprovalPolicy>,
}

/// Checked construction parameters for a ledger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LedgerParams {
    pub name: String,
    pub symbol: String,
    pub strategy: AccrualStrategy,
    pub initial_factor: Factor,
    pub history: bool,
    pub transfers_enabled: bool,
    pub approval_policy: ApprovalPolicy,
}

impl LedgerConfig {
    fn with_strategy(name: impl Into<String>, symbol: impl Into<String>, strategy: StrategyConfig) -> Self {
        Self {
            name: name.into(),
            symbol: symbol.into(),
            strategy,
            history: true,
            transfers_enabled: true,
            approval_policy: None,
        }
    }

    /// Geometric ledger.
    pub fn auto(name: impl Into<String>, symbol: impl Into<String>, initial_factor: Factor, increment: U256) -> Self {
        Self::with_strategy(
            name,
            symbol,
            StrategyConfig::Auto {
                initial_factor: initial_factor.to_string(),
                increment: format_ray(increment),
            },
        )
    }

    /// Linear ledger minting `seigniorage_per_block` real units per block.
    pub fn fixed(
        name: impl Into<String>,
        symbol: impl Into<String>,
        initial_factor: Factor,
        seigniorage_per_block: U256,
    ) -> Self {
        Self::with_strategy(
            name,
            symbol,
            StrategyConfig::Fixed {
                initial_factor: initial_factor.to_string(),
                seigniorage_per_block: format_ray(seigniorage_per_block),
            },
        )
    }

    /// Settable ledger.
    pub fn custom(name: impl Into<String>, symbol: impl Into<String>, initial_factor: Factor) -> Self {
        Self::with_strategy(
            name,
            symbol,
            StrategyConfig::Custom {
                initial_factor: initial_factor.to_string(),
            },
        )
    }

    pub fn with_history(mut self, history: bool) -> Self {
        self.history = history;
        self
    }

    pub fn with_transfers_enabled(mut self, enabled: bool) -> Self {
        self.transfers_enabled = enabled;
        self
    }

    pub fn with_approval_policy(mut self, policy: ApprovalPolicy) -> Self {
        self.approval_policy = Some(policy);
        self
    }

    /// Load from `path` (format by extension) with environment overrides.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::build(
            config::File::from(path.as_ref()),
            config::Environment::with_prefix(CONFIG_ENV_PREFIX),
        )
    }

    /// Parse an inline TOML document. No environment overrides apply.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        config::Config::builder()
            .add_source(config::File::from_str(s, config::FileFormat::Toml))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    pub(crate) fn build<F>(file: F, env: config::Environment) -> Result<Self, ConfigError>
    where
        F: config::Source + Send + Sync + 'static,
    {
        config::Config::builder()
            .add_source(file)
            .add_source(env.prefix_separator(ENV_SEPARATOR).separator(ENV_SEPARATOR))
            .build()
            .and_then(|c| c.try_deserialize())
            .map_err(|e| ConfigError::Load(e.to_string()))
    }

    /// Check the configuration and resolve defaults.
    ///
    /// # Errors
    ///
    /// - [`ConfigError::Math`] for a malformed decimal
    /// - [`ConfigError::Invalid`] for a zero initial factor or an Auto
    ///   increment that is not greater than 1.0
    pub fn validate(&self) -> Result<LedgerParams, ConfigError> {
        let initial_factor = Factor(parse_ray(self.strategy.initial_factor())?);
        if initial_factor.is_zero() {
            return Err(ConfigError::Invalid("initial_factor must be non-zero".into()));
        }

        let strategy = match &self.strategy {
            StrategyConfig::Auto { increment, .. } => AccrualStrategy::Auto {
                increment: parse_ray(increment)?,
            },
            StrategyConfig::Fixed {
                seigniorage_per_block,
                ..
            } => AccrualStrategy::Fixed {
                seigniorage_per_block: parse_ray(seigniorage_per_block)?,
            },
            StrategyConfig::Custom { .. } => AccrualStrategy::Custom,
        };
        strategy
            .validate()
            .map_err(|_| ConfigError::Invalid("increment must be greater than 1".into()))?;

        let approval_policy = self.approval_policy.unwrap_or_else(|| {
            if strategy.kind() == StrategyKind::Custom {
                ApprovalPolicy::ZeroFirst
            } else {
                ApprovalPolicy::Replace
            }
        });

        Ok(LedgerParams {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            strategy,
            initial_factor,
            history: self.history,
            transfers_enabled: self.transfers_enabled,
            approval_policy,
        })
    }
}
