//! Accrual strategies implementing the [`FactorAdvance`] trait.
//!
//! Each strategy is a pure function from a factor checkpoint and the elapsed
//! blocks to the factor now. Strategies are chosen at construction and are
//! immutable for the lifetime of a ledger.

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use coinage_core::constants::RAY;
use coinage_core::error::{LedgerError, MathError};
use coinage_core::math::{div_scaled, mul_scaled, pow_scaled, serde_ray};
use coinage_core::traits::FactorAdvance;
use coinage_core::types::{Factor, FactorCheckpoint, StrategyKind};

/// Geometric accrual: every elapsed block multiplies the factor by
/// `increment`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoIncrement {
    increment: U256,
}

impl AutoIncrement {
    /// Create a geometric strategy.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidFactor`] unless `increment > 1.0`.
    pub fn new(increment: U256) -> Result<Self, LedgerError> {
        if increment <= RAY {
            return Err(LedgerError::InvalidFactor);
        }
        Ok(Self { increment })
    }

    /// Per-block multiplier, ray-scaled.
    pub fn increment(&self) -> U256 {
        self.increment
    }
}

impl FactorAdvance for AutoIncrement {
    fn advance(
        &self,
        checkpoint: &FactorCheckpoint,
        block: u64,
        _total_shares: U256,
    ) -> Result<Factor, MathError> {
        if block <= checkpoint.block {
            return Ok(checkpoint.factor);
        }
        let growth = pow_scaled(self.increment, block - checkpoint.block)?;
        Ok(Factor(mul_scaled(checkpoint.factor.0, growth)?))
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Auto
    }
}

/// Linear accrual: `seigniorage_per_block` real units of new supply appear
/// every block, split across all existing shares.
///
/// Per-block factor delta is `seigniorage_per_block / total_shares`, so the
/// extrapolation is only valid while total shares stay constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedIncrement {
    seigniorage_per_block: U256,
}

impl FixedIncrement {
    pub fn new(seigniorage_per_block: U256) -> Self {
        Self {
            seigniorage_per_block,
        }
    }

    /// Real units minted per block across all holders, ray-scaled.
    pub fn seigniorage_per_block(&self) -> U256 {
        self.seigniorage_per_block
    }
}

impl FactorAdvance for FixedIncrement {
    fn advance(
        &self,
        checkpoint: &FactorCheckpoint,
        block: u64,
        total_shares: U256,
    ) -> Result<Factor, MathError> {
        // No shares to distribute onto: the factor holds.
        if block <= checkpoint.block || total_shares.is_zero() {
            return Ok(checkpoint.factor);
        }
        let seigniorage = self
            .seigniorage_per_block
            .checked_mul(U256::from(block - checkpoint.block))
            .ok_or(MathError::Overflow)?;
        let delta = div_scaled(seigniorage, total_shares)?;
        checkpoint
            .factor
            .0
            .checked_add(delta)
            .map(Factor)
            .ok_or(MathError::Overflow)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Fixed
    }

    fn depends_on_supply(&self) -> bool {
        true
    }
}

/// Settable accrual: the factor never moves on its own.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CustomIncrement;

impl FactorAdvance for CustomIncrement {
    fn advance(
        &self,
        checkpoint: &FactorCheckpoint,
        _block: u64,
        _total_shares: U256,
    ) -> Result<Factor, MathError> {
        Ok(checkpoint.factor)
    }

    fn kind(&self) -> StrategyKind {
        StrategyKind::Custom
    }
}

/// The accrual strategy of a ledger, in its serializable form.
///
/// Dispatches [`FactorAdvance`] to [`AutoIncrement`], [`FixedIncrement`] or
/// [`CustomIncrement`].
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AccrualStrategy {
    Auto {
        #[serde(with = "serde_ray")]
        increment: U256,
    },
    Fixed {
        #[serde(with = "serde_ray")]
        seigniorage_per_block: U256,
    },
    Custom,
}

impl AccrualStrategy {
    /// Check the strategy parameters.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidFactor`] for an Auto increment that is not
    /// strictly greater than 1.0.
    pub fn validate(&self) -> Result<(), LedgerError> {
        if let Self::Auto { increment } = self {
            AutoIncrement::new(*increment)?;
        }
        Ok(())
    }
}

impl FactorAdvance for AccrualStrategy {
    fn advance(
        &self,
        checkpoint: &FactorCheckpoint,
        block: u64,
        total_shares: U256,
    ) -> Result<Factor, MathError> {
        match *self {
            Self::Auto { increment } => AutoIncrement { increment }.advance(checkpoint, block, total_shares),
            Self::Fixed {
                seigniorage_per_block,
            } => FixedIncrement::new(seigniorage_per_block).advance(checkpoint, block, total_shares),
            Self::Custom => CustomIncrement.advance(checkpoint, block, total_shares),
        }
    }

    fn kind(&self) -> StrategyKind {
        match self {
            Self::Auto { .. } => StrategyKind::Auto,
            Self::Fixed { .. } => StrategyKind::Fixed,
            Self::Custom => StrategyKind::Custom,
        }
    }

    fn depends_on_supply(&self) -> bool {
        matches!(self, Self::Fixed { .. })
    }
}
