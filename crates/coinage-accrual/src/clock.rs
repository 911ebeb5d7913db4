//! The factor clock: a persisted checkpoint plus a strategy.
//!
//! Reads extrapolate from the checkpoint without mutating anything
//! ([`FactorClock::live_factor`]). A commit persists the extrapolated value
//! at the current block and is idempotent within a block. Strategies whose
//! formula reads total shares must be committed before every supply change,
//! using the total that was in force for the elapsed interval.

use primitive_types::U256;
use tracing::{debug, info};

use coinage_core::error::{LedgerError, MathError};
use coinage_core::traits::FactorAdvance;
use coinage_core::types::{Factor, FactorCheckpoint, StrategyKind};

use crate::strategy::AccrualStrategy;

#[derive(Debug, Clone)]
pub struct FactorClock {
    strategy: AccrualStrategy,
    genesis: FactorCheckpoint,
    checkpoint: FactorCheckpoint,
}

impl FactorClock {
    /// Start a clock at `block` with `initial` as the genesis factor.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidFactor`] for a zero initial factor or an invalid
    /// strategy parameter.
    pub fn new(strategy: AccrualStrategy, initial: Factor, block: u64) -> Result<Self, LedgerError> {
        if initial.is_zero() {
            return Err(LedgerError::InvalidFactor);
        }
        strategy.validate()?;
        let genesis = FactorCheckpoint::new(initial, block);
        Ok(Self {
            strategy,
            genesis,
            checkpoint: genesis,
        })
    }

    pub fn strategy(&self) -> &AccrualStrategy {
        &self.strategy
    }

    pub fn kind(&self) -> StrategyKind {
        self.strategy.kind()
    }

    /// The checkpoint the clock started from.
    pub fn genesis(&self) -> FactorCheckpoint {
        self.genesis
    }

    /// The last persisted checkpoint.
    pub fn checkpoint(&self) -> FactorCheckpoint {
        self.checkpoint
    }

    /// Factor as of `block`, extrapolated from the checkpoint. Pure.
    pub fn live_factor(&self, block: u64, total_shares: U256) -> Result<Factor, MathError> {
        self.strategy.advance(&self.checkpoint, block, total_shares)
    }

    /// Factor as of `block` extrapolated from an arbitrary historical
    /// checkpoint with this clock's strategy.
    pub fn factor_from(
        &self,
        checkpoint: &FactorCheckpoint,
        block: u64,
        total_shares: U256,
    ) -> Result<Factor, MathError> {
        self.strategy.advance(checkpoint, block, total_shares)
    }

    /// Persist the live factor as of `block`.
    ///
    /// A second commit in the same block returns the stored factor without
    /// recomputing.
    ///
    /// # Errors
    ///
    /// [`LedgerError::BlockRegression`] if `block` is older than the
    /// checkpoint; arithmetic errors from the strategy. The checkpoint is
    /// unchanged on error.
    pub fn commit(&mut self, block: u64, total_shares: U256) -> Result<Factor, LedgerError> {
        self.ensure_not_before_checkpoint(block)?;
        if block == self.checkpoint.block {
            return Ok(self.checkpoint.factor);
        }
        let factor = self.live_factor(block, total_shares)?;
        debug!(
            from_block = self.checkpoint.block,
            to_block = block,
            %factor,
            "factor_clock: committed"
        );
        self.checkpoint = FactorCheckpoint::new(factor, block);
        Ok(factor)
    }

    /// Commit, then overwrite the factor with `factor`. Returns the factor
    /// that was in force immediately before.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnsupportedOperation`] unless the strategy is settable
    /// - [`LedgerError::InvalidFactor`] for a zero factor
    /// - [`LedgerError::BlockRegression`] as for [`commit`](Self::commit)
    pub fn set(&mut self, block: u64, factor: Factor) -> Result<Factor, LedgerError> {
        if !self.strategy.is_settable() {
            return Err(LedgerError::UnsupportedOperation("set_factor"));
        }
        if factor.is_zero() {
            return Err(LedgerError::InvalidFactor);
        }
        let previous = self.commit(block, U256::zero())?;
        self.checkpoint = FactorCheckpoint::new(factor, block);
        info!(%previous, current = %factor, block, "factor_clock: factor set");
        Ok(previous)
    }

    /// Check that `block` is not older than the last checkpoint.
    pub fn ensure_not_before_checkpoint(&self, block: u64) -> Result<(), LedgerError> {
        if block < self.checkpoint.block {
            return Err(LedgerError::BlockRegression {
                checkpoint: self.checkpoint.block,
                current: block,
            });
        }
        Ok(())
    }
}
