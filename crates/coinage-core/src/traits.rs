//! Trait interfaces for Coinage ledgers.
//!
//! These traits define the contracts between crates:
//! - [`BlockClock`] — the externally supplied current block (the embedding
//!   environment implements; [`ManualBlockClock`](crate::block::ManualBlockClock)
//!   is provided)
//! - [`FactorAdvance`] — the accrual formula (coinage-accrual implements)

use primitive_types::U256;

use crate::error::MathError;
use crate::types::{Factor, FactorCheckpoint, StrategyKind};

/// Source of the current block number.
///
/// The clock is owned by the environment, never by a ledger: ledgers only
/// read it. Implementations must be monotonically non-decreasing.
pub trait BlockClock: Send + Sync {
    /// The block the next operation executes in.
    fn current_block(&self) -> u64;
}

/// Pure factor-advance formula of an accrual strategy.
///
/// Given the last persisted checkpoint, computes the factor as of `block`.
/// Must not depend on anything but its arguments and the strategy's own
/// immutable parameters.
pub trait FactorAdvance: Send + Sync {
    /// Factor as of `block`, extrapolated from `checkpoint`.
    ///
    /// `total_shares` is the aggregate share count in force over the
    /// interval `(checkpoint.block, block]`; strategies that ignore supply
    /// ignore it. Blocks at or before the checkpoint return the checkpoint
    /// factor unchanged.
    fn advance(
        &self,
        checkpoint: &FactorCheckpoint,
        block: u64,
        total_shares: U256,
    ) -> Result<Factor, MathError>;

    /// Which strategy this is.
    fn kind(&self) -> StrategyKind;

    /// Whether the factor may be overwritten by an explicit `set_factor`.
    ///
    /// Default implementation: only the Custom strategy is settable.
    fn is_settable(&self) -> bool {
        self.kind() == StrategyKind::Custom
    }

    /// Whether [`advance`](Self::advance) reads `total_shares`, which forces
    /// a commit before every supply change.
    fn depends_on_supply(&self) -> bool {
        false
    }
}
