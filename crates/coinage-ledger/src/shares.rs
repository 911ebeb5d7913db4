//! Share balances, total shares and real-unit allowances.
//!
//! This is plain storage: it knows nothing about factors or blocks. The
//! [`Ledger`](crate::ledger::Ledger) converts real amounts to shares and
//! decides what gets written.

use std::collections::HashMap;

use primitive_types::U256;
use serde::{Deserialize, Serialize};

use coinage_core::error::LedgerError;
use coinage_core::types::Address;

/// Rule applied when an allowance is overwritten.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalPolicy {
    /// Any allowance may replace any other.
    Replace,
    /// A non-zero allowance must be reset to zero before it can be set to a
    /// different non-zero value.
    ZeroFirst,
}

impl ApprovalPolicy {
    /// Check whether `requested` may replace `current`.
    pub fn check(self, current: U256, requested: U256) -> Result<(), LedgerError> {
        match self {
            Self::Replace => Ok(()),
            Self::ZeroFirst => {
                if !current.is_zero() && !requested.is_zero() && current != requested {
                    return Err(LedgerError::InvalidApproval { current, requested });
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ShareLedger {
    balances: HashMap<Address, U256>,
    total_shares: U256,
    allowances: HashMap<(Address, Address), U256>,
}

impl ShareLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with `total_shares` already outstanding but no holder entries.
    /// Used by clones whose holder shares are materialized on first write.
    pub fn with_total(total_shares: U256) -> Self {
        Self {
            total_shares,
            ..Self::default()
        }
    }

    /// Stored shares of `holder`; `None` if the holder was never written.
    pub fn shares_of(&self, holder: &Address) -> Option<U256> {
        self.balances.get(holder).copied()
    }

    pub fn has_holder(&self, holder: &Address) -> bool {
        self.balances.contains_key(holder)
    }

    pub fn total_shares(&self) -> U256 {
        self.total_shares
    }

    /// Overwrite the stored shares of `holder`. Zero entries are kept so
    /// that a written holder stays materialized.
    pub fn set_shares(&mut self, holder: Address, shares: U256) {
        self.balances.insert(holder, shares);
    }

    pub fn set_total_shares(&mut self, total: U256) {
        self.total_shares = total;
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> U256 {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or_default()
    }

    pub fn set_allowance(&mut self, owner: Address, spender: Address, amount: U256) {
        if amount.is_zero() {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    /// Holders with a stored entry.
    pub fn holders(&self) -> impl Iterator<Item = (&Address, &U256)> {
        self.balances.iter()
    }

    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }
}
