//! Shared test helpers for scenario and adversarial suites.

use std::sync::Arc;

use primitive_types::U256;

use coinage_core::block::ManualBlockClock;
use coinage_core::math::{parse_ray, units};
use coinage_core::traits::BlockClock;
use coinage_core::types::{Address, Factor};
use coinage_ledger::logging::{init_tracing, LogFormat};
use coinage_ledger::{CloneFactory, LedgerConfig, SharedLedger};

/// Simple holder address from a seed byte.
pub fn addr(seed: u8) -> Address {
    Address([seed; 20])
}

/// Ray-scaled value from a decimal string.
pub fn ray(s: &str) -> U256 {
    parse_ray(s).unwrap()
}

/// A factory over a fresh manual clock at block 0.
pub struct Harness {
    pub clock: Arc<ManualBlockClock>,
    pub factory: CloneFactory,
}

impl Harness {
    pub fn new() -> Self {
        init_tracing("warn", LogFormat::Text);
        let clock = Arc::new(ManualBlockClock::new(0));
        let dyn_clock: Arc<dyn BlockClock> = clock.clone();
        Self {
            factory: CloneFactory::new(dyn_clock),
            clock,
        }
    }

    pub fn advance(&self, blocks: u64) -> u64 {
        self.clock.advance(blocks)
    }

    pub fn block(&self) -> u64 {
        self.clock.current_block()
    }

    pub fn deploy(&self, config: &LedgerConfig) -> SharedLedger {
        self.factory.deploy(config).unwrap()
    }

    /// Auto ledger at factor 1.0 with the given per-block increment.
    pub fn auto(&self, increment: &str) -> SharedLedger {
        self.deploy(&LedgerConfig::auto("Auto", "AUT", Factor::ONE, ray(increment)))
    }

    /// Fixed ledger at factor 1.0 minting `rate` whole units per block.
    pub fn fixed(&self, rate: u64) -> SharedLedger {
        self.deploy(&LedgerConfig::fixed("Fixed", "FIX", Factor::ONE, units(rate)))
    }

    /// Custom ledger at factor 1.0.
    pub fn custom(&self) -> SharedLedger {
        self.deploy(&LedgerConfig::custom("Custom", "CUS", Factor::ONE))
    }

    /// Clone `parent` at `fork_block` as a Custom ledger at factor 1.0.
    pub fn clone_custom(&self, parent: &SharedLedger, fork_block: u64) -> SharedLedger {
        let config = LedgerConfig::custom("Clone", "CLN", Factor::ONE);
        self.factory.create_clone(parent, fork_block, &config).unwrap().0
    }
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

/// Sum of live balances of `holders`.
pub fn sum_balances(ledger: &SharedLedger, holders: &[Address]) -> U256 {
    let guard = ledger.read();
    holders
        .iter()
        .map(|h| guard.balance_of(h).unwrap())
        .fold(U256::zero(), |acc, b| acc + b)
}

/// `|a - b|`.
pub fn abs_diff(a: U256, b: U256) -> U256 {
    if a > b { a - b } else { b - a }
}
