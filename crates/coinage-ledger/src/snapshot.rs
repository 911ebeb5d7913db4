//! Append-only point-in-time history.
//!
//! A [`CheckpointSeries`] is a block-ordered list of `(block, value)` entries
//! with at most one entry per block. The [`SnapshotStore`] keeps one share
//! series per holder, one for total shares and one for the factor. Real
//! values are reconstructed by the ledger as `shares * factor` at query time,
//! so a query between two recorded blocks still reflects accrual.
//!
//! A clone forked at the current block reads its parent at a block the
//! parent can still write to. [`SnapshotStore::pin`] freezes that view: the
//! first write after the pin to any series in the pinned block saves the
//! value the series held, and pinned reads return the saved value.

use std::collections::HashMap;

use primitive_types::U256;

use coinage_core::types::{Address, Factor, FactorCheckpoint};

/// Block-ordered `(block, value)` entries, strictly increasing in block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckpointSeries<V> {
    entries: Vec<(u64, V)>,
}

impl<V> Default for CheckpointSeries<V> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<V: Copy> CheckpointSeries<V> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `value` as of `block`.
    ///
    /// A second write in the same block overwrites the first. Writes older
    /// than the latest entry are ignored; the ledger rejects block
    /// regressions before it records anything.
    pub fn record(&mut self, block: u64, value: V) {
        match self.entries.last_mut() {
            Some((last, v)) if *last == block => *v = value,
            Some((last, _)) if *last > block => {
                debug_assert!(false, "snapshot write at {block} after {last}");
            }
            _ => self.entries.push((block, value)),
        }
    }

    /// Latest entry with `entry.block <= block`.
    pub fn entry_at(&self, block: u64) -> Option<(u64, V)> {
        let idx = self.entries.partition_point(|(b, _)| *b <= block);
        idx.checked_sub(1).map(|i| self.entries[i])
    }

    /// Value of the latest entry with `entry.block <= block`.
    pub fn value_at(&self, block: u64) -> Option<V> {
        self.entry_at(block).map(|(_, v)| v)
    }

    pub fn latest(&self) -> Option<(u64, V)> {
        self.entries.last().copied()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(u64, V)> {
        self.entries.iter()
    }
}

/// Handle to a frozen view of a [`SnapshotStore`] at one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PinId(usize);

/// Values replaced in the pinned block after the pin was taken. An inner
/// `None` means the series had no entry at or before the block.
#[derive(Debug, Clone)]
struct ForkPin {
    block: u64,
    holders: HashMap<Address, Option<U256>>,
    total: Option<Option<U256>>,
    factor: Option<Option<FactorCheckpoint>>,
}

/// Share and factor history of one ledger.
#[derive(Debug, Clone, Default)]
pub struct SnapshotStore {
    holders: HashMap<Address, CheckpointSeries<U256>>,
    total: CheckpointSeries<U256>,
    factors: CheckpointSeries<Factor>,
    pins: Vec<ForkPin>,
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Freeze the view of every series at `block`.
    pub fn pin(&mut self, block: u64) -> PinId {
        self.pins.push(ForkPin {
            block,
            holders: HashMap::new(),
            total: None,
            factor: None,
        });
        PinId(self.pins.len() - 1)
    }

    /// Pins taken at `block`. Pins are taken at non-decreasing blocks, so
    /// they sit at the end of the list.
    fn pins_at(pins: &mut [ForkPin], block: u64) -> impl Iterator<Item = &mut ForkPin> {
        pins.iter_mut().rev().take_while(move |p| p.block == block)
    }

    pub fn record_holder(&mut self, holder: Address, block: u64, shares: U256) {
        let before = self.holder_shares_at(&holder, block);
        for pin in Self::pins_at(&mut self.pins, block) {
            pin.holders.entry(holder).or_insert(before);
        }
        self.holders.entry(holder).or_default().record(block, shares);
    }

    pub fn record_total(&mut self, block: u64, shares: U256) {
        let before = self.total_shares_at(block);
        for pin in Self::pins_at(&mut self.pins, block) {
            if pin.total.is_none() {
                pin.total = Some(before);
            }
        }
        self.total.record(block, shares);
    }

    pub fn record_factor(&mut self, checkpoint: FactorCheckpoint) {
        let before = self.factor_checkpoint_at(checkpoint.block);
        for pin in Self::pins_at(&mut self.pins, checkpoint.block) {
            if pin.factor.is_none() {
                pin.factor = Some(before);
            }
        }
        self.factors.record(checkpoint.block, checkpoint.factor);
    }

    /// The pin behind `pin` if it freezes `block`.
    fn pinned(&self, pin: Option<PinId>, block: u64) -> Option<&ForkPin> {
        pin.and_then(|PinId(i)| self.pins.get(i))
            .filter(|p| p.block == block)
    }

    /// [`holder_shares_at`](Self::holder_shares_at) as seen through `pin`.
    pub fn holder_shares_pinned(&self, holder: &Address, block: u64, pin: Option<PinId>) -> Option<U256> {
        match self.pinned(pin, block).and_then(|p| p.holders.get(holder)) {
            Some(saved) => *saved,
            None => self.holder_shares_at(holder, block),
        }
    }

    pub fn total_shares_pinned(&self, block: u64, pin: Option<PinId>) -> Option<U256> {
        match self.pinned(pin, block).and_then(|p| p.total) {
            Some(saved) => saved,
            None => self.total_shares_at(block),
        }
    }

    pub fn factor_checkpoint_pinned(&self, block: u64, pin: Option<PinId>) -> Option<FactorCheckpoint> {
        match self.pinned(pin, block).and_then(|p| p.factor) {
            Some(saved) => saved,
            None => self.factor_checkpoint_at(block),
        }
    }

    /// Holder shares as of `block`, or `None` if the holder has no entry at
    /// or before it.
    pub fn holder_shares_at(&self, holder: &Address, block: u64) -> Option<U256> {
        self.holders.get(holder).and_then(|s| s.value_at(block))
    }

    pub fn total_shares_at(&self, block: u64) -> Option<U256> {
        self.total.value_at(block)
    }

    /// Factor checkpoint in force at `block`.
    pub fn factor_checkpoint_at(&self, block: u64) -> Option<FactorCheckpoint> {
        self.factors
            .entry_at(block)
            .map(|(b, f)| FactorCheckpoint::new(f, b))
    }

    pub fn holder_series(&self, holder: &Address) -> Option<&CheckpointSeries<U256>> {
        self.holders.get(holder)
    }

    pub fn total_series(&self) -> &CheckpointSeries<U256> {
        &self.total
    }

    pub fn factor_series(&self) -> &CheckpointSeries<Factor> {
        &self.factors
    }

    /// Number of holders with at least one entry.
    pub fn holder_count(&self) -> usize {
        self.holders.len()
    }
}
