//! A manually driven block clock for embedding and tests.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::traits::BlockClock;

/// Block clock advanced explicitly by its owner.
///
/// Never moves backwards: [`advance_to`](Self::advance_to) with an older
/// block is a no-op.
///
/// # Examples
///
/// ```
/// use coinage_core::block::ManualBlockClock;
/// use coinage_core::traits::BlockClock;
/// let clock = ManualBlockClock::new(10);
/// clock.advance(5);
/// assert_eq!(clock.current_block(), 15);
/// clock.advance_to(12);
/// assert_eq!(clock.current_block(), 15);
/// ```
#[derive(Debug, Default)]
pub struct ManualBlockClock {
    block: AtomicU64,
}

impl ManualBlockClock {
    /// Create a clock starting at `block`.
    pub fn new(block: u64) -> Self {
        Self {
            block: AtomicU64::new(block),
        }
    }

    /// Mine `n` blocks, saturating at `u64::MAX`. Returns the new current
    /// block.
    pub fn advance(&self, n: u64) -> u64 {
        let previous = self
            .block
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |b| Some(b.saturating_add(n)))
            .unwrap_or_else(|b| b);
        previous.saturating_add(n)
    }

    /// Move to `block` if it is ahead of the current block. Returns the
    /// resulting current block.
    pub fn advance_to(&self, block: u64) -> u64 {
        self.block.fetch_max(block, Ordering::SeqCst).max(block)
    }
}

impl BlockClock for ManualBlockClock {
    fn current_block(&self) -> u64 {
        self.block.load(Ordering::SeqCst)
    }
}
