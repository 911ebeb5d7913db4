//! Ledger registry and clone factory.
//!
//! The [`CloneFactory`] owns every ledger it creates and hands out shared
//! handles. Clones only keep a weak link to their parent, so removing a
//! ledger from the factory (and dropping every handle) makes its clones
//! fail with [`LedgerError::ParentUnavailable`] on queries that need it.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use tracing::info;

use coinage_core::error::{CoinageError, LedgerError};
use coinage_core::math::div_scaled;
use coinage_core::traits::BlockClock;
use coinage_core::types::{LedgerEvent, LedgerId};

use crate::config::LedgerConfig;
use crate::ledger::{Ledger, ParentLink, SharedLedger};

pub struct CloneFactory {
    clock: Arc<dyn BlockClock>,
    ledgers: RwLock<HashMap<LedgerId, SharedLedger>>,
    next_id: AtomicU64,
}

impl CloneFactory {
    /// Create a factory whose ledgers all read `clock`.
    pub fn new(clock: Arc<dyn BlockClock>) -> Self {
        Self {
            clock,
            ledgers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn clock(&self) -> &Arc<dyn BlockClock> {
        &self.clock
    }

    fn allocate_id(&self) -> LedgerId {
        LedgerId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    fn register(&self, id: LedgerId, ledger: Ledger) -> SharedLedger {
        let shared = Arc::new(RwLock::new(ledger));
        self.ledgers.write().insert(id, Arc::clone(&shared));
        shared
    }

    /// Deploy a new root ledger at the current block.
    pub fn deploy(&self, config: &LedgerConfig) -> Result<SharedLedger, CoinageError> {
        let params = config.validate()?;
        let id = self.allocate_id();
        let kind = params.strategy;
        let ledger = Ledger::new(id, params, Arc::clone(&self.clock))?;

        info!(ledger = %id, name = %config.name, strategy = ?kind, "factory: deployed");
        Ok(self.register(id, ledger))
    }

    /// Fork `parent` at `fork_block` into a new ledger configured by
    /// `config`. A `fork_block` of zero forks at the current block.
    ///
    /// Returns the clone and the `NewClone` event.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::UnsupportedOperation`] if the parent keeps no history
    /// - [`LedgerError::ForkBlockInFuture`] if `fork_block` is after the
    ///   current block
    /// - configuration errors from `config`
    pub fn create_clone(
        &self,
        parent: &SharedLedger,
        fork_block: u64,
        config: &LedgerConfig,
    ) -> Result<(SharedLedger, Vec<LedgerEvent>), CoinageError> {
        let params = config.validate()?;

        let (parent_id, link, inherited_total) = {
            let mut guard = parent.write();
            if !guard.history_enabled() {
                return Err(LedgerError::UnsupportedOperation("create_clone").into());
            }
            let current = guard.current_block()?;
            let fork_block = if fork_block == 0 { current } else { fork_block };
            if fork_block > current {
                return Err(LedgerError::ForkBlockInFuture { fork_block, current }.into());
            }
            let parent_id = guard.id();
            let mut link = ParentLink::new(parent, parent_id, fork_block);
            let parent_total = guard.fork_total(&link)?;
            let inherited_total = div_scaled(parent_total, params.initial_factor.0)?;
            // The parent can still write to its current block.
            if fork_block == current {
                link = link.with_pin(guard.pin_history(fork_block));
            }
            (parent_id, link, inherited_total)
        };

        let fork_block = link.fork_block();
        let id = self.allocate_id();
        let ledger = Ledger::new_clone(id, params, Arc::clone(&self.clock), link, inherited_total)?;

        info!(ledger = %id, parent = %parent_id, fork_block, "factory: cloned");
        let events = vec![LedgerEvent::NewClone {
            clone: id,
            fork_block,
        }];
        Ok((self.register(id, ledger), events))
    }

    pub fn get(&self, id: LedgerId) -> Option<SharedLedger> {
        self.ledgers.read().get(&id).cloned()
    }

    /// Drop the factory's handle to a ledger.
    pub fn remove(&self, id: LedgerId) -> Option<SharedLedger> {
        self.ledgers.write().remove(&id)
    }

    pub fn ids(&self) -> Vec<LedgerId> {
        let mut ids: Vec<LedgerId> = self.ledgers.read().keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.ledgers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.read().is_empty()
    }
}
