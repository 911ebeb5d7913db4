//! The ledger aggregate.
//!
//! A [`Ledger`] owns one [`FactorClock`], one [`ShareLedger`] and, when
//! history is enabled, one [`SnapshotStore`]. Every mutating operation runs
//! in the same order:
//!
//! 1. read the current block and reject a regression
//! 2. validate against live values (nothing is written yet)
//! 3. commit the factor with the total shares in force before the change
//! 4. write shares and allowances
//! 5. record history at the current block
//!
//! Any error is returned from step 1 or 2, so a failed call leaves no
//! observable change. Steps 3 to 5 cannot fail once validation passed.
//!
//! Clones hold a [`ParentLink`] to the ledger they forked from. Holder shares
//! are inherited lazily: a holder the clone never wrote reads its value from
//! the parent's history at the fork block. A clone forked at the parent's
//! current block reads through a pin on the parent's [`SnapshotStore`], so
//! later parent writes in that block stay invisible to it.

use std::fmt;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;
use primitive_types::U256;
use tracing::{debug, info, warn};

use coinage_accrual::FactorClock;
use coinage_core::constants::LEDGER_DECIMALS;
use coinage_core::error::{LedgerError, MathError};
use coinage_core::math::{div_scaled, format_ray, mul_scaled};
use coinage_core::traits::BlockClock;
use coinage_core::types::{Address, Amount, Factor, FactorCheckpoint, LedgerEvent, LedgerId, StrategyKind};

use crate::config::LedgerParams;
use crate::shares::{ApprovalPolicy, ShareLedger};
use crate::snapshot::{PinId, SnapshotStore};

/// A ledger shared between its factory, its clones and its callers.
pub type SharedLedger = Arc<RwLock<Ledger>>;

/// Non-owning reference from a clone to the ledger it forked from.
#[derive(Debug, Clone)]
pub struct ParentLink {
    ledger: Weak<RwLock<Ledger>>,
    parent_id: LedgerId,
    fork_block: u64,
    pin: Option<PinId>,
}

impl ParentLink {
    pub fn new(parent: &SharedLedger, parent_id: LedgerId, fork_block: u64) -> Self {
        Self {
            ledger: Arc::downgrade(parent),
            parent_id,
            fork_block,
            pin: None,
        }
    }

    /// Read the parent's fork block through `pin`.
    pub(crate) fn with_pin(mut self, pin: Option<PinId>) -> Self {
        self.pin = pin;
        self
    }

    pub fn parent_id(&self) -> LedgerId {
        self.parent_id
    }

    pub fn fork_block(&self) -> u64 {
        self.fork_block
    }

    pub fn pin(&self) -> Option<PinId> {
        self.pin
    }

    /// The parent ledger, if it is still alive.
    pub fn upgrade(&self) -> Result<SharedLedger, LedgerError> {
        self.ledger
            .upgrade()
            .ok_or(LedgerError::ParentUnavailable(self.parent_id))
    }
}

/// A validated share movement, ready to apply.
struct ShareMove {
    from: Address,
    to: Address,
    from_after: U256,
    to_after: U256,
}

fn checked_add(a: U256, b: U256) -> Result<U256, LedgerError> {
    a.checked_add(b).ok_or(LedgerError::Math(MathError::Overflow))
}

pub struct Ledger {
    id: LedgerId,
    name: String,
    symbol: String,
    clock: Arc<dyn BlockClock>,
    factor: FactorClock,
    shares: ShareLedger,
    history: Option<SnapshotStore>,
    parent: Option<ParentLink>,
    inherited_total: U256,
    transfers_enabled: bool,
    approval_policy: ApprovalPolicy,
}

impl fmt::Debug for Ledger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Ledger")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("symbol", &self.symbol)
            .field("factor", &self.factor)
            .field("total_shares", &self.shares.total_shares())
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl Ledger {
    /// Create a root ledger starting at the clock's current block.
    ///
    /// # Errors
    ///
    /// [`LedgerError::InvalidFactor`] for a zero initial factor or an invalid
    /// strategy parameter.
    pub fn new(id: LedgerId, params: LedgerParams, clock: Arc<dyn BlockClock>) -> Result<Self, LedgerError> {
        Self::build(id, params, clock, None, U256::zero())
    }

    /// Create a clone of the ledger behind `parent`, inheriting
    /// `inherited_total` shares valued at the clone's initial factor.
    pub(crate) fn new_clone(
        id: LedgerId,
        params: LedgerParams,
        clock: Arc<dyn BlockClock>,
        parent: ParentLink,
        inherited_total: U256,
    ) -> Result<Self, LedgerError> {
        Self::build(id, params, clock, Some(parent), inherited_total)
    }

    fn build(
        id: LedgerId,
        params: LedgerParams,
        clock: Arc<dyn BlockClock>,
        parent: Option<ParentLink>,
        inherited_total: U256,
    ) -> Result<Self, LedgerError> {
        let block = clock.current_block();
        let factor = FactorClock::new(params.strategy, params.initial_factor, block)?;

        let history = params.history.then(|| {
            let mut store = SnapshotStore::new();
            store.record_factor(factor.genesis());
            store.record_total(block, inherited_total);
            store
        });

        Ok(Self {
            id,
            name: params.name,
            symbol: params.symbol,
            clock,
            factor,
            shares: ShareLedger::with_total(inherited_total),
            history,
            parent,
            inherited_total,
            transfers_enabled: params.transfers_enabled,
            approval_policy: params.approval_policy,
        })
    }

    // ------------------------------------------------------------------
    // Metadata
    // ------------------------------------------------------------------

    pub fn id(&self) -> LedgerId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn decimals(&self) -> u8 {
        LEDGER_DECIMALS
    }

    pub fn strategy_kind(&self) -> StrategyKind {
        self.factor.kind()
    }

    pub fn factor_clock(&self) -> &FactorClock {
        &self.factor
    }

    pub fn history_enabled(&self) -> bool {
        self.history.is_some()
    }

    pub fn snapshots(&self) -> Option<&SnapshotStore> {
        self.history.as_ref()
    }

    pub fn parent(&self) -> Option<&ParentLink> {
        self.parent.as_ref()
    }

    pub fn transfers_enabled(&self) -> bool {
        self.transfers_enabled
    }

    pub fn approval_policy(&self) -> ApprovalPolicy {
        self.approval_policy
    }

    // ------------------------------------------------------------------
    // Live reads
    // ------------------------------------------------------------------

    /// Factor as of the current block, including uncommitted accrual.
    pub fn factor(&self) -> Result<Factor, LedgerError> {
        let block = self.current_block()?;
        self.live_factor(block)
    }

    pub fn balance_of(&self, holder: &Address) -> Result<Amount, LedgerError> {
        let factor = self.factor()?;
        let shares = self.resolve_shares(holder)?;
        Ok(mul_scaled(shares, factor.0)?)
    }

    pub fn total_supply(&self) -> Result<Amount, LedgerError> {
        let factor = self.factor()?;
        Ok(mul_scaled(self.shares.total_shares(), factor.0)?)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.shares.allowance(owner, spender)
    }

    /// Share count of `holder`, inherited from the parent if never written.
    pub fn shares_of(&self, holder: &Address) -> Result<U256, LedgerError> {
        self.resolve_shares(holder)
    }

    pub fn total_shares(&self) -> U256 {
        self.shares.total_shares()
    }

    // ------------------------------------------------------------------
    // Mutations
    // ------------------------------------------------------------------

    /// Create `amount` real units for `holder`.
    pub fn mint(&mut self, holder: Address, amount: Amount) -> Result<Vec<LedgerEvent>, LedgerError> {
        if holder.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        let block = self.current_block()?;
        let factor = self.live_factor(block)?;

        let minted = div_scaled(amount, factor.0)?;
        let holder_after = checked_add(self.resolve_shares(&holder)?, minted)?;
        let total_after = checked_add(self.shares.total_shares(), minted)?;
        // Supply must stay representable at the current factor.
        mul_scaled(total_after, factor.0)?;

        self.commit_factor(block)?;
        self.write_holder(holder, holder_after, block);
        self.write_total(total_after, block);

        debug!(ledger = %self.id, %holder, amount = %format_ray(amount), block, "ledger: mint");
        Ok(vec![LedgerEvent::Transfer {
            from: Address::ZERO,
            to: holder,
            value: amount,
        }])
    }

    /// Destroy `amount` real units held by `holder`.
    pub fn burn(&mut self, holder: Address, amount: Amount) -> Result<Vec<LedgerEvent>, LedgerError> {
        if holder.is_zero() {
            return Err(LedgerError::InvalidHolder);
        }
        let block = self.current_block()?;
        let factor = self.live_factor(block)?;

        let holder_before = self.resolve_shares(&holder)?;
        let balance = mul_scaled(holder_before, factor.0)?;
        if balance < amount {
            warn!(ledger = %self.id, %holder, "ledger: burn exceeds balance");
            return Err(LedgerError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        let burned = div_scaled(amount, factor.0)?.min(holder_before);
        // Total shares always cover every holder's shares.
        let total_after = self.shares.total_shares().saturating_sub(burned);

        self.commit_factor(block)?;
        self.write_holder(holder, holder_before - burned, block);
        self.write_total(total_after, block);

        debug!(ledger = %self.id, %holder, amount = %format_ray(amount), block, "ledger: burn");
        Ok(vec![LedgerEvent::Transfer {
            from: holder,
            to: Address::ZERO,
            value: amount,
        }])
    }

    /// Move `amount` real units from `from` to `to` at the live factor.
    ///
    /// A zero amount is valid and still commits the factor.
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_transfers_enabled()?;
        let block = self.current_block()?;
        let mv = self.prepare_move(from, to, amount, block)?;
        self.apply_move(mv, block)?;

        debug!(ledger = %self.id, %from, %to, amount = %format_ray(amount), block, "ledger: transfer");
        Ok(vec![LedgerEvent::Transfer {
            from,
            to,
            value: amount,
        }])
    }

    /// Set the real-unit allowance of `spender` over `owner`'s balance.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_transfers_enabled()?;
        if spender.is_zero() {
            return Err(LedgerError::InvalidSpender);
        }
        let current = self.shares.allowance(&owner, &spender);
        if let Err(e) = self.approval_policy.check(current, amount) {
            warn!(ledger = %self.id, %owner, %spender, "ledger: approval rejected");
            return Err(e);
        }
        self.shares.set_allowance(owner, spender, amount);

        debug!(ledger = %self.id, %owner, %spender, amount = %format_ray(amount), "ledger: approve");
        Ok(vec![LedgerEvent::Approval {
            owner,
            spender,
            value: amount,
        }])
    }

    /// Spend `spender`'s allowance to move `amount` from `owner` to `to`.
    pub fn transfer_from(
        &mut self,
        spender: Address,
        owner: Address,
        to: Address,
        amount: Amount,
    ) -> Result<Vec<LedgerEvent>, LedgerError> {
        self.ensure_transfers_enabled()?;
        let allowed = self.shares.allowance(&owner, &spender);
        if allowed < amount {
            warn!(ledger = %self.id, %owner, %spender, "ledger: allowance exceeded");
            return Err(LedgerError::InsufficientAllowance {
                have: allowed,
                need: amount,
            });
        }
        let block = self.current_block()?;
        let mv = self.prepare_move(owner, to, amount, block)?;
        self.apply_move(mv, block)?;
        let remaining = allowed - amount;
        self.shares.set_allowance(owner, spender, remaining);

        debug!(
            ledger = %self.id,
            %spender,
            %owner,
            %to,
            amount = %format_ray(amount),
            block,
            "ledger: transfer_from"
        );
        Ok(vec![
            LedgerEvent::Transfer {
                from: owner,
                to,
                value: amount,
            },
            LedgerEvent::Approval {
                owner,
                spender,
                value: remaining,
            },
        ])
    }

    /// Overwrite the factor of a settable ledger. Every balance rescales at
    /// once.
    pub fn set_factor(&mut self, factor: Factor) -> Result<Vec<LedgerEvent>, LedgerError> {
        let block = self.current_block()?;
        let previous = self.factor.set(block, factor)?;
        if let Some(store) = self.history.as_mut() {
            store.record_factor(self.factor.checkpoint());
        }

        info!(ledger = %self.id, %previous, current = %factor, block, "ledger: factor set");
        Ok(vec![LedgerEvent::FactorSet {
            previous,
            current: factor,
        }])
    }

    pub fn enable_transfers(&mut self, enabled: bool) {
        if self.transfers_enabled != enabled {
            info!(ledger = %self.id, enabled, "ledger: transfers toggled");
        }
        self.transfers_enabled = enabled;
    }

    // ------------------------------------------------------------------
    // Point-in-time reads
    // ------------------------------------------------------------------

    /// Real balance of `holder` as of `block`. Blocks past the current block
    /// are read as the current block.
    pub fn balance_of_at(&self, holder: &Address, block: u64) -> Result<Amount, LedgerError> {
        self.balance_at_view(holder, block, None, "balance_of_at")
    }

    /// Real total supply as of `block`.
    pub fn total_supply_at(&self, block: u64) -> Result<Amount, LedgerError> {
        self.total_supply_at_view(block, None, "total_supply_at")
    }

    fn balance_at_view(
        &self,
        holder: &Address,
        block: u64,
        pin: Option<PinId>,
        op: &'static str,
    ) -> Result<Amount, LedgerError> {
        let store = self.snapshot_store(op)?;
        let block = block.min(self.current_block()?);

        let shares = match store.holder_shares_pinned(holder, block, pin) {
            Some(shares) => shares,
            None => match &self.parent {
                Some(link) if block <= link.fork_block => {
                    let parent = link.upgrade()?;
                    return parent.read().balance_at_view(holder, block, link.pin, op);
                }
                Some(link) => self.inherited_shares(link, holder)?,
                None => return Ok(U256::zero()),
            },
        };
        Ok(mul_scaled(shares, self.factor_at(store, block, pin)?.0)?)
    }

    fn total_supply_at_view(&self, block: u64, pin: Option<PinId>, op: &'static str) -> Result<Amount, LedgerError> {
        let store = self.snapshot_store(op)?;
        let block = block.min(self.current_block()?);

        let shares = match store.total_shares_pinned(block, pin) {
            Some(shares) => shares,
            None => match &self.parent {
                Some(link) if block <= link.fork_block => {
                    let parent = link.upgrade()?;
                    return parent.read().total_supply_at_view(block, link.pin, op);
                }
                Some(_) => self.inherited_total,
                None => return Ok(U256::zero()),
            },
        };
        Ok(mul_scaled(shares, self.factor_at(store, block, pin)?.0)?)
    }

    /// Factor as of `block` from the recorded factor history.
    fn factor_at(&self, store: &SnapshotStore, block: u64, pin: Option<PinId>) -> Result<Factor, LedgerError> {
        let checkpoint: FactorCheckpoint = store
            .factor_checkpoint_pinned(block, pin)
            .unwrap_or_else(|| self.factor.genesis());
        let total = store
            .total_shares_pinned(block, pin)
            .unwrap_or(self.inherited_total);
        Ok(self.factor.factor_from(&checkpoint, block, total)?)
    }

    /// Freeze this ledger's history at `block` for a clone forking there.
    pub(crate) fn pin_history(&mut self, block: u64) -> Option<PinId> {
        self.history.as_mut().map(|store| store.pin(block))
    }

    /// Real total supply at the fork block as `link` sees it.
    pub(crate) fn fork_total(&self, link: &ParentLink) -> Result<Amount, LedgerError> {
        self.total_supply_at_view(link.fork_block, link.pin, "create_clone")
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    pub(crate) fn current_block(&self) -> Result<u64, LedgerError> {
        let block = self.clock.current_block();
        if let Err(e) = self.factor.ensure_not_before_checkpoint(block) {
            warn!(ledger = %self.id, block, "ledger: block clock went backwards");
            return Err(e);
        }
        Ok(block)
    }

    fn live_factor(&self, block: u64) -> Result<Factor, LedgerError> {
        Ok(self.factor.live_factor(block, self.shares.total_shares())?)
    }

    fn snapshot_store(&self, op: &'static str) -> Result<&SnapshotStore, LedgerError> {
        self.history
            .as_ref()
            .ok_or(LedgerError::UnsupportedOperation(op))
    }

    fn ensure_transfers_enabled(&self) -> Result<(), LedgerError> {
        if !self.transfers_enabled {
            return Err(LedgerError::TransfersDisabled);
        }
        Ok(())
    }

    fn resolve_shares(&self, holder: &Address) -> Result<U256, LedgerError> {
        if let Some(shares) = self.shares.shares_of(holder) {
            return Ok(shares);
        }
        match &self.parent {
            Some(link) => self.inherited_shares(link, holder),
            None => Ok(U256::zero()),
        }
    }

    /// Parent value at the fork block, converted at this ledger's genesis
    /// factor.
    fn inherited_shares(&self, link: &ParentLink, holder: &Address) -> Result<U256, LedgerError> {
        if holder.is_zero() {
            return Ok(U256::zero());
        }
        let parent = link.upgrade()?;
        let value = parent
            .read()
            .balance_at_view(holder, link.fork_block, link.pin, "balance_of_at")?;
        Ok(div_scaled(value, self.factor.genesis().factor.0)?)
    }

    fn prepare_move(&self, from: Address, to: Address, amount: Amount, block: u64) -> Result<ShareMove, LedgerError> {
        if to.is_zero() {
            return Err(LedgerError::InvalidRecipient);
        }
        if from.is_zero() {
            return Err(LedgerError::InvalidHolder);
        }
        let factor = self.live_factor(block)?;

        let from_before = self.resolve_shares(&from)?;
        let balance = mul_scaled(from_before, factor.0)?;
        if balance < amount {
            warn!(ledger = %self.id, %from, "ledger: transfer exceeds balance");
            return Err(LedgerError::InsufficientBalance {
                have: balance,
                need: amount,
            });
        }
        let moved = div_scaled(amount, factor.0)?.min(from_before);
        let from_after = from_before - moved;
        let to_before = if to == from {
            from_after
        } else {
            self.resolve_shares(&to)?
        };
        let to_after = checked_add(to_before, moved)?;

        Ok(ShareMove {
            from,
            to,
            from_after,
            to_after,
        })
    }

    fn apply_move(&mut self, mv: ShareMove, block: u64) -> Result<(), LedgerError> {
        self.commit_factor(block)?;
        self.write_holder(mv.from, mv.from_after, block);
        self.write_holder(mv.to, mv.to_after, block);
        Ok(())
    }

    fn commit_factor(&mut self, block: u64) -> Result<Factor, LedgerError> {
        let factor = self.factor.commit(block, self.shares.total_shares())?;
        if let Some(store) = self.history.as_mut() {
            store.record_factor(self.factor.checkpoint());
        }
        Ok(factor)
    }

    fn write_holder(&mut self, holder: Address, shares: U256, block: u64) {
        self.shares.set_shares(holder, shares);
        if let Some(store) = self.history.as_mut() {
            store.record_holder(holder, block, shares);
        }
    }

    fn write_total(&mut self, total: U256, block: u64) {
        self.shares.set_total_shares(total);
        if let Some(store) = self.history.as_mut() {
            store.record_total(block, total);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use coinage_core::block::ManualBlockClock;
    use coinage_core::math::{parse_ray, units};
    use proptest::prelude::*;
    use std::sync::atomic::{AtomicU64, Ordering};

    fn addr(seed: u8) -> Address {
        Address([seed; 20])
    }

    fn ray(s: &str) -> U256 {
        parse_ray(s).unwrap()
    }

    fn ledger_with(config: LedgerConfig) -> (Arc<ManualBlockClock>, Ledger) {
        let clock = Arc::new(ManualBlockClock::new(0));
        let dyn_clock: Arc<dyn BlockClock> = clock.clone();
        let ledger = Ledger::new(LedgerId(1), config.validate().unwrap(), dyn_clock).unwrap();
        (clock, ledger)
    }

    fn auto_ledger() -> (Arc<ManualBlockClock>, Ledger) {
        ledger_with(LedgerConfig::auto("Auto", "AUT", Factor::ONE, ray("1.1")))
    }

    fn fixed_ledger() -> (Arc<ManualBlockClock>, Ledger) {
        ledger_with(LedgerConfig::fixed("Fixed", "FIX", Factor::ONE, units(100)))
    }

    fn custom_ledger() -> (Arc<ManualBlockClock>, Ledger) {
        ledger_with(LedgerConfig::custom("Custom", "CUS", Factor::ONE))
    }

    /// A clock that can be moved backwards.
    struct RewindClock(AtomicU64);

    impl BlockClock for RewindClock {
        fn current_block(&self) -> u64 {
            self.0.load(Ordering::SeqCst)
        }
    }

    // ------------------------------------------------------------------
    // metadata
    // ------------------------------------------------------------------

    #[test]
    fn metadata() {
        let (_, ledger) = auto_ledger();
        assert_eq!(ledger.name(), "Auto");
        assert_eq!(ledger.symbol(), "AUT");
        assert_eq!(ledger.decimals(), 27);
        assert_eq!(ledger.strategy_kind(), StrategyKind::Auto);
        assert!(ledger.history_enabled());
        assert!(ledger.transfers_enabled());
        assert!(ledger.parent().is_none());
    }

    // ------------------------------------------------------------------
    // mint / burn
    // ------------------------------------------------------------------

    #[test]
    fn auto_balance_grows_without_writes() {
        let (clock, mut ledger) = auto_ledger();
        let events = ledger.mint(addr(1), units(1000)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::Transfer {
                from: Address::ZERO,
                to: addr(1),
                value: units(1000),
            }]
        );
        clock.advance(1);
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(1100));
        assert_eq!(ledger.total_supply().unwrap(), units(1100));
        // Nothing was committed by the reads.
        assert_eq!(ledger.factor_clock().checkpoint().block, 0);
    }

    #[test]
    fn fixed_supply_grows_by_rate() {
        let (clock, mut ledger) = fixed_ledger();
        ledger.mint(addr(1), units(1000)).unwrap();
        clock.advance(1);
        assert_eq!(ledger.total_supply().unwrap(), units(1100));
        assert_eq!(ledger.factor().unwrap(), Factor(ray("1.1")));
    }

    #[test]
    fn fixed_commits_before_supply_change() {
        let (clock, mut ledger) = fixed_ledger();
        ledger.mint(addr(1), units(1000)).unwrap();
        clock.advance(5);
        ledger.mint(addr(2), units(1000)).unwrap();
        // The first 5 blocks were distributed over 1000 shares only.
        assert_eq!(ledger.factor_clock().checkpoint().factor, Factor(ray("1.5")));
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(1500));

        let before = ledger.total_supply().unwrap();
        clock.advance(1);
        let after = ledger.total_supply().unwrap();
        let growth = after - before;
        assert!(growth <= units(100));
        // Per-block delta is floored over ~1667 shares.
        assert!(units(100) - growth < U256::from(2_000u64));
    }

    #[test]
    fn mint_to_null_rejected() {
        let (_, mut ledger) = auto_ledger();
        assert_eq!(
            ledger.mint(Address::ZERO, units(1)).unwrap_err(),
            LedgerError::InvalidRecipient
        );
        assert_eq!(ledger.total_supply().unwrap(), U256::zero());
    }

    #[test]
    fn burn_emits_transfer_to_null() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(10)).unwrap();
        let events = ledger.burn(addr(1), units(4)).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::Transfer {
                from: addr(1),
                to: Address::ZERO,
                value: units(4),
            }]
        );
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(6));
        assert_eq!(ledger.total_supply().unwrap(), units(6));
    }

    #[test]
    fn burn_more_than_balance_rejected() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(10)).unwrap();
        assert_eq!(
            ledger.burn(addr(1), units(11)).unwrap_err(),
            LedgerError::InsufficientBalance {
                have: units(10),
                need: units(11),
            }
        );
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(10));
    }

    #[test]
    fn burn_from_null_rejected() {
        let (_, mut ledger) = custom_ledger();
        assert_eq!(
            ledger.burn(Address::ZERO, U256::zero()).unwrap_err(),
            LedgerError::InvalidHolder
        );
    }

    // ------------------------------------------------------------------
    // transfer
    // ------------------------------------------------------------------

    #[test]
    fn transfer_moves_real_value() {
        let (clock, mut ledger) = auto_ledger();
        ledger.mint(addr(1), units(1000)).unwrap();
        clock.advance(1);
        ledger.transfer(addr(1), addr(2), units(110)).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(990));
        assert_eq!(ledger.balance_of(&addr(2)).unwrap(), units(110));
        assert_eq!(ledger.total_supply().unwrap(), units(1100));
    }

    #[test]
    fn transfer_insufficient_balance_changes_nothing() {
        let (_, mut ledger) = auto_ledger();
        ledger.mint(addr(1), units(10)).unwrap();
        let err = ledger.transfer(addr(1), addr(2), units(11)).unwrap_err();
        assert!(matches!(err, LedgerError::InsufficientBalance { .. }));
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(10));
        assert_eq!(ledger.balance_of(&addr(2)).unwrap(), U256::zero());
    }

    #[test]
    fn transfer_to_null_rejected() {
        let (_, mut ledger) = auto_ledger();
        ledger.mint(addr(1), units(10)).unwrap();
        assert_eq!(
            ledger.transfer(addr(1), Address::ZERO, units(1)).unwrap_err(),
            LedgerError::InvalidRecipient
        );
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(10));
    }

    #[test]
    fn zero_transfer_commits_factor() {
        let (clock, mut ledger) = auto_ledger();
        ledger.mint(addr(1), units(1000)).unwrap();
        clock.advance(2);
        ledger.transfer(addr(1), addr(2), U256::zero()).unwrap();
        let cp = ledger.factor_clock().checkpoint();
        assert_eq!(cp.block, 2);
        assert_eq!(cp.factor, Factor(ray("1.21")));
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(1210));
    }

    #[test]
    fn self_transfer_keeps_balance() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(10)).unwrap();
        ledger.transfer(addr(1), addr(1), units(7)).unwrap();
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(10));
    }

    #[test]
    fn disabled_transfers_block_transfer_and_approve() {
        let (_, mut ledger) = ledger_with(
            LedgerConfig::custom("C", "C", Factor::ONE).with_transfers_enabled(false),
        );
        ledger.mint(addr(1), units(10)).unwrap();
        assert_eq!(
            ledger.transfer(addr(1), addr(2), units(1)).unwrap_err(),
            LedgerError::TransfersDisabled
        );
        assert_eq!(
            ledger.approve(addr(1), addr(2), units(1)).unwrap_err(),
            LedgerError::TransfersDisabled
        );
        assert_eq!(
            ledger.transfer_from(addr(2), addr(1), addr(3), U256::zero()).unwrap_err(),
            LedgerError::TransfersDisabled
        );
        ledger.enable_transfers(true);
        ledger.transfer(addr(1), addr(2), units(1)).unwrap();
        assert_eq!(ledger.balance_of(&addr(2)).unwrap(), units(1));
    }

    // ------------------------------------------------------------------
    // approve / transfer_from
    // ------------------------------------------------------------------

    #[test]
    fn approve_to_null_spender_rejected() {
        let (_, mut ledger) = auto_ledger();
        assert_eq!(
            ledger.approve(addr(1), Address::ZERO, units(1)).unwrap_err(),
            LedgerError::InvalidSpender
        );
    }

    #[test]
    fn zero_first_policy_applies() {
        let (_, mut ledger) = custom_ledger();
        assert_eq!(ledger.approval_policy(), ApprovalPolicy::ZeroFirst);
        ledger.approve(addr(1), addr(2), units(5)).unwrap();
        assert_eq!(
            ledger.approve(addr(1), addr(2), units(6)).unwrap_err(),
            LedgerError::InvalidApproval {
                current: units(5),
                requested: units(6),
            }
        );
        assert_eq!(ledger.allowance(&addr(1), &addr(2)), units(5));
        ledger.approve(addr(1), addr(2), U256::zero()).unwrap();
        ledger.approve(addr(1), addr(2), units(6)).unwrap();
        assert_eq!(ledger.allowance(&addr(1), &addr(2)), units(6));
    }

    #[test]
    fn replace_policy_allows_overwrite() {
        let (_, mut ledger) = auto_ledger();
        assert!(ledger.history_enabled());
        assert_eq!(ledger.approval_policy(), ApprovalPolicy::Replace);
        ledger.approve(addr(1), addr(2), units(5)).unwrap();
        ledger.approve(addr(1), addr(2), units(6)).unwrap();
        assert_eq!(ledger.allowance(&addr(1), &addr(2)), units(6));
    }

    #[test]
    fn transfer_from_spends_allowance() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(100)).unwrap();
        ledger.approve(addr(1), addr(2), units(30)).unwrap();
        let events = ledger.transfer_from(addr(2), addr(1), addr(3), units(10)).unwrap();
        assert_eq!(
            events,
            vec![
                LedgerEvent::Transfer {
                    from: addr(1),
                    to: addr(3),
                    value: units(10),
                },
                LedgerEvent::Approval {
                    owner: addr(1),
                    spender: addr(2),
                    value: units(20),
                },
            ]
        );
        assert_eq!(ledger.allowance(&addr(1), &addr(2)), units(20));
        assert_eq!(ledger.balance_of(&addr(3)).unwrap(), units(10));
    }

    #[test]
    fn transfer_from_over_allowance_rejected() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(100)).unwrap();
        ledger.approve(addr(1), addr(2), units(5)).unwrap();
        assert_eq!(
            ledger.transfer_from(addr(2), addr(1), addr(3), units(6)).unwrap_err(),
            LedgerError::InsufficientAllowance {
                have: units(5),
                need: units(6),
            }
        );
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(100));
    }

    #[test]
    fn transfer_from_over_balance_keeps_allowance() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(5)).unwrap();
        ledger.approve(addr(1), addr(2), units(50)).unwrap();
        assert!(matches!(
            ledger.transfer_from(addr(2), addr(1), addr(3), units(6)),
            Err(LedgerError::InsufficientBalance { .. })
        ));
        assert_eq!(ledger.allowance(&addr(1), &addr(2)), units(50));
    }

    // ------------------------------------------------------------------
    // set_factor
    // ------------------------------------------------------------------

    #[test]
    fn set_factor_rescales_everyone() {
        let (_, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(100)).unwrap();
        ledger.mint(addr(2), units(300)).unwrap();
        let events = ledger.set_factor(Factor(ray("0.5"))).unwrap();
        assert_eq!(
            events,
            vec![LedgerEvent::FactorSet {
                previous: Factor::ONE,
                current: Factor(ray("0.5")),
            }]
        );
        assert_eq!(ledger.total_supply().unwrap(), units(200));
        assert_eq!(ledger.balance_of(&addr(1)).unwrap(), units(50));
        assert_eq!(ledger.balance_of(&addr(2)).unwrap(), units(150));
    }

    #[test]
    fn set_factor_on_auto_unsupported() {
        let (_, mut ledger) = auto_ledger();
        assert_eq!(
            ledger.set_factor(Factor::ONE).unwrap_err(),
            LedgerError::UnsupportedOperation("set_factor")
        );
    }

    #[test]
    fn set_factor_zero_rejected() {
        let (_, mut ledger) = custom_ledger();
        assert_eq!(
            ledger.set_factor(Factor(U256::zero())).unwrap_err(),
            LedgerError::InvalidFactor
        );
        assert_eq!(ledger.factor().unwrap(), Factor::ONE);
    }

    // ------------------------------------------------------------------
    // history
    // ------------------------------------------------------------------

    #[test]
    fn balance_at_grows_between_checkpoints() {
        let (clock, mut ledger) = auto_ledger();
        ledger.mint(addr(1), units(1000)).unwrap();
        clock.advance(3);
        assert_eq!(ledger.balance_of_at(&addr(1), 0).unwrap(), units(1000));
        assert_eq!(ledger.balance_of_at(&addr(1), 1).unwrap(), units(1100));
        assert_eq!(ledger.balance_of_at(&addr(1), 2).unwrap(), units(1210));
        assert_eq!(ledger.total_supply_at(2).unwrap(), units(1210));
        // Future blocks read as now.
        assert_eq!(
            ledger.balance_of_at(&addr(1), 100).unwrap(),
            ledger.balance_of(&addr(1)).unwrap()
        );
    }

    #[test]
    fn balance_at_before_first_write_is_zero() {
        let (clock, mut ledger) = custom_ledger();
        clock.advance(5);
        ledger.mint(addr(1), units(10)).unwrap();
        assert_eq!(ledger.balance_of_at(&addr(1), 4).unwrap(), U256::zero());
        assert_eq!(ledger.balance_of_at(&addr(1), 5).unwrap(), units(10));
        assert_eq!(ledger.total_supply_at(4).unwrap(), U256::zero());
    }

    #[test]
    fn history_survives_factor_set() {
        let (clock, mut ledger) = custom_ledger();
        ledger.mint(addr(1), units(100)).unwrap();
        clock.advance(1);
        ledger.set_factor(Factor(ray("2"))).unwrap();
        assert_eq!(ledger.balance_of_at(&addr(1), 0).unwrap(), units(100));
        assert_eq!(ledger.balance_of_at(&addr(1), 1).unwrap(), units(200));
    }

    #[test]
    fn history_disabled_rejects_queries() {
        let (_, ledger) = ledger_with(LedgerConfig::custom("C", "C", Factor::ONE).with_history(false));
        assert_eq!(
            ledger.balance_of_at(&addr(1), 0).unwrap_err(),
            LedgerError::UnsupportedOperation("balance_of_at")
        );
        assert_eq!(
            ledger.total_supply_at(0).unwrap_err(),
            LedgerError::UnsupportedOperation("total_supply_at")
        );
        assert!(ledger.snapshots().is_none());
    }

    #[test]
    fn fixed_history_uses_total_in_force() {
        let (clock, mut ledger) = fixed_ledger();
        ledger.mint(addr(1), units(1000)).unwrap();
        clock.advance(2);
        ledger.mint(addr(1), units(1200)).unwrap();
        clock.advance(2);
        assert_eq!(ledger.total_supply_at(1).unwrap(), units(1100));
        assert_eq!(ledger.total_supply_at(2).unwrap(), units(2400));
        // 100 per block over 2000 shares from block 2 on.
        assert_eq!(ledger.total_supply_at(3).unwrap(), units(2500));
    }

    // ------------------------------------------------------------------
    // block regression
    // ------------------------------------------------------------------

    #[test]
    fn clock_regression_rejected_without_change() {
        let clock = Arc::new(RewindClock(AtomicU64::new(10)));
        let dyn_clock: Arc<dyn BlockClock> = clock.clone();
        let params = LedgerConfig::custom("C", "C", Factor::ONE).validate().unwrap();
        let mut ledger = Ledger::new(LedgerId(1), params, dyn_clock).unwrap();
        ledger.mint(addr(1), units(1)).unwrap();

        clock.0.store(9, Ordering::SeqCst);
        assert_eq!(
            ledger.mint(addr(1), units(1)).unwrap_err(),
            LedgerError::BlockRegression {
                checkpoint: 10,
                current: 9,
            }
        );
        assert!(ledger.balance_of(&addr(1)).is_err());
        assert_eq!(ledger.shares_of(&addr(1)).unwrap(), units(1));
    }

    // --- proptest ---

    proptest! {
        #[test]
        fn balances_sum_to_supply_within_rounding(
            mints in proptest::collection::vec((1u8..8, 1u64..1_000_000), 1..20),
            blocks in 0u64..50,
        ) {
            let (clock, mut ledger) = ledger_with(
                LedgerConfig::auto("A", "A", Factor::ONE, ray("1.01")),
            );
            for (seed, amount) in &mints {
                ledger.mint(addr(*seed), U256::from(*amount) * U256::exp10(20)).unwrap();
            }
            clock.advance(blocks);
            let mut sum = U256::zero();
            for seed in 1u8..8 {
                sum += ledger.balance_of(&addr(seed)).unwrap();
            }
            let total = ledger.total_supply().unwrap();
            prop_assert!(sum <= total);
            prop_assert!(total - sum <= U256::from(8u64));
        }

        #[test]
        fn failed_transfer_changes_nothing(balance in 1u64..1_000, extra in 1u64..1_000) {
            let (clock, mut ledger) = auto_ledger();
            ledger.mint(addr(1), units(balance)).unwrap();
            clock.advance(1);
            let before = ledger.balance_of(&addr(1)).unwrap();
            let cp = ledger.factor_clock().checkpoint();
            let result = ledger.transfer(addr(1), addr(2), before + units(extra));
            prop_assert!(result.is_err());
            prop_assert_eq!(ledger.balance_of(&addr(1)).unwrap(), before);
            prop_assert_eq!(ledger.factor_clock().checkpoint(), cp);
        }
    }
}
