//! # coinage-ledger — Share ledgers, point-in-time history and clones.
//!
//! - [`ledger::Ledger`] — the ledger aggregate: factor clock, shares,
//!   allowances and optional history
//! - [`shares::ShareLedger`] — share balances and real-unit allowances
//! - [`snapshot::SnapshotStore`] — per-holder and aggregate checkpoint series
//! - [`factory::CloneFactory`] — ledger registry, deployment and forking
//! - [`config::LedgerConfig`] — deployment configuration
//! - [`logging`] — tracing subscriber setup

pub mod config;
pub mod factory;
pub mod ledger;
pub mod logging;
pub mod shares;
pub mod snapshot;

pub use config::{LedgerConfig, LedgerParams, StrategyConfig};
pub use factory::CloneFactory;
pub use ledger::{Ledger, ParentLink, SharedLedger};
pub use shares::{ApprovalPolicy, ShareLedger};
pub use snapshot::{CheckpointSeries, PinId, SnapshotStore};
