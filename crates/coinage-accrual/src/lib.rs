//! # coinage-accrual — Factor accrual strategies and the factor clock.
//!
//! All calculations use ray-scaled integer arithmetic only for determinism.
//!
//! - **Auto**: geometric growth, `factor * increment^elapsed`, evaluated with
//!   binary exponentiation so a read after a long idle stretch costs
//!   O(log n) multiplications.
//! - **Fixed**: linear supply growth, a fixed real amount per block spread
//!   over all shares, so the factor delta depends on total shares and must be
//!   committed before every supply change.
//! - **Custom**: the factor only moves when explicitly set.
//!
//! [`FactorClock`] holds the checkpoint and turns a strategy into live reads
//! and commits.

pub mod clock;
pub mod strategy;

pub use clock::FactorClock;
pub use strategy::{AccrualStrategy, AutoIncrement, CustomIncrement, FixedIncrement};
