//! # coinage-core
//! Foundation types, fixed-point math and traits for Coinage ledgers.

pub mod block;
pub mod constants;
pub mod error;
pub mod math;
pub mod traits;
pub mod types;

pub use primitive_types::U256;
