//! Scenario and adversarial test suites for Coinage ledgers.
//!
//! The suites live in `tests/`; [`helpers`] holds the shared fixtures.

pub mod helpers;
