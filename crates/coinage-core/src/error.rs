//! Error types for Coinage ledgers.
use primitive_types::U256;
use thiserror::Error;

use crate::types::LedgerId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MathError {
    #[error("division by zero")] DivisionByZero,
    #[error("arithmetic overflow")] Overflow,
    #[error("invalid decimal: {0}")] InvalidDecimal(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid length: {0} bytes")] InvalidLength(usize),
    #[error("invalid hex: {0}")] InvalidHex(String),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid recipient: null identity")] InvalidRecipient,
    #[error("invalid spender: null identity")] InvalidSpender,
    #[error("invalid holder: null identity")] InvalidHolder,
    #[error("insufficient balance: have {have}, need {need}")] InsufficientBalance { have: U256, need: U256 },
    #[error("insufficient allowance: have {have}, need {need}")] InsufficientAllowance { have: U256, need: U256 },
    #[error("invalid approval: allowance {current} must be reset to zero before approving {requested}")] InvalidApproval { current: U256, requested: U256 },
    #[error("invalid factor: must be non-zero")] InvalidFactor,
    #[error("transfers are disabled")] TransfersDisabled,
    #[error("unsupported operation: {0}")] UnsupportedOperation(&'static str),
    #[error("fork block {fork_block} is after current block {current}")] ForkBlockInFuture { fork_block: u64, current: u64 },
    #[error("block regression: checkpoint at {checkpoint}, clock reports {current}")] BlockRegression { checkpoint: u64, current: u64 },
    #[error("parent ledger {0} is no longer available")] ParentUnavailable(LedgerId),
    #[error("math: {0}")] Math(#[from] MathError),
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("load: {0}")] Load(String),
    #[error("invalid: {0}")] Invalid(String),
    #[error("math: {0}")] Math(#[from] MathError),
}

#[derive(Error, Debug)]
pub enum CoinageError {
    #[error(transparent)] Math(#[from] MathError),
    #[error(transparent)] Address(#[from] AddressError),
    #[error(transparent)] Ledger(#[from] LedgerError),
    #[error(transparent)] Config(#[from] ConfigError),
}
