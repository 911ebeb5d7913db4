//! Core ledger types: holder identities, factors, checkpoints, events.
//!
//! All amounts are ray-scaled `U256` integers (1 unit = 10^27).

use primitive_types::U256;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::constants::RAY;
use crate::error::{AddressError, MathError};
use crate::math::{format_ray, parse_ray, serde_ray};

/// A real-unit amount or a share count, ray-scaled.
pub type Amount = U256;

/// A 20-byte holder identity.
///
/// [`Address::ZERO`] is the null identity: it can never receive, spend or
/// hold balance.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address(pub [u8; 20]);

impl Address {
    /// The null identity (20 zero bytes).
    pub const ZERO: Self = Self([0u8; 20]);

    /// Return the underlying bytes.
    pub fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    /// Check if this is the null identity.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 20]
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl FromStr for Address {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let stripped = s.strip_prefix("0x").unwrap_or(s);
        let bytes = hex::decode(stripped).map_err(|e| AddressError::InvalidHex(e.to_string()))?;
        let arr: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| AddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Identity of a ledger instance, assigned by the factory that created it.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LedgerId(pub u64);

impl fmt::Display for LedgerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ledger#{}", self.0)
    }
}

/// Exchange rate between one share and one real unit, ray-scaled.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct Factor(#[serde(with = "serde_ray")] pub U256);

impl Factor {
    /// 1.0
    pub const ONE: Self = Self(RAY);

    /// Wrap a ray-scaled value.
    pub fn new(raw: U256) -> Self {
        Self(raw)
    }

    /// Parse a decimal string such as `"1.10"`.
    pub fn from_decimal_str(s: &str) -> Result<Self, MathError> {
        parse_ray(s).map(Self)
    }

    /// The ray-scaled integer.
    pub fn raw(&self) -> U256 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl Default for Factor {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format_ray(self.0))
    }
}

/// The last persisted factor and the block it was persisted at.
///
/// From here the factor advances deterministically using the ledger's
/// accrual strategy. Invariant: `block <= current block`.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
pub struct FactorCheckpoint {
    pub factor: Factor,
    pub block: u64,
}

impl FactorCheckpoint {
    pub fn new(factor: Factor, block: u64) -> Self {
        Self { factor, block }
    }
}

/// Which accrual formula a ledger uses.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    /// Geometric: the factor is multiplied by a fixed increment every block.
    Auto,
    /// Settable: the factor only moves on an explicit `set_factor`.
    Custom,
    /// Linear: total supply grows by a fixed real amount every block.
    Fixed,
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Auto => f.write_str("auto"),
            Self::Custom => f.write_str("custom"),
            Self::Fixed => f.write_str("fixed"),
        }
    }
}

/// Structured records emitted by ledger operations.
///
/// The transport layer forwards these verbatim. Mints are transfers from
/// [`Address::ZERO`], burns are transfers to it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum LedgerEvent {
    Transfer {
        from: Address,
        to: Address,
        #[serde(with = "serde_ray")]
        value: Amount,
    },
    Approval {
        owner: Address,
        spender: Address,
        #[serde(with = "serde_ray")]
        value: Amount,
    },
    FactorSet {
        previous: Factor,
        current: Factor,
    },
    NewClone {
        clone: LedgerId,
        fork_block: u64,
    },
}
