//! Ledger constants. All amounts, shares and factors are ray-scaled integers
//! (1.0 = 10^27).

use primitive_types::U256;

/// Number of fractional decimal digits carried by every ray-scaled value.
pub const RAY_DECIMALS: usize = 27;

/// The ray scale, `10^27`. A factor of exactly `RAY` means 1.0.
///
/// # Examples
///
/// ```
/// use coinage_core::constants::RAY;
/// use coinage_core::U256;
/// assert_eq!(RAY, U256::exp10(27));
/// ```
pub const RAY: U256 = U256([0x9fd0_803c_e800_0000, 0x033b_2e3c, 0, 0]);

/// Decimals reported by every ledger (`decimals()`), equal to the ray scale.
pub const LEDGER_DECIMALS: u8 = RAY_DECIMALS as u8;

/// Prefix for environment-variable overrides of ledger configuration.
pub const CONFIG_ENV_PREFIX: &str = "COINAGE";
