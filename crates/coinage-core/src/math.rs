//! Ray-scaled fixed-point arithmetic.
//!
//! Every ledger computation goes through [`mul_scaled`] and [`div_scaled`] so
//! there is exactly one rounding policy: floor. Products are formed in a
//! 512-bit intermediate, so multiply-before-divide never loses precision and
//! only a final result wider than 256 bits is an error.

use primitive_types::{U256, U512};

use crate::constants::{RAY, RAY_DECIMALS};
use crate::error::MathError;

/// `floor(a * b / RAY)`.
///
/// # Examples
///
/// ```
/// use coinage_core::math::{mul_scaled, parse_ray};
/// let a = parse_ray("1000").unwrap();
/// let b = parse_ray("1.1").unwrap();
/// assert_eq!(mul_scaled(a, b).unwrap(), parse_ray("1100").unwrap());
/// ```
pub fn mul_scaled(a: U256, b: U256) -> Result<U256, MathError> {
    let wide = a.full_mul(b) / U512::from(RAY);
    U256::try_from(wide).map_err(|_| MathError::Overflow)
}

/// `floor(a * RAY / b)`.
///
/// # Errors
///
/// [`MathError::DivisionByZero`] when `b` is zero, [`MathError::Overflow`]
/// when the quotient does not fit in 256 bits.
pub fn div_scaled(a: U256, b: U256) -> Result<U256, MathError> {
    if b.is_zero() {
        return Err(MathError::DivisionByZero);
    }
    let wide = a.full_mul(RAY) / U512::from(b);
    U256::try_from(wide).map_err(|_| MathError::Overflow)
}

/// Ray-scaled exponentiation: `base^exp` where `base` is ray-scaled.
///
/// Uses binary exponentiation for O(log n) multiplications, flooring after
/// each one. `exp == 0` yields `RAY` (1.0).
pub fn pow_scaled(base: U256, exp: u64) -> Result<U256, MathError> {
    let mut result = RAY;
    let mut b = base;
    let mut e = exp;

    while e > 0 {
        if e & 1 == 1 {
            result = mul_scaled(result, b)?;
        }
        e >>= 1;
        if e > 0 {
            b = mul_scaled(b, b)?;
        }
    }

    Ok(result)
}

/// Whole units expressed in ray precision (`n * RAY`).
pub fn units(n: u64) -> U256 {
    U256::from(n) * RAY
}

/// Parse a decimal string such as `"1.10"` or `"10000"` into a ray-scaled
/// integer. At most 27 fractional digits are accepted.
pub fn parse_ray(s: &str) -> Result<U256, MathError> {
    let s = s.trim();
    let invalid = || MathError::InvalidDecimal(s.to_string());

    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.bytes().all(|b| b.is_ascii_digit())
        || !frac_part.bytes().all(|b| b.is_ascii_digit())
        || frac_part.len() > RAY_DECIMALS
    {
        return Err(invalid());
    }

    let int = if int_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(int_part).map_err(|_| invalid())?
    };
    let frac = if frac_part.is_empty() {
        U256::zero()
    } else {
        U256::from_dec_str(frac_part).map_err(|_| invalid())?
            * U256::exp10(RAY_DECIMALS - frac_part.len())
    };

    int.checked_mul(RAY)
        .and_then(|v| v.checked_add(frac))
        .ok_or(MathError::Overflow)
}

/// Render a ray-scaled integer as a decimal string with trailing zeros
/// trimmed (`RAY` renders as `"1"`, `1.1 * RAY` as `"1.1"`).
pub fn format_ray(value: U256) -> String {
    let mut digits = value.to_string();
    if digits.len() <= RAY_DECIMALS {
        digits.insert_str(0, &"0".repeat(RAY_DECIMALS + 1 - digits.len()));
    }
    let (int, frac) = digits.split_at(digits.len() - RAY_DECIMALS);
    let frac = frac.trim_end_matches('0');
    if frac.is_empty() {
        int.to_string()
    } else {
        format!("{int}.{frac}")
    }
}

/// Serde adapter carrying ray-scaled integers as decimal strings.
///
/// Use with `#[serde(with = "coinage_core::math::serde_ray")]`.
pub mod serde_ray {
    use primitive_types::U256;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::{format_ray, parse_ray};

    pub fn serialize<S: Serializer>(value: &U256, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&format_ray(*value))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<U256, D::Error> {
        let s = String::deserialize(deserializer)?;
        parse_ray(&s).map_err(serde::de::Error::custom)
    }
}
