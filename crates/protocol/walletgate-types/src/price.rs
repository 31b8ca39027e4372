//! Tool prices.
//!
//! A [`Price`] is a strictly positive decimal amount in the settlement
//! currency, stored as atomic units so that amounts never pass through
//! floating point. Prices render as `$0.05` in listings and as an atomic
//! unit string (`"50000"`) in payment requirements.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::constants::{ATOMIC_UNITS_PER_DOLLAR, PRICE_DECIMALS};

/// Errors produced when parsing a price.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PriceError {
    /// The input was not a decimal number.
    #[error("invalid price format: {0}")]
    Format(String),

    /// More fractional digits than the currency supports.
    #[error("price {0} has more than 6 decimal places")]
    Precision(String),

    /// Zero prices are expressed by leaving the price off entirely.
    #[error("price must be positive: {0}")]
    NotPositive(String),

    /// Too large to represent in atomic units.
    #[error("price out of range: {0}")]
    Overflow(String),
}

/// A positive price in the gateway's fixed currency unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Price(u64);

impl Price {
    /// Create a price from atomic units. Returns `None` for zero.
    pub fn from_atomic_units(units: u64) -> Option<Self> {
        (units > 0).then_some(Self(units))
    }

    /// Create a price from whole cents (e.g. `5` for `$0.05`).
    pub fn from_cents(cents: u64) -> Option<Self> {
        cents
            .checked_mul(ATOMIC_UNITS_PER_DOLLAR / 100)
            .and_then(Self::from_atomic_units)
    }

    /// Amount in atomic units.
    pub fn atomic_units(&self) -> u64 {
        self.0
    }

    /// Decimal amount without the currency symbol (e.g. `0.05`).
    pub fn decimal(&self) -> String {
        let whole = self.0 / ATOMIC_UNITS_PER_DOLLAR;
        let frac = self.0 % ATOMIC_UNITS_PER_DOLLAR;
        let mut frac_str = format!("{:0width$}", frac, width = PRICE_DECIMALS as usize);
        while frac_str.len() > 2 && frac_str.ends_with('0') {
            frac_str.pop();
        }
        format!("{}.{}", whole, frac_str)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "${}", self.decimal())
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim();
        let digits = trimmed.strip_prefix('$').unwrap_or(trimmed);

        let (whole, frac) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        let all_digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());
        if (whole.is_empty() && frac.is_empty()) || !all_digits(whole) || !all_digits(frac) {
            return Err(PriceError::Format(input.to_string()));
        }
        if frac.len() > PRICE_DECIMALS as usize {
            return Err(PriceError::Precision(input.to_string()));
        }

        let overflow = || PriceError::Overflow(input.to_string());
        let whole_units = if whole.is_empty() {
            0
        } else {
            whole.parse::<u64>().map_err(|_| overflow())?
        };
        let frac_units = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = PRICE_DECIMALS as usize);
            padded.parse::<u64>().map_err(|_| overflow())?
        };

        let units = whole_units
            .checked_mul(ATOMIC_UNITS_PER_DOLLAR)
            .and_then(|u| u.checked_add(frac_units))
            .ok_or_else(overflow)?;

        Self::from_atomic_units(units).ok_or_else(|| PriceError::NotPositive(input.to_string()))
    }
}

impl Serialize for Price {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Price {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
