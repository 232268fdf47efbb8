//! Core data types shared by the store, provider, ledger and scheduler.

use crate::error::{OracleError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Hex digits in a 32-byte identifier.
pub const ID_HEX_LEN: usize = 64;

/// Validator identifier in canonical form: lowercase hex, no prefix, at least
/// 64 digits (left-padded with zeros).
///
/// Identifiers whose significant digits exceed 32 bytes are still accepted so
/// they can be tracked and reported, but [`ValidatorId::to_bytes32`] rejects
/// them rather than truncating.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ValidatorId(String);

impl ValidatorId {
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        let digits = trimmed
            .strip_prefix("0x")
            .or_else(|| trimmed.strip_prefix("0X"))
            .unwrap_or(trimmed);

        if digits.is_empty() {
            return Err(OracleError::invalid_identifier(raw, "empty identifier"));
        }
        if !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(OracleError::invalid_identifier(
                raw,
                "identifier must be hexadecimal",
            ));
        }

        let mut canonical = digits.to_ascii_lowercase();
        if canonical.len() < ID_HEX_LEN {
            canonical = format!("{:0>width$}", canonical, width = ID_HEX_LEN);
        } else if canonical.len() > ID_HEX_LEN {
            let significant = canonical.trim_start_matches('0');
            canonical = format!("{:0>width$}", significant, width = ID_HEX_LEN);
        }

        Ok(Self(canonical))
    }

    /// Canonical digits without prefix (the persisted form).
    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn fits_bytes32(&self) -> bool {
        self.0.len() == ID_HEX_LEN
    }

    pub fn to_bytes32(&self) -> Result<[u8; 32]> {
        if !self.fits_bytes32() {
            return Err(OracleError::invalid_identifier(
                self.to_string(),
                format!(
                    "{} significant hex digits exceed the 32-byte identifier width",
                    self.0.len()
                ),
            ));
        }
        let mut out = [0u8; 32];
        hex::decode_to_slice(&self.0, &mut out)
            .map_err(|e| OracleError::invalid_identifier(self.to_string(), e.to_string()))?;
        Ok(out)
    }
}

impl fmt::Display for ValidatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", self.0)
    }
}

impl TryFrom<String> for ValidatorId {
    type Error = OracleError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<ValidatorId> for String {
    fn from(id: ValidatorId) -> Self {
        id.to_string()
    }
}

impl std::str::FromStr for ValidatorId {
    type Err = OracleError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

/// One validator read from the data provider. Amounts are in the smallest unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub validator: ValidatorId,
    pub balance: u128,
    pub rewards: u128,
}

/// Asset fiat price scaled to a fixed number of decimals.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriceRecord {
    pub scaled: u128,
    pub decimals: u32,
    /// Floating-point value as reported by the source.
    pub raw: f64,
}

impl PriceRecord {
    /// Converts a floating-point quote into fixed point, rounding half away from zero.
    pub fn from_float(raw: f64, decimals: u32) -> Result<Self> {
        if !raw.is_finite() {
            return Err(OracleError::ProviderMalformed(format!(
                "price is not a finite number: {raw}"
            )));
        }
        if raw < 0.0 {
            return Err(OracleError::ProviderMalformed(format!(
                "price is negative: {raw}"
            )));
        }

        let scaled = (raw * 10f64.powi(decimals as i32)).round();
        if scaled >= u128::MAX as f64 {
            return Err(OracleError::ProviderMalformed(format!(
                "price {raw} overflows at {decimals} decimals"
            )));
        }

        Ok(Self {
            scaled: scaled as u128,
            decimals,
            raw,
        })
    }
}
