//! HashId codec: signed 32-bit decimal <-> big-endian `0x`-prefixed hex.
//!
//! Map unit documents carry identifiers in either encoding. Everything inside
//! the crate works on [`HashId`]; the hex form is the canonical text used for
//! persisted artifacts and DOT node keys.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{MubinGraphError, Result};

const HEX_PREFIX: &str = "0x";
const HEX_DIGITS: usize = 8;

/// Opaque 32-bit signed object handle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HashId(i32);

impl HashId {
    pub const fn new(value: i32) -> Self {
        Self(value)
    }

    pub const fn value(self) -> i32 {
        self.0
    }

    /// Parse a signed decimal; values outside the i32 range are rejected.
    pub fn from_decimal(s: &str) -> Result<Self> {
        let wide: i64 = s
            .trim()
            .parse()
            .map_err(|_| MubinGraphError::InvalidIdentifier(format!("not a decimal integer: {:?}", s)))?;
        let value = i32::try_from(wide).map_err(|_| {
            MubinGraphError::InvalidIdentifier(format!("{} is outside the signed 32-bit range", wide))
        })?;
        Ok(Self(value))
    }

    /// Parse `0x` + exactly 8 hex digits (either case) as big-endian bytes.
    pub fn from_hex(s: &str) -> Result<Self> {
        let s = s.trim();
        let digits = s.strip_prefix(HEX_PREFIX).ok_or_else(|| {
            MubinGraphError::InvalidIdentifier(format!("missing 0x prefix: {:?}", s))
        })?;
        if digits.len() != HEX_DIGITS || !digits.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(MubinGraphError::InvalidIdentifier(format!(
                "expected 0x followed by {} hex digits: {:?}",
                HEX_DIGITS, s
            )));
        }
        let unsigned = u32::from_str_radix(digits, 16)
            .map_err(|e| MubinGraphError::InvalidIdentifier(format!("{:?}: {}", s, e)))?;
        Ok(Self(i32::from_be_bytes(unsigned.to_be_bytes())))
    }

    pub fn to_hex(self) -> String {
        let [a, b, c, d] = self.0.to_be_bytes();
        format!("0x{:02x}{:02x}{:02x}{:02x}", a, b, c, d)
    }

    pub fn to_decimal(self) -> String {
        self.0.to_string()
    }
}

/// Convert a decimal identifier string to its hex encoding.
pub fn to_hex(decimal: &str) -> Result<String> {
    HashId::from_decimal(decimal).map(HashId::to_hex)
}

/// Convert a hex identifier string to its decimal encoding.
pub fn to_decimal(hex: &str) -> Result<String> {
    HashId::from_hex(hex).map(HashId::to_decimal)
}

/// Accept either encoding (detected by the `0x` prefix) and return the canonical id.
pub fn normalize(s: &str) -> Result<HashId> {
    let trimmed = s.trim();
    if trimmed.starts_with(HEX_PREFIX) {
        HashId::from_hex(trimmed)
    } else {
        HashId::from_decimal(trimmed)
    }
}

impl fmt::Display for HashId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl FromStr for HashId {
    type Err = MubinGraphError;

    fn from_str(s: &str) -> Result<Self> {
        normalize(s)
    }
}

impl From<i32> for HashId {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl Serialize for HashId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hex())
    }
}

impl<'de> Deserialize<'de> for HashId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        normalize(&raw).map_err(serde::de::Error::custom)
    }
}
