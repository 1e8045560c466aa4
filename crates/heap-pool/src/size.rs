// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Human-readable byte sizes for pool configuration.
//!
//! A [`ByteSize`] is a byte count that can be written as `"64M"` in a TOML
//! config file instead of `67108864`.

use crate::PoolError;
use std::fmt;

const KIB: u64 = 1024;
const MIB: u64 = 1024 * KIB;
const GIB: u64 = 1024 * MIB;

/// A byte count with human-readable parsing and formatting.
///
/// # Parsing
/// Supports binary suffixes, case-insensitive:
/// - `"64M"` or `"64MB"` → 64 × 1024² bytes
/// - `"1G"` or `"1GB"` → 1 × 1024³ bytes
/// - `"512K"` or `"512KB"` → 512 × 1024 bytes
/// - `"65536"` or `"65536B"` → raw byte count
///
/// # Examples
/// ```
/// use heap_pool::ByteSize;
///
/// let s = ByteSize::from_mib(64);
/// assert_eq!(s.as_bytes(), 64 * 1024 * 1024);
///
/// let s = ByteSize::parse("1G").unwrap();
/// assert_eq!(s.as_mib(), 1024);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(try_from = "ByteSizeRepr", into = "String")]
pub struct ByteSize {
    bytes: u64,
}

impl ByteSize {
    /// Creates a size from a byte count.
    pub const fn from_bytes(bytes: u64) -> Self {
        Self { bytes }
    }

    /// Creates a size from kibibytes.
    pub const fn from_kib(kib: u64) -> Self {
        Self { bytes: kib * KIB }
    }

    /// Creates a size from mebibytes.
    pub const fn from_mib(mib: u64) -> Self {
        Self { bytes: mib * MIB }
    }

    /// Creates a size from gibibytes.
    pub const fn from_gib(gib: u64) -> Self {
        Self { bytes: gib * GIB }
    }

    /// Returns the size in bytes.
    pub const fn as_bytes(&self) -> u64 {
        self.bytes
    }

    /// Returns the size in mebibytes (truncated).
    pub const fn as_mib(&self) -> u64 {
        self.bytes / MIB
    }

    /// Parses a human-readable size string.
    pub fn parse(s: &str) -> Result<Self, PoolError> {
        let invalid = |detail: &str| PoolError::InvalidByteSize {
            input: s.to_string(),
            detail: detail.to_string(),
        };

        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(invalid("empty string"));
        }

        let upper = trimmed.to_ascii_uppercase();
        let (num_str, multiplier) = if let Some(n) = upper.strip_suffix("GB") {
            (n, GIB)
        } else if let Some(n) = upper.strip_suffix('G') {
            (n, GIB)
        } else if let Some(n) = upper.strip_suffix("MB") {
            (n, MIB)
        } else if let Some(n) = upper.strip_suffix('M') {
            (n, MIB)
        } else if let Some(n) = upper.strip_suffix("KB") {
            (n, KIB)
        } else if let Some(n) = upper.strip_suffix('K') {
            (n, KIB)
        } else if let Some(n) = upper.strip_suffix('B') {
            (n, 1)
        } else {
            (upper.as_str(), 1)
        };

        let value: u64 = num_str
            .trim()
            .parse()
            .map_err(|_| invalid("expected a number followed by an optional suffix (K, M, G)"))?;

        let bytes = value
            .checked_mul(multiplier)
            .ok_or_else(|| invalid("value overflows 64 bits"))?;

        Ok(Self { bytes })
    }
}

impl fmt::Display for ByteSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.bytes;
        if b >= GIB && b % GIB == 0 {
            write!(f, "{}G", b / GIB)
        } else if b >= MIB && b % MIB == 0 {
            write!(f, "{}M", b / MIB)
        } else if b >= KIB && b % KIB == 0 {
            write!(f, "{}K", b / KIB)
        } else {
            write!(f, "{b}")
        }
    }
}

impl From<ByteSize> for String {
    fn from(size: ByteSize) -> Self {
        size.to_string()
    }
}

impl From<u64> for ByteSize {
    fn from(bytes: u64) -> Self {
        Self::from_bytes(bytes)
    }
}

/// Accepts either `size = 1048576` or `size = "1M"` in config files.
#[derive(serde::Deserialize)]
#[serde(untagged)]
enum ByteSizeRepr {
    Bytes(u64),
    Text(String),
}

impl TryFrom<ByteSizeRepr> for ByteSize {
    type Error = PoolError;

    fn try_from(repr: ByteSizeRepr) -> Result<Self, Self::Error> {
        match repr {
            ByteSizeRepr::Bytes(bytes) => Ok(Self::from_bytes(bytes)),
            ByteSizeRepr::Text(text) => Self::parse(&text),
        }
    }
}
