// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool configuration loaded from TOML files or constructed programmatically.
//!
//! # TOML Format
//! ```toml
//! kind = "default"
//! category = "buffers"
//! minimum_allocator_count = 1
//! maximum_allocator_count = 64
//! maximum_shared_allocator_byte_length = "64M"
//! minimum_allocator_byte_length = "4M"
//! minimum_region_margin = "0"
//! minimum_byte_length = "0"
//! strategy = "free-list"
//! ```
//! Every field is optional; missing fields take the [`Default`] values.

use crate::suballocator::{free_list_factory, linear_factory, SuballocatorFactory};
use crate::{ByteSize, HeapCategory, HeapKind, PoolError};
use std::path::Path;

/// Configuration for one heap pool.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Heap kind of every segment in the pool.
    pub kind: HeapKind,
    /// Heap category of every segment in the pool.
    pub category: HeapCategory,
    /// Allocators the pool never drops below.
    pub minimum_allocator_count: usize,
    /// Allocators the pool never grows beyond.
    pub maximum_allocator_count: usize,
    /// Size of a shared allocator once the pool has warmed up.
    pub maximum_shared_allocator_byte_length: ByteSize,
    /// Smallest size the growth ramp may pick for a shared allocator.
    pub minimum_allocator_byte_length: ByteSize,
    /// Bytes kept clear on both sides of every region.
    pub minimum_region_margin: ByteSize,
    /// Capacity floor applied right after construction.
    pub minimum_byte_length: ByteSize,
    /// Placement strategy: `"free-list"` or `"linear"`.
    pub strategy: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            kind: HeapKind::Default,
            category: HeapCategory::Mixed,
            minimum_allocator_count: 1,
            maximum_allocator_count: 64,
            maximum_shared_allocator_byte_length: ByteSize::from_mib(64),
            minimum_allocator_byte_length: ByteSize::from_mib(4),
            minimum_region_margin: ByteSize::from_bytes(0),
            minimum_byte_length: ByteSize::from_bytes(0),
            strategy: "free-list".to_string(),
        }
    }
}

impl PoolConfig {
    /// Loads configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, PoolError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            PoolError::Config(format!("cannot read config '{}': {e}", path.display()))
        })?;
        Self::from_toml(&content)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, PoolError> {
        toml::from_str(toml_str).map_err(|e| PoolError::Config(format!("TOML parse error: {e}")))
    }

    /// Serialises configuration to TOML.
    pub fn to_toml(&self) -> Result<String, PoolError> {
        toml::to_string_pretty(self)
            .map_err(|e| PoolError::Config(format!("TOML serialise error: {e}")))
    }

    /// Checks the limits for consistency.
    pub fn validate(&self) -> Result<(), PoolError> {
        if self.maximum_allocator_count == 0 {
            return Err(PoolError::Config(
                "maximum_allocator_count must be at least 1".to_string(),
            ));
        }
        if self.minimum_allocator_count > self.maximum_allocator_count {
            return Err(PoolError::Config(format!(
                "minimum_allocator_count ({}) exceeds maximum_allocator_count ({})",
                self.minimum_allocator_count, self.maximum_allocator_count
            )));
        }
        if self.maximum_shared_allocator_byte_length.as_bytes() == 0 {
            return Err(PoolError::Config(
                "maximum_shared_allocator_byte_length must be non-zero".to_string(),
            ));
        }
        if self.minimum_allocator_byte_length > self.maximum_shared_allocator_byte_length {
            return Err(PoolError::Config(format!(
                "minimum_allocator_byte_length ({}) exceeds maximum_shared_allocator_byte_length ({})",
                self.minimum_allocator_byte_length, self.maximum_shared_allocator_byte_length
            )));
        }
        Ok(())
    }

    /// Creates the suballocator factory named by `strategy`.
    pub fn create_strategy(&self) -> Result<SuballocatorFactory, PoolError> {
        match self.strategy.to_lowercase().as_str() {
            "free-list" | "freelist" => Ok(free_list_factory()),
            "linear" => Ok(linear_factory()),
            other => Err(PoolError::Config(format!(
                "unknown strategy '{other}'; expected 'free-list' or 'linear'"
            ))),
        }
    }
}
