// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Memory budget readings and the oracles that produce them.
//!
//! The pool asks a [`BudgetOracle`] for the current `{usage, limit}` pair
//! before growing. Readings are advisory: they may be approximate or stale,
//! and the pool never holds its lock across anything but the query itself.

use budget_monitor::{MemoryInfo, VramInfo};
use std::sync::atomic::{AtomicU64, Ordering};

/// A `{usage, limit}` memory budget reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct Budget {
    /// Estimated bytes currently in use.
    pub usage_bytes: u64,
    /// Estimated bytes the process may use.
    pub limit_bytes: u64,
}

impl Budget {
    /// Creates a reading from usage and limit.
    pub const fn new(usage_bytes: u64, limit_bytes: u64) -> Self {
        Self {
            usage_bytes,
            limit_bytes,
        }
    }

    /// A reading that never gates growth.
    pub const fn unlimited() -> Self {
        Self::new(0, u64::MAX)
    }

    /// Returns `max(0, limit - usage)`.
    pub fn available_bytes(&self) -> u64 {
        self.limit_bytes.saturating_sub(self.usage_bytes)
    }

    /// Returns `true` once usage has reached the limit.
    pub fn is_exceeded(&self) -> bool {
        self.usage_bytes >= self.limit_bytes
    }
}

/// Source of budget readings for a pool.
pub trait BudgetOracle: Send + Sync {
    /// Returns the current budget estimate.
    fn query_budget(&self) -> Budget;
}

impl<F> BudgetOracle for F
where
    F: Fn() -> Budget + Send + Sync,
{
    fn query_budget(&self) -> Budget {
        self()
    }
}

/// An oracle that always returns the same reading.
#[derive(Debug, Clone, Copy)]
pub struct FixedBudget(pub Budget);

impl FixedBudget {
    /// An oracle that never gates growth.
    pub const fn unlimited() -> Self {
        Self(Budget::unlimited())
    }
}

impl BudgetOracle for FixedBudget {
    fn query_budget(&self) -> Budget {
        self.0
    }
}

/// An oracle whose reading is set from outside, e.g. by a layer that
/// already receives budget notifications from the driver.
#[derive(Debug)]
pub struct ManualBudget {
    usage_bytes: AtomicU64,
    limit_bytes: AtomicU64,
}

impl ManualBudget {
    /// Creates an oracle with the given starting reading.
    pub fn new(usage_bytes: u64, limit_bytes: u64) -> Self {
        Self {
            usage_bytes: AtomicU64::new(usage_bytes),
            limit_bytes: AtomicU64::new(limit_bytes),
        }
    }

    /// Replaces the usage estimate.
    pub fn set_usage(&self, usage_bytes: u64) {
        self.usage_bytes.store(usage_bytes, Ordering::Release);
    }

    /// Replaces the limit estimate.
    pub fn set_limit(&self, limit_bytes: u64) {
        self.limit_bytes.store(limit_bytes, Ordering::Release);
    }
}

impl BudgetOracle for ManualBudget {
    fn query_budget(&self) -> Budget {
        Budget::new(
            self.usage_bytes.load(Ordering::Acquire),
            self.limit_bytes.load(Ordering::Acquire),
        )
    }
}

/// Host memory budget from `/proc/meminfo`, for upload and readback heaps.
///
/// If the file cannot be read the reading is [`Budget::unlimited`], so a
/// missing procfs never blocks allocation.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemMemoryBudget;

impl BudgetOracle for SystemMemoryBudget {
    fn query_budget(&self) -> Budget {
        match MemoryInfo::read() {
            Ok(info) => Budget::new(info.used_bytes, info.total_bytes),
            Err(e) => {
                tracing::warn!("host budget unavailable, not gating growth: {e}");
                Budget::unlimited()
            }
        }
    }
}

/// Device memory budget from the amdgpu `mem_info_vram_*` attributes, for
/// default (device-local) heaps.
#[derive(Debug, Default, Clone, Copy)]
pub struct VramBudget {
    card: Option<u32>,
}

impl VramBudget {
    /// Reads from the first card exposing VRAM counters.
    pub fn new() -> Self {
        Self { card: None }
    }

    /// Reads from `/sys/class/drm/card{index}`.
    pub fn for_card(index: u32) -> Self {
        Self { card: Some(index) }
    }
}

impl BudgetOracle for VramBudget {
    fn query_budget(&self) -> Budget {
        let reading = match self.card {
            Some(index) => VramInfo::read_card(index),
            None => VramInfo::read(),
        };
        match reading {
            Ok(info) => Budget::new(info.used_bytes, info.total_bytes),
            Err(e) => {
                tracing::warn!("vram budget unavailable, not gating growth: {e}");
                Budget::unlimited()
            }
        }
    }
}
