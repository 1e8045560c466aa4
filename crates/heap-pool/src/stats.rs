// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Pool statistics for profiling and diagnostics.
//!
//! [`AllocationStats`] accumulates over the pool's lifetime: how often
//! requests were served by an existing allocator versus by growing, how
//! often they failed, and how much churn the retention policy caused.
//! [`PoolStats`] is a settled snapshot of the pool's counters.

/// Cumulative statistics about pool usage.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize)]
pub struct AllocationStats {
    /// Regions placed into an allocator that already existed.
    pub search_hits: u64,
    /// Regions that required creating a new allocator.
    pub growth_allocations: u64,
    /// Allocation requests that returned no region.
    pub failed_allocations: u64,
    /// Regions freed.
    pub frees: u64,
    /// Allocators created, including the ones made at construction.
    pub allocators_created: u64,
    /// Allocators evicted.
    pub allocators_evicted: u64,
    /// Segment factory failures on the growth path.
    pub segment_failures: u64,
    /// Largest `TotalByteLength` observed.
    pub peak_total_byte_length: u64,
}

impl AllocationStats {
    /// Returns the fraction of successful allocations served without growth,
    /// in `[0.0, 1.0]`. Returns `0.0` before the first allocation.
    pub fn search_hit_ratio(&self) -> f64 {
        let total = self.search_hits + self.growth_allocations;
        if total == 0 {
            return 0.0;
        }
        self.search_hits as f64 / total as f64
    }

    pub(crate) fn record_search_hit(&mut self) {
        self.search_hits += 1;
    }

    pub(crate) fn record_growth(&mut self) {
        self.growth_allocations += 1;
    }

    pub(crate) fn record_failure(&mut self) {
        self.failed_allocations += 1;
    }

    pub(crate) fn record_free(&mut self) {
        self.frees += 1;
    }

    pub(crate) fn record_allocator_created(&mut self, total_byte_length: u64) {
        self.allocators_created += 1;
        if total_byte_length > self.peak_total_byte_length {
            self.peak_total_byte_length = total_byte_length;
        }
    }

    pub(crate) fn record_allocator_evicted(&mut self) {
        self.allocators_evicted += 1;
    }

    pub(crate) fn record_segment_failure(&mut self) {
        self.segment_failures += 1;
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let peak_mb = self.peak_total_byte_length as f64 / (1024.0 * 1024.0);
        format!(
            "Allocations: {} placed ({} search, {} growth, {:.0}% hit rate), \
             {} failed, {} freed; allocators {} created / {} evicted, \
             {} segment failures, peak {:.2} MB",
            self.search_hits + self.growth_allocations,
            self.search_hits,
            self.growth_allocations,
            self.search_hit_ratio() * 100.0,
            self.failed_allocations,
            self.frees,
            self.allocators_created,
            self.allocators_evicted,
            self.segment_failures,
            peak_mb,
        )
    }
}

/// Size and occupancy of one allocator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct AllocatorStats {
    /// Segment size in bytes.
    pub byte_length: u64,
    /// Bytes not covered by any live region.
    pub total_free_region_byte_length: u64,
    /// Created for a dedicated allocation.
    pub is_dedicated: bool,
    /// Currently referenced as the cached-empty allocator.
    pub is_cached_empty: bool,
}

/// Point-in-time view of a pool's counters, in collection order.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct PoolStats {
    /// Sum of allocator sizes.
    pub total_byte_length: u64,
    /// Capacity floor.
    pub minimum_byte_length: u64,
    /// Sum of allocator free bytes.
    pub total_free_region_byte_length: u64,
    /// Successful mutating operations so far.
    pub operation_count: u64,
    /// Per-allocator breakdown.
    pub allocators: Vec<AllocatorStats>,
}

impl PoolStats {
    /// Number of allocators in the pool.
    pub fn allocator_count(&self) -> usize {
        self.allocators.len()
    }

    /// Bytes covered by live regions.
    pub fn used_byte_length(&self) -> u64 {
        self.total_byte_length - self.total_free_region_byte_length
    }

    /// Number of allocators with no live region.
    pub fn empty_allocator_count(&self) -> usize {
        self.allocators
            .iter()
            .filter(|a| a.total_free_region_byte_length == a.byte_length)
            .count()
    }

    /// Returns a human-readable summary.
    pub fn summary(&self) -> String {
        let mb = |b: u64| b as f64 / (1024.0 * 1024.0);
        format!(
            "Pool: {} allocators ({} empty), {:.2} MB reserved, {:.2} MB used, \
             floor {:.2} MB, {} operations",
            self.allocator_count(),
            self.empty_allocator_count(),
            mb(self.total_byte_length),
            mb(self.used_byte_length()),
            mb(self.minimum_byte_length),
            self.operation_count,
        )
    }
}
