// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Thread-safe heap pool.
//!
//! [`HeapPool`] serialises every mutating operation through one
//! `parking_lot::Mutex` around a [`PoolCore`]. Reading the budget does not
//! take the lock, so a monitoring thread never stalls allocation.
//!
//! # Thread Safety
//! `HeapPool` is `Send + Sync` and is normally shared as `Arc<HeapPool>`.
//! The lock is not re-entrant: segment factories and budget oracles must
//! not call back into the pool that invoked them.

use crate::budget::{Budget, BudgetOracle};
use crate::region::{AllocationRequest, Region};
use crate::segment::SegmentFactory;
use crate::stats::{AllocationStats, PoolStats};
use crate::suballocator::SuballocatorFactory;
use crate::{PoolConfig, PoolCore, PoolError, RegionGuard};
use parking_lot::Mutex;
use std::sync::Arc;

/// A heap pool shared between threads.
///
/// # Example
/// ```
/// use heap_pool::{AllocationRequest, FixedBudget, HeapPool, HostSegmentFactory, PoolConfig};
/// use std::sync::Arc;
///
/// let pool = HeapPool::new(
///     &PoolConfig::default(),
///     Arc::new(HostSegmentFactory::new()),
///     Arc::new(FixedBudget::unlimited()),
/// )
/// .unwrap();
///
/// let region = pool
///     .try_allocate(AllocationRequest::new(1024 * 1024, 256))
///     .unwrap()
///     .expect("pool has room");
/// assert_eq!(region.offset() % 256, 0);
///
/// pool.free(region).unwrap();
/// assert_eq!(pool.total_free_region_byte_length(), pool.total_byte_length());
/// ```
pub struct HeapPool {
    core: Mutex<PoolCore>,
    budget: Arc<dyn BudgetOracle>,
}

impl HeapPool {
    /// Creates a pool using the strategy named in `config`.
    pub fn new(
        config: &PoolConfig,
        segments: Arc<dyn SegmentFactory>,
        budget: Arc<dyn BudgetOracle>,
    ) -> Result<Self, PoolError> {
        PoolCore::new(config, segments, budget).map(Self::from_core)
    }

    /// Creates a pool with a caller-supplied placement strategy.
    pub fn with_strategy(
        config: &PoolConfig,
        segments: Arc<dyn SegmentFactory>,
        budget: Arc<dyn BudgetOracle>,
        strategy: SuballocatorFactory,
    ) -> Result<Self, PoolError> {
        PoolCore::with_strategy(config, segments, budget, strategy).map(Self::from_core)
    }

    /// Wraps an existing core.
    pub fn from_core(core: PoolCore) -> Self {
        let budget = core.budget_oracle();
        Self {
            core: Mutex::new(core),
            budget,
        }
    }

    /// See [`PoolCore::try_allocate`].
    pub fn try_allocate(&self, request: AllocationRequest) -> Result<Option<Region>, PoolError> {
        self.core.lock().try_allocate(request)
    }

    /// See [`PoolCore::try_allocate_many`]. The whole batch runs under one
    /// lock acquisition.
    pub fn try_allocate_many(
        &self,
        request: AllocationRequest,
        count: usize,
    ) -> Result<Option<Vec<Region>>, PoolError> {
        self.core.lock().try_allocate_many(request, count)
    }

    /// Allocates a region that is freed when the returned guard drops.
    pub fn allocate_guarded(
        self: &Arc<Self>,
        request: AllocationRequest,
    ) -> Result<Option<RegionGuard>, PoolError> {
        let region = self.try_allocate(request)?;
        Ok(region.map(|region| RegionGuard::new(region, Arc::clone(self))))
    }

    /// See [`PoolCore::free`].
    pub fn free(&self, region: Region) -> Result<(), PoolError> {
        self.core.lock().free(region)
    }

    /// See [`PoolCore::try_set_minimum_byte_length`].
    pub fn try_set_minimum_byte_length(&self, byte_length: u64) -> bool {
        self.core.lock().try_set_minimum_byte_length(byte_length)
    }

    /// Current budget reading. Never takes the pool lock.
    pub fn budget(&self) -> Budget {
        self.budget.query_budget()
    }

    /// Sum of allocator sizes.
    pub fn total_byte_length(&self) -> u64 {
        self.core.lock().total_byte_length()
    }

    /// Capacity floor.
    pub fn minimum_byte_length(&self) -> u64 {
        self.core.lock().minimum_byte_length()
    }

    /// Sum of allocator free bytes.
    pub fn total_free_region_byte_length(&self) -> u64 {
        self.core.lock().total_free_region_byte_length()
    }

    /// Successful mutating operations so far.
    pub fn operation_count(&self) -> u64 {
        self.core.lock().operation_count()
    }

    /// Number of allocators in the pool.
    pub fn allocator_count(&self) -> usize {
        self.core.lock().allocator_count()
    }

    /// Snapshot of the pool's counters and allocators, taken under one lock.
    pub fn stats(&self) -> PoolStats {
        self.core.lock().stats()
    }

    /// Copy of the cumulative allocation statistics.
    pub fn allocation_stats(&self) -> AllocationStats {
        self.core.lock().allocation_stats().clone()
    }

    /// Unlocked access for a caller holding the pool exclusively.
    pub fn get_mut(&mut self) -> &mut PoolCore {
        self.core.get_mut()
    }

    /// Unwraps the pool into its unsynchronised core.
    pub fn into_core(self) -> PoolCore {
        self.core.into_inner()
    }
}

impl std::fmt::Debug for HeapPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.core.try_lock() {
            Some(core) => f.debug_tuple("HeapPool").field(&*core).finish(),
            None => f.debug_tuple("HeapPool").field(&"<locked>").finish(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedBudget, HostSegmentFactory, ManualBudget};

    const MIB: u64 = 1024 * 1024;

    fn pool() -> HeapPool {
        HeapPool::new(
            &PoolConfig::default(),
            Arc::new(HostSegmentFactory::new()),
            Arc::new(FixedBudget::unlimited()),
        )
        .unwrap()
    }

    #[test]
    fn test_allocate_and_free() {
        let pool = pool();
        let region = pool.try_allocate(AllocationRequest::new(MIB, 256)).unwrap().unwrap();
        assert_eq!(pool.total_free_region_byte_length(), 63 * MIB);
        pool.free(region).unwrap();
        assert_eq!(pool.total_free_region_byte_length(), 64 * MIB);
        assert_eq!(pool.operation_count(), 2);
    }

    #[test]
    fn test_budget_does_not_need_lock() {
        let budget = Arc::new(ManualBudget::new(10, 100));
        let pool = HeapPool::new(
            &PoolConfig::default(),
            Arc::new(HostSegmentFactory::new()),
            budget.clone(),
        )
        .unwrap();

        let _held = pool.core.lock();
        assert_eq!(pool.budget(), Budget::new(10, 100));
        budget.set_usage(50);
        assert_eq!(pool.budget().available_bytes(), 50);
    }

    #[test]
    fn test_into_core_keeps_state() {
        let mut pool = pool();
        let region = pool.try_allocate(AllocationRequest::new(MIB, 256)).unwrap().unwrap();
        pool.get_mut().free(region).unwrap();

        let core = pool.into_core();
        assert_eq!(core.operation_count(), 2);
        assert_eq!(core.allocator_count(), 1);
    }

    #[test]
    fn test_stats_snapshot() {
        let pool = pool();
        let _a = pool.try_allocate(AllocationRequest::new(MIB, 256)).unwrap().unwrap();
        let stats = pool.stats();
        assert_eq!(stats.allocator_count(), 1);
        assert_eq!(stats.used_byte_length(), MIB);
        assert_eq!(pool.allocation_stats().search_hits, 1);
    }

    #[test]
    fn test_debug_format() {
        let pool = pool();
        let debug = format!("{pool:?}");
        assert!(debug.contains("HeapPool"));
        assert!(debug.contains("total_byte_length"));
    }

    #[test]
    fn test_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<HeapPool>();
    }
}
