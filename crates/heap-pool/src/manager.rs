// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The unsynchronised pool manager.
//!
//! [`PoolCore`] owns an ordered collection of allocators, each wrapping one
//! segment, and decides when to create and when to retire them:
//!
//! 1. **Construction** creates `minimum_allocator_count` shared allocators so
//!    the first allocation never waits on a segment.
//! 2. **Allocation** searches the existing allocators first and grows the
//!    pool only when none can hold the region, the allocator cap has room,
//!    and the budget allows it.
//! 3. **Free** keeps at most one empty allocator around for reuse. A second
//!    empty allocator is evicted (the larger of the two) unless doing so
//!    would break the count or byte-length floor.
//!
//! Every method takes `&mut self`. [`HeapPool`](crate::HeapPool) wraps the
//! core in a mutex; a caller that already serialises access can own a
//! `PoolCore` directly and skip the lock.
//!
//! # Ordering
//! The collection is nudged towards ascending free space after every free,
//! so searches try the fullest allocators first and leave emptier ones to
//! drain.

use crate::budget::{Budget, BudgetOracle};
use crate::region::{AllocationFlags, AllocationRequest, AllocatorId, PoolId, Region};
use crate::segment::{HeapCategory, HeapKind, SegmentDesc, SegmentFactory, SegmentHandle};
use crate::stats::{AllocationStats, AllocatorStats, PoolStats};
use crate::suballocator::{
    placement_byte_length, SubRegion, Suballocator, SuballocatorDesc, SuballocatorFactory,
};
use crate::{PoolConfig, PoolError, SegmentError};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// How many times the growth ramp may halve the shared allocator size.
const MAX_RAMP_HALVINGS: usize = 3;

static NEXT_POOL_ID: AtomicU64 = AtomicU64::new(0);

/// One allocator: a segment plus the strategy placing regions inside it.
struct AllocatorEntry {
    id: AllocatorId,
    segment: SegmentHandle,
    suballocator: Box<dyn Suballocator>,
    is_dedicated: bool,
}

impl AllocatorEntry {
    fn byte_length(&self) -> u64 {
        self.suballocator.byte_length()
    }

    fn free_bytes(&self) -> u64 {
        self.suballocator.total_free_region_byte_length()
    }

    fn is_empty(&self) -> bool {
        self.suballocator.is_empty()
    }
}

/// Limits resolved from [`PoolConfig`] into plain byte counts.
#[derive(Debug, Clone, Copy)]
struct Limits {
    kind: HeapKind,
    category: HeapCategory,
    minimum_allocator_count: usize,
    maximum_allocator_count: usize,
    maximum_shared_allocator_byte_length: u64,
    minimum_allocator_byte_length: u64,
    minimum_region_margin: u64,
}

impl From<&PoolConfig> for Limits {
    fn from(config: &PoolConfig) -> Self {
        Self {
            kind: config.kind,
            category: config.category,
            minimum_allocator_count: config.minimum_allocator_count,
            maximum_allocator_count: config.maximum_allocator_count,
            maximum_shared_allocator_byte_length: config
                .maximum_shared_allocator_byte_length
                .as_bytes(),
            minimum_allocator_byte_length: config.minimum_allocator_byte_length.as_bytes(),
            minimum_region_margin: config.minimum_region_margin.as_bytes(),
        }
    }
}

/// A heap pool without internal locking.
pub struct PoolCore {
    id: PoolId,
    limits: Limits,
    segments: Arc<dyn SegmentFactory>,
    budget: Arc<dyn BudgetOracle>,
    strategy: SuballocatorFactory,
    allocators: Vec<AllocatorEntry>,
    /// At most one empty allocator retained for reuse.
    cached_empty: Option<AllocatorId>,
    next_allocator_id: u64,
    total_byte_length: u64,
    minimum_byte_length: u64,
    total_free_region_byte_length: u64,
    operation_count: u64,
    stats: AllocationStats,
}

impl PoolCore {
    /// Creates a pool using the strategy named in `config`.
    pub fn new(
        config: &PoolConfig,
        segments: Arc<dyn SegmentFactory>,
        budget: Arc<dyn BudgetOracle>,
    ) -> Result<Self, PoolError> {
        let strategy = config.create_strategy()?;
        Self::with_strategy(config, segments, budget, strategy)
    }

    /// Creates a pool with a caller-supplied placement strategy.
    ///
    /// The minimum allocators are created immediately; if `config` carries
    /// a non-zero `minimum_byte_length` the pool grows to it as well.
    pub fn with_strategy(
        config: &PoolConfig,
        segments: Arc<dyn SegmentFactory>,
        budget: Arc<dyn BudgetOracle>,
        strategy: SuballocatorFactory,
    ) -> Result<Self, PoolError> {
        config.validate()?;

        let mut core = Self {
            id: PoolId(NEXT_POOL_ID.fetch_add(1, Ordering::Relaxed)),
            limits: Limits::from(config),
            segments,
            budget,
            strategy,
            allocators: Vec::with_capacity(config.maximum_allocator_count.min(64)),
            cached_empty: None,
            next_allocator_id: 0,
            total_byte_length: 0,
            minimum_byte_length: 0,
            total_free_region_byte_length: 0,
            operation_count: 0,
            stats: AllocationStats::default(),
        };

        for _ in 0..core.limits.minimum_allocator_count {
            let byte_length = core
                .adjusted_allocator_byte_length(core.limits.maximum_shared_allocator_byte_length);
            core.create_allocator(byte_length, false)?;
        }

        let floor = config.minimum_byte_length.as_bytes();
        if floor > 0 && !core.set_minimum_byte_length(floor) {
            return Err(PoolError::Config(format!(
                "minimum_byte_length {} cannot be reached with at most {} allocators",
                config.minimum_byte_length, core.limits.maximum_allocator_count
            )));
        }

        tracing::info!(
            "heap pool created: {:?}/{:?}, {} allocators, {} bytes reserved",
            core.limits.kind,
            core.limits.category,
            core.allocators.len(),
            core.total_byte_length
        );
        Ok(core)
    }

    /// Allocates one region.
    ///
    /// Returns `Ok(None)` when no allocator can hold the region and the pool
    /// may not grow. Returns `Err` only for invalid requests.
    pub fn try_allocate(&mut self, request: AllocationRequest) -> Result<Option<Region>, PoolError> {
        request.validate()?;

        let budget = self.budget.query_budget();
        let region = self.allocate_one(request, budget);
        match region {
            Some(_) => self.operation_count += 1,
            None => self.stats.record_failure(),
        }
        Ok(region)
    }

    /// Allocates `count` regions, all or nothing.
    ///
    /// If any region cannot be placed, every region produced so far is
    /// released in reverse order, allocators created for the batch are
    /// evicted, and `Ok(None)` is returned with the pool's counters as they
    /// were before the call.
    pub fn try_allocate_many(
        &mut self,
        request: AllocationRequest,
        count: usize,
    ) -> Result<Option<Vec<Region>>, PoolError> {
        request.validate()?;

        let first_batch_allocator = self.next_allocator_id;
        let cached_before = self.cached_empty;
        // `count` is caller-supplied; the batch fails long before a huge one fills.
        let mut regions =
            Vec::with_capacity(count.min(self.limits.maximum_allocator_count.max(16)));

        for _ in 0..count {
            let budget = self.budget.query_budget();
            match self.allocate_one(request, budget) {
                Some(region) => regions.push(region),
                None => {
                    tracing::debug!(
                        "batch failed after {} of {count} regions, rolling back",
                        regions.len()
                    );
                    self.roll_back_batch(regions, first_batch_allocator, cached_before);
                    self.stats.record_failure();
                    return Ok(None);
                }
            }
        }

        self.operation_count += regions.len() as u64;
        Ok(Some(regions))
    }

    /// Returns a region to its allocator and re-evaluates retention.
    ///
    /// Returns [`PoolError::UnknownRegion`] if the region does not belong to
    /// a live allocator of this pool.
    pub fn free(&mut self, region: Region) -> Result<(), PoolError> {
        let index = self
            .position(region.allocator)
            .filter(|_| region.pool == self.id)
            .ok_or(PoolError::UnknownRegion {
                allocator: region.allocator,
            })?;

        self.release(index, region.sub);
        self.operation_count += 1;
        self.stats.record_free();

        if self.allocators[index].is_empty() {
            self.retain_or_evict(index);
        }
        self.nudge_order();
        Ok(())
    }

    /// Moves the capacity floor.
    ///
    /// Lowering the floor evicts empty allocators that are no longer needed
    /// to meet it. Raising the floor creates allocators until it is met;
    /// if `maximum_allocator_count` is reached first, `false` is returned
    /// and the allocators created so far are kept.
    pub fn try_set_minimum_byte_length(&mut self, byte_length: u64) -> bool {
        if byte_length == self.minimum_byte_length {
            return true;
        }
        let reached = self.set_minimum_byte_length(byte_length);
        if reached {
            self.operation_count += 1;
        }
        reached
    }

    /// Size for a new allocator that must hold `requested` bytes.
    ///
    /// Requests at or above the shared size get an allocator of exactly
    /// that size. Smaller requests get the shared size halved up to three
    /// times, as long as the result still exceeds every existing allocator,
    /// is at least twice the request, and is not below the configured
    /// minimum. Early allocators therefore come out at 1/8, 1/4 and 1/2 of
    /// the shared size before the pool settles on full-size allocators.
    pub fn adjusted_allocator_byte_length(&self, requested: u64) -> u64 {
        let max_shared = self.limits.maximum_shared_allocator_byte_length;
        if requested >= max_shared {
            return requested;
        }

        let largest_existing = self
            .allocators
            .iter()
            .map(AllocatorEntry::byte_length)
            .max()
            .unwrap_or(0);

        let mut byte_length = max_shared;
        for _ in 0..MAX_RAMP_HALVINGS {
            let smaller = byte_length / 2;
            if smaller > largest_existing
                && smaller >= requested.saturating_mul(2)
                && smaller >= self.limits.minimum_allocator_byte_length
            {
                byte_length = smaller;
            } else {
                break;
            }
        }
        byte_length
    }

    /// Current budget reading. Does not touch pool state.
    pub fn budget(&self) -> Budget {
        self.budget.query_budget()
    }

    pub(crate) fn budget_oracle(&self) -> Arc<dyn BudgetOracle> {
        Arc::clone(&self.budget)
    }

    /// Identity of this pool.
    pub fn id(&self) -> PoolId {
        self.id
    }

    /// Heap kind of every segment in the pool.
    pub fn kind(&self) -> HeapKind {
        self.limits.kind
    }

    /// Heap category of every segment in the pool.
    pub fn category(&self) -> HeapCategory {
        self.limits.category
    }

    /// Sum of allocator sizes.
    pub fn total_byte_length(&self) -> u64 {
        self.total_byte_length
    }

    /// Capacity floor.
    pub fn minimum_byte_length(&self) -> u64 {
        self.minimum_byte_length
    }

    /// Sum of allocator free bytes.
    pub fn total_free_region_byte_length(&self) -> u64 {
        self.total_free_region_byte_length
    }

    /// Successful mutating operations so far.
    pub fn operation_count(&self) -> u64 {
        self.operation_count
    }

    /// Number of allocators in the pool.
    pub fn allocator_count(&self) -> usize {
        self.allocators.len()
    }

    /// Returns `true` if an empty allocator is being retained for reuse.
    pub fn has_cached_empty(&self) -> bool {
        self.cached_empty.is_some()
    }

    /// Cumulative allocation statistics.
    pub fn allocation_stats(&self) -> &AllocationStats {
        &self.stats
    }

    /// Snapshot of the pool's counters and allocators.
    pub fn stats(&self) -> PoolStats {
        PoolStats {
            total_byte_length: self.total_byte_length,
            minimum_byte_length: self.minimum_byte_length,
            total_free_region_byte_length: self.total_free_region_byte_length,
            operation_count: self.operation_count,
            allocators: self
                .allocators
                .iter()
                .map(|entry| AllocatorStats {
                    byte_length: entry.byte_length(),
                    total_free_region_byte_length: entry.free_bytes(),
                    is_dedicated: entry.is_dedicated,
                    is_cached_empty: self.cached_empty == Some(entry.id),
                })
                .collect(),
        }
    }

    fn allocate_one(&mut self, request: AllocationRequest, budget: Budget) -> Option<Region> {
        let flags = request.flags;
        let dedicated = flags.contains(AllocationFlags::DEDICATED_ALLOCATOR);

        if !dedicated && request.byte_length <= self.limits.maximum_shared_allocator_byte_length {
            for index in 0..self.allocators.len() {
                if let Some(region) = self.place(index, request) {
                    if self.cached_empty == Some(region.allocator) {
                        self.cached_empty = None;
                    }
                    self.stats.record_search_hit();
                    return Some(region);
                }
            }
        }

        if flags.contains(AllocationFlags::EXISTING_ALLOCATOR_ONLY) {
            return None;
        }
        if self.allocators.len() >= self.limits.maximum_allocator_count {
            tracing::debug!(
                "allocator cap of {} reached, cannot grow",
                self.limits.maximum_allocator_count
            );
            return None;
        }

        let can_exceed_budget = flags.contains(AllocationFlags::CAN_EXCEED_BUDGET);
        if budget.is_exceeded() && !can_exceed_budget {
            tracing::warn!(
                "budget exceeded ({} of {} bytes), refusing to grow",
                budget.usage_bytes,
                budget.limit_bytes
            );
            return None;
        }

        let size_with_margins = placement_byte_length(
            request.byte_length,
            request.byte_alignment,
            self.limits.minimum_region_margin,
        );
        let byte_length = self.adjusted_allocator_byte_length(size_with_margins);
        if !can_exceed_budget && byte_length >= budget.available_bytes() {
            tracing::warn!(
                "new allocator of {byte_length} bytes does not fit in {} available bytes",
                budget.available_bytes()
            );
            return None;
        }

        let index = self.create_allocator(byte_length, dedicated).ok()?;
        let region = self.place(index, request);
        debug_assert!(
            region.is_some(),
            "allocator of {byte_length} bytes could not hold the region it was sized for"
        );
        if region.is_some() {
            self.stats.record_growth();
        }
        region
    }

    fn place(&mut self, index: usize, request: AllocationRequest) -> Option<Region> {
        let entry = &mut self.allocators[index];
        let before = entry.suballocator.total_free_region_byte_length();
        let sub = entry
            .suballocator
            .try_allocate(request.byte_length, request.byte_alignment)?;
        let consumed = before - entry.suballocator.total_free_region_byte_length();
        self.total_free_region_byte_length -= consumed;

        Some(Region {
            pool: self.id,
            allocator: entry.id,
            segment: entry.segment,
            sub,
        })
    }

    fn release(&mut self, index: usize, sub: SubRegion) {
        let entry = &mut self.allocators[index];
        let before = entry.suballocator.total_free_region_byte_length();
        entry.suballocator.free(sub);
        let returned = entry.suballocator.total_free_region_byte_length() - before;
        self.total_free_region_byte_length += returned;
    }

    fn position(&self, id: AllocatorId) -> Option<usize> {
        self.allocators.iter().position(|entry| entry.id == id)
    }

    /// Whether removing an allocator of `byte_length` keeps both floors.
    fn can_evict(&self, byte_length: u64) -> bool {
        self.allocators.len() > self.limits.minimum_allocator_count
            && self.total_byte_length - byte_length >= self.minimum_byte_length
    }

    /// Decides the fate of the allocator at `index`, which just became empty.
    fn retain_or_evict(&mut self, index: usize) {
        let entry = &self.allocators[index];
        let (id, byte_length) = (entry.id, entry.byte_length());

        match self.cached_empty {
            Some(cached_id) if cached_id != id => {
                let Some(cached_index) = self.position(cached_id) else {
                    self.cached_empty = Some(id);
                    return;
                };
                let cached_byte_length = self.allocators[cached_index].byte_length();

                match (self.can_evict(byte_length), self.can_evict(cached_byte_length)) {
                    (true, true) if byte_length >= cached_byte_length => self.evict(index),
                    (true, true) | (false, true) => {
                        self.evict(cached_index);
                        self.cached_empty = Some(id);
                    }
                    (true, false) => self.evict(index),
                    (false, false) => {
                        tracing::debug!(
                            "allocators {cached_id} and {id} both empty, floors keep both"
                        );
                    }
                }
            }
            Some(_) => {}
            None => {
                if self.can_evict(byte_length) && self.budget.query_budget().is_exceeded() {
                    self.evict(index);
                } else {
                    tracing::debug!("caching empty allocator {id} ({byte_length} bytes)");
                    self.cached_empty = Some(id);
                }
            }
        }
    }

    /// One bubble pass from the front, stopping at the first ordered pair.
    fn nudge_order(&mut self) {
        for i in 1..self.allocators.len() {
            if self.allocators[i - 1].free_bytes() > self.allocators[i].free_bytes() {
                self.allocators.swap(i - 1, i);
            } else {
                break;
            }
        }
    }

    fn create_allocator(&mut self, byte_length: u64, dedicated: bool) -> Result<usize, SegmentError> {
        if self.total_byte_length.checked_add(byte_length).is_none() {
            return Err(SegmentError::Rejected(format!(
                "{byte_length} bytes would overflow the pool size"
            )));
        }
        let desc = SegmentDesc {
            byte_length,
            kind: self.limits.kind,
            category: self.limits.category,
            dedicated,
        };
        let segment = match self.segments.create_segment(&desc) {
            Ok(segment) => segment,
            Err(e) => {
                tracing::warn!("segment creation of {byte_length} bytes failed: {e}");
                self.stats.record_segment_failure();
                return Err(e);
            }
        };

        let suballocator = (self.strategy)(&SuballocatorDesc {
            byte_length: segment.byte_length,
            minimum_region_margin: self.limits.minimum_region_margin,
        });
        debug_assert!(suballocator.is_empty());

        let id = AllocatorId(self.next_allocator_id);
        self.next_allocator_id += 1;
        self.total_byte_length += suballocator.byte_length();
        self.total_free_region_byte_length += suballocator.total_free_region_byte_length();
        self.allocators.push(AllocatorEntry {
            id,
            segment,
            suballocator,
            is_dedicated: dedicated,
        });
        self.stats.record_allocator_created(self.total_byte_length);

        tracing::debug!(
            "created allocator {id}: {} bytes{}, pool now {} bytes in {} allocators",
            segment.byte_length,
            if dedicated { " (dedicated)" } else { "" },
            self.total_byte_length,
            self.allocators.len()
        );
        Ok(self.allocators.len() - 1)
    }

    fn evict(&mut self, index: usize) {
        let entry = self.allocators.swap_remove(index);
        debug_assert!(entry.is_empty());

        self.total_byte_length -= entry.byte_length();
        self.total_free_region_byte_length -= entry.free_bytes();
        if self.cached_empty == Some(entry.id) {
            self.cached_empty = None;
        }
        self.segments.destroy_segment(entry.segment);
        self.stats.record_allocator_evicted();

        tracing::debug!(
            "evicted allocator {}: {} bytes, pool now {} bytes in {} allocators",
            entry.id,
            entry.byte_length(),
            self.total_byte_length,
            self.allocators.len()
        );
    }

    fn roll_back_batch(
        &mut self,
        regions: Vec<Region>,
        first_batch_allocator: u64,
        cached_before: Option<AllocatorId>,
    ) {
        for region in regions.into_iter().rev() {
            if let Some(index) = self.position(region.allocator) {
                self.release(index, region.sub);
            }
        }

        let mut index = self.allocators.len();
        while index > 0 {
            index -= 1;
            if self.allocators[index].id.0 >= first_batch_allocator {
                self.evict(index);
            }
        }
        self.cached_empty = cached_before;
    }

    fn set_minimum_byte_length(&mut self, byte_length: u64) -> bool {
        if byte_length < self.minimum_byte_length {
            let mut cached = None;
            let mut index = self.allocators.len();
            while index > 0 {
                index -= 1;
                let entry = &self.allocators[index];
                if !entry.is_empty() {
                    continue;
                }
                let (id, entry_length) = (entry.id, entry.byte_length());
                if self.total_byte_length - entry_length >= byte_length
                    && self.allocators.len() > self.limits.minimum_allocator_count
                {
                    self.evict(index);
                } else if cached.is_none() {
                    cached = Some(id);
                }
            }
            self.cached_empty = cached;
            self.minimum_byte_length = byte_length;
            tracing::info!(
                "minimum lowered to {byte_length} bytes, pool now {} bytes in {} allocators",
                self.total_byte_length,
                self.allocators.len()
            );
            return true;
        }

        let max_shared = self.limits.maximum_shared_allocator_byte_length;
        while self.total_byte_length < byte_length {
            if self.allocators.len() >= self.limits.maximum_allocator_count {
                tracing::warn!(
                    "minimum of {byte_length} bytes not reached: allocator cap of {} hit at {} bytes",
                    self.limits.maximum_allocator_count,
                    self.total_byte_length
                );
                return false;
            }
            let remaining = byte_length - self.total_byte_length;
            let next = self
                .adjusted_allocator_byte_length(remaining.min(max_shared))
                .min(remaining);
            if self.create_allocator(next, false).is_err() {
                return false;
            }
        }

        self.minimum_byte_length = byte_length;
        tracing::info!(
            "minimum raised to {byte_length} bytes, pool now {} bytes in {} allocators",
            self.total_byte_length,
            self.allocators.len()
        );
        true
    }
}

impl Drop for PoolCore {
    fn drop(&mut self) {
        let outstanding = self.total_byte_length - self.total_free_region_byte_length;
        if outstanding > 0 {
            tracing::warn!("heap pool dropped with {outstanding} bytes still in live regions");
        }
        for entry in self.allocators.drain(..) {
            self.segments.destroy_segment(entry.segment);
        }
    }
}

impl fmt::Debug for PoolCore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolCore")
            .field("id", &self.id)
            .field("kind", &self.limits.kind)
            .field("category", &self.limits.category)
            .field("allocators", &self.allocators.len())
            .field("total_byte_length", &self.total_byte_length)
            .field("minimum_byte_length", &self.minimum_byte_length)
            .field("total_free_region_byte_length", &self.total_free_region_byte_length)
            .field("operation_count", &self.operation_count)
            .finish()
    }
}
