// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Allocation requests and the regions they produce.

use crate::suballocator::SubRegion;
use crate::{PoolError, SegmentHandle};
use bitflags::bitflags;
use std::fmt;

bitflags! {
    /// Options controlling how a request may be satisfied.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct AllocationFlags: u8 {
        /// Give the request its own allocator instead of sharing one.
        const DEDICATED_ALLOCATOR = 0b0001;
        /// Never create an allocator; only place into existing ones.
        const EXISTING_ALLOCATOR_ONLY = 0b0010;
        /// Allow growth even when the budget says there is no room.
        const CAN_EXCEED_BUDGET = 0b0100;
    }
}

/// A request for one region.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AllocationRequest {
    /// Region size in bytes. Must be non-zero.
    pub byte_length: u64,
    /// Required offset alignment. Must be a power of two.
    pub byte_alignment: u64,
    /// Placement options.
    pub flags: AllocationFlags,
}

impl AllocationRequest {
    /// Creates a request with no flags.
    pub fn new(byte_length: u64, byte_alignment: u64) -> Self {
        Self {
            byte_length,
            byte_alignment,
            flags: AllocationFlags::empty(),
        }
    }

    /// Replaces the request flags.
    pub fn with_flags(mut self, flags: AllocationFlags) -> Self {
        self.flags = flags;
        self
    }

    pub(crate) fn validate(&self) -> Result<(), PoolError> {
        if self.byte_length == 0 {
            return Err(PoolError::ZeroSizedAllocation);
        }
        if !self.byte_alignment.is_power_of_two() {
            return Err(PoolError::InvalidAlignment {
                alignment: self.byte_alignment,
            });
        }
        if self.flags.contains(
            AllocationFlags::DEDICATED_ALLOCATOR | AllocationFlags::EXISTING_ALLOCATOR_ONLY,
        ) {
            return Err(PoolError::InvalidFlagsCombination);
        }
        Ok(())
    }
}

/// Identity of a pool instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PoolId(pub(crate) u64);

/// Identity of an allocator within its pool. Never reused, so a region
/// that outlives its allocator cannot be routed to a newer one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocatorId(pub(crate) u64);

impl fmt::Display for AllocatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// One allocated sub-range of a segment.
///
/// A region is deliberately not `Clone`: it is consumed by
/// [`PoolCore::free`](crate::PoolCore::free), so the same value cannot be
/// freed twice.
#[derive(Debug, PartialEq, Eq)]
pub struct Region {
    pub(crate) pool: PoolId,
    pub(crate) allocator: AllocatorId,
    pub(crate) segment: SegmentHandle,
    pub(crate) sub: SubRegion,
}

impl Region {
    /// The segment the region lives in.
    pub fn segment(&self) -> SegmentHandle {
        self.segment
    }

    /// Offset of the region inside its segment.
    pub fn offset(&self) -> u64 {
        self.sub.offset
    }

    /// Region size in bytes.
    pub fn byte_length(&self) -> u64 {
        self.sub.byte_length
    }

    /// The allocator that placed the region.
    pub fn allocator(&self) -> AllocatorId {
        self.allocator
    }

    /// The pool that owns the region.
    pub fn pool(&self) -> PoolId {
        self.pool
    }
}
