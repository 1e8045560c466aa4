// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Error types for the heap pool.
//!
//! Only caller-contract violations and construction failures are errors.
//! Running out of memory is reported as `Ok(None)` / `Ok(false)` by the
//! allocation entry points.

use crate::AllocatorId;

/// Errors raised by pool construction and by misuse of the pool API.
#[derive(Debug, thiserror::Error)]
pub enum PoolError {
    /// Attempted to allocate a zero-sized region.
    #[error("cannot allocate zero-sized region")]
    ZeroSizedAllocation,

    /// The requested alignment is zero or not a power of two.
    #[error("alignment {alignment} is not a power of two")]
    InvalidAlignment { alignment: u64 },

    /// `DEDICATED_ALLOCATOR` and `EXISTING_ALLOCATOR_ONLY` were both set.
    #[error("dedicated-allocator and existing-allocator-only flags are mutually exclusive")]
    InvalidFlagsCombination,

    /// The region does not belong to any allocator of this pool
    /// (double free, stale region, or a region from another pool).
    #[error("region is not owned by this pool (allocator {allocator})")]
    UnknownRegion { allocator: AllocatorId },

    /// The pool configuration is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// A byte size string could not be parsed.
    #[error("invalid byte size '{input}': {detail}")]
    InvalidByteSize { input: String, detail: String },

    /// The segment factory failed while building the initial allocators.
    #[error("segment creation failed: {0}")]
    Segment(#[from] SegmentError),
}

/// Errors reported by a [`SegmentFactory`](crate::SegmentFactory).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SegmentError {
    /// The backing heap has no room for a segment of the requested size.
    #[error("segment of {requested_bytes} bytes exceeds remaining capacity of {available_bytes} bytes")]
    Exhausted {
        requested_bytes: u64,
        available_bytes: u64,
    },

    /// The native call rejected the segment description.
    #[error("segment rejected: {0}")]
    Rejected(String),
}
