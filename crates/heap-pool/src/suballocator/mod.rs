// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! The [`Suballocator`] trait and the built-in placement strategies.
//!
//! A suballocator owns the bookkeeping for one segment: it decides where a
//! region goes inside the segment and takes it back on free. The pool only
//! relies on the contract below, never on how placement is done.

pub mod free_list;
pub mod linear;

pub use free_list::FreeListSuballocator;
pub use linear::LinearSuballocator;

use std::sync::Arc;

/// A placed sub-range inside one segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubRegion {
    /// Offset of the region from the start of the segment.
    pub offset: u64,
    /// Length the caller asked for, excluding margins and padding.
    pub byte_length: u64,
}

/// Parameters for building a suballocator over a fresh segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuballocatorDesc {
    /// Size of the segment being managed.
    pub byte_length: u64,
    /// Bytes kept clear on both sides of every region.
    pub minimum_region_margin: u64,
}

/// Placement strategy for a single segment.
///
/// # Contract
/// - [`byte_length`](Self::byte_length) never changes.
/// - [`total_free_region_byte_length`](Self::total_free_region_byte_length)
///   drops by exactly the amount a successful [`try_allocate`](Self::try_allocate)
///   consumed and rises by the same amount when that region is freed.
/// - A fresh suballocator with `byte_length >= align_up(margin, alignment) + len + margin`
///   must satisfy a request for `len` bytes at `alignment`.
pub trait Suballocator: Send {
    /// Human-readable name of this strategy.
    fn name(&self) -> &str;

    /// Size of the managed segment in bytes.
    fn byte_length(&self) -> u64;

    /// Bytes not covered by any live region (margins count as covered).
    fn total_free_region_byte_length(&self) -> u64;

    /// Returns `true` when no region is live.
    fn is_empty(&self) -> bool {
        self.total_free_region_byte_length() == self.byte_length()
    }

    /// Places a region of `byte_length` bytes at a multiple of `byte_alignment`.
    fn try_allocate(&mut self, byte_length: u64, byte_alignment: u64) -> Option<SubRegion>;

    /// Releases a region previously returned by [`try_allocate`](Self::try_allocate).
    fn free(&mut self, region: SubRegion);
}

/// Builds a suballocator for each new segment. Supplied at pool construction.
pub type SuballocatorFactory =
    Arc<dyn Fn(&SuballocatorDesc) -> Box<dyn Suballocator> + Send + Sync>;

/// Factory for the default [`FreeListSuballocator`].
pub fn free_list_factory() -> SuballocatorFactory {
    Arc::new(|desc: &SuballocatorDesc| -> Box<dyn Suballocator> {
        Box::new(FreeListSuballocator::new(desc))
    })
}

/// Factory for [`LinearSuballocator`].
pub fn linear_factory() -> SuballocatorFactory {
    Arc::new(|desc: &SuballocatorDesc| -> Box<dyn Suballocator> {
        Box::new(LinearSuballocator::new(desc))
    })
}

/// Rounds `value` up to a multiple of `alignment` (a power of two).
///
/// Returns `None` on overflow.
pub(crate) fn align_up(value: u64, alignment: u64) -> Option<u64> {
    debug_assert!(alignment.is_power_of_two());
    let mask = alignment - 1;
    value.checked_add(mask).map(|v| v & !mask)
}

/// Bytes a fresh segment needs to be guaranteed to hold one region.
pub(crate) fn placement_byte_length(byte_length: u64, byte_alignment: u64, margin: u64) -> u64 {
    align_up(margin, byte_alignment)
        .and_then(|lead| lead.checked_add(byte_length))
        .and_then(|v| v.checked_add(margin))
        .unwrap_or(u64::MAX)
}
