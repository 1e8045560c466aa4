// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! First-fit free-list strategy.
//!
//! Free ranges are kept in an address-ordered `BTreeMap` so that freeing a
//! region can merge with both neighbours in `O(log n)`. Each region is
//! surrounded by `minimum_region_margin` bytes that belong to the region's
//! block; alignment padding in front of a block stays free.
//!
//! ```text
//! | free pad | margin | region bytes | margin | free ...
//!            ^ block start                    ^ block end
//! ```

use super::{align_up, SubRegion, Suballocator, SuballocatorDesc};
use std::collections::BTreeMap;

/// The default placement strategy.
#[derive(Debug, Clone)]
pub struct FreeListSuballocator {
    byte_length: u64,
    margin: u64,
    /// Free ranges keyed by offset, valued by length. Never adjacent.
    free_ranges: BTreeMap<u64, u64>,
    total_free: u64,
}

impl FreeListSuballocator {
    /// Creates a suballocator over an empty segment.
    pub fn new(desc: &SuballocatorDesc) -> Self {
        let mut free_ranges = BTreeMap::new();
        if desc.byte_length > 0 {
            free_ranges.insert(0, desc.byte_length);
        }
        Self {
            byte_length: desc.byte_length,
            margin: desc.minimum_region_margin,
            free_ranges,
            total_free: desc.byte_length,
        }
    }

    /// Number of disjoint free ranges.
    pub fn free_range_count(&self) -> usize {
        self.free_ranges.len()
    }

    /// Length of the largest free range.
    pub fn largest_free_range(&self) -> u64 {
        self.free_ranges.values().copied().max().unwrap_or(0)
    }

    /// Finds the first free range that can hold the block, returning
    /// `(range_start, block_start, block_end, region_offset)`.
    fn find_fit(&self, byte_length: u64, byte_alignment: u64) -> Option<(u64, u64, u64, u64)> {
        self.free_ranges.iter().find_map(|(&start, &len)| {
            let region_offset = align_up(start.checked_add(self.margin)?, byte_alignment)?;
            let block_end = region_offset
                .checked_add(byte_length)?
                .checked_add(self.margin)?;
            (block_end <= start + len).then_some((
                start,
                region_offset - self.margin,
                block_end,
                region_offset,
            ))
        })
    }

    fn insert_free(&mut self, mut start: u64, mut len: u64) {
        if let Some((&prev_start, &prev_len)) = self.free_ranges.range(..start).next_back() {
            if prev_start + prev_len == start {
                self.free_ranges.remove(&prev_start);
                start = prev_start;
                len += prev_len;
            }
        }
        let end = start + len;
        if let Some(next_len) = self.free_ranges.remove(&end) {
            len += next_len;
        }
        self.free_ranges.insert(start, len);
    }
}

impl Suballocator for FreeListSuballocator {
    fn name(&self) -> &str {
        "free-list"
    }

    fn byte_length(&self) -> u64 {
        self.byte_length
    }

    fn total_free_region_byte_length(&self) -> u64 {
        self.total_free
    }

    fn try_allocate(&mut self, byte_length: u64, byte_alignment: u64) -> Option<SubRegion> {
        let (range_start, block_start, block_end, offset) =
            self.find_fit(byte_length, byte_alignment)?;

        let range_len = self.free_ranges.remove(&range_start)?;
        let range_end = range_start + range_len;
        if block_start > range_start {
            self.free_ranges.insert(range_start, block_start - range_start);
        }
        if block_end < range_end {
            self.free_ranges.insert(block_end, range_end - block_end);
        }
        self.total_free -= block_end - block_start;

        Some(SubRegion {
            offset,
            byte_length,
        })
    }

    fn free(&mut self, region: SubRegion) {
        let block_start = region.offset - self.margin;
        let block_len = region.byte_length + 2 * self.margin;
        self.insert_free(block_start, block_len);
        self.total_free += block_len;
        debug_assert!(self.total_free <= self.byte_length);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suballocator(byte_length: u64, margin: u64) -> FreeListSuballocator {
        FreeListSuballocator::new(&SuballocatorDesc {
            byte_length,
            minimum_region_margin: margin,
        })
    }

    #[test]
    fn test_first_fit_packs_from_start() {
        let mut s = suballocator(4096, 0);
        let a = s.try_allocate(1000, 1).unwrap();
        let b = s.try_allocate(1000, 1).unwrap();
        assert_eq!(a.offset, 0);
        assert_eq!(b.offset, 1000);
        assert_eq!(s.total_free_region_byte_length(), 2096);
    }

    #[test]
    fn test_alignment_padding_stays_free() {
        let mut s = suballocator(4096, 0);
        s.try_allocate(100, 1).unwrap();
        let aligned = s.try_allocate(100, 256).unwrap();
        assert_eq!(aligned.offset, 256);
        // The pad [100, 256) is still a free range.
        assert_eq!(s.free_range_count(), 2);
        assert_eq!(s.total_free_region_byte_length(), 4096 - 200);

        let small = s.try_allocate(100, 1).unwrap();
        assert_eq!(small.offset, 100);
    }

    #[test]
    fn test_margins_surround_region() {
        let mut s = suballocator(4096, 64);
        let a = s.try_allocate(100, 1).unwrap();
        assert_eq!(a.offset, 64);
        let b = s.try_allocate(100, 1).unwrap();
        // a's block ends at 64 + 100 + 64 = 228, b's margin follows.
        assert_eq!(b.offset, 228 + 64);
        assert_eq!(s.total_free_region_byte_length(), 4096 - 2 * 228);
    }

    #[test]
    fn test_free_coalesces_neighbours() {
        let mut s = suballocator(3000, 0);
        let a = s.try_allocate(1000, 1).unwrap();
        let b = s.try_allocate(1000, 1).unwrap();
        let c = s.try_allocate(1000, 1).unwrap();
        assert_eq!(s.free_range_count(), 0);

        s.free(a);
        s.free(c);
        assert_eq!(s.free_range_count(), 2);
        s.free(b);
        assert_eq!(s.free_range_count(), 1);
        assert_eq!(s.largest_free_range(), 3000);
        assert!(s.is_empty());
    }

    #[test]
    fn test_exhaustion() {
        let mut s = suballocator(1024, 0);
        assert!(s.try_allocate(1025, 1).is_none());
        let _a = s.try_allocate(1024, 1).unwrap();
        assert!(s.try_allocate(1, 1).is_none());
    }

    #[test]
    fn test_fragmented_space_rejects_large_request() {
        let mut s = suballocator(3000, 0);
        let a = s.try_allocate(1000, 1).unwrap();
        let _b = s.try_allocate(1000, 1).unwrap();
        let c = s.try_allocate(1000, 1).unwrap();
        s.free(a);
        s.free(c);
        assert_eq!(s.total_free_region_byte_length(), 2000);
        assert!(s.try_allocate(1500, 1).is_none());
    }

    #[test]
    fn test_oversized_alignment_does_not_overflow() {
        let mut s = suballocator(4096, 0);
        s.try_allocate(1, 1).unwrap();
        assert!(s.try_allocate(1, 1 << 63).is_none());
    }
}
