// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Bump-pointer strategy.
//!
//! Regions are placed one after another. Freed space is not reused until
//! every region in the segment has been freed, at which point the cursor
//! rewinds to zero. Suited to per-frame upload heaps where everything is
//! released together.
//!
//! Alignment padding in front of a block cannot be reached again until the
//! rewind, so it counts as consumed along with the block.

use super::{align_up, SubRegion, Suballocator, SuballocatorDesc};
use std::collections::BTreeMap;

/// Linear placement over one segment.
#[derive(Debug, Clone)]
pub struct LinearSuballocator {
    byte_length: u64,
    margin: u64,
    cursor: u64,
    /// Live region offset to the cursor position it was placed from.
    live_regions: BTreeMap<u64, u64>,
    total_free: u64,
}

impl LinearSuballocator {
    /// Creates a suballocator over an empty segment.
    pub fn new(desc: &SuballocatorDesc) -> Self {
        Self {
            byte_length: desc.byte_length,
            margin: desc.minimum_region_margin,
            cursor: 0,
            live_regions: BTreeMap::new(),
            total_free: desc.byte_length,
        }
    }

    /// Offset of the next placement.
    pub fn cursor(&self) -> u64 {
        self.cursor
    }
}

impl Suballocator for LinearSuballocator {
    fn name(&self) -> &str {
        "linear"
    }

    fn byte_length(&self) -> u64 {
        self.byte_length
    }

    fn total_free_region_byte_length(&self) -> u64 {
        self.total_free
    }

    fn try_allocate(&mut self, byte_length: u64, byte_alignment: u64) -> Option<SubRegion> {
        let offset = align_up(self.cursor.checked_add(self.margin)?, byte_alignment)?;
        let block_end = offset.checked_add(byte_length)?.checked_add(self.margin)?;
        if block_end > self.byte_length {
            return None;
        }

        self.total_free -= block_end - self.cursor;
        self.live_regions.insert(offset, self.cursor);
        self.cursor = block_end;

        Some(SubRegion {
            offset,
            byte_length,
        })
    }

    fn free(&mut self, region: SubRegion) {
        let span_start = self.live_regions.remove(&region.offset);
        debug_assert!(span_start.is_some(), "region at {} is not live", region.offset);
        let Some(span_start) = span_start else {
            return;
        };
        self.total_free += region.offset + region.byte_length + self.margin - span_start;
        if self.live_regions.is_empty() {
            self.cursor = 0;
            debug_assert_eq!(self.total_free, self.byte_length);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suballocator(byte_length: u64, margin: u64) -> LinearSuballocator {
        LinearSuballocator::new(&SuballocatorDesc {
            byte_length,
            minimum_region_margin: margin,
        })
    }

    #[test]
    fn test_bumps_cursor() {
        let mut s = suballocator(4096, 0);
        let a = s.try_allocate(100, 1).unwrap();
        let b = s.try_allocate(100, 64).unwrap();
        assert_eq!(a.offset, 0);
        assert_eq!(b.offset, 128);
        assert_eq!(s.cursor(), 228);
        assert_eq!(s.total_free_region_byte_length(), 4096 - 228);
    }

    #[test]
    fn test_padding_counted_and_returned() {
        let mut s = suballocator(4096, 0);
        let a = s.try_allocate(100, 1).unwrap();
        let before = s.total_free_region_byte_length();
        let b = s.try_allocate(100, 256).unwrap();
        assert_eq!(b.offset, 256);
        // 156 bytes of padding plus the region itself.
        assert_eq!(before - s.total_free_region_byte_length(), 256);
        assert_eq!(s.total_free_region_byte_length(), 4096 - s.cursor());

        s.free(b);
        assert_eq!(s.total_free_region_byte_length(), before);
        s.free(a);
        assert!(s.is_empty());
        assert_eq!(s.cursor(), 0);
    }

    #[test]
    fn test_space_not_reused_until_empty() {
        let mut s = suballocator(1000, 0);
        let a = s.try_allocate(600, 1).unwrap();
        let b = s.try_allocate(400, 1).unwrap();
        s.free(a);
        assert_eq!(s.total_free_region_byte_length(), 600);
        assert!(s.try_allocate(100, 1).is_none());

        s.free(b);
        assert!(s.is_empty());
        assert_eq!(s.cursor(), 0);
        assert_eq!(s.try_allocate(1000, 1).unwrap().offset, 0);
    }

    #[test]
    fn test_margins() {
        let mut s = suballocator(1000, 10);
        let a = s.try_allocate(100, 1).unwrap();
        assert_eq!(a.offset, 10);
        assert_eq!(s.cursor(), 120);
        assert_eq!(s.total_free_region_byte_length(), 880);
    }
}
