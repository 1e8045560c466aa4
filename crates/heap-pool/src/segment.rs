// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Heap segments and the factory boundary that creates them.
//!
//! A segment is one native backing heap allocation. The pool never touches
//! segment memory itself; it only asks a [`SegmentFactory`] to create and
//! destroy segments and hands the resulting [`SegmentHandle`] out with each
//! region so the caller can place a resource at `(segment, offset)`.

use crate::SegmentError;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

/// Where a heap lives and how the CPU can reach it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeapKind {
    /// Device-local memory, not CPU visible.
    #[default]
    Default,
    /// CPU-writable memory used to stage uploads.
    Upload,
    /// CPU-readable memory used for readbacks.
    Readback,
}

/// Which resource types a heap may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum HeapCategory {
    /// Buffers and textures of any kind.
    #[default]
    Mixed,
    /// Buffers only.
    Buffers,
    /// Textures that are not render or depth targets.
    Textures,
    /// Render and depth-stencil targets.
    RenderTargets,
}

/// Description of a segment to create.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SegmentDesc {
    /// Segment size in bytes.
    pub byte_length: u64,
    /// Heap kind of the owning pool.
    pub kind: HeapKind,
    /// Heap category of the owning pool.
    pub category: HeapCategory,
    /// The segment will back a single dedicated allocation.
    pub dedicated: bool,
}

/// Opaque handle to a created segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SegmentHandle {
    /// Factory-assigned identifier.
    pub id: u64,
    /// Segment size in bytes.
    pub byte_length: u64,
}

/// Creates and destroys native heap segments.
///
/// Implementations wrap the graphics API's heap creation call. A failure
/// to create a segment is treated by the pool as ordinary exhaustion.
pub trait SegmentFactory: Send + Sync {
    /// Creates one segment matching `desc`.
    fn create_segment(&self, desc: &SegmentDesc) -> Result<SegmentHandle, SegmentError>;

    /// Releases a segment previously returned by [`create_segment`](Self::create_segment).
    fn destroy_segment(&self, segment: SegmentHandle);
}

/// A segment factory with no native heap behind it.
///
/// Segments are identifiers plus accounting. It serves as the backing for
/// simulations and tests, and an optional capacity turns it into a
/// stand-in for a device that runs out of heap space.
#[derive(Debug, Default)]
pub struct HostSegmentFactory {
    capacity_bytes: Option<u64>,
    next_id: AtomicU64,
    live_segments: AtomicUsize,
    live_bytes: AtomicU64,
    created_segments: AtomicU64,
}

impl HostSegmentFactory {
    /// Creates a factory without a capacity limit.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a factory that refuses segments once `capacity_bytes` are live.
    pub fn with_capacity(capacity_bytes: u64) -> Self {
        Self {
            capacity_bytes: Some(capacity_bytes),
            ..Self::default()
        }
    }

    /// Number of segments currently alive.
    pub fn live_segments(&self) -> usize {
        self.live_segments.load(Ordering::Acquire)
    }

    /// Bytes held by live segments.
    pub fn live_bytes(&self) -> u64 {
        self.live_bytes.load(Ordering::Acquire)
    }

    /// Number of segments ever created.
    pub fn created_segments(&self) -> u64 {
        self.created_segments.load(Ordering::Acquire)
    }
}

impl SegmentFactory for HostSegmentFactory {
    fn create_segment(&self, desc: &SegmentDesc) -> Result<SegmentHandle, SegmentError> {
        if desc.byte_length == 0 {
            return Err(SegmentError::Rejected("zero-length segment".to_string()));
        }

        let capacity = self.capacity_bytes.unwrap_or(u64::MAX);
        self.live_bytes
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |live| {
                live.checked_add(desc.byte_length)
                    .filter(|&next| next <= capacity)
            })
            .map_err(|live| SegmentError::Exhausted {
                requested_bytes: desc.byte_length,
                available_bytes: capacity.saturating_sub(live),
            })?;

        self.live_segments.fetch_add(1, Ordering::AcqRel);
        self.created_segments.fetch_add(1, Ordering::AcqRel);
        let id = self.next_id.fetch_add(1, Ordering::AcqRel);

        Ok(SegmentHandle {
            id,
            byte_length: desc.byte_length,
        })
    }

    fn destroy_segment(&self, segment: SegmentHandle) {
        self.live_bytes
            .fetch_sub(segment.byte_length, Ordering::AcqRel);
        self.live_segments.fetch_sub(1, Ordering::AcqRel);
    }
}
