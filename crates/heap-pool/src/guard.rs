// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! RAII region guard that frees the region on drop.
//!
//! [`RegionGuard`] pairs a [`Region`] with the pool that owns it. Dropping
//! the guard returns the region, so a region cannot leak past the scope
//! that allocated it and cannot be freed twice.

use crate::{HeapPool, Region, SegmentHandle};
use std::sync::Arc;

/// A region that frees itself when dropped.
///
/// # Example
/// ```ignore
/// let guard = pool.allocate_guarded(AllocationRequest::new(4096, 256))?.unwrap();
/// bind_buffer(guard.segment(), guard.offset());
/// drop(guard);               // region returned to the pool
/// ```
pub struct RegionGuard {
    /// Wrapped in `Option` so it can be taken in `drop()`.
    region: Option<Region>,
    pool: Arc<HeapPool>,
}

impl RegionGuard {
    pub(crate) fn new(region: Region, pool: Arc<HeapPool>) -> Self {
        Self {
            region: Some(region),
            pool,
        }
    }

    /// The guarded region.
    pub fn region(&self) -> &Region {
        // Only `into_region` and `drop` take the region, and both consume the guard.
        self.region.as_ref().expect("region already taken")
    }

    /// The segment the region lives in.
    pub fn segment(&self) -> SegmentHandle {
        self.region().segment()
    }

    /// Offset of the region inside its segment.
    pub fn offset(&self) -> u64 {
        self.region().offset()
    }

    /// Region size in bytes.
    pub fn byte_length(&self) -> u64 {
        self.region().byte_length()
    }

    /// Disarms the guard and hands the region back to the caller, who is
    /// now responsible for freeing it.
    pub fn into_region(mut self) -> Region {
        self.region.take().expect("region already taken")
    }
}

impl Drop for RegionGuard {
    fn drop(&mut self) {
        if let Some(region) = self.region.take() {
            if let Err(e) = self.pool.free(region) {
                tracing::error!("failed to free guarded region: {e}");
            }
        }
    }
}

impl std::fmt::Debug for RegionGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegionGuard")
            .field("region", &self.region)
            .finish()
    }
}
