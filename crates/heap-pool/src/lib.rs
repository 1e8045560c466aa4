// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # heap-pool
//!
//! A pool manager for GPU memory heaps. The pool grows and shrinks a set of
//! heap segments, places resource regions inside them through a pluggable
//! suballocator, and consults a memory budget before it grows.
//!
//! # Key Components
//!
//! - [`PoolCore`]: the pool manager itself, without locking.
//! - [`HeapPool`]: a `PoolCore` behind a mutex, for sharing as `Arc<HeapPool>`.
//! - [`RegionGuard`]: frees its region when dropped.
//! - [`Suballocator`]: placement inside one segment, with
//!   [`FreeListSuballocator`] and [`LinearSuballocator`] built in.
//! - [`SegmentFactory`]: the boundary to the graphics API's heap creation.
//!   [`HostSegmentFactory`] backs simulations and tests.
//! - [`BudgetOracle`]: the `{usage, limit}` reading consulted before growth.
//! - [`PoolConfig`]: limits and strategy, loadable from TOML.
//!
//! # Lifecycle
//!
//! ```text
//! try_allocate(request)
//!       │
//!       ├── search existing allocators ──► Region
//!       │
//!       ├── cap reached / over budget ──► None
//!       │
//!       ▼
//!   SegmentFactory::create_segment ──► new allocator ──► Region
//!
//! free(region)
//!       │
//!       ▼
//!   allocator empty? ── cache it, or evict the larger of two empties
//! ```
//!
//! # Example
//! ```
//! use heap_pool::{AllocationRequest, FixedBudget, HeapPool, HostSegmentFactory, PoolConfig};
//! use std::sync::Arc;
//!
//! let pool = Arc::new(
//!     HeapPool::new(
//!         &PoolConfig::default(),
//!         Arc::new(HostSegmentFactory::new()),
//!         Arc::new(FixedBudget::unlimited()),
//!     )
//!     .unwrap(),
//! );
//!
//! let guard = pool
//!     .allocate_guarded(AllocationRequest::new(64 * 1024, 256))
//!     .unwrap()
//!     .expect("pool has room");
//! assert_eq!(pool.stats().used_byte_length(), 64 * 1024);
//!
//! drop(guard);
//! assert_eq!(pool.stats().used_byte_length(), 0);
//! ```

pub mod budget;
mod config;
mod error;
mod guard;
mod manager;
mod pool;
mod region;
pub mod segment;
mod size;
mod stats;
pub mod suballocator;

pub use budget::{
    Budget, BudgetOracle, FixedBudget, ManualBudget, SystemMemoryBudget, VramBudget,
};
pub use config::PoolConfig;
pub use error::{PoolError, SegmentError};
pub use guard::RegionGuard;
pub use manager::PoolCore;
pub use pool::HeapPool;
pub use region::{AllocationFlags, AllocationRequest, AllocatorId, PoolId, Region};
pub use segment::{
    HeapCategory, HeapKind, HostSegmentFactory, SegmentDesc, SegmentFactory, SegmentHandle,
};
pub use size::ByteSize;
pub use stats::{AllocationStats, AllocatorStats, PoolStats};
pub use suballocator::{
    free_list_factory, linear_factory, FreeListSuballocator, LinearSuballocator, SubRegion,
    Suballocator, SuballocatorDesc, SuballocatorFactory,
};
