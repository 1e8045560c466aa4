// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! # budget-monitor
//!
//! Reads memory budgets from `/proc/` and `/sys/` so the heap pool can gate
//! growth on what the system actually has left.
//!
//! # Sources
//! - **Host memory**: `MemTotal` / `MemAvailable` from `/proc/meminfo`.
//!   Upload and readback heaps are backed by this memory.
//! - **VRAM**: `mem_info_vram_total` / `mem_info_vram_used` exposed by the
//!   amdgpu driver under `/sys/class/drm/cardN/device/`.
//!
//! All reads are non-blocking and cheap enough to do on every allocation
//! that may grow a pool.
//!
//! # Example
//! ```no_run
//! use budget_monitor::MemorySnapshot;
//!
//! let snap = MemorySnapshot::capture().expect("failed to read memory state");
//! println!("{}", snap.summary());
//! ```

mod error;
mod memory;
mod snapshot;
mod sysfs;
mod vram;

pub use error::MonitorError;
pub use memory::MemoryInfo;
pub use snapshot::MemorySnapshot;
pub use vram::VramInfo;

/// Captures a point-in-time snapshot of host and device memory.
///
/// This is a convenience wrapper around [`MemorySnapshot::capture()`].
pub fn snapshot() -> Result<MemorySnapshot, MonitorError> {
    MemorySnapshot::capture()
}
