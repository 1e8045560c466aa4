// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Aggregated point-in-time memory snapshot.
//!
//! A [`MemorySnapshot`] combines the host memory reading with the VRAM
//! reading of the first GPU that exposes one.

use crate::{MemoryInfo, MonitorError, VramInfo};
use std::time::{SystemTime, UNIX_EPOCH};

/// Available host memory below which the system counts as constrained.
const CONSTRAINED_HOST_MB: u64 = 512;

/// VRAM utilisation above which the device counts as constrained.
const CONSTRAINED_VRAM_UTILISATION: f64 = 0.9;

/// A point-in-time reading of host and device memory.
#[derive(Debug, Clone, serde::Serialize)]
pub struct MemorySnapshot {
    /// Host memory state.
    pub host: MemoryInfo,
    /// Device memory state, when a driver exposes it.
    pub vram: Option<VramInfo>,
    /// Unix timestamp in milliseconds when the snapshot was taken.
    pub timestamp_ms: u64,
}

impl MemorySnapshot {
    /// Captures a new snapshot.
    ///
    /// Host memory must be readable. A missing VRAM source (no amdgpu
    /// device, container without `/sys/class/drm`) yields `vram: None`.
    pub fn capture() -> Result<Self, MonitorError> {
        let host = MemoryInfo::read()?;
        let vram = VramInfo::read().ok();

        let timestamp_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);

        Ok(Self {
            host,
            vram,
            timestamp_ms,
        })
    }

    /// Returns a one-line human-readable summary.
    pub fn summary(&self) -> String {
        let vram = match &self.vram {
            Some(v) => format!(
                "VRAM {}/{} MB used ({:.0}%)",
                v.used_mb(),
                v.total_mb(),
                v.utilisation() * 100.0
            ),
            None => "VRAM n/a".to_string(),
        };

        format!(
            "Host {}/{} MB avail ({:.0}% used), {vram}",
            self.host.available_mb(),
            self.host.total_mb(),
            self.host.utilisation() * 100.0,
        )
    }

    /// Returns `true` if either memory domain is close to exhaustion.
    pub fn is_memory_constrained(&self) -> bool {
        self.host.available_mb() < CONSTRAINED_HOST_MB
            || self
                .vram
                .as_ref()
                .is_some_and(|v| v.utilisation() > CONSTRAINED_VRAM_UTILISATION)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn sample_snapshot(avail_mb: u64, total_mb: u64, vram: Option<(u64, u64)>) -> MemorySnapshot {
        MemorySnapshot {
            host: MemoryInfo {
                total_bytes: total_mb * 1024 * 1024,
                available_bytes: avail_mb * 1024 * 1024,
                used_bytes: (total_mb - avail_mb) * 1024 * 1024,
            },
            vram: vram.map(|(used_mb, total_mb)| VramInfo {
                device: PathBuf::from("/sys/class/drm/card0/device"),
                total_bytes: total_mb * 1024 * 1024,
                used_bytes: used_mb * 1024 * 1024,
            }),
            timestamp_ms: 1700000000000,
        }
    }

    #[test]
    fn test_capture_on_linux() {
        if std::path::Path::new("/proc/meminfo").exists() {
            let snap = MemorySnapshot::capture().unwrap();
            assert!(snap.host.total_bytes > 0);
            assert!(snap.timestamp_ms > 0);
        }
    }

    #[test]
    fn test_summary_with_vram() {
        let snap = sample_snapshot(8000, 16000, Some((2048, 8192)));
        let summary = snap.summary();
        assert!(summary.contains("8000/16000 MB avail"));
        assert!(summary.contains("VRAM 2048/8192 MB used (25%)"));
    }

    #[test]
    fn test_summary_without_vram() {
        let snap = sample_snapshot(8000, 16000, None);
        assert!(snap.summary().contains("VRAM n/a"));
    }

    #[test]
    fn test_constrained() {
        assert!(!sample_snapshot(8000, 16000, Some((1024, 8192))).is_memory_constrained());
        assert!(sample_snapshot(100, 16000, None).is_memory_constrained());
        assert!(sample_snapshot(8000, 16000, Some((8000, 8192))).is_memory_constrained());
    }
}
