// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Device-local memory readings via DRM sysfs.
//!
//! The amdgpu driver exposes `mem_info_vram_total` and `mem_info_vram_used`
//! (both in bytes) under `/sys/class/drm/cardN/device/`. These are the
//! closest thing Linux offers to a driver-reported video memory budget.

use crate::sysfs::read_sysfs_u64;
use crate::MonitorError;
use std::path::{Path, PathBuf};

/// Base sysfs path for DRM devices.
const DRM_BASE: &str = "/sys/class/drm";

const VRAM_TOTAL: &str = "mem_info_vram_total";
const VRAM_USED: &str = "mem_info_vram_used";

/// Video memory state for one DRM device.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VramInfo {
    /// Device sysfs directory the reading came from.
    pub device: PathBuf,
    /// Total VRAM in bytes.
    pub total_bytes: u64,
    /// VRAM currently in use in bytes.
    pub used_bytes: u64,
}

impl VramInfo {
    /// Reads VRAM information from the first DRM card that exposes it.
    pub fn read() -> Result<Self, MonitorError> {
        let device = discover_device()?;
        Self::read_from(&device)
    }

    /// Reads VRAM information for a specific card index (`/sys/class/drm/cardN`).
    pub fn read_card(index: u32) -> Result<Self, MonitorError> {
        let device = Path::new(DRM_BASE).join(format!("card{index}")).join("device");
        Self::read_from(&device)
    }

    /// Reads VRAM information from a device directory containing the
    /// `mem_info_vram_*` attributes.
    pub fn read_from(device: &Path) -> Result<Self, MonitorError> {
        let total_bytes = read_sysfs_u64(&device.join(VRAM_TOTAL))?;
        let used_bytes = read_sysfs_u64(&device.join(VRAM_USED))?;

        Ok(Self {
            device: device.to_path_buf(),
            total_bytes,
            used_bytes: used_bytes.min(total_bytes),
        })
    }

    /// Returns VRAM not currently in use, in bytes.
    pub fn available_bytes(&self) -> u64 {
        self.total_bytes - self.used_bytes
    }

    /// Returns the VRAM utilisation as a fraction in `[0.0, 1.0]`.
    pub fn utilisation(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64
    }

    /// Returns total VRAM in megabytes.
    pub fn total_mb(&self) -> u64 {
        self.total_bytes / (1024 * 1024)
    }

    /// Returns used VRAM in megabytes.
    pub fn used_mb(&self) -> u64 {
        self.used_bytes / (1024 * 1024)
    }
}

/// Finds the first `cardN/device` directory exposing `mem_info_vram_total`.
///
/// Connector entries such as `card0-DP-1` are skipped.
fn discover_device() -> Result<PathBuf, MonitorError> {
    discover_device_in(Path::new(DRM_BASE))
}

fn discover_device_in(base: &Path) -> Result<PathBuf, MonitorError> {
    let entries = std::fs::read_dir(base).map_err(|_| MonitorError::NotAvailable {
        path: base.display().to_string(),
    })?;

    let mut cards: Vec<(u32, PathBuf)> = entries
        .filter_map(|e| e.ok())
        .filter_map(|e| {
            let name = e.file_name();
            let index = name.to_str()?.strip_prefix("card")?.parse::<u32>().ok()?;
            Some((index, e.path().join("device")))
        })
        .collect();
    cards.sort_by_key(|(index, _)| *index);

    cards
        .into_iter()
        .map(|(_, device)| device)
        .find(|device| device.join(VRAM_TOTAL).exists())
        .ok_or_else(|| MonitorError::NotAvailable {
            path: format!("{}/card*/device/{VRAM_TOTAL}", base.display()),
        })
}
