// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Host memory readings via `/proc/meminfo`.
//!
//! Upload and readback heaps live in system memory, so their budget is the
//! kernel's view of physical memory: the limit is `MemTotal` and the usage is
//! everything that is not `MemAvailable`.

use crate::MonitorError;
use std::path::Path;

/// Default path to the kernel memory info file.
const MEMINFO_PATH: &str = "/proc/meminfo";

/// Host memory state.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct MemoryInfo {
    /// Total physical memory in bytes.
    pub total_bytes: u64,
    /// Memory the kernel reports as available for new allocations, in bytes.
    pub available_bytes: u64,
    /// Memory in use in bytes (`total - available`).
    pub used_bytes: u64,
}

impl MemoryInfo {
    /// Reads current memory information from `/proc/meminfo`.
    pub fn read() -> Result<Self, MonitorError> {
        Self::read_from(Path::new(MEMINFO_PATH))
    }

    /// Reads memory information from a specific file.
    pub fn read_from(path: &Path) -> Result<Self, MonitorError> {
        let content = std::fs::read_to_string(path).map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::parse(&content, path)
    }

    /// Parses the content of a `/proc/meminfo`-formatted string.
    pub(crate) fn parse(content: &str, source_path: &Path) -> Result<Self, MonitorError> {
        let mut total_kb: Option<u64> = None;
        let mut available_kb: Option<u64> = None;

        for line in content.lines() {
            let mut parts = line.split_whitespace();
            let (Some(key), Some(value)) = (parts.next(), parts.next()) else {
                continue;
            };
            match key {
                "MemTotal:" => total_kb = Some(parse_kb_value(value, source_path)?),
                "MemAvailable:" => available_kb = Some(parse_kb_value(value, source_path)?),
                _ => {}
            }

            if total_kb.is_some() && available_kb.is_some() {
                break;
            }
        }

        let total_kb = total_kb.ok_or_else(|| MonitorError::ParseError {
            path: source_path.display().to_string(),
            detail: "MemTotal not found".to_string(),
        })?;
        let available_kb = available_kb.ok_or_else(|| MonitorError::ParseError {
            path: source_path.display().to_string(),
            detail: "MemAvailable not found".to_string(),
        })?;

        let total_bytes = total_kb * 1024;
        let available_bytes = available_kb.min(total_kb) * 1024;

        Ok(Self {
            total_bytes,
            available_bytes,
            used_bytes: total_bytes - available_bytes,
        })
    }

    /// Returns the memory utilisation as a fraction in `[0.0, 1.0]`.
    pub fn utilisation(&self) -> f64 {
        if self.total_bytes == 0 {
            return 0.0;
        }
        self.used_bytes as f64 / self.total_bytes as f64
    }

    /// Returns available memory in megabytes.
    pub fn available_mb(&self) -> u64 {
        self.available_bytes / (1024 * 1024)
    }

    /// Returns total memory in megabytes.
    pub fn total_mb(&self) -> u64 {
        self.total_bytes / (1024 * 1024)
    }
}

/// Parses a numeric string from `/proc/meminfo` (values are in kB).
fn parse_kb_value(s: &str, source_path: &Path) -> Result<u64, MonitorError> {
    s.parse::<u64>().map_err(|_| MonitorError::ParseError {
        path: source_path.display().to_string(),
        detail: format!("expected integer kB value, got '{s}'"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sysfs::tests::write_temp;

    const SAMPLE_MEMINFO: &str = "\
MemTotal:       16303420 kB
MemFree:         9218456 kB
MemAvailable:   12456780 kB
Buffers:          123456 kB
Cached:          1987654 kB
SwapCached:            0 kB
";

    #[test]
    fn test_parse_meminfo() {
        let info = MemoryInfo::parse(SAMPLE_MEMINFO, Path::new("/proc/meminfo")).unwrap();
        assert_eq!(info.total_bytes, 16303420 * 1024);
        assert_eq!(info.available_bytes, 12456780 * 1024);
        assert_eq!(info.used_bytes, (16303420 - 12456780) * 1024);
    }

    #[test]
    fn test_available_clamped_to_total() {
        let odd = "MemTotal: 100 kB\nMemAvailable: 150 kB\n";
        let info = MemoryInfo::parse(odd, Path::new("/proc/meminfo")).unwrap();
        assert_eq!(info.available_bytes, info.total_bytes);
        assert_eq!(info.used_bytes, 0);
    }

    #[test]
    fn test_total_mb() {
        let info = MemoryInfo::parse(SAMPLE_MEMINFO, Path::new("/proc/meminfo")).unwrap();
        assert_eq!(info.total_mb(), 15921);
    }

    #[test]
    fn test_utilisation() {
        let info = MemoryInfo {
            total_bytes: 4_000_000_000,
            available_bytes: 1_000_000_000,
            used_bytes: 3_000_000_000,
        };
        assert!((info.utilisation() - 0.75).abs() < 0.001);

        let empty = MemoryInfo {
            total_bytes: 0,
            available_bytes: 0,
            used_bytes: 0,
        };
        assert_eq!(empty.utilisation(), 0.0);
    }

    #[test]
    fn test_read_from_file() {
        let path = write_temp("meminfo", "meminfo", SAMPLE_MEMINFO);
        let info = MemoryInfo::read_from(&path).unwrap();
        assert_eq!(info.total_bytes, 16303420 * 1024);
        let _ = std::fs::remove_file(&path);
    }

    #[test]
    fn test_missing_mem_available() {
        let incomplete = "MemTotal:        3884292 kB\nMemFree:          218456 kB\n";
        let result = MemoryInfo::parse(incomplete, Path::new("/proc/meminfo"));
        assert!(matches!(result, Err(MonitorError::ParseError { .. })));
    }

    #[test]
    fn test_read_real_meminfo() {
        if Path::new(MEMINFO_PATH).exists() {
            let info = MemoryInfo::read().unwrap();
            assert!(info.total_bytes > 0);
            assert!(info.available_bytes <= info.total_bytes);
        }
    }
}
