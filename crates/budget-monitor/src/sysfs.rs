// Copyright (c) 2025 Dimitris Kafetzis
//
// Licensed under the MIT License.
// See LICENSE file in the project root for full license information.
//
// SPDX-License-Identifier: MIT

//! Small helpers for reading single-value sysfs attributes.

use crate::MonitorError;
use std::path::Path;

/// Reads a sysfs/procfs file and returns its trimmed content.
pub(crate) fn read_sysfs_file(path: &Path) -> Result<String, MonitorError> {
    if !path.exists() {
        return Err(MonitorError::NotAvailable {
            path: path.display().to_string(),
        });
    }
    std::fs::read_to_string(path)
        .map(|s| s.trim().to_string())
        .map_err(|e| MonitorError::ReadError {
            path: path.display().to_string(),
            source: e,
        })
}

/// Reads a sysfs attribute holding a plain unsigned byte count.
pub(crate) fn read_sysfs_u64(path: &Path) -> Result<u64, MonitorError> {
    let content = read_sysfs_file(path)?;
    content.parse::<u64>().map_err(|_| MonitorError::ParseError {
        path: path.display().to_string(),
        detail: format!("expected integer byte count, got '{content}'"),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;

    /// Creates a temporary file with the given content and returns its path.
    /// The caller is responsible for cleanup.
    pub(crate) fn write_temp(dir: &str, name: &str, content: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join("heap_pool_test").join(dir);
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        write!(f, "{content}").unwrap();
        path
    }

    #[test]
    fn test_read_trimmed() {
        let p = write_temp("sysfs_trim", "value", "  4096\n");
        assert_eq!(read_sysfs_file(&p).unwrap(), "4096");
        assert_eq!(read_sysfs_u64(&p).unwrap(), 4096);
        let _ = std::fs::remove_file(&p);
    }

    #[test]
    fn test_missing_file() {
        let result = read_sysfs_file(Path::new("/definitely/not/here"));
        assert!(matches!(result, Err(MonitorError::NotAvailable { .. })));
    }

    #[test]
    fn test_non_numeric() {
        let p = write_temp("sysfs_bad", "value", "lots");
        let result = read_sysfs_u64(&p);
        assert!(matches!(result, Err(MonitorError::ParseError { .. })));
        let _ = std::fs::remove_file(&p);
    }
}
