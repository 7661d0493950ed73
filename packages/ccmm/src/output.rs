//! File output.

use std::fs::{self, File};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::{CcmmError, Result};

/// Write `content` to `path` through a sibling temp file.
///
/// The whole document is already in memory, so a failed write leaves
/// either the previous file or nothing, never a truncated document.
pub fn write_atomic(path: &Path, content: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| CcmmError::validation("path", format!("'{}' has no file name", path.display())))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let temp_file = dir.join(format!(".{}.tmp", file_name.to_string_lossy()));

    // Write to temp file first, then sync and rename for atomicity
    let written = (|| -> std::io::Result<()> {
        let mut file = File::create(&temp_file)?;
        file.write_all(content.as_bytes())?;
        file.sync_all()
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&temp_file);
        return Err(e.into());
    }

    // On Windows, rename fails if the destination already exists
    #[cfg(target_os = "windows")]
    if path.exists() {
        fs::remove_file(path)?;
    }

    fs::rename(&temp_file, path)?;
    Ok(())
}
