//! Writing captures to disk
//!
//! A capture is written to an explicit `save_path` when the caller gives
//! one, otherwise to a timestamped file in the configured capture
//! directory. Parent directories are created as needed.

use std::{
    fs,
    path::{Path, PathBuf},
};

use chrono::Utc;

use crate::error::ToolResult;

/// Resolves a caller-supplied save path
///
/// Appends `.png` unless the path already ends in it (case-insensitive) and
/// makes the result absolute against the current directory.
pub fn resolve_save_path(save_path: &str) -> ToolResult<PathBuf> {
    let mut raw = save_path.to_string();
    if !raw.to_lowercase().ends_with(".png") {
        raw.push_str(".png");
    }
    Ok(std::path::absolute(raw)?)
}

/// Builds `dir/terminal_capture_<timestamp>.png`
pub fn timestamped_path(dir: &Path) -> PathBuf {
    let timestamp = Utc::now().format("%Y%m%d_%H%M%S_%3f");
    dir.join(format!("terminal_capture_{timestamp}.png"))
}

/// Writes `data` to `path`, creating parent directories
///
/// Returns the number of bytes written.
pub fn write_capture(path: &Path, data: &[u8]) -> ToolResult<u64> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            fs::create_dir_all(parent)?;
        }
    }

    fs::write(path, data)?;
    tracing::info!("Saved capture to {} ({} bytes)", path.display(), data.len());
    Ok(data.len() as u64)
}
