//! Dirty-set persistence: the pending backlog survives restarts.
//!
//! Saved as a small JSON array next to the index files. Written atomically
//! (temp file + rename) so a crash mid-save leaves the previous snapshot
//! intact.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};

use crate::models::LogIdentifier;

/// Loads a previously saved dirty set. Returns an empty vec if the file
/// does not exist; a corrupt file is an error (callers log and start with
/// an empty backlog).
pub fn load_dirty_set(path: &Path) -> Result<Vec<LogIdentifier>> {
    if !path.exists() {
        return Ok(Vec::new());
    }
    let json = fs::read_to_string(path)
        .with_context(|| format!("Failed to read dirty set file: {}", path.display()))?;
    let ids: Vec<LogIdentifier> =
        serde_json::from_str(&json).context("Failed to parse dirty set JSON")?;
    Ok(ids)
}

/// Saves the pending dirty set atomically.
pub fn save_dirty_set(path: &Path, ids: &[LogIdentifier]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    let temp = path.with_extension("json.tmp");
    let json = serde_json::to_string(ids).context("Failed to serialize dirty set")?;
    fs::write(&temp, json).context("Failed to write dirty set temp file")?;
    fs::rename(&temp, path).context("Failed to rename dirty set temp file")?;

    Ok(())
}
