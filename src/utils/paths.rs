//! Log directory naming and path helpers.
//!
//! Transcript logs live under `<base>/<account>/<object>/<file>.log`, where
//! the account and object components are percent-encoded so that arbitrary
//! account and contact names (which may contain separators or control
//! characters) map to exactly one directory name each.

use std::borrow::Cow;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use percent_encoding::{AsciiSet, CONTROLS, percent_decode_str, utf8_percent_encode};

// Characters that may not appear in a directory component
const ENCODE_SET: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'<')
    .add(b'>')
    .add(b'`')
    .add(b'?')
    .add(b'/')
    .add(b'\\')
    .add(b':')
    .add(b'*')
    .add(b'|');

/// Encodes one path component (account or remote object name).
///
/// Distinct names always encode to distinct components; `/` and other
/// separator characters are percent-escaped.
pub fn encode_component(name: &str) -> String {
    utf8_percent_encode(name, ENCODE_SET).to_string()
}

/// Decodes a component encoded by [`encode_component`].
pub fn decode_component(encoded: &str) -> String {
    let decoded = percent_decode_str(encoded).decode_utf8_lossy();
    match decoded {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}

/// Default base directory for transcript logs
/// (`~/.local/share/transcript-indexer/logs` on Linux).
pub fn default_log_base_dir() -> Result<PathBuf> {
    let data_dir = dirs::data_dir().context("Failed to get platform data directory")?;
    Ok(data_dir.join("transcript-indexer").join("logs"))
}

/// Platform cache directory holding the search index and the persisted
/// dirty set for a specific log base directory.
///
/// Each base directory gets its own subdirectory keyed by a path hash, so
/// two profiles never share index state.
pub fn index_cache_dir(log_base_dir: &Path) -> Result<PathBuf> {
    let cache_base = dirs::cache_dir().context("Failed to get platform cache directory")?;
    let path_hash = compute_path_hash(log_base_dir);
    Ok(cache_base.join("transcript-indexer").join(path_hash))
}

/// Hash of the canonical base path, first 12 hex characters.
fn compute_path_hash(path: &Path) -> String {
    use std::collections::hash_map::DefaultHasher;
    use std::hash::{Hash, Hasher};

    // Canonicalize when possible so symlinked and relative spellings of the
    // same directory share one cache; fall back to the raw path otherwise.
    let canonical = path.canonicalize().unwrap_or_else(|_| path.to_path_buf());

    let mut hasher = DefaultHasher::new();
    canonical.hash(&mut hasher);
    format!("{:016x}", hasher.finish())[..12].to_string()
}

/// Formats a path with ~ substitution for the home directory.
pub fn format_path_with_tilde(path: &Path) -> String {
    format_path_with_tilde_internal(path, None)
}

pub(crate) fn format_path_with_tilde_internal(path: &Path, home_override: Option<&str>) -> String {
    let home_from_env = env::var("HOME").ok();
    let home = home_override.or(home_from_env.as_deref());

    let path_str = path.to_string_lossy();
    if let Some(home) = home
        && path_str.starts_with(home)
    {
        return path_str.replacen(home, "~", 1);
    }

    match path_str {
        Cow::Borrowed(s) => s.to_string(),
        Cow::Owned(s) => s,
    }
}
