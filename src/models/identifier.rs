//! Stable transcript identifiers.

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::utils::paths::{decode_component, encode_component};

/// Stable string key identifying one transcript.
///
/// Derived from the owning account, the conversation partner (or chat
/// object), and the transcript file name; doubles as the index document key
/// and the transcript's path relative to the log base directory. The
/// account and object components are percent-encoded, so the `/` separators
/// are unambiguous.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LogIdentifier(String);

impl LogIdentifier {
    /// Wraps an already-derived key (e.g. a relative path found on disk).
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// Derives the identifier for a transcript of `object` on `account`
    /// stored in `file_name`.
    pub fn from_parts(account: &str, object: &str, file_name: &str) -> Self {
        Self(format!(
            "{}/{}/{}",
            encode_component(account),
            encode_component(object),
            encode_component(file_name)
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The transcript's path relative to the log base directory.
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(&self.0)
    }

    /// The owning account name, decoded.
    pub fn account(&self) -> String {
        decode_component(self.component(0))
    }

    /// The conversation partner or chat object name, decoded.
    pub fn remote_object(&self) -> String {
        decode_component(self.component(1))
    }

    fn component(&self, n: usize) -> &str {
        self.0.split('/').nth(n).unwrap_or("")
    }
}

impl fmt::Display for LogIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for LogIdentifier {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}
