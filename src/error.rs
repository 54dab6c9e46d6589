//! Typed errors for the indexing subsystem.
//!
//! No variant is fatal to the host process. `OpenFailed` degrades the
//! subsystem to [`IndexState::Disabled`](crate::models::IndexState::Disabled)
//! (logging keeps working without search); `DocumentUnreadable` skips one
//! document permanently; `WriteFailed` leaves the document marked dirty so
//! the next indexing pass retries it.

use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the index store.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The backing store could not be opened (corrupt or unreadable).
    #[error("failed to open index store at {path}: {reason}")]
    OpenFailed { path: PathBuf, reason: String },

    /// One document could not be tokenized or indexed. Not retried.
    #[error("document {id} cannot be indexed: {reason}")]
    DocumentUnreadable { id: String, reason: String },

    /// Transient write failure. The document stays marked dirty and is
    /// retried on the next pass.
    #[error("index write failed: {0}")]
    WriteFailed(String),
}

/// Errors raised by the external transcript content loader.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The transcript no longer exists. Treated like `DocumentUnreadable`:
    /// skipped, not retried.
    #[error("transcript not found: {}", .0.display())]
    NotFound(PathBuf),

    /// The transcript exists but could not be read. Treated like
    /// `WriteFailed`: retried on the next pass.
    #[error("failed to read transcript {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
