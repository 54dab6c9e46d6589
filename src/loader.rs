//! Transcript content loading for the indexing worker.

use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use chrono::{DateTime, Utc};

use crate::error::LoadError;
use crate::models::{DocumentMetadata, LogIdentifier};

/// Raw transcript text plus the metadata stored alongside it.
#[derive(Debug, Clone)]
pub struct LoadedTranscript {
    pub content: String,
    pub metadata: DocumentMetadata,
}

/// Supplies transcript content to the indexing worker.
///
/// Implementations may block on I/O; the worker only calls this off the
/// caller-facing path.
pub trait TranscriptLoader: Send + Sync {
    fn load(&self, id: &LogIdentifier) -> Result<LoadedTranscript, LoadError>;
}

/// Loads transcripts from files under the log base directory, at the path
/// the identifier names.
pub struct FileTranscriptLoader {
    base_dir: PathBuf,
}

impl FileTranscriptLoader {
    pub fn new(base_dir: PathBuf) -> Self {
        Self { base_dir }
    }
}

impl TranscriptLoader for FileTranscriptLoader {
    fn load(&self, id: &LogIdentifier) -> Result<LoadedTranscript, LoadError> {
        let path = self.base_dir.join(id.relative_path());

        let content = fs::read_to_string(&path).map_err(|e| match e.kind() {
            ErrorKind::NotFound => LoadError::NotFound(path.clone()),
            _ => LoadError::Io { path: path.clone(), source: e },
        })?;

        let last_timestamp: Option<DateTime<Utc>> = fs::metadata(&path)
            .and_then(|m| m.modified())
            .ok()
            .map(DateTime::<Utc>::from);

        Ok(LoadedTranscript {
            content,
            metadata: DocumentMetadata {
                account: id.account(),
                remote_object: id.remote_object(),
                first_timestamp: None,
                last_timestamp,
            },
        })
    }
}
