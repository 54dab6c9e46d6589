//! Index persistence: load/save with atomic writes.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use bincode::config;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::models::IndexDocument;

const METADATA_FILENAME: &str = "index-metadata.json";
const DOCUMENTS_FILENAME: &str = "index-documents.bin";

/// Index schema version for invalidation on format changes
pub const INDEX_VERSION: u32 = 1;

/// Metadata written next to the document file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexFileMetadata {
    pub version: u32,
    pub document_count: usize,
    pub saved_at: DateTime<Utc>,
}

/// Loads persisted documents from `dir`.
///
/// Returns `None` if no index has been saved yet or the version does not
/// match (caller starts empty and rebuilds). A present-but-unreadable index
/// is an error; callers map it to `OpenFailed`.
pub fn load_documents(dir: &Path) -> Result<Option<Vec<IndexDocument>>> {
    let metadata_path = dir.join(METADATA_FILENAME);
    let documents_path = dir.join(DOCUMENTS_FILENAME);

    if !metadata_path.exists() || !documents_path.exists() {
        return Ok(None);
    }

    let metadata_json =
        fs::read_to_string(&metadata_path).context("Failed to read index metadata file")?;
    let metadata: IndexFileMetadata =
        serde_json::from_str(&metadata_json).context("Failed to parse index metadata JSON")?;

    if metadata.version != INDEX_VERSION {
        tracing::warn!(
            expected = INDEX_VERSION,
            found = metadata.version,
            "index version mismatch, starting empty"
        );
        return Ok(None);
    }

    let document_bytes = fs::read(&documents_path).context("Failed to read index documents")?;
    let documents: Vec<IndexDocument> =
        bincode::serde::decode_from_slice(&document_bytes, config::standard())
            .context("Failed to deserialize index documents")?
            .0;

    Ok(Some(documents))
}

/// Saves documents and metadata atomically (temp file + rename) to `dir`.
pub fn save_documents(dir: &Path, documents: &[IndexDocument]) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create index directory: {}", dir.display()))?;

    let metadata = IndexFileMetadata {
        version: INDEX_VERSION,
        document_count: documents.len(),
        saved_at: Utc::now(),
    };

    let metadata_path = dir.join(METADATA_FILENAME);
    let metadata_temp = dir.join(format!("{}.tmp", METADATA_FILENAME));
    let metadata_json =
        serde_json::to_string_pretty(&metadata).context("Failed to serialize index metadata")?;
    fs::write(&metadata_temp, metadata_json).context("Failed to write index metadata temp file")?;
    fs::rename(&metadata_temp, &metadata_path)
        .context("Failed to rename index metadata temp file")?;

    let documents_temp = dir.join(format!("{}.tmp", DOCUMENTS_FILENAME));
    let document_bytes = bincode::serde::encode_to_vec(documents, config::standard())
        .context("Failed to serialize index documents")?;
    fs::write(&documents_temp, document_bytes)
        .context("Failed to write index documents temp file")?;
    fs::rename(&documents_temp, dir.join(DOCUMENTS_FILENAME))
        .context("Failed to rename index documents temp file")?;

    Ok(())
}
