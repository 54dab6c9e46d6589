use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::LogIdentifier;

/// Metadata stored alongside a document's content in the index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub account: String,
    pub remote_object: String,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}

/// One document to be written into the full-text index.
///
/// The identifier is the natural key: re-adding an id replaces the existing
/// document, it never duplicates it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: LogIdentifier,
    pub content: String,
    pub metadata: DocumentMetadata,
}
