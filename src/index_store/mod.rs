//! Persistent full-text index over transcript content.
//!
//! Two-file layout under the index directory:
//! - `index-metadata.json`: JSON metadata (version, counts, save time)
//! - `index-documents.bin`: bincode-serialized documents
//!
//! The inverted term index is rebuilt from the documents at open; only the
//! documents themselves are persisted.

pub mod persistence;
pub mod store;

pub use persistence::{load_documents, save_documents};
pub use store::IndexStore;
