//! In-memory inverted index with persistent document storage.

use std::collections::{HashMap, HashSet};
use std::path::PathBuf;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::IndexError;
use crate::models::{IndexDocument, LogIdentifier};

use super::persistence::{load_documents, save_documents};

// Tokens shorter than this are noise and never indexed
const MIN_TOKEN_LEN: usize = 2;

struct IndexInner {
    documents: HashMap<LogIdentifier, IndexDocument>,
    postings: HashMap<String, HashSet<LogIdentifier>>,
    /// Unsaved changes since the last flush
    modified: bool,
}

impl IndexInner {
    fn empty() -> Self {
        Self { documents: HashMap::new(), postings: HashMap::new(), modified: false }
    }

    fn from_documents(documents: Vec<IndexDocument>) -> Self {
        let mut inner = Self::empty();
        for doc in documents {
            inner.insert(doc);
        }
        inner.modified = false;
        inner
    }

    fn insert(&mut self, doc: IndexDocument) {
        self.remove(&doc.id);
        for token in tokenize(&doc.content) {
            self.postings.entry(token).or_default().insert(doc.id.clone());
        }
        self.documents.insert(doc.id.clone(), doc);
        self.modified = true;
    }

    fn remove(&mut self, id: &LogIdentifier) {
        if self.documents.remove(id).is_none() {
            return;
        }
        self.postings.retain(|_, ids| {
            ids.remove(id);
            !ids.is_empty()
        });
        self.modified = true;
    }
}

/// Wraps the persistent full-text index keyed by [`LogIdentifier`].
///
/// One lock serializes every store operation, so a document replace is a
/// single logical step: callers never observe zero or two documents for the
/// same identifier. Document mutation is in-memory only; durability comes
/// from [`flush`](Self::flush), which is the only operation doing file I/O
/// after open.
pub struct IndexStore {
    dir: PathBuf,
    inner: Mutex<Option<IndexInner>>,
}

impl IndexStore {
    /// Creates a closed store backed by `dir`. Nothing touches the disk
    /// until [`open`](Self::open).
    pub fn new(dir: PathBuf) -> Self {
        Self { dir, inner: Mutex::new(None) }
    }

    /// Opens the store, loading any persisted documents.
    ///
    /// A missing index means a fresh empty one; a version mismatch discards
    /// the old index and starts empty.
    ///
    /// # Errors
    ///
    /// [`IndexError::OpenFailed`] if the backing files exist but cannot be
    /// read. Callers degrade to disabled rather than crash.
    pub fn open(&self) -> Result<(), IndexError> {
        let mut inner = self.inner.lock();
        if inner.is_some() {
            return Ok(());
        }

        let loaded = load_documents(&self.dir).map_err(|e| IndexError::OpenFailed {
            path: self.dir.clone(),
            reason: format!("{e:#}"),
        })?;

        let state = match loaded {
            Some(documents) => {
                info!(count = documents.len(), "loaded persisted index");
                IndexInner::from_documents(documents)
            }
            None => {
                debug!(dir = %self.dir.display(), "no persisted index, starting empty");
                IndexInner::empty()
            }
        };
        *inner = Some(state);
        Ok(())
    }

    /// Flushes and closes the store. Further writes fail with
    /// [`IndexError::WriteFailed`] until reopened.
    pub fn close(&self) {
        if let Err(e) = self.flush() {
            warn!(error = %e, "flush on close failed");
        }
        *self.inner.lock() = None;
    }

    pub fn is_open(&self) -> bool {
        self.inner.lock().is_some()
    }

    /// Adds or replaces the document for `doc.id` as a single logical step.
    ///
    /// # Errors
    ///
    /// [`IndexError::DocumentUnreadable`] if the content yields no
    /// indexable tokens (the document is skipped, never retried);
    /// [`IndexError::WriteFailed`] if the store is closed (transient, the
    /// identifier stays dirty).
    pub fn add_or_update_document(&self, doc: IndexDocument) -> Result<(), IndexError> {
        let mut guard = self.inner.lock();
        let inner = guard
            .as_mut()
            .ok_or_else(|| IndexError::WriteFailed("index store is closed".to_string()))?;

        if tokenize(&doc.content).is_empty() {
            return Err(IndexError::DocumentUnreadable {
                id: doc.id.to_string(),
                reason: "no indexable tokens".to_string(),
            });
        }

        inner.insert(doc);
        Ok(())
    }

    /// Removes zero or more documents; absent ids are no-ops.
    pub fn remove_documents(&self, ids: &[LogIdentifier]) {
        let mut guard = self.inner.lock();
        let Some(inner) = guard.as_mut() else {
            return;
        };
        for id in ids {
            inner.remove(id);
        }
    }

    pub fn contains(&self, id: &LogIdentifier) -> bool {
        self.inner.lock().as_ref().is_some_and(|inner| inner.documents.contains_key(id))
    }

    pub fn document_count(&self) -> usize {
        self.inner.lock().as_ref().map_or(0, |inner| inner.documents.len())
    }

    /// Identifiers whose content matches every token of `query`, sorted for
    /// stable output. Presentation of results is the caller's problem.
    pub fn search(&self, query: &str) -> Vec<LogIdentifier> {
        let guard = self.inner.lock();
        let Some(inner) = guard.as_ref() else {
            return Vec::new();
        };

        let tokens = tokenize(query);
        if tokens.is_empty() {
            return Vec::new();
        }

        let mut matches: Option<HashSet<&LogIdentifier>> = None;
        for token in &tokens {
            let ids: HashSet<&LogIdentifier> =
                inner.postings.get(token).map(|s| s.iter().collect()).unwrap_or_default();
            matches = Some(match matches {
                None => ids,
                Some(prev) => prev.intersection(&ids).copied().collect(),
            });
            if matches.as_ref().is_some_and(HashSet::is_empty) {
                return Vec::new();
            }
        }

        let mut result: Vec<LogIdentifier> =
            matches.unwrap_or_default().into_iter().cloned().collect();
        result.sort();
        result
    }

    /// Forces durability of pending writes.
    ///
    /// # Errors
    ///
    /// [`IndexError::WriteFailed`] if the snapshot cannot be written; the
    /// in-memory index is unaffected and the next flush retries.
    pub fn flush(&self) -> Result<(), IndexError> {
        let mut guard = self.inner.lock();
        let Some(inner) = guard.as_mut() else {
            return Ok(());
        };
        if !inner.modified {
            return Ok(());
        }

        let documents: Vec<IndexDocument> = inner.documents.values().cloned().collect();
        save_documents(&self.dir, &documents)
            .map_err(|e| IndexError::WriteFailed(format!("{e:#}")))?;
        inner.modified = false;
        Ok(())
    }
}

/// Lowercased alphanumeric tokens of at least [`MIN_TOKEN_LEN`] characters.
fn tokenize(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= MIN_TOKEN_LEN)
        .map(|t| t.to_lowercase())
        .filter(|t| seen.insert(t.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentMetadata;

    fn doc(id: &str, content: &str) -> IndexDocument {
        IndexDocument {
            id: LogIdentifier::new(id),
            content: content.to_string(),
            metadata: DocumentMetadata::default(),
        }
    }

    fn open_store(dir: &std::path::Path) -> IndexStore {
        let store = IndexStore::new(dir.to_path_buf());
        store.open().unwrap();
        store
    }

    #[test]
    fn test_tokenize() {
        assert_eq!(tokenize("Hello, world!"), vec!["hello", "world"]);
        assert_eq!(tokenize("a b c"), Vec::<String>::new());
        // Duplicates collapse
        assert_eq!(tokenize("foo foo FOO"), vec!["foo"]);
    }

    #[test]
    fn test_add_then_search() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        store.add_or_update_document(doc("a/b/x.log", "hello brave world")).unwrap();
        store.add_or_update_document(doc("a/c/y.log", "hello again")).unwrap();

        assert_eq!(store.search("hello").len(), 2);
        assert_eq!(store.search("brave world"), vec![LogIdentifier::new("a/b/x.log")]);
        assert!(store.search("absent").is_empty());
    }

    #[test]
    fn test_readd_replaces() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        let id = LogIdentifier::new("a/b/x.log");

        store.add_or_update_document(doc("a/b/x.log", "original words")).unwrap();
        store.add_or_update_document(doc("a/b/x.log", "replacement text")).unwrap();

        assert_eq!(store.document_count(), 1);
        assert!(store.search("original").is_empty());
        assert_eq!(store.search("replacement"), vec![id]);
    }

    #[test]
    fn test_untokenizable_content_is_unreadable() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());

        let err = store.add_or_update_document(doc("a/b/x.log", "? ! .")).unwrap_err();
        assert!(matches!(err, IndexError::DocumentUnreadable { .. }));
        assert_eq!(store.document_count(), 0);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let store = open_store(dir.path());
        store.remove_documents(&[LogIdentifier::new("a/b/x.log")]);
        assert_eq!(store.document_count(), 0);
    }

    #[test]
    fn test_closed_store_write_is_transient() {
        let dir = tempfile::tempdir().unwrap();
        let store = IndexStore::new(dir.path().to_path_buf());
        let err = store.add_or_update_document(doc("a/b/x.log", "hello")).unwrap_err();
        assert!(matches!(err, IndexError::WriteFailed(_)));
    }

    #[test]
    fn test_flush_and_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path());
            store.add_or_update_document(doc("a/b/x.log", "persisted words")).unwrap();
            store.flush().unwrap();
        }

        let store = open_store(dir.path());
        assert_eq!(store.document_count(), 1);
        assert_eq!(store.search("persisted"), vec![LogIdentifier::new("a/b/x.log")]);
    }

    #[test]
    fn test_corrupt_index_fails_open() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = open_store(dir.path());
            store.add_or_update_document(doc("a/b/x.log", "hello")).unwrap();
            store.flush().unwrap();
        }
        std::fs::write(dir.path().join("index-documents.bin"), b"garbage").unwrap();

        let store = IndexStore::new(dir.path().to_path_buf());
        assert!(matches!(store.open(), Err(IndexError::OpenFailed { .. })));
    }
}
