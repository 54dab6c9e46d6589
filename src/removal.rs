//! Retraction of deleted or moved logs.

use std::sync::Arc;

use tracing::debug;

use crate::dirty::DirtySetTracker;
use crate::index_store::IndexStore;
use crate::models::LogIdentifier;

/// Removes documents and pending dirty markers for deleted or moved logs.
///
/// Holds the dirty-set lock and acquires the index-store lock inside it,
/// the same order the scheduler's commit step uses, so a retraction and an
/// in-flight indexing pass serialize cleanly: whichever runs first, the
/// final state has neither a dirty marker nor an index document for the
/// removed identifier.
pub struct PathRemovalCoordinator {
    dirty: Arc<DirtySetTracker>,
    store: Arc<IndexStore>,
}

impl PathRemovalCoordinator {
    pub fn new(dirty: Arc<DirtySetTracker>, store: Arc<IndexStore>) -> Self {
        Self { dirty, store }
    }

    /// Retracts each id from the dirty set (if pending) and the index (if
    /// committed). A deleted transcript can neither be re-indexed nor
    /// appear in search results afterwards.
    pub fn remove_paths_from_index(&self, ids: &[LogIdentifier]) {
        let mut state = self.dirty.lock();
        for id in ids {
            state.retract(id);
        }
        // Dirty lock still held: the scheduler cannot commit one of these
        // ids between the retraction above and the removal below.
        self.store.remove_documents(ids);
        drop(state);

        debug!(count = ids.len(), "retracted removed logs");
    }
}
