//! Thread-safe set of pending-reindex identifiers.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use parking_lot::{Mutex, MutexGuard, RwLock};
use tracing::debug;

use crate::models::LogIdentifier;

use super::persistence::{load_dirty_set, save_dirty_set};

type WakeHook = Arc<dyn Fn() + Send + Sync>;

/// Mutable dirty-set state, guarded by the tracker's lock.
///
/// Besides the pending set this tracks the batch currently drained by the
/// indexing worker (`in_flight`) and retraction tombstones for in-flight
/// identifiers whose transcript was deleted mid-pass. Both critical
/// sections that race on a deletion (the removal coordinator and the
/// worker's per-item commit) run under this lock, so a removed transcript
/// can never resurface in the index.
#[derive(Debug, Default)]
pub struct DirtyState {
    pending: HashSet<LogIdentifier>,
    in_flight: HashSet<LogIdentifier>,
    retracted: HashSet<LogIdentifier>,
}

impl DirtyState {
    /// Idempotent insert. Returns true if the identifier was not already
    /// pending.
    pub fn mark_dirty(&mut self, id: LogIdentifier) -> bool {
        // A re-marked identifier is live again even if a deletion tombstoned
        // it while in flight.
        self.retracted.remove(&id);
        self.pending.insert(id)
    }

    /// Atomically removes and returns up to `max` identifiers (all, if
    /// `None`), moving them into the in-flight set. Nothing returned here
    /// is visible to a second drain until re-inserted.
    pub fn drain_batch(&mut self, max: Option<usize>) -> Vec<LogIdentifier> {
        let take = max.unwrap_or(self.pending.len()).min(self.pending.len());
        let batch: Vec<LogIdentifier> = self.pending.iter().take(take).cloned().collect();
        for id in &batch {
            self.pending.remove(id);
            self.in_flight.insert(id.clone());
        }
        batch
    }

    /// Retracts a pending marker without indexing it. An in-flight
    /// identifier is tombstoned so the worker skips its commit.
    pub fn retract(&mut self, id: &LogIdentifier) {
        self.pending.remove(id);
        if self.in_flight.contains(id) {
            self.retracted.insert(id.clone());
        }
    }

    /// True and consumed if `id` was tombstoned by a retraction while in
    /// flight.
    pub fn take_retracted(&mut self, id: &LogIdentifier) -> bool {
        self.retracted.remove(id)
    }

    /// Marks an in-flight identifier fully processed (indexed or skipped).
    pub fn finish(&mut self, id: &LogIdentifier) {
        self.in_flight.remove(id);
        self.retracted.remove(id);
    }

    /// Returns an in-flight identifier to the pending set after a transient
    /// failure. Returns false if the identifier was retracted meanwhile
    /// (the marker is dropped instead).
    pub fn requeue(&mut self, id: LogIdentifier) -> bool {
        self.in_flight.remove(&id);
        if self.retracted.remove(&id) {
            return false;
        }
        self.pending.insert(id);
        true
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Identifiers still awaiting indexing, including the in-flight batch.
    pub fn backlog_len(&self) -> usize {
        (self.pending.len() + self.in_flight.len()).saturating_sub(self.retracted.len())
    }

    pub fn is_dirty(&self, id: &LogIdentifier) -> bool {
        self.pending.contains(id)
            || (self.in_flight.contains(id) && !self.retracted.contains(id))
    }

    fn clear(&mut self) {
        self.pending.clear();
        self.retracted.extend(self.in_flight.iter().cloned());
    }
}

/// Thread-safe owner of the dirty set.
///
/// All mutations are mutually exclusive; readers never observe a partially
/// updated set. No operation fails: membership is the only semantics. No
/// caller holds the lock across blocking I/O; persistence snapshots the set
/// and writes outside the lock.
pub struct DirtySetTracker {
    state: Mutex<DirtyState>,
    /// Wakes the scheduler when new work arrives; installed at wiring time.
    wake: RwLock<Option<WakeHook>>,
    /// Where the pending set is persisted between runs, if anywhere.
    save_path: RwLock<Option<PathBuf>>,
    /// Suppresses saving during bulk marking (full rebuild).
    suspend_saving: Mutex<bool>,
}

impl DirtySetTracker {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(DirtyState::default()),
            wake: RwLock::new(None),
            save_path: RwLock::new(None),
            suspend_saving: Mutex::new(false),
        }
    }

    /// Installs the hook that wakes the scheduler on `mark_dirty`.
    pub(crate) fn set_wake_hook(&self, hook: WakeHook) {
        *self.wake.write() = Some(hook);
    }

    /// Locks the dirty set for a compound critical section (batch
    /// retraction, the worker's commit step). Callers must not block on
    /// I/O while holding the guard; acquiring the index store lock inside
    /// it is the one sanctioned nesting, in that order.
    pub fn lock(&self) -> MutexGuard<'_, DirtyState> {
        self.state.lock()
    }

    /// Idempotent insert; wakes the scheduler if it is idle.
    pub fn mark_dirty(&self, id: LogIdentifier) -> bool {
        let inserted = {
            let mut state = self.state.lock();
            state.mark_dirty(id)
        };
        if inserted {
            self.notify_wake();
        }
        inserted
    }

    /// Bulk insert used on full rebuild; wakes the scheduler once.
    pub fn mark_all_dirty(&self, ids: impl IntoIterator<Item = LogIdentifier>) -> usize {
        let inserted = {
            let mut state = self.state.lock();
            ids.into_iter().filter(|id| state.mark_dirty(id.clone())).count()
        };
        if inserted > 0 {
            self.notify_wake();
        }
        inserted
    }

    pub fn drain_batch(&self, max: Option<usize>) -> Vec<LogIdentifier> {
        self.state.lock().drain_batch(max)
    }

    /// Retracts a single pending marker.
    pub fn remove(&self, id: &LogIdentifier) {
        self.state.lock().retract(id);
    }

    /// Retracts several pending markers.
    pub fn remove_all(&self, ids: &[LogIdentifier]) {
        let mut state = self.state.lock();
        for id in ids {
            state.retract(id);
        }
    }

    pub fn finish(&self, id: &LogIdentifier) {
        self.state.lock().finish(id);
    }

    pub fn requeue(&self, id: LogIdentifier) -> bool {
        self.state.lock().requeue(id)
    }

    /// Non-blocking snapshot read.
    pub fn is_empty(&self) -> bool {
        self.state.lock().is_empty()
    }

    pub fn is_dirty(&self, id: &LogIdentifier) -> bool {
        self.state.lock().is_dirty(id)
    }

    pub fn backlog_len(&self) -> usize {
        self.state.lock().backlog_len()
    }

    /// Clears every marker. The only operation that drops dirty state;
    /// disable/enable cycles retain it.
    pub fn clear_all(&self) {
        self.state.lock().clear();
    }

    /// Where to persist the pending set; loads any previously saved set.
    pub fn attach_save_path(&self, path: PathBuf) {
        let restored = match load_dirty_set(&path) {
            Ok(ids) => self.mark_all_dirty(ids),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "no saved dirty set restored");
                0
            }
        };
        if restored > 0 {
            debug!(restored, "restored dirty markers from disk");
        }
        *self.save_path.write() = Some(path);
    }

    /// Suspends or resumes persistence of the dirty set (used while bulk
    /// marking during a rebuild).
    pub fn set_saving_suspended(&self, suspended: bool) {
        *self.suspend_saving.lock() = suspended;
    }

    /// Persists the pending set if a save path is attached and saving is
    /// not suspended. The snapshot is taken under the lock; the write
    /// happens outside it.
    pub fn persist(&self) -> Result<()> {
        if *self.suspend_saving.lock() {
            return Ok(());
        }
        let Some(path) = self.save_path.read().clone() else {
            return Ok(());
        };
        let snapshot: Vec<LogIdentifier> = {
            let state = self.state.lock();
            state.pending.iter().cloned().collect()
        };
        save_dirty_set(&path, &snapshot)
    }

    fn notify_wake(&self) {
        if let Some(hook) = self.wake.read().as_ref() {
            hook();
        }
    }
}

impl Default for DirtySetTracker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id(s: &str) -> LogIdentifier {
        LogIdentifier::new(s)
    }

    #[test]
    fn test_mark_dirty_idempotent() {
        let tracker = DirtySetTracker::new();
        assert!(tracker.mark_dirty(id("a")));
        assert!(!tracker.mark_dirty(id("a")));
        assert_eq!(tracker.drain_batch(None), vec![id("a")]);
    }

    #[test]
    fn test_drain_batch_bounded() {
        let tracker = DirtySetTracker::new();
        tracker.mark_all_dirty(["a", "b", "c"].map(id));
        let batch = tracker.drain_batch(Some(2));
        assert_eq!(batch.len(), 2);
        assert_eq!(tracker.drain_batch(None).len(), 1);
        // Drained identifiers are not visible to a second drain
        assert!(tracker.drain_batch(None).is_empty());
        assert_eq!(tracker.backlog_len(), 3);
    }

    #[test]
    fn test_remove_pending() {
        let tracker = DirtySetTracker::new();
        tracker.mark_dirty(id("a"));
        tracker.remove(&id("a"));
        assert!(!tracker.is_dirty(&id("a")));
        assert!(tracker.is_empty());
    }

    #[test]
    fn test_retract_in_flight_tombstones() {
        let tracker = DirtySetTracker::new();
        tracker.mark_dirty(id("a"));
        let batch = tracker.drain_batch(None);
        assert_eq!(batch, vec![id("a")]);

        tracker.remove(&id("a"));
        assert!(!tracker.is_dirty(&id("a")));

        // The worker's commit sees the tombstone and skips
        let mut state = tracker.lock();
        assert!(state.take_retracted(&id("a")));
        state.finish(&id("a"));
        drop(state);
        assert_eq!(tracker.backlog_len(), 0);
    }

    #[test]
    fn test_requeue_respects_retraction() {
        let tracker = DirtySetTracker::new();
        tracker.mark_dirty(id("a"));
        tracker.mark_dirty(id("b"));
        let _ = tracker.drain_batch(None);

        tracker.remove(&id("a"));
        assert!(!tracker.requeue(id("a")));
        assert!(tracker.requeue(id("b")));
        assert!(tracker.is_dirty(&id("b")));
        assert!(!tracker.is_dirty(&id("a")));
    }

    #[test]
    fn test_remark_while_in_flight_stays_dirty() {
        let tracker = DirtySetTracker::new();
        tracker.mark_dirty(id("a"));
        let _ = tracker.drain_batch(None);

        // Content changed again while the worker holds it
        tracker.mark_dirty(id("a"));
        tracker.finish(&id("a"));
        assert!(tracker.is_dirty(&id("a")));
    }

    #[test]
    fn test_clear_all_tombstones_in_flight() {
        let tracker = DirtySetTracker::new();
        tracker.mark_dirty(id("a"));
        tracker.mark_dirty(id("b"));
        let _ = tracker.drain_batch(Some(1));
        tracker.clear_all();
        assert!(tracker.is_empty());
        assert_eq!(tracker.backlog_len(), 0);
    }

    #[test]
    fn test_wake_hook_fires_on_new_work_only() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let tracker = DirtySetTracker::new();
        let fired = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&fired);
        tracker.set_wake_hook(Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        tracker.mark_dirty(id("a"));
        tracker.mark_dirty(id("a"));
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }
}
