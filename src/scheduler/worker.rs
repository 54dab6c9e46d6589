//! The indexing scheduler and its worker loop.

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex};
use tracing::{debug, info, warn};

use crate::dirty::DirtySetTracker;
use crate::error::{IndexError, LoadError};
use crate::index_store::IndexStore;
use crate::loader::TranscriptLoader;
use crate::models::{IndexDocument, IndexState, IndexingProgress, LogIdentifier};

/// Identifiers drained per lock acquisition.
const DRAIN_BATCH_SIZE: usize = 32;

/// Back-off before retrying a pass that made no forward progress.
const RETRY_DELAY: Duration = Duration::from_secs(2);

struct Control {
    state: IndexState,
    paused: bool,
    enabled: bool,
    shutdown: bool,
    logs_indexed: u64,
}

struct SchedulerShared {
    control: Mutex<Control>,
    cvar: Condvar,
    dirty: Arc<DirtySetTracker>,
    store: Arc<IndexStore>,
    loader: Arc<dyn TranscriptLoader>,
}

impl SchedulerShared {
    fn should_stop(&self) -> bool {
        let control = self.control.lock();
        control.shutdown || control.paused || !control.enabled
    }
}

/// Drives the background worker that drains the dirty set into the index
/// store.
///
/// At most one worker is ever active: the thread is spawned once by
/// [`start`](Self::start) and every store mutation it performs runs under
/// the store's own serialization lock. All control operations are
/// non-blocking or bounded-wait; only the worker itself blocks on I/O.
pub struct IndexingScheduler {
    shared: Arc<SchedulerShared>,
    worker: Mutex<Option<JoinHandle<()>>>,
}

impl IndexingScheduler {
    /// Wires the scheduler to its collaborators. The worker does not run
    /// until [`start`](Self::start); the initial state is `Disabled`.
    pub fn new(
        dirty: Arc<DirtySetTracker>,
        store: Arc<IndexStore>,
        loader: Arc<dyn TranscriptLoader>,
    ) -> Self {
        let shared = Arc::new(SchedulerShared {
            control: Mutex::new(Control {
                state: IndexState::Disabled,
                paused: false,
                enabled: false,
                shutdown: false,
                logs_indexed: 0,
            }),
            cvar: Condvar::new(),
            dirty: Arc::clone(&dirty),
            store,
            loader,
        });

        // mark_dirty wakes the worker when it is idle
        let wake = Arc::clone(&shared);
        dirty.set_wake_hook(Arc::new(move || {
            let _control = wake.control.lock();
            wake.cvar.notify_all();
        }));

        Self { shared, worker: Mutex::new(None) }
    }

    /// Enables indexing and spawns the worker thread if it is not running.
    pub fn start(&self) {
        {
            let mut control = self.shared.control.lock();
            control.enabled = true;
            if control.state == IndexState::Disabled {
                control.state = IndexState::Idle;
            }
            self.shared.cvar.notify_all();
        }

        let mut worker = self.worker.lock();
        if worker.is_none() {
            let shared = Arc::clone(&self.shared);
            *worker = Some(thread::spawn(move || run_worker(shared)));
        }
    }

    /// Disables indexing. The worker finishes its current item, then parks.
    /// Dirty markers are retained; a later [`start`](Self::start) resumes
    /// exactly where the backlog left off.
    pub fn disable(&self) {
        let mut control = self.shared.control.lock();
        control.enabled = false;
        control.state = IndexState::Disabled;
        self.shared.cvar.notify_all();
    }

    /// Asks the worker to suspend after its current item.
    pub fn pause_indexing(&self) {
        let mut control = self.shared.control.lock();
        if !control.paused {
            control.paused = true;
            if control.state != IndexState::Disabled {
                control.state = IndexState::Paused;
            }
            self.shared.cvar.notify_all();
        }
    }

    /// Clears the pause flag and wakes the worker.
    pub fn resume_indexing(&self) {
        let mut control = self.shared.control.lock();
        if control.paused {
            control.paused = false;
            if control.enabled && control.state == IndexState::Paused {
                control.state = if self.shared.dirty.is_empty() {
                    IndexState::Idle
                } else {
                    IndexState::Indexing
                };
            }
            self.shared.cvar.notify_all();
        }
    }

    /// Non-blocking snapshot of the progress counters. The total is
    /// recomputed from the current backlog, so it reflects concurrently
    /// added work rather than a frozen snapshot.
    pub fn progress(&self) -> IndexingProgress {
        let logs_indexed = self.shared.control.lock().logs_indexed;
        let backlog = self.shared.dirty.backlog_len() as u64;
        IndexingProgress { logs_indexed, logs_to_index: logs_indexed + backlog }
    }

    pub fn state(&self) -> IndexState {
        self.shared.control.lock().state
    }

    /// Blocks until the worker is idle (or disabled) with an empty dirty
    /// set, or until `timeout` elapses. Returns true if idle was reached.
    pub fn wait_for_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        let mut control = self.shared.control.lock();
        loop {
            let settled = match control.state {
                IndexState::Idle => self.shared.dirty.is_empty(),
                IndexState::Disabled => true,
                _ => false,
            };
            if settled {
                return true;
            }
            let now = Instant::now();
            if now >= deadline {
                return false;
            }
            let _ = self.shared.cvar.wait_for(&mut control, deadline - now);
        }
    }

    /// Drops every dirty marker and resets the progress counters. The only
    /// operation that clears retained markers; typically followed by a full
    /// re-mark for a rebuild.
    pub fn reset_all(&self) {
        self.shared.dirty.clear_all();
        let mut control = self.shared.control.lock();
        control.logs_indexed = 0;
        self.shared.cvar.notify_all();
    }

    /// Signals the worker to exit at the next item boundary and joins it.
    /// Unprocessed identifiers stay in the dirty set.
    pub fn shutdown(&self) {
        {
            let mut control = self.shared.control.lock();
            control.shutdown = true;
            self.shared.cvar.notify_all();
        }
        if let Some(handle) = self.worker.lock().take() {
            let _ = handle.join();
        }
    }
}

impl Drop for IndexingScheduler {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_worker(shared: Arc<SchedulerShared>) {
    debug!("indexing worker started");
    loop {
        // Park until enabled, unpaused, and work is available
        {
            let mut control = shared.control.lock();
            loop {
                if control.shutdown {
                    control.state = if control.enabled {
                        IndexState::Idle
                    } else {
                        IndexState::Disabled
                    };
                    shared.cvar.notify_all();
                    debug!("indexing worker exiting");
                    return;
                }
                if !control.enabled {
                    control.state = IndexState::Disabled;
                } else if control.paused {
                    control.state = IndexState::Paused;
                } else if !shared.dirty.is_empty() {
                    if control.state == IndexState::Idle {
                        // Fresh cycle: counters reset to track this backlog
                        control.logs_indexed = 0;
                    }
                    control.state = IndexState::Indexing;
                    break;
                } else if control.state != IndexState::Idle {
                    control.state = IndexState::Idle;
                    shared.cvar.notify_all();
                }
                shared.cvar.wait(&mut control);
            }
        }

        run_pass(&shared);
    }
}

/// One indexing pass: drain until the dirty set is empty or a control flag
/// stops the loop.
fn run_pass(shared: &SchedulerShared) {
    let mut retry: Vec<LogIdentifier> = Vec::new();
    let mut progressed = false;

    'pass: loop {
        let batch = shared.dirty.drain_batch(Some(DRAIN_BATCH_SIZE));
        if batch.is_empty() {
            break;
        }

        let mut remaining = batch.into_iter();
        while let Some(id) = remaining.next() {
            // Cooperative stop: flags are honored only at item boundaries,
            // and unprocessed identifiers go back to the dirty set.
            if shared.should_stop() {
                shared.dirty.requeue(id);
                for rest in remaining {
                    shared.dirty.requeue(rest);
                }
                break 'pass;
            }

            match process_item(shared, &id) {
                ItemOutcome::Indexed | ItemOutcome::Skipped => {
                    let mut control = shared.control.lock();
                    control.logs_indexed += 1;
                    shared.cvar.notify_all();
                    drop(control);
                    progressed = true;
                }
                ItemOutcome::Retracted => {
                    progressed = true;
                }
                ItemOutcome::Retry => retry.push(id),
            }
        }
    }

    let mut requeued = 0usize;
    for id in retry {
        if shared.dirty.requeue(id) {
            requeued += 1;
        }
    }

    if let Err(e) = shared.store.flush() {
        warn!(error = %e, "index flush failed, will retry next pass");
    }
    if let Err(e) = shared.dirty.persist() {
        warn!(error = %e, "failed to persist dirty set");
    }

    if requeued > 0 {
        info!(requeued, "transient failures left marked dirty for retry");
        if !progressed {
            // Only failures this pass; back off instead of spinning
            let mut control = shared.control.lock();
            if !control.shutdown && !control.paused && control.enabled {
                let _ = shared.cvar.wait_for(&mut control, RETRY_DELAY);
            }
        }
    }
}

enum ItemOutcome {
    /// Document written; counts toward progress.
    Indexed,
    /// Permanently unindexable; processed but produced no document.
    Skipped,
    /// Deleted while in flight; leaves the backlog without being counted.
    Retracted,
    /// Transient failure; requeued at the end of the pass.
    Retry,
}

fn process_item(shared: &SchedulerShared, id: &LogIdentifier) -> ItemOutcome {
    // Content loading may block on I/O; no locks are held here.
    let loaded = match shared.loader.load(id) {
        Ok(loaded) => loaded,
        Err(LoadError::NotFound(_)) => {
            debug!(id = %id, "transcript gone, skipping");
            shared.dirty.finish(id);
            return ItemOutcome::Skipped;
        }
        Err(e) => {
            warn!(id = %id, error = %e, "transcript load failed, will retry");
            return ItemOutcome::Retry;
        }
    };

    // Commit under the dirty lock (dirty before index store, the global
    // order) so a concurrent retraction cannot interleave between the
    // tombstone check and the index write.
    let mut dirty = shared.dirty.lock();
    if dirty.take_retracted(id) {
        dirty.finish(id);
        debug!(id = %id, "retracted while in flight, skipping");
        return ItemOutcome::Retracted;
    }

    let doc = IndexDocument { id: id.clone(), content: loaded.content, metadata: loaded.metadata };
    match shared.store.add_or_update_document(doc) {
        Ok(()) => {
            dirty.finish(id);
            ItemOutcome::Indexed
        }
        Err(IndexError::DocumentUnreadable { reason, .. }) => {
            dirty.finish(id);
            warn!(id = %id, reason, "document unreadable, skipping");
            ItemOutcome::Skipped
        }
        Err(e) => {
            drop(dirty);
            warn!(id = %id, error = %e, "index write failed, will retry");
            ItemOutcome::Retry
        }
    }
}
