//! Open log writer lifecycle.
//!
//! One writer per active conversation, closed after an inactivity window by
//! a periodic sweeper thread. A log is marked dirty exactly once per close
//! (never per write), so the index only ever sees fully flushed content.

use std::collections::HashMap;
use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use chrono::Utc;
use parking_lot::{Condvar, Mutex};
use tracing::{debug, warn};

use crate::dirty::DirtySetTracker;
use crate::models::LogIdentifier;

struct AppenderEntry {
    writer: BufWriter<File>,
    last_write: Instant,
}

struct Shared {
    entries: Mutex<HashMap<LogIdentifier, AppenderEntry>>,
    dirty: Arc<DirtySetTracker>,
    base_dir: PathBuf,
    window: Duration,
    shutdown: Mutex<bool>,
    cvar: Condvar,
}

impl Shared {
    /// Removes every entry idle for at least the window, then closes them
    /// outside the map lock.
    fn sweep(&self) {
        let now = Instant::now();
        let expired: Vec<(LogIdentifier, AppenderEntry)> = {
            let mut entries = self.entries.lock();
            let ids: Vec<LogIdentifier> = entries
                .iter()
                .filter(|(_, e)| now.duration_since(e.last_write) >= self.window)
                .map(|(id, _)| id.clone())
                .collect();
            ids.into_iter().filter_map(|id| entries.remove(&id).map(|e| (id, e))).collect()
        };

        for (id, entry) in expired {
            close_entry(&self.dirty, id, entry);
        }
    }
}

/// Flushes, releases the writer, and marks the log dirty exactly once.
fn close_entry(dirty: &DirtySetTracker, id: LogIdentifier, mut entry: AppenderEntry) {
    if let Err(e) = entry.writer.flush() {
        warn!(id = %id, error = %e, "failed to flush log writer on close");
    }
    drop(entry);
    debug!(id = %id, "closed idle log writer");
    dirty.mark_dirty(id);
}

/// Owns the open per-conversation log writers.
///
/// Writers are created lazily on the first write after a period of
/// inactivity and destroyed when the sweeper finds them idle or on forced
/// shutdown. The sweeper runs on its own thread and takes the entry lock
/// before touching the map, so a sweep racing a late append or an explicit
/// close is safe; "entry not found" is always a benign no-op.
pub struct AppenderLifecycleManager {
    shared: Arc<Shared>,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl AppenderLifecycleManager {
    pub fn new(dirty: Arc<DirtySetTracker>, base_dir: PathBuf, window: Duration) -> Self {
        let shared = Arc::new(Shared {
            entries: Mutex::new(HashMap::new()),
            dirty,
            base_dir,
            window,
            shutdown: Mutex::new(false),
            cvar: Condvar::new(),
        });

        let sweeper_shared = Arc::clone(&shared);
        let handle = thread::spawn(move || run_sweeper(sweeper_shared));

        Self { shared, sweeper: Mutex::new(Some(handle)) }
    }

    /// Writes `content` through the conversation's writer, creating it if
    /// needed, and re-arms the close timer. Nothing is visible to the
    /// indexer until the writer closes.
    ///
    /// # Errors
    ///
    /// Returns an error if the log file cannot be created or written.
    pub fn append_content(
        &self,
        account: &str,
        object: &str,
        content: &str,
    ) -> Result<LogIdentifier> {
        let file_name = format!("{} ({}).log", object, Utc::now().format("%Y-%m-%d"));
        let id = LogIdentifier::from_parts(account, object, &file_name);

        let mut entries = self.shared.entries.lock();
        let entry = match entries.entry(id.clone()) {
            std::collections::hash_map::Entry::Occupied(e) => e.into_mut(),
            std::collections::hash_map::Entry::Vacant(slot) => {
                let path = self.shared.base_dir.join(id.relative_path());
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).with_context(|| {
                        format!("Failed to create log directory: {}", parent.display())
                    })?;
                }
                let file = OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&path)
                    .with_context(|| format!("Failed to open log file: {}", path.display()))?;
                debug!(id = %id, "opened log writer");
                slot.insert(AppenderEntry {
                    writer: BufWriter::new(file),
                    last_write: Instant::now(),
                })
            }
        };

        entry.writer.write_all(content.as_bytes()).context("Failed to write log content")?;
        entry.writer.write_all(b"\n").context("Failed to write log content")?;
        entry.last_write = Instant::now();

        Ok(id)
    }

    /// Closes the writer for `id` if it has been idle for the window.
    /// A missing entry (already closed by another path) is a no-op.
    pub fn close_if_idle(&self, id: &LogIdentifier) {
        let removed = {
            let mut entries = self.shared.entries.lock();
            let expired = entries
                .get(id)
                .is_some_and(|e| e.last_write.elapsed() >= self.shared.window);
            if expired { entries.remove(id).map(|e| (id.clone(), e)) } else { None }
        };
        if let Some((id, entry)) = removed {
            close_entry(&self.shared.dirty, id, entry);
        }
    }

    /// Synchronously flushes and closes every open writer, marking each log
    /// dirty. Returns only after all entries are released.
    pub fn force_close_all(&self) {
        let drained: Vec<(LogIdentifier, AppenderEntry)> =
            self.shared.entries.lock().drain().collect();
        for (id, entry) in drained {
            close_entry(&self.shared.dirty, id, entry);
        }
    }

    /// Number of currently open writers.
    pub fn open_count(&self) -> usize {
        self.shared.entries.lock().len()
    }

    /// Stops the sweeper and force-closes everything. Idempotent.
    pub fn shutdown(&self) {
        let handle = {
            let mut stop = self.shared.shutdown.lock();
            *stop = true;
            self.shared.cvar.notify_all();
            self.sweeper.lock().take()
        };
        if let Some(handle) = handle {
            let _ = handle.join();
        }
        self.force_close_all();
    }
}

impl Drop for AppenderLifecycleManager {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn run_sweeper(shared: Arc<Shared>) {
    let tick = (shared.window / 4)
        .clamp(Duration::from_millis(10), Duration::from_secs(1));
    loop {
        {
            let mut stop = shared.shutdown.lock();
            if *stop {
                break;
            }
            let _ = shared.cvar.wait_for(&mut stop, tick);
            if *stop {
                break;
            }
        }
        shared.sweep();
    }
}
