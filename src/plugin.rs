//! The logging plugin facade.
//!
//! Owns every component of the subsystem: the dirty-set tracker, the index
//! store, the appender lifecycle manager, the indexing scheduler, and the
//! removal coordinator. Created at plugin initialization, torn down by
//! [`shutdown`](LoggerPlugin::shutdown); components are injected into each
//! other here rather than reached through globals.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::appender::AppenderLifecycleManager;
use crate::config::LoggerConfig;
use crate::dirty::DirtySetTracker;
use crate::index_store::IndexStore;
use crate::loader::{FileTranscriptLoader, TranscriptLoader};
use crate::models::{IndexState, IndexingProgress, LogIdentifier};
use crate::removal::PathRemovalCoordinator;
use crate::scheduler::IndexingScheduler;

const DIRTY_SET_FILENAME: &str = "dirty-logs.json";

/// Bounded wait for the final flush at shutdown.
const SHUTDOWN_FLUSH_WAIT: Duration = Duration::from_secs(10);

/// Transcript logging with content search indexing.
pub struct LoggerPlugin {
    config: LoggerConfig,
    log_base_dir: PathBuf,
    index_dir: PathBuf,
    dirty: Arc<DirtySetTracker>,
    store: Arc<IndexStore>,
    appenders: AppenderLifecycleManager,
    scheduler: IndexingScheduler,
    removal: PathRemovalCoordinator,
}

impl LoggerPlugin {
    /// Builds the subsystem with the default filesystem content loader.
    pub fn new(config: LoggerConfig) -> Result<Self> {
        let log_base_dir = config.resolved_log_base_dir()?;
        let loader = Arc::new(FileTranscriptLoader::new(log_base_dir.clone()));
        Self::with_loader(config, loader)
    }

    /// Builds the subsystem around an externally supplied content loader.
    pub fn with_loader(config: LoggerConfig, loader: Arc<dyn TranscriptLoader>) -> Result<Self> {
        let log_base_dir = config.resolved_log_base_dir()?;
        let index_dir = config.resolved_index_dir()?;

        let dirty = Arc::new(DirtySetTracker::new());
        let store = Arc::new(IndexStore::new(index_dir.clone()));
        let appenders = AppenderLifecycleManager::new(
            Arc::clone(&dirty),
            log_base_dir.clone(),
            config.inactivity_window(),
        );
        let scheduler =
            IndexingScheduler::new(Arc::clone(&dirty), Arc::clone(&store), loader);
        let removal = PathRemovalCoordinator::new(Arc::clone(&dirty), Arc::clone(&store));

        Ok(Self { config, log_base_dir, index_dir, dirty, store, appenders, scheduler, removal })
    }

    /// Prepares content searching: opens the index, restores the saved
    /// dirty backlog, and starts the worker.
    ///
    /// An unopenable index degrades the subsystem to `Disabled` (logging
    /// still works, search does not) rather than failing the host.
    pub fn start(&self) -> Result<()> {
        if !self.config.indexing_enabled {
            info!("content indexing disabled by configuration");
            return Ok(());
        }

        match self.store.open() {
            Ok(()) => {
                self.dirty.attach_save_path(self.index_dir.join(DIRTY_SET_FILENAME));
                self.scheduler.start();
                info!(index_dir = %self.index_dir.display(), "content indexing started");
            }
            Err(e) => {
                warn!(error = %e, "index unavailable, content searching disabled");
            }
        }
        Ok(())
    }

    /// Appends conversation content to the transcript of `object` on
    /// `account`. The log is only marked dirty once its writer closes, so
    /// the index always reflects flushed content.
    pub fn append_content(&self, account: &str, object: &str, content: &str) -> Result<()> {
        if !self.config.logging_enabled {
            debug!(account, object, "logging disabled, dropping content");
            return Ok(());
        }
        self.appenders
            .append_content(account, object, content)
            .context("Failed to append transcript content")?;
        Ok(())
    }

    /// Marks one transcript stale relative to the index.
    pub fn mark_dirty(&self, id: LogIdentifier) {
        self.dirty.mark_dirty(id);
    }

    /// Marks every transcript under the log base directory dirty, driving
    /// a full re-index. Returns the number of transcripts marked.
    pub fn mark_all_dirty(&self) -> Result<usize> {
        // Bulk marking; don't rewrite the dirty set file per transcript
        self.dirty.set_saving_suspended(true);

        let mut ids = Vec::new();
        for entry in WalkDir::new(&self.log_base_dir).into_iter().filter_map(|e| e.ok()) {
            if !entry.file_type().is_file() {
                continue;
            }
            let Ok(relative) = entry.path().strip_prefix(&self.log_base_dir) else {
                continue;
            };
            ids.push(LogIdentifier::new(relative.to_string_lossy()));
        }
        let marked = self.dirty.mark_all_dirty(ids);

        self.dirty.set_saving_suspended(false);
        if let Err(e) = self.dirty.persist() {
            warn!(error = %e, "failed to persist dirty set after full mark");
        }

        info!(marked, "marked all transcripts dirty");
        Ok(marked)
    }

    /// Retracts deleted or moved logs from both the dirty set and the
    /// index.
    pub fn remove_paths_from_index(&self, ids: &[LogIdentifier]) {
        self.removal.remove_paths_from_index(ids);
    }

    pub fn pause_indexing(&self) {
        self.scheduler.pause_indexing();
    }

    pub fn resume_indexing(&self) {
        self.scheduler.resume_indexing();
    }

    /// `(complete, total)` snapshot for progress indicators.
    pub fn indexing_progress(&self) -> IndexingProgress {
        self.scheduler.progress()
    }

    pub fn index_state(&self) -> IndexState {
        self.scheduler.state()
    }

    pub fn is_dirty(&self, id: &LogIdentifier) -> bool {
        self.dirty.is_dirty(id)
    }

    /// Identifiers whose indexed content matches `query`.
    pub fn search(&self, query: &str) -> Vec<LogIdentifier> {
        self.store.search(query)
    }

    /// Blocks until indexing settles (idle or disabled with nothing
    /// pending), or until `timeout`. Returns true if it settled.
    pub fn wait_until_idle(&self, timeout: Duration) -> bool {
        self.scheduler.wait_for_idle(timeout)
    }

    /// Drops all dirty markers and progress counters.
    pub fn reset_all(&self) {
        self.scheduler.reset_all();
    }

    /// Cleans up content searching: closes every appender (marking those
    /// logs dirty), stops the worker at its next item boundary, and
    /// flushes what can be flushed within a bounded wait. Failures are
    /// logged, never escalated.
    pub fn shutdown(&self) {
        self.appenders.shutdown();

        // Bounded wait for the final logs to drain; whatever is left stays
        // marked dirty for the next run
        let settled = self.scheduler.wait_for_idle(SHUTDOWN_FLUSH_WAIT);
        if !settled {
            warn!("indexing did not settle before shutdown, backlog kept for next run");
        }
        self.scheduler.shutdown();
        if let Err(e) = self.store.flush() {
            warn!(error = %e, "final index flush failed");
        }
        if let Err(e) = self.dirty.persist() {
            warn!(error = %e, "final dirty set save failed");
        }
        self.store.close();
        info!("logger plugin shut down");
    }
}
