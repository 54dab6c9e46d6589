//! Transcript logging with full-text content indexing.
//!
//! This library implements a chat client's logging plugin core: it writes
//! conversation content to per-conversation transcript files, tracks which
//! transcripts are stale ("dirty") relative to a persistent full-text
//! index, and drives a pausable background worker that re-indexes the
//! dirty set under concurrent mutation. It supports:
//!
//! - Appending content through auto-closing per-conversation log writers
//! - Dirty tracking with exactly-once indexing per marked transcript
//! - A background indexing pass with pause/resume and progress reporting
//! - Retraction of deleted logs from both the backlog and the index
//!
//! # Example
//!
//! ```no_run
//! use transcript_indexer::{LoggerConfig, LoggerPlugin};
//!
//! let plugin = LoggerPlugin::new(LoggerConfig::default())?;
//! plugin.start()?;
//! plugin.append_content("AIM.alice", "bob", "hello bob")?;
//! // The writer auto-closes after the inactivity window, the log is
//! // marked dirty, and the background worker indexes it.
//! plugin.shutdown();
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod appender;
pub mod cli;
pub mod config;
pub mod dirty;
pub mod error;
pub mod index_store;
pub mod loader;
pub mod models;
pub mod plugin;
pub mod removal;
pub mod scheduler;
pub mod utils;

// Re-export commonly used types
pub use appender::AppenderLifecycleManager;
pub use config::LoggerConfig;
pub use dirty::DirtySetTracker;
pub use error::{IndexError, LoadError};
pub use index_store::IndexStore;
pub use loader::{FileTranscriptLoader, LoadedTranscript, TranscriptLoader};
pub use models::{
    DocumentMetadata, IndexDocument, IndexState, IndexingProgress, LogIdentifier,
};
pub use plugin::LoggerPlugin;
pub use removal::PathRemovalCoordinator;
pub use scheduler::IndexingScheduler;
