//! Shared test utilities for integration tests
#![allow(dead_code)]

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tempfile::TempDir;
use transcript_indexer::{
    DocumentMetadata, LoadError, LoadedTranscript, LogIdentifier, LoggerConfig, LoggerPlugin,
    TranscriptLoader,
};

/// Builder for creating test log directory trees
pub struct LogDirBuilder {
    temp_dir: TempDir,
}

impl LogDirBuilder {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        Self { temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Add a transcript file for `object` on `account`
    pub fn with_transcript(self, account: &str, object: &str, file: &str, content: &str) -> Self {
        let id = LogIdentifier::from_parts(account, object, file);
        let path = self.temp_dir.path().join(id.relative_path());
        fs::create_dir_all(path.parent().unwrap()).expect("Failed to create log dirs");
        fs::write(&path, content).expect("Failed to write transcript");
        self
    }

    pub fn build(self) -> TempDir {
        self.temp_dir
    }
}

impl Default for LogDirBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// In-memory transcript loader with call counting and fault injection
pub struct StaticLoader {
    docs: Mutex<HashMap<LogIdentifier, String>>,
    loads: Mutex<Vec<LogIdentifier>>,
    fail_times: Mutex<HashMap<LogIdentifier, u32>>,
}

impl StaticLoader {
    pub fn new() -> Self {
        Self {
            docs: Mutex::new(HashMap::new()),
            loads: Mutex::new(Vec::new()),
            fail_times: Mutex::new(HashMap::new()),
        }
    }

    pub fn insert(&self, id: &LogIdentifier, content: &str) {
        self.docs.lock().unwrap().insert(id.clone(), content.to_string());
    }

    /// Make the next `times` loads of `id` fail with a transient I/O error
    pub fn fail_next(&self, id: &LogIdentifier, times: u32) {
        self.fail_times.lock().unwrap().insert(id.clone(), times);
    }

    pub fn load_count(&self, id: &LogIdentifier) -> usize {
        self.loads.lock().unwrap().iter().filter(|l| *l == id).count()
    }

    pub fn total_loads(&self) -> usize {
        self.loads.lock().unwrap().len()
    }
}

impl Default for StaticLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl TranscriptLoader for StaticLoader {
    fn load(&self, id: &LogIdentifier) -> Result<LoadedTranscript, LoadError> {
        self.loads.lock().unwrap().push(id.clone());

        let mut failures = self.fail_times.lock().unwrap();
        if let Some(remaining) = failures.get_mut(id) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(LoadError::Io {
                    path: id.relative_path(),
                    source: io::Error::other("injected failure"),
                });
            }
        }
        drop(failures);

        let docs = self.docs.lock().unwrap();
        match docs.get(id) {
            Some(content) => Ok(LoadedTranscript {
                content: content.clone(),
                metadata: DocumentMetadata::default(),
            }),
            None => Err(LoadError::NotFound(id.relative_path())),
        }
    }
}

/// Loader that blocks at the entry of every `load` call until the test
/// sends a permit, making item boundaries deterministic
pub struct GateLoader {
    docs: HashMap<LogIdentifier, String>,
    entered: Mutex<Sender<LogIdentifier>>,
    permits: Mutex<Receiver<()>>,
}

impl GateLoader {
    /// Returns the loader plus the channel endpoints the test drives:
    /// `entered_rx` reports which id the worker is about to load, and each
    /// send on `permit_tx` lets one load proceed
    pub fn new(
        docs: &[(&LogIdentifier, &str)],
    ) -> (Arc<Self>, Receiver<LogIdentifier>, Sender<()>) {
        let (entered_tx, entered_rx) = channel();
        let (permit_tx, permit_rx) = channel();
        let loader = Arc::new(Self {
            docs: docs.iter().map(|(id, c)| ((*id).clone(), c.to_string())).collect(),
            entered: Mutex::new(entered_tx),
            permits: Mutex::new(permit_rx),
        });
        (loader, entered_rx, permit_tx)
    }
}

impl TranscriptLoader for GateLoader {
    fn load(&self, id: &LogIdentifier) -> Result<LoadedTranscript, LoadError> {
        let _ = self.entered.lock().unwrap().send(id.clone());
        // A closed channel (test finished) just unblocks the worker
        let _ = self.permits.lock().unwrap().recv();

        match self.docs.get(id) {
            Some(content) => Ok(LoadedTranscript {
                content: content.clone(),
                metadata: DocumentMetadata::default(),
            }),
            None => Err(LoadError::NotFound(id.relative_path())),
        }
    }
}

/// Config pointing at two temp directories
pub fn test_config(logs_dir: &Path, index_dir: &Path) -> LoggerConfig {
    LoggerConfig {
        log_base_dir: Some(logs_dir.to_path_buf()),
        index_dir: Some(index_dir.to_path_buf()),
        ..Default::default()
    }
}

/// Plugin wired to an in-memory loader; returns the temp dirs so they
/// outlive the plugin
pub fn plugin_with_loader(loader: Arc<dyn TranscriptLoader>) -> (LoggerPlugin, TempDir, TempDir) {
    let logs = TempDir::new().expect("Failed to create logs dir");
    let index = TempDir::new().expect("Failed to create index dir");
    let config = test_config(logs.path(), index.path());
    let plugin = LoggerPlugin::with_loader(config, loader).expect("Failed to build plugin");
    (plugin, logs, index)
}

/// Polls `cond` every 10ms until it holds or `timeout` elapses
pub fn wait_for(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
    cond()
}

pub fn id(key: &str) -> LogIdentifier {
    LogIdentifier::new(key)
}
