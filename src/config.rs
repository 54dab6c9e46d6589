//! Subsystem configuration.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::utils::paths::{default_log_base_dir, index_cache_dir};

/// Default inactivity window before an open log writer is auto-closed.
pub const DEFAULT_INACTIVITY_WINDOW_SECS: u64 = 5;

/// Recognized configuration options for the logging plugin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggerConfig {
    /// Whether transcript logging is enabled at all.
    pub logging_enabled: bool,
    /// Whether content indexing is enabled. When off, the index is never
    /// opened and the scheduler stays `Disabled`.
    pub indexing_enabled: bool,
    /// Seconds without a write before an open log writer is flushed,
    /// closed, and its log marked dirty.
    pub inactivity_window_secs: u64,
    /// Base directory for transcript logs. `None` uses the platform data
    /// directory.
    pub log_base_dir: Option<PathBuf>,
    /// Directory for the persisted index and dirty set. `None` uses the
    /// platform cache directory, keyed by the log base directory.
    pub index_dir: Option<PathBuf>,
}

impl Default for LoggerConfig {
    fn default() -> Self {
        Self {
            logging_enabled: true,
            indexing_enabled: true,
            inactivity_window_secs: DEFAULT_INACTIVITY_WINDOW_SECS,
            log_base_dir: None,
            index_dir: None,
        }
    }
}

impl LoggerConfig {
    pub fn inactivity_window(&self) -> Duration {
        Duration::from_secs(self.inactivity_window_secs)
    }

    /// The effective log base directory.
    pub fn resolved_log_base_dir(&self) -> Result<PathBuf> {
        match &self.log_base_dir {
            Some(dir) => Ok(dir.clone()),
            None => default_log_base_dir(),
        }
    }

    /// The effective index directory for the resolved log base directory.
    pub fn resolved_index_dir(&self) -> Result<PathBuf> {
        match &self.index_dir {
            Some(dir) => Ok(dir.clone()),
            None => index_cache_dir(&self.resolved_log_base_dir()?),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = LoggerConfig::default();
        assert!(config.logging_enabled);
        assert!(config.indexing_enabled);
        assert_eq!(config.inactivity_window(), Duration::from_secs(5));
    }

    #[test]
    fn test_explicit_dirs_win() {
        let config = LoggerConfig {
            log_base_dir: Some(PathBuf::from("/tmp/logs")),
            index_dir: Some(PathBuf::from("/tmp/index")),
            ..Default::default()
        };
        assert_eq!(config.resolved_log_base_dir().unwrap(), PathBuf::from("/tmp/logs"));
        assert_eq!(config.resolved_index_dir().unwrap(), PathBuf::from("/tmp/index"));
    }

    #[test]
    fn test_deserialize_partial() {
        let config: LoggerConfig =
            serde_json::from_str(r#"{"indexing_enabled": false}"#).unwrap();
        assert!(config.logging_enabled);
        assert!(!config.indexing_enabled);
    }
}
