//! Configuration constants and the small config type threaded into the store.

use std::path::PathBuf;
use std::time::Duration;

/// Directory name created under the cache root for the PSE environment.
///
/// `<cacheRoot>/diskquota_page_store`.
pub const STORE_DIR_NAME: &str = "diskquota_page_store";

/// Tile-set id (and layer name) of the sentinel row that mirrors total usage.
pub const GLOBAL_QUOTA_TILE_SET_ID: &str = "___GLOBAL_QUOTA___";

/// Default deadline the Transaction Worker waits for outstanding units to
/// drain before closing the PSE best-effort.
pub const DEFAULT_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(30);

/// Configuration for opening a [`crate::Store`].
///
/// There is no CLI or environment-variable surface for this crate — this
/// struct exists only to carry the handful of values an embedding application
/// must supply explicitly.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root directory supplied by the external `CacheDirectoryLocator`.
    ///
    /// The PSE environment is created at `cache_root.join(STORE_DIR_NAME)`.
    pub cache_root: PathBuf,

    /// How long the worker waits for in-flight units to drain on close.
    pub shutdown_deadline: Duration,
}

impl StoreConfig {
    /// Build a config pointing at `cache_root` with the default shutdown deadline.
    pub fn new(cache_root: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            shutdown_deadline: DEFAULT_SHUTDOWN_DEADLINE,
        }
    }

    /// Override the shutdown drain deadline.
    pub fn with_shutdown_deadline(mut self, deadline: Duration) -> Self {
        self.shutdown_deadline = deadline;
        self
    }

    /// Full path to the PSE environment directory.
    pub fn store_path(&self) -> PathBuf {
        self.cache_root.join(STORE_DIR_NAME)
    }
}
