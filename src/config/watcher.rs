//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};

use crate::config::loader::load_config;
use crate::config::schema::BridgeConfig;

/// Configuration shared between the bridge loop and the watcher.
pub type SharedConfig = Arc<ArcSwap<BridgeConfig>>;

/// Wrap a configuration for sharing.
pub fn shared(config: BridgeConfig) -> SharedConfig {
    Arc::new(ArcSwap::from_pointee(config))
}

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    target: SharedConfig,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher that publishes reloads into `target`.
    pub fn new(path: &Path, target: SharedConfig) -> Self {
        Self {
            path: path.to_path_buf(),
            target,
        }
    }

    /// Start watching the file in a background thread.
    ///
    /// The returned watcher must be kept alive for reloads to happen.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let target = self.target.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        reload(&path, &target);
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Load `path` and swap it into `target`. An invalid file keeps the current config.
pub fn reload(path: &Path, target: &SharedConfig) -> bool {
    match load_config(path) {
        Ok(new_config) => {
            target.store(Arc::new(new_config));
            true
        }
        Err(e) => {
            tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
            false
        }
    }
}
