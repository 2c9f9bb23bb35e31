//! Configuration file watcher for hot reload.

use std::path::{Path, PathBuf};
use std::time::Duration;
use arc_swap::ArcSwap;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::{AdminConfig, AuthConfig};

/// A watcher that monitors the configuration file for changes.
pub struct ConfigWatcher {
    path: PathBuf,
    update_tx: mpsc::UnboundedSender<AdminConfig>,
}

impl ConfigWatcher {
    /// Create a new ConfigWatcher.
    ///
    /// Returns the watcher and a receiver for configuration updates.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AdminConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();

        (Self {
            path: path.to_path_buf(),
            update_tx,
        }, update_rx)
    }

    /// Start watching the file. The returned watcher must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let tx = self.update_tx.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(move |res: notify::Result<Event>| {
            match res {
                Ok(event) => {
                    if event.kind.is_modify() || event.kind.is_create() {
                        tracing::info!("Config file change detected, reloading...");
                        match load_config(&path) {
                            Ok(new_config) => {
                                let _ = tx.send(new_config);
                            }
                            Err(e) => {
                                tracing::error!("Failed to reload config: {}. Keeping current configuration.", e);
                            }
                        }
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            }
        }, Config::default().with_poll_interval(Duration::from_secs(2)))?;

        watcher.watch(&self.path, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?self.path, "Config watcher started");
        Ok(watcher)
    }
}

/// Apply a reloaded configuration.
///
/// Only the `auth` section is live; the rest is fixed at startup. Returns
/// true when the live auth settings changed.
pub fn apply_reload(live_auth: &ArcSwap<AuthConfig>, running: &AdminConfig, new: AdminConfig) -> bool {
    if new.mysql != running.mysql {
        tracing::warn!("MySQL settings changed on disk; restart required for them to take effect");
    }
    if new.server.bind_address != running.server.bind_address || new.server.tls != running.server.tls {
        tracing::warn!("Listener settings changed on disk; restart required for them to take effect");
    }

    if **live_auth.load() == new.auth {
        return false;
    }

    tracing::info!(
        max_login_attempts = new.auth.max_login_attempts,
        window_seconds = new.auth.window_seconds,
        "Auth settings reloaded"
    );
    live_auth.store(std::sync::Arc::new(new.auth));
    true
}
