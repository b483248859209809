//! Directory watcher for live reload.
//!
//! Every event under the root except a plain access becomes one `reload`
//! broadcast. That includes `Other` and rescan notices, which report changes
//! the platform could not describe. Events are neither debounced nor filtered
//! by path, so a single editor save may reload the page more than once.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::hub::BroadcastHub;
use crate::RELOAD_MESSAGE;
use crate::error::WatchError;

/// Recursive watcher bound to a hub. Watching stops when this is dropped.
pub struct DirectoryWatcher {
    root: PathBuf,
    _watcher: RecommendedWatcher,
}

impl DirectoryWatcher {
    /// Start watching `root`, creating it first if it does not exist.
    ///
    /// Spawns a task that turns filesystem events into hub broadcasts.
    ///
    /// # Errors
    ///
    /// Returns an error if the root cannot be created or the platform watcher
    /// cannot watch it recursively.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start(root: &Path, hub: Arc<BroadcastHub>) -> Result<Self, WatchError> {
        std::fs::create_dir_all(root).map_err(|source| WatchError::Root {
            path: root.to_path_buf(),
            source,
        })?;

        let (tx, mut rx) = mpsc::unbounded_channel::<notify::Result<Event>>();

        // The callback runs on the watcher's own thread
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = tx.send(res);
        })?;
        watcher.watch(root, RecursiveMode::Recursive)?;

        // Ends once the watcher, and with it the sender, is dropped
        tokio::spawn(async move {
            while let Some(result) = rx.recv().await {
                match result {
                    Ok(event) => {
                        Self::handle_event(&event, &hub);
                    }
                    Err(err) => tracing::warn!(error = %err, "File watcher error"),
                }
            }
        });

        tracing::info!(root = %root.display(), "Watching for changes");

        Ok(Self {
            root: root.to_path_buf(),
            _watcher: watcher,
        })
    }

    /// Watched directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Broadcast a reload for a change event. Returns whether one was sent.
    fn handle_event(event: &Event, hub: &BroadcastHub) -> bool {
        if !triggers_reload(event.kind) && !event.need_rescan() {
            return false;
        }

        let clients = hub.broadcast(RELOAD_MESSAGE);
        tracing::info!(
            kind = ?event.kind,
            paths = ?event.paths,
            clients,
            "Change detected, notified clients"
        );
        true
    }
}

/// Whether an event kind may report that something under the root changed.
fn triggers_reload(kind: EventKind) -> bool {
    !matches!(kind, EventKind::Access(_))
}
