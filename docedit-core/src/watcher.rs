//! File watching for live re-ingestion

use anyhow::{Context, Result};
use crossbeam_channel::{Receiver, RecvTimeoutError};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// File change event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Changed,
}

/// Collapses a burst of events into a single change.
///
/// A change is reported once the channel has been quiet for the debounce period.
pub struct Debouncer {
    receiver: Receiver<FileEvent>,
    quiet: Duration,
}

impl Debouncer {
    pub fn new(receiver: Receiver<FileEvent>, quiet: Duration) -> Self {
        Self { receiver, quiet }
    }

    /// Block until a change settles.
    ///
    /// Returns `false` once every sender is gone and no change is pending.
    pub fn wait(&self) -> bool {
        if self.receiver.recv().is_err() {
            return false;
        }

        loop {
            match self.receiver.recv_timeout(self.quiet) {
                Ok(_) => continue,
                Err(RecvTimeoutError::Timeout) => return true,
                // The burst still counts
                Err(RecvTimeoutError::Disconnected) => return true,
            }
        }
    }
}

/// Watches a single document for changes made outside the process
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    debouncer: Debouncer,
    watched_path: PathBuf,
}

impl FileWatcher {
    /// Create a new file watcher for the given path
    pub fn new(path: &Path, debounce: Duration) -> Result<Self> {
        let (tx, rx) = crossbeam_channel::unbounded();
        let watched_path = path
            .canonicalize()
            .with_context(|| format!("Failed to canonicalize path: {}", path.display()))?;
        let target = watched_path.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let Ok(event) = res else {
                return;
            };
            if matches!(
                event.kind,
                notify::EventKind::Modify(_) | notify::EventKind::Create(_)
            ) && event.paths.iter().any(|p| p == &target)
            {
                let _ = tx.send(FileEvent::Changed);
            }
        })
        .context("Failed to create file watcher")?;

        // Watch the parent too, editors often save by atomic rename
        let watch_root = watched_path.parent().unwrap_or(watched_path.as_path());
        watcher
            .watch(watch_root, RecursiveMode::NonRecursive)
            .with_context(|| format!("Failed to watch: {}", watch_root.display()))?;

        log::debug!("watching {}", watched_path.display());

        Ok(Self {
            _watcher: watcher,
            debouncer: Debouncer::new(rx, debounce),
            watched_path,
        })
    }

    /// Block until the file changes; `false` when the watcher shut down
    pub fn wait_for_change(&self) -> bool {
        self.debouncer.wait()
    }

    pub fn path(&self) -> &Path {
        &self.watched_path
    }
}
