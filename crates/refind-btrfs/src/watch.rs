use std::path::Path;
use std::sync::mpsc::{self, Receiver};
use std::time::Duration;

use notify::{RecommendedWatcher, RecursiveMode, Watcher};

/// A burst of create/delete events from the same `btrfs subvolume snapshot`
/// invocation is debounced into a single run-now token within this window.
const DEBOUNCE_WINDOW: Duration = Duration::from_millis(500);

pub struct FilesystemWatch {
    _watcher: RecommendedWatcher,
    events: Receiver<()>,
}

impl FilesystemWatch {
    pub fn new(watched_dirs: &[impl AsRef<Path>]) -> notify::Result<Self> {
        let (tx, rx) = mpsc::channel();

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                if matches!(
                    event.kind,
                    notify::EventKind::Create(_) | notify::EventKind::Remove(_)
                ) {
                    let _ = tx.send(());
                }
            }
        })?;

        for dir in watched_dirs {
            watcher.watch(dir.as_ref(), RecursiveMode::NonRecursive)?;
        }

        Ok(FilesystemWatch {
            _watcher: watcher,
            events: rx,
        })
    }

    /// Blocks for the next run-now trigger, draining any further events that
    /// arrive within the debounce window so a burst collapses into one run.
    pub fn wait_for_trigger(&self) -> bool {
        if self.events.recv().is_err() {
            return false;
        }

        loop {
            match self.events.recv_timeout(DEBOUNCE_WINDOW) {
                Ok(()) => continue,
                Err(mpsc::RecvTimeoutError::Timeout) => break,
                Err(mpsc::RecvTimeoutError::Disconnected) => break,
            }
        }

        true
    }
}
