use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crossbeam::channel::Sender;
use log::{debug, warn};
use notify::event::{ModifyKind, RenameMode};
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};

/// The three change classes the engine distinguishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Add,
    Remove,
    Modify,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatchEvent {
    pub path: PathBuf,
    pub kind: ChangeKind,
}

impl WatchEvent {
    pub fn new(path: impl Into<PathBuf>, kind: ChangeKind) -> Self {
        WatchEvent {
            path: path.into(),
            kind,
        }
    }
}

/// What a subscription delivers: per-root FIFO events, or a stream failure
/// (overflow included) that callers recover from with a full refresh.
#[derive(Debug, Clone)]
pub enum WatchSignal {
    Event(WatchEvent),
    Error { root: PathBuf, message: String },
}

/// The watcher half of the resource provider. The engine takes one
/// subscription per top-level included folder; dropping the returned handle
/// releases it.
pub trait WatchService {
    fn watch(&mut self, root: &Path) -> io::Result<Box<dyn WatchHandle>>;
}

/// Marker for a live subscription; unsubscribes on drop.
pub trait WatchHandle {}

/// Service that watches nothing. One-shot scans and tests use it.
#[derive(Debug, Default)]
pub struct NullWatchService;

struct NullHandle;

impl WatchHandle for NullHandle {}

impl WatchService for NullWatchService {
    fn watch(&mut self, _root: &Path) -> io::Result<Box<dyn WatchHandle>> {
        Ok(Box::new(NullHandle))
    }
}

/// Recursive notify-backed watcher delivering `WatchSignal`s into a channel.
pub struct NotifyWatchService {
    watcher: Arc<Mutex<RecommendedWatcher>>,
}

impl NotifyWatchService {
    pub fn new(tx: Sender<WatchSignal>) -> io::Result<Self> {
        let watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            match res {
                Ok(event) => forward_event(&tx, event),
                Err(e) => {
                    let root = e.paths.first().cloned().unwrap_or_default();
                    let _ = tx.send(WatchSignal::Error {
                        root,
                        message: e.to_string(),
                    });
                }
            }
        })
        .map_err(io::Error::other)?;

        Ok(NotifyWatchService {
            watcher: Arc::new(Mutex::new(watcher)),
        })
    }
}

/// Collapse notify's event taxonomy onto the three-kind model. Renames count
/// as a remove of the old name and an add of the new one.
fn forward_event(tx: &Sender<WatchSignal>, event: notify::Event) {
    if event.need_rescan() {
        let root = event.paths.first().cloned().unwrap_or_default();
        let _ = tx.send(WatchSignal::Error {
            root,
            message: "watcher requested rescan".to_owned(),
        });
        return;
    }

    let kind = match event.kind {
        EventKind::Create(_) => ChangeKind::Add,
        EventKind::Remove(_) => ChangeKind::Remove,
        EventKind::Modify(ModifyKind::Name(RenameMode::To)) => ChangeKind::Add,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => ChangeKind::Remove,
        EventKind::Modify(_) => ChangeKind::Modify,
        _ => return,
    };

    for path in event.paths {
        let _ = tx.send(WatchSignal::Event(WatchEvent { path, kind }));
    }
}

struct NotifyHandle {
    watcher: Arc<Mutex<RecommendedWatcher>>,
    root: PathBuf,
}

impl WatchHandle for NotifyHandle {}

impl Drop for NotifyHandle {
    fn drop(&mut self) {
        if let Ok(mut watcher) = self.watcher.lock()
            && let Err(e) = watcher.unwatch(&self.root)
        {
            debug!("[watch] unwatch {:?}: {e}", self.root);
        }
    }
}

impl WatchService for NotifyWatchService {
    fn watch(&mut self, root: &Path) -> io::Result<Box<dyn WatchHandle>> {
        let mut watcher = self
            .watcher
            .lock()
            .map_err(|_| io::Error::other("watcher mutex poisoned"))?;

        if let Err(e) = watcher.watch(root, RecursiveMode::Recursive) {
            warn!("[watch] subscription to {:?} failed: {e}", root);
            return Err(io::Error::other(e));
        }

        Ok(Box::new(NotifyHandle {
            watcher: Arc::clone(&self.watcher),
            root: root.to_path_buf(),
        }))
    }
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
