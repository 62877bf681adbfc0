//! File system watches on the directories containing configured patterns.

use std::path::{Path, PathBuf};

use notify::event::ModifyKind;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, error, trace};

use crate::error::WatchError;

/// Something that can be told to watch a directory.
pub trait DirWatcher: Send {
    /// Starts watching `dir` non-recursively. Watching an already watched
    /// directory again must succeed.
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError>;
}

/// [`DirWatcher`] backed by the platform's recommended `notify` watcher.
///
/// Relevant events and errors are forwarded into the channel passed to
/// [`new`] without ever blocking the notify thread.
///
/// [`new`]: NotifyWatcher::new
pub struct NotifyWatcher {
    inner: RecommendedWatcher,
}

impl NotifyWatcher {
    pub fn new(events: mpsc::Sender<notify::Result<Event>>) -> Result<Self, WatchError> {
        let inner = notify::recommended_watcher(move |res: notify::Result<Event>| {
            forward_event(&events, res);
        })
        .map_err(WatchError::Init)?;

        Ok(Self { inner })
    }
}

/// Queues `res` for the event loop if it may need a refresh.
///
/// Never blocks: the notify thread also answers `watch` calls made from the
/// event loop, so waiting here for queue space can deadlock. When the queue
/// is full the event is dropped, since every queued event already triggers
/// a full refresh that reads the files after this change.
pub fn forward_event(events: &mpsc::Sender<notify::Result<Event>>, res: notify::Result<Event>) {
    if let Ok(event) = &res {
        if !requires_refresh(event) {
            return;
        }
    }
    match events.try_send(res) {
        Ok(()) | Err(TrySendError::Closed(_)) => {}
        Err(TrySendError::Full(_)) => trace!("Event queue full, dropping file event"),
    }
}

impl DirWatcher for NotifyWatcher {
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.inner
            .watch(dir, RecursiveMode::NonRecursive)
            .map_err(|source| WatchError::Add {
                path: dir.to_path_buf(),
                source,
            })
    }
}

/// Directory to watch for `pattern`: everything up to the last separator.
pub fn watch_dir_for(pattern: &str) -> PathBuf {
    match pattern.rfind(std::path::is_separator) {
        Some(0) => PathBuf::from("/"),
        Some(idx) => PathBuf::from(&pattern[..idx]),
        None => PathBuf::from("./"),
    }
}

/// Registers a watch for the directory of every pattern.
///
/// Failures are logged and skipped; the periodic refresh covers directories
/// that could not be watched. Returns the number of failed registrations.
pub fn watch_files(patterns: &[String], watcher: &mut dyn DirWatcher) -> usize {
    let mut failed = 0;
    for pattern in patterns {
        let dir = watch_dir_for(pattern);
        match watcher.watch_dir(&dir) {
            Ok(()) => debug!(path = %dir.display(), "Watching directory"),
            Err(e) => {
                error!(path = %dir.display(), error = %e, "Error adding file watch");
                failed += 1;
            }
        }
    }
    failed
}

/// Whether `event` may have changed a target file.
///
/// Events without paths and attribute-only changes are ignored. Any other
/// change triggers a full refresh: the sequence of events produced by an
/// edit varies by editor and platform, so they aren't interpreted further.
pub fn requires_refresh(event: &Event) -> bool {
    if event.paths.is_empty() {
        return false;
    }
    !matches!(
        event.kind,
        EventKind::Access(_) | EventKind::Modify(ModifyKind::Metadata(_))
    )
}
