//! Refresh: enumerate → read → diff against the last scan → emit → rewatch.
//!
//! Groups are identified by their position in their file, so the only
//! deletions that can be detected are a file vanishing or shrinking. Every
//! index that disappeared is announced with an empty (tombstone) group, as
//! consumers have no other way to learn that a group is gone.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info_span, Instrument};

use super::enumerator::list_files;
use super::reader::read_target_groups;
use super::watcher::{watch_files, DirWatcher};
use crate::metrics::{DiscoveryMetrics, FileTimestamps};
use crate::targetgroup::{file_source, TargetGroup};

/// How a refresh ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Every file was read and every update was delivered.
    Completed,
    /// Cancellation fired before all updates were delivered.
    Cancelled,
    /// The consumer dropped its receiver.
    Closed,
}

impl RefreshOutcome {
    pub fn is_completed(self) -> bool {
        self == RefreshOutcome::Completed
    }
}

/// Records the scan duration when dropped, whichever way the scan ends.
struct ScanTimer<'a> {
    metrics: &'a DiscoveryMetrics,
    started: Instant,
}

impl Drop for ScanTimer<'_> {
    fn drop(&mut self) {
        self.metrics.observe_scan(self.started.elapsed());
    }
}

/// Reconciles the files on disk with what was last sent downstream.
pub struct Reconciler {
    paths: Vec<String>,
    /// Files found during the last refresh and how many target groups each
    /// contained.
    last_refresh: BTreeMap<String, usize>,
    timestamps: Arc<FileTimestamps>,
    metrics: Arc<DiscoveryMetrics>,
}

impl Reconciler {
    pub fn new(
        paths: Vec<String>,
        timestamps: Arc<FileTimestamps>,
        metrics: Arc<DiscoveryMetrics>,
    ) -> Self {
        Self {
            paths,
            last_refresh: BTreeMap::new(),
            timestamps,
            metrics,
        }
    }

    pub fn paths(&self) -> &[String] {
        &self.paths
    }

    /// Group count per file as of the last refresh.
    pub fn baseline(&self) -> &BTreeMap<String, usize> {
        &self.last_refresh
    }

    pub fn timestamps(&self) -> &Arc<FileTimestamps> {
        &self.timestamps
    }

    /// Reads all files matching the configured patterns and sends their
    /// target groups on `tx`, followed by tombstones for groups that
    /// disappeared since the previous refresh.
    pub async fn refresh(
        &mut self,
        watcher: &mut dyn DirWatcher,
        tx: &mpsc::Sender<Vec<TargetGroup>>,
        cancel: &CancellationToken,
    ) -> RefreshOutcome {
        let span = info_span!("filesd.refresh", patterns = self.paths.len());
        self.refresh_inner(watcher, tx, cancel).instrument(span).await
    }

    async fn refresh_inner(
        &mut self,
        watcher: &mut dyn DirWatcher,
        tx: &mpsc::Sender<Vec<TargetGroup>>,
        cancel: &CancellationToken,
    ) -> RefreshOutcome {
        let metrics = Arc::clone(&self.metrics);
        let _timer = ScanTimer {
            metrics: &metrics,
            started: Instant::now(),
        };

        let patterns = self.paths.clone();
        let files = match blocking(cancel, move || list_files(&patterns)).await {
            Ok(files) => files,
            Err(outcome) => return outcome,
        };

        let mut current: BTreeMap<String, usize> = BTreeMap::new();
        for path in files {
            let file = path.clone();
            let timestamps = Arc::clone(&self.timestamps);
            let read = blocking(cancel, move || read_target_groups(&file, &timestamps)).await;
            let groups = match read {
                Ok(Ok(groups)) => groups,
                Err(outcome) => return outcome,
                Ok(Err(e)) => {
                    self.metrics.read_errors.inc();
                    error!(path = %path, error = %e, "Error reading file");
                    // Keep the old count so the file isn't treated as deleted.
                    if let Some(&count) = self.last_refresh.get(&path) {
                        current.insert(path, count);
                    }
                    continue;
                }
            };

            let count = groups.len();
            if let Err(outcome) = send(tx, groups, cancel).await {
                return outcome;
            }
            current.insert(path, count);
        }

        // Send empty updates for sources that disappeared.
        for (path, &previous) in &self.last_refresh {
            let count = current.get(path).copied().unwrap_or(0);
            if count >= previous {
                continue;
            }
            debug!(file = %path, previous, count, "Refresh found target groups that should be removed");
            self.timestamps.remove(path);
            for index in count..previous {
                let tombstone = vec![TargetGroup::tombstone(file_source(path, index))];
                if let Err(outcome) = send(tx, tombstone, cancel).await {
                    return outcome;
                }
            }
        }
        self.last_refresh = current;

        watch_files(&self.paths, watcher);

        RefreshOutcome::Completed
    }
}

/// Runs file system work on the blocking pool, giving up if `cancel` fires
/// first. A panic in `f` is resumed on the caller.
async fn blocking<T, F>(cancel: &CancellationToken, f: F) -> Result<T, RefreshOutcome>
where
    F: FnOnce() -> T + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(f);
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RefreshOutcome::Cancelled),
        res = task => match res {
            Ok(value) => Ok(value),
            Err(e) if e.is_panic() => std::panic::resume_unwind(e.into_panic()),
            Err(_) => Err(RefreshOutcome::Cancelled),
        },
    }
}

/// Sends one batch, giving up if `cancel` fires first.
async fn send(
    tx: &mpsc::Sender<Vec<TargetGroup>>,
    batch: Vec<TargetGroup>,
    cancel: &CancellationToken,
) -> Result<(), RefreshOutcome> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(RefreshOutcome::Cancelled),
        res = tx.send(batch) => res.map_err(|_| RefreshOutcome::Closed),
    }
}
