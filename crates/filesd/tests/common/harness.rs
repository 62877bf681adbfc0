//! Test harness for isolated discovery runs.
//!
//! The `TestHarness` struct provides:
//! - A temporary `targets/` directory to write target files into
//! - A shared `TimestampRegistry` and `DiscoveryMetrics`
//! - Single-refresh execution with all emitted batches captured

#![allow(dead_code)]

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use filesd::discovery::DirWatcher;
use filesd::{
    DiscoveryMetrics, FileSdConfig, FileTimestamps, Reconciler, RefreshOutcome, TargetGroup,
    TimestampRegistry, WatchError,
};

/// Watcher that only records which directories it was asked to watch.
#[derive(Debug, Default)]
pub struct RecordingWatcher {
    pub watched: Vec<PathBuf>,
}

impl DirWatcher for RecordingWatcher {
    fn watch_dir(&mut self, dir: &Path) -> Result<(), WatchError> {
        self.watched.push(dir.to_path_buf());
        Ok(())
    }
}

/// Result of one refresh run through the harness.
#[derive(Debug)]
pub struct ScanResult {
    pub outcome: RefreshOutcome,
    pub batches: Vec<Vec<TargetGroup>>,
}

impl ScanResult {
    /// Sources of all single-group tombstone batches, in send order.
    pub fn tombstones(&self) -> Vec<String> {
        self.batches
            .iter()
            .filter(|b| b.len() == 1 && b[0].is_tombstone())
            .map(|b| b[0].source.clone())
            .collect()
    }

    /// All non-tombstone batches.
    pub fn updates(&self) -> Vec<&Vec<TargetGroup>> {
        self.batches
            .iter()
            .filter(|b| !(b.len() == 1 && b[0].is_tombstone()))
            .collect()
    }
}

/// Test harness providing an isolated environment for discovery tests.
pub struct TestHarness {
    temp_dir: TempDir,
    /// Directory target files are written to.
    pub targets_dir: PathBuf,
    pub registry: Arc<TimestampRegistry>,
    pub metrics: Arc<DiscoveryMetrics>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let targets_dir = temp_dir.path().join("targets");
        std::fs::create_dir_all(&targets_dir).expect("Failed to create targets dir");

        Self {
            temp_dir,
            targets_dir,
            registry: Arc::new(TimestampRegistry::new()),
            metrics: Arc::new(DiscoveryMetrics::new()),
        }
    }

    pub fn temp_path(&self) -> &Path {
        self.temp_dir.path()
    }

    /// A glob pattern relative to the targets directory.
    pub fn pattern(&self, glob: &str) -> String {
        format!("{}/{}", self.targets_dir.display(), glob)
    }

    /// Path of `name` inside the targets directory, as discovery reports it.
    pub fn path_of(&self, name: &str) -> String {
        self.targets_dir.join(name).to_string_lossy().into_owned()
    }

    /// Writes a target file and returns its path.
    pub fn write_file(&self, name: &str, content: &str) -> String {
        let path = self.targets_dir.join(name);
        std::fs::write(&path, content).expect("Failed to write target file");
        path.to_string_lossy().into_owned()
    }

    pub fn remove_file(&self, name: &str) {
        std::fs::remove_file(self.targets_dir.join(name)).expect("Failed to remove target file");
    }

    pub fn config(&self, globs: &[&str], refresh_interval: Duration) -> FileSdConfig {
        FileSdConfig::new(globs.iter().map(|g| self.pattern(g)), refresh_interval)
    }

    /// A reconciler over `globs` sharing the harness metrics.
    pub fn reconciler(&self, globs: &[&str]) -> Reconciler {
        Reconciler::new(
            globs.iter().map(|g| self.pattern(g)).collect(),
            Arc::new(FileTimestamps::new()),
            Arc::clone(&self.metrics),
        )
    }

    /// Runs one refresh and captures everything it sent.
    pub async fn scan(&self, reconciler: &mut Reconciler) -> ScanResult {
        let (tx, mut rx) = mpsc::channel(1024);
        let mut watcher = RecordingWatcher::default();
        let outcome = reconciler
            .refresh(&mut watcher, &tx, &CancellationToken::new())
            .await;
        drop(tx);

        let mut batches = Vec::new();
        while let Some(batch) = rx.recv().await {
            batches.push(batch);
        }
        ScanResult { outcome, batches }
    }
}
