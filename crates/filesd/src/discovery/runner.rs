//! The discovery event loop.
//!
//! A refresh runs once on start, then again on every relevant file system
//! event and on every tick of the refresh interval. The ticker also repairs
//! watches that failed to register after an earlier refresh.

use std::sync::Arc;
use std::time::Duration;

use notify::Event;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::reconciler::{Reconciler, RefreshOutcome};
use super::watcher::{requires_refresh, NotifyWatcher};
use crate::config::FileSdConfig;
use crate::error::{ConfigError, WatchError};
use crate::metrics::{DiscoveryMetrics, FileTimestamps, RegistrationId, TimestampRegistry};
use crate::targetgroup::TargetGroup;

/// Capacity of the channel between the notify callback and the event loop.
const EVENT_BUFFER: usize = 100;

/// Lifecycle of a [`FileDiscovery`] instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiscoveryState {
    /// Constructed, not yet watching.
    Starting,
    /// Watching and refreshing.
    Running,
    /// Shut down; resources released.
    Stopped,
}

/// File based discovery: watches files holding target groups in JSON or
/// YAML format and sends updated groups downstream.
pub struct FileDiscovery {
    reconciler: Reconciler,
    interval: Duration,
    registry: Arc<TimestampRegistry>,
    registration: RegistrationId,
    state: watch::Sender<DiscoveryState>,
}

impl FileDiscovery {
    /// Creates a discovery instance for `config` and registers its timestamp
    /// map with `registry`.
    pub fn new(
        config: &FileSdConfig,
        registry: Arc<TimestampRegistry>,
        metrics: Arc<DiscoveryMetrics>,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        let timestamps = Arc::new(FileTimestamps::new());
        let registration = registry.register(&timestamps);
        let (state, _) = watch::channel(DiscoveryState::Starting);

        Ok(Self {
            reconciler: Reconciler::new(config.files.clone(), timestamps, metrics),
            interval: config.refresh_interval,
            registry,
            registration,
            state,
        })
    }

    pub fn paths(&self) -> &[String] {
        self.reconciler.paths()
    }

    pub fn refresh_interval(&self) -> Duration {
        self.interval
    }

    /// This instance's per-file read timestamps.
    pub fn timestamps(&self) -> Arc<FileTimestamps> {
        Arc::clone(self.reconciler.timestamps())
    }

    /// Returns a receiver tracking this instance's lifecycle.
    pub fn subscribe_state(&self) -> watch::Receiver<DiscoveryState> {
        self.state.subscribe()
    }

    /// Runs the event loop on a new tokio task.
    pub fn spawn(
        self,
        tx: mpsc::Sender<Vec<TargetGroup>>,
        cancel: CancellationToken,
    ) -> JoinHandle<()> {
        tokio::spawn(self.run(tx, cancel))
    }

    /// Runs until `cancel` fires or `tx` is closed.
    pub async fn run(mut self, tx: mpsc::Sender<Vec<TargetGroup>>, cancel: CancellationToken) {
        let (event_tx, mut events) = mpsc::channel(EVENT_BUFFER);
        let mut watcher = match NotifyWatcher::new(event_tx) {
            Ok(watcher) => watcher,
            Err(e) => {
                error!(error = %e, "Error adding file watcher");
                self.registry.unregister(self.registration);
                self.set_state(DiscoveryState::Stopped);
                return;
            }
        };

        self.set_state(DiscoveryState::Running);
        info!(paths = ?self.paths(), interval = ?self.interval, "File discovery started");

        let mut open = self
            .reconciler
            .refresh(&mut watcher, &tx, &cancel)
            .await
            .is_completed();

        let mut ticker = tokio::time::interval_at(Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        while open {
            let outcome: RefreshOutcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                Some(res) = events.recv() => match res {
                    Ok(event) if requires_refresh(&event) => {
                        debug!(kind = ?event.kind, paths = ?event.paths, "File change detected");
                        self.reconciler.refresh(&mut watcher, &tx, &cancel).await
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        let e = WatchError::Backend(e);
                        error!(error = %e, "Error watching file");
                        continue;
                    }
                },
                _ = ticker.tick() => self.reconciler.refresh(&mut watcher, &tx, &cancel).await,
            };
            open = outcome.is_completed();
        }

        self.stop(watcher, events).await;
    }

    /// Unregisters from the timestamp registry and closes the watcher.
    async fn stop(self, watcher: NotifyWatcher, events: mpsc::Receiver<notify::Result<Event>>) {
        debug!(paths = ?self.paths(), "Stopping file discovery...");

        self.registry.unregister(self.registration);

        // Dropping the watcher may wait on its event thread.
        if let Err(e) = tokio::task::spawn_blocking(move || drop(watcher)).await {
            error!(paths = ?self.paths(), error = %e, "Error closing file watcher");
        }
        drop(events);

        self.set_state(DiscoveryState::Stopped);
        debug!("File discovery stopped");
    }

    fn set_state(&self, state: DiscoveryState) {
        self.state.send_replace(state);
    }
}

impl Drop for FileDiscovery {
    fn drop(&mut self) {
        self.registry.unregister(self.registration);
    }
}
