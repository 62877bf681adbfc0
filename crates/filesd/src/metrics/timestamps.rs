//! Per-file read timestamps and the registry that aggregates them across
//! live discovery instances.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Last successful read time (epoch seconds) of every file one discovery
/// instance has read.
#[derive(Debug, Default)]
pub struct FileTimestamps {
    inner: RwLock<HashMap<String, f64>>,
}

impl FileTimestamps {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, path: &str, timestamp: f64) {
        self.write().insert(path.to_string(), timestamp);
    }

    pub fn remove(&self, path: &str) {
        self.write().remove(path);
    }

    pub fn get(&self, path: &str) -> Option<f64> {
        self.read().get(path).copied()
    }

    pub fn snapshot(&self) -> HashMap<String, f64> {
        self.read().clone()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, f64>> {
        match self.inner.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("File timestamp lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, f64>> {
        match self.inner.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("File timestamp lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Handle returned by [`TimestampRegistry::register`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

/// One gauge sample: a file and its last read timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct GaugeSample {
    pub filename: String,
    pub value: f64,
}

/// Process-wide set of live discovery instances' timestamp maps.
///
/// Construct one per process and hand it to every discovery instance. The
/// registry only holds weak references; each instance owns its map.
#[derive(Debug, Default)]
pub struct TimestampRegistry {
    next_id: AtomicU64,
    instances: RwLock<BTreeMap<RegistrationId, Weak<FileTimestamps>>>,
}

impl TimestampRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, timestamps: &Arc<FileTimestamps>) -> RegistrationId {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.write().insert(id, Arc::downgrade(timestamps));
        id
    }

    /// Returns false if `id` was not registered.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        self.write().remove(&id).is_some()
    }

    /// Number of registered instances, including ones already dropped.
    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Builds one sample per distinct file across all live instances.
    ///
    /// When two instances report the same file, the one registered later
    /// wins. Samples are sorted by filename.
    pub fn collect(&self) -> Vec<GaugeSample> {
        let mut unique: HashMap<String, f64> = HashMap::new();
        {
            let instances = self.read();
            for timestamps in instances.values().filter_map(Weak::upgrade) {
                let map = timestamps.read();
                for (filename, timestamp) in map.iter() {
                    unique.insert(filename.clone(), *timestamp);
                }
            }
        }

        let mut samples: Vec<GaugeSample> = unique
            .into_iter()
            .map(|(filename, value)| GaugeSample { filename, value })
            .collect();
        samples.sort_by(|a, b| a.filename.cmp(&b.filename));
        samples
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<RegistrationId, Weak<FileTimestamps>>> {
        match self.instances.read() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("Timestamp registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<RegistrationId, Weak<FileTimestamps>>> {
        match self.instances.write() {
            Ok(g) => g,
            Err(poisoned) => {
                tracing::warn!("Timestamp registry lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}
