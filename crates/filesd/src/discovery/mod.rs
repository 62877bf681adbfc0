//! File based target discovery.
//!
//! - `enumerator`: glob expansion of the configured patterns
//! - `reader`: decoding a JSON/YAML file into target groups
//! - `watcher`: directory watches and the file event filter
//! - `reconciler`: one refresh, including deletion detection
//! - `runner`: the long-lived event loop

pub mod enumerator;
pub mod reader;
pub mod reconciler;
pub mod runner;
pub mod watcher;

pub use enumerator::list_files;
pub use reader::{decode_target_groups, read_target_groups};
pub use reconciler::{Reconciler, RefreshOutcome};
pub use runner::{DiscoveryState, FileDiscovery};
pub use watcher::{forward_event, requires_refresh, watch_dir_for, watch_files, DirWatcher, NotifyWatcher};
