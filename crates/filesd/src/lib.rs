pub mod config;
pub mod discovery;
pub mod error;
pub mod metrics;
pub mod targetgroup;

pub use config::{load_config, load_config_from_str, FileSdConfig};
pub use discovery::{DiscoveryState, FileDiscovery, Reconciler, RefreshOutcome};
pub use error::{
    ConfigError, DecodeError, EnumerationError, FileSdError, ReadError, Result, WatchError,
};
pub use metrics::{render_text, DiscoveryMetrics, FileTimestamps, GaugeSample, TimestampRegistry};
pub use targetgroup::{LabelSet, Target, TargetGroup, FILEPATH_LABEL};
