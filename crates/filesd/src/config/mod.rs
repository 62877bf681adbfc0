pub mod loader;
pub mod pattern;
pub mod schema;

pub use loader::{load_config, load_config_from_str};
pub use pattern::{is_valid_pattern, validate_patterns, FileFormat};
pub use schema::{FileSdConfig, DEFAULT_REFRESH_INTERVAL};
