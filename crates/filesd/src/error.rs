use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum FileSdError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Read error: {0}")]
    Read(#[from] ReadError),

    #[error("Watch error: {0}")]
    Watch(#[from] WatchError),
}

/// Rejected configuration. Fatal: surfaced before the engine runs.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("file service discovery config must contain at least one path name")]
    NoPaths,

    #[error("path name '{0}' is not valid for file discovery")]
    InvalidPath(String),

    #[error("refresh interval must be positive, got '{0}'")]
    InvalidInterval(String),

    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config YAML: {0}")]
    ParseYaml(#[from] serde_yaml::Error),
}

/// A glob pattern that could not be expanded. Recovered: the pattern
/// contributes nothing to the current scan.
#[derive(Error, Debug)]
#[error("Error expanding glob '{pattern}': {source}")]
pub struct EnumerationError {
    pub pattern: String,
    #[source]
    pub source: glob::PatternError,
}

/// A target file that could not be turned into target groups. Recovered by
/// the reconciler, which keeps the file's previous baseline.
#[derive(Error, Debug)]
pub enum ReadError {
    #[error("Failed to open '{path}': {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to stat '{path}': {source}")]
    Stat {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to decode '{path}': {source}")]
    Decode {
        path: PathBuf,
        #[source]
        source: DecodeError,
    },
}

#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("nil target group item found at index {index}")]
    NullGroup { index: usize },

    #[error("\"{0}\" is not a valid label name")]
    InvalidLabelName(String),
}

#[derive(Error, Debug)]
pub enum WatchError {
    #[error("Failed to create file watcher: {0}")]
    Init(#[source] notify::Error),

    #[error("Failed to add file watch for '{path}': {source}")]
    Add {
        path: PathBuf,
        #[source]
        source: notify::Error,
    },

    #[error("File watch failed: {0}")]
    Backend(#[source] notify::Error),
}

pub type Result<T> = std::result::Result<T, FileSdError>;
