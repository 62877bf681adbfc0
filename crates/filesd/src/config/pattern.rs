//! Path pattern validation and file format detection.
//!
//! The accepted extensions here and the decoders in
//! [`crate::discovery::reader`] must stay in lockstep: every pattern that
//! passes validation can only match files with a [`FileFormat`].

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::error::ConfigError;

/// `<literal-prefix>(*<literal-suffix>)?.<ext>`
static RE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^*]*(\*[^/]*)?\.(?i:json|yml|yaml)$").unwrap());

/// Structured formats a target file can be written in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Json,
    Yaml,
}

impl FileFormat {
    /// Detects the format from a file extension, case-insensitively.
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_lowercase().as_str() {
            "json" => Some(FileFormat::Json),
            "yml" | "yaml" => Some(FileFormat::Yaml),
            _ => None,
        }
    }

    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(Self::from_extension)
    }
}

/// Whether a single pattern is acceptable for file discovery.
pub fn is_valid_pattern(pattern: &str) -> bool {
    RE_PATTERN.is_match(pattern)
}

/// Validates a pattern list: non-empty, and every entry well-formed.
pub fn validate_patterns(patterns: &[String]) -> Result<(), ConfigError> {
    if patterns.is_empty() {
        return Err(ConfigError::NoPaths);
    }
    for pattern in patterns {
        if !is_valid_pattern(pattern) {
            return Err(ConfigError::InvalidPath(pattern.clone()));
        }
    }
    Ok(())
}
