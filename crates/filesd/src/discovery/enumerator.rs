//! Expands configured glob patterns into concrete file paths.

use tracing::{debug, error};

use crate::error::EnumerationError;

/// Returns all existing paths matching `pattern`, in glob order.
pub fn expand_pattern(pattern: &str) -> Result<Vec<String>, EnumerationError> {
    let entries = glob::glob(pattern).map_err(|source| EnumerationError {
        pattern: pattern.to_string(),
        source,
    })?;

    let mut paths = Vec::new();
    for entry in entries {
        match entry {
            Ok(path) => paths.push(path.to_string_lossy().into_owned()),
            Err(e) => debug!(glob = pattern, error = %e, "Skipping unreadable glob entry"),
        }
    }
    Ok(paths)
}

/// Returns all files matching any of `patterns`.
///
/// A pattern that fails to expand is logged and contributes nothing.
pub fn list_files(patterns: &[String]) -> Vec<String> {
    let mut paths = Vec::new();
    for pattern in patterns {
        match expand_pattern(pattern) {
            Ok(files) => paths.extend(files),
            Err(e) => {
                error!(glob = %pattern, error = %e.source, "Error expanding glob");
                continue;
            }
        }
    }
    paths
}
