//! Reads a target file and decodes it into target groups.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::{DateTime, Utc};

use crate::config::FileFormat;
use crate::error::{DecodeError, ReadError};
use crate::metrics::FileTimestamps;
use crate::targetgroup::{file_source, GroupDoc, StrictGroupDoc, TargetGroup, FILEPATH_LABEL};

/// Reads the JSON or YAML list of target groups in `path`.
///
/// Every group gets its source set to `"<path>:<index>"` and the
/// [`FILEPATH_LABEL`] set to `path`. On success the file's modification time
/// is recorded in `timestamps`.
///
/// # Panics
/// Panics if `path` has no JSON or YAML extension. Configured patterns are
/// validated up front, so only such files can be enumerated.
pub fn read_target_groups(
    path: &str,
    timestamps: &FileTimestamps,
) -> Result<Vec<TargetGroup>, ReadError> {
    let fs_path = Path::new(path);

    let mut file = File::open(fs_path).map_err(|e| ReadError::Open {
        path: fs_path.to_path_buf(),
        source: e,
    })?;

    let mut content = Vec::new();
    file.read_to_end(&mut content)
        .map_err(|e| ReadError::Read {
            path: fs_path.to_path_buf(),
            source: e,
        })?;

    let modified = file
        .metadata()
        .and_then(|m| m.modified())
        .map_err(|e| ReadError::Stat {
            path: fs_path.to_path_buf(),
            source: e,
        })?;

    let format = match FileFormat::from_path(fs_path) {
        Some(format) => format,
        None => unreachable!("unhandled file extension for {:?}", path),
    };

    let groups = decode_target_groups(path, format, &content).map_err(|e| ReadError::Decode {
        path: fs_path.to_path_buf(),
        source: e,
    })?;

    timestamps.set(path, DateTime::<Utc>::from(modified).timestamp() as f64);

    Ok(groups)
}

/// Decodes `content` as a list of target groups read from `path`.
pub fn decode_target_groups(
    path: &str,
    format: FileFormat,
    content: &[u8],
) -> Result<Vec<TargetGroup>, DecodeError> {
    let docs: Vec<Option<GroupDoc>> = match format {
        FileFormat::Json => {
            serde_json::from_slice::<Option<Vec<Option<GroupDoc>>>>(content)?.unwrap_or_default()
        }
        FileFormat::Yaml => {
            if content.iter().all(u8::is_ascii_whitespace) {
                Vec::new()
            } else {
                serde_yaml::from_slice::<Option<Vec<Option<StrictGroupDoc>>>>(content)?
                    .unwrap_or_default()
                    .into_iter()
                    .map(|doc| doc.map(GroupDoc::from))
                    .collect()
            }
        }
    };

    docs.into_iter()
        .enumerate()
        .map(|(index, doc)| {
            let doc = doc.ok_or(DecodeError::NullGroup { index })?;
            let mut group = doc.into_group()?;
            group.source = file_source(path, index);
            group
                .labels
                .insert(FILEPATH_LABEL.to_string(), path.to_string());
            Ok(group)
        })
        .collect()
}
