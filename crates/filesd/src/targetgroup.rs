//! Target groups: the unit of output of file discovery.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::DecodeError;

/// Label name → label value. Ordered so output is stable.
pub type LabelSet = BTreeMap<String, String>;

/// Label holding a target's address.
pub const ADDRESS_LABEL: &str = "__address__";

/// Provenance label injected into every group read from a file.
pub const FILEPATH_LABEL: &str = "__meta_filepath";

/// A single scrape target with optional per-target labels.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Target {
    /// Host and port, e.g. `"localhost:9100"`.
    pub address: String,
    /// Labels overriding the group's labels for this target.
    #[serde(skip_serializing_if = "LabelSet::is_empty")]
    pub labels: LabelSet,
}

impl Target {
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
            labels: LabelSet::new(),
        }
    }

    /// The target's full label set, with the address under [`ADDRESS_LABEL`].
    pub fn label_set(&self) -> LabelSet {
        let mut labels = self.labels.clone();
        labels.insert(ADDRESS_LABEL.to_string(), self.address.clone());
        labels
    }
}

/// A set of targets sharing common labels, identified by `source`.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct TargetGroup {
    /// Deterministic identifier, `"<path>:<index>"` for file discovery.
    pub source: String,
    pub targets: Vec<Target>,
    pub labels: LabelSet,
}

impl TargetGroup {
    /// An empty group announcing that `source` no longer exists.
    pub fn tombstone(source: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            ..Default::default()
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.targets.is_empty() && self.labels.is_empty()
    }
}

impl fmt::Display for TargetGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Returns the source ID for the `index`-th target group in `path`.
pub fn file_source(path: &str, index: usize) -> String {
    format!("{}:{}", path, index)
}

/// Whether `name` matches `[a-zA-Z_][a-zA-Z0-9_]*`.
pub fn is_valid_label_name(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// On-disk shape of a group in JSON files. Unknown keys are ignored.
#[derive(Debug, Deserialize)]
pub(crate) struct GroupDoc {
    #[serde(default)]
    targets: Option<Vec<String>>,
    #[serde(default)]
    labels: Option<LabelSet>,
}

/// On-disk shape of a group in YAML files. Unknown keys are rejected.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub(crate) struct StrictGroupDoc {
    #[serde(default)]
    targets: Option<Vec<String>>,
    #[serde(default)]
    labels: Option<LabelSet>,
}

impl From<StrictGroupDoc> for GroupDoc {
    fn from(doc: StrictGroupDoc) -> Self {
        Self {
            targets: doc.targets,
            labels: doc.labels,
        }
    }
}

impl GroupDoc {
    /// Validates label names and converts into a group with an empty source.
    pub(crate) fn into_group(self) -> Result<TargetGroup, DecodeError> {
        let labels = self.labels.unwrap_or_default();
        if let Some(name) = labels.keys().find(|name| !is_valid_label_name(name)) {
            return Err(DecodeError::InvalidLabelName(name.clone()));
        }

        Ok(TargetGroup {
            source: String::new(),
            targets: self
                .targets
                .unwrap_or_default()
                .into_iter()
                .map(Target::new)
                .collect(),
            labels,
        })
    }
}
