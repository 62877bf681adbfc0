//! Builders for target file contents.

#![allow(dead_code)]

use std::collections::BTreeMap;

use serde_json::json;

/// One group as written to a target file.
#[derive(Debug, Clone, Default)]
pub struct GroupSpec {
    pub targets: Vec<String>,
    pub labels: BTreeMap<String, String>,
}

/// Builder for the contents of a target file.
#[derive(Debug, Clone, Default)]
pub struct TargetFileBuilder {
    groups: Vec<GroupSpec>,
}

impl TargetFileBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a group with the given targets and no labels.
    pub fn group(mut self, targets: &[&str]) -> Self {
        self.groups.push(GroupSpec {
            targets: targets.iter().map(|t| t.to_string()).collect(),
            labels: BTreeMap::new(),
        });
        self
    }

    /// Adds a label to the most recently added group.
    pub fn label(mut self, name: &str, value: &str) -> Self {
        if let Some(group) = self.groups.last_mut() {
            group.labels.insert(name.to_string(), value.to_string());
        }
        self
    }

    /// Adds `n` single-target groups, `host-0:80` .. `host-{n-1}:80`.
    pub fn groups(mut self, n: usize) -> Self {
        for i in 0..n {
            self = self.group(&[&format!("host-{}:80", i)]);
        }
        self
    }

    pub fn to_json(&self) -> String {
        let groups: Vec<_> = self
            .groups
            .iter()
            .map(|g| json!({ "targets": g.targets, "labels": g.labels }))
            .collect();
        serde_json::to_string_pretty(&groups).expect("Failed to serialize target file")
    }

    pub fn to_yaml(&self) -> String {
        let mut out = String::new();
        if self.groups.is_empty() {
            return "[]\n".to_string();
        }
        for group in &self.groups {
            out.push_str("- targets:\n");
            for target in &group.targets {
                out.push_str(&format!("    - '{}'\n", target));
            }
            if !group.labels.is_empty() {
                out.push_str("  labels:\n");
                for (name, value) in &group.labels {
                    out.push_str(&format!("    {}: '{}'\n", name, value));
                }
            }
        }
        out
    }
}
