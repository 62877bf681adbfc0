//! Integration tests for a single refresh and the diff between refreshes.

mod common;

use common::{TargetFileBuilder, TestHarness};

use filesd::{RefreshOutcome, Target, FILEPATH_LABEL};

#[tokio::test]
async fn test_file_with_n_groups_yields_n_sources() {
    let harness = TestHarness::new();
    let path = harness.write_file("nodes.json", &TargetFileBuilder::new().groups(3).to_json());
    let mut reconciler = harness.reconciler(&["*.json"]);

    let result = harness.scan(&mut reconciler).await;
    assert_eq!(result.outcome, RefreshOutcome::Completed);
    assert_eq!(result.batches.len(), 1);

    let batch = &result.batches[0];
    assert_eq!(batch.len(), 3);
    for (i, group) in batch.iter().enumerate() {
        assert_eq!(group.source, format!("{}:{}", path, i));
        assert_eq!(group.labels[FILEPATH_LABEL], path);
        assert_eq!(group.targets, vec![Target::new(format!("host-{}:80", i))]);
    }
    assert_eq!(reconciler.baseline().get(&path), Some(&3));
    assert!(reconciler.timestamps().get(&path).is_some());
}

#[tokio::test]
async fn test_yaml_and_json_files_are_both_read() {
    let harness = TestHarness::new();
    let json = harness.write_file(
        "a.json",
        &TargetFileBuilder::new()
            .group(&["a:1"])
            .label("env", "prod")
            .to_json(),
    );
    let yaml = harness.write_file(
        "b.yml",
        &TargetFileBuilder::new()
            .group(&["b:1", "b:2"])
            .label("env", "dev")
            .to_yaml(),
    );
    let mut reconciler = harness.reconciler(&["*.json", "*.yml"]);

    let result = harness.scan(&mut reconciler).await;
    assert_eq!(result.batches.len(), 2);
    assert_eq!(result.batches[0][0].source, format!("{}:0", json));
    assert_eq!(result.batches[0][0].labels["env"], "prod");
    assert_eq!(result.batches[1][0].source, format!("{}:0", yaml));
    assert_eq!(result.batches[1][0].targets.len(), 2);
    assert_eq!(result.batches[1][0].labels["env"], "dev");
}

#[tokio::test]
async fn test_shrunk_file_emits_tombstones_for_removed_indices() {
    let harness = TestHarness::new();
    let path = harness.write_file("nodes.json", &TargetFileBuilder::new().groups(5).to_json());
    let mut reconciler = harness.reconciler(&["*.json"]);
    harness.scan(&mut reconciler).await;

    harness.write_file("nodes.json", &TargetFileBuilder::new().groups(2).to_json());
    let result = harness.scan(&mut reconciler).await;

    assert_eq!(result.updates().len(), 1);
    assert_eq!(result.updates()[0].len(), 2);
    assert_eq!(
        result.tombstones(),
        vec![
            format!("{}:2", path),
            format!("{}:3", path),
            format!("{}:4", path),
        ]
    );
    assert_eq!(reconciler.baseline().get(&path), Some(&2));
    assert!(reconciler.timestamps().get(&path).is_none());
}

#[tokio::test]
async fn test_deleted_file_emits_tombstones_for_all_groups() {
    let harness = TestHarness::new();
    let gone = harness.write_file("gone.json", &TargetFileBuilder::new().groups(2).to_json());
    let kept = harness.write_file("kept.json", &TargetFileBuilder::new().groups(1).to_json());
    let mut reconciler = harness.reconciler(&["*.json"]);
    harness.scan(&mut reconciler).await;

    harness.remove_file("gone.json");
    let result = harness.scan(&mut reconciler).await;

    assert_eq!(
        result.tombstones(),
        vec![format!("{}:0", gone), format!("{}:1", gone)]
    );
    assert!(!reconciler.baseline().contains_key(&gone));
    assert_eq!(reconciler.baseline().get(&kept), Some(&1));
    assert!(reconciler.timestamps().get(&gone).is_none());
    assert!(reconciler.timestamps().get(&kept).is_some());
}

#[tokio::test]
async fn test_read_failure_keeps_baseline() {
    let harness = TestHarness::new();
    let path = harness.write_file("nodes.json", &TargetFileBuilder::new().groups(3).to_json());
    let mut reconciler = harness.reconciler(&["*.json"]);
    harness.scan(&mut reconciler).await;
    let errors_before = harness.metrics.read_errors.get();

    harness.write_file("nodes.json", "[{\"targets\": [\"a:1\"]}, null]");
    let result = harness.scan(&mut reconciler).await;

    assert!(result.batches.is_empty());
    assert_eq!(reconciler.baseline().get(&path), Some(&3));
    assert_eq!(harness.metrics.read_errors.get(), errors_before + 1);
    // The timestamp of the last good read is kept.
    assert!(reconciler.timestamps().get(&path).is_some());
}

#[tokio::test]
async fn test_unreadable_new_file_is_not_tracked() {
    let harness = TestHarness::new();
    std::fs::create_dir(harness.targets_dir.join("dir.json")).unwrap();
    let mut reconciler = harness.reconciler(&["*.json"]);

    let result = harness.scan(&mut reconciler).await;

    assert_eq!(result.outcome, RefreshOutcome::Completed);
    assert!(result.batches.is_empty());
    assert!(reconciler.baseline().is_empty());
    assert_eq!(harness.metrics.read_errors.get(), 1);
}

#[tokio::test]
async fn test_rescan_of_unchanged_files_is_idempotent() {
    let harness = TestHarness::new();
    harness.write_file("a.json", &TargetFileBuilder::new().groups(2).to_json());
    harness.write_file("b.yaml", &TargetFileBuilder::new().groups(1).to_yaml());
    let mut reconciler = harness.reconciler(&["*.json", "*.yaml"]);

    let first = harness.scan(&mut reconciler).await;
    let second = harness.scan(&mut reconciler).await;

    assert!(first.tombstones().is_empty());
    assert!(second.tombstones().is_empty());
    assert_eq!(first.batches, second.batches);
}

#[tokio::test]
async fn test_empty_file_is_distinct_from_error() {
    let harness = TestHarness::new();
    let path = harness.write_file("nodes.json", &TargetFileBuilder::new().groups(2).to_json());
    let mut reconciler = harness.reconciler(&["*.json"]);
    harness.scan(&mut reconciler).await;

    harness.write_file("nodes.json", "[]");
    let result = harness.scan(&mut reconciler).await;

    assert_eq!(result.updates().len(), 1);
    assert!(result.updates()[0].is_empty());
    assert_eq!(
        result.tombstones(),
        vec![format!("{}:0", path), format!("{}:1", path)]
    );
    assert_eq!(reconciler.baseline().get(&path), Some(&0));
    assert_eq!(harness.metrics.read_errors.get(), 0);
}

#[tokio::test]
async fn test_reordered_groups_produce_no_tombstones() {
    let harness = TestHarness::new();
    harness.write_file(
        "nodes.json",
        &TargetFileBuilder::new().group(&["a:1"]).group(&["b:2"]).to_json(),
    );
    let mut reconciler = harness.reconciler(&["*.json"]);
    harness.scan(&mut reconciler).await;

    harness.write_file(
        "nodes.json",
        &TargetFileBuilder::new().group(&["b:2"]).group(&["a:1"]).to_json(),
    );
    let result = harness.scan(&mut reconciler).await;

    assert!(result.tombstones().is_empty());
    assert_eq!(result.batches[0][0].targets, vec![Target::new("b:2")]);
}

#[tokio::test]
async fn test_scan_duration_observed_per_refresh() {
    let harness = TestHarness::new();
    let mut reconciler = harness.reconciler(&["*.json"]);

    harness.scan(&mut reconciler).await;
    harness.scan(&mut reconciler).await;

    assert_eq!(harness.metrics.scan_duration.snapshot().count, 2);
}
