use std::fs;

use ferrite_sft::network::ModelMetadata;
use ferrite_sft::{run_from_config, Network, RunConfig, TrainError};
use tempfile::tempdir;

const RUN: &str = r#"
[trainer]
epochs = 3
log_interval = 1
show_progress = false
seed = 7

[project]
project_dir = "run"
total_limit = 2

[logging]
stdout = false
jsonl = "run/metrics.jsonl"

[optimizer]
learning_rate = 0.5

[scheduler]
kind = "linear"
warmup_steps = 1

[model]
name = "xor"
loss = "mse"
layers = [
    { size = 4, input_size = 2, activation = "tanh" },
    { size = 1, input_size = 4, activation = "sigmoid" },
]

[model.metadata]
description = "xor smoke run"
feature_names = ["a", "b"]

[data]
batch_size = 2

[data.source]
kind = "builtin"
name = "xor"
"#;

#[test]
fn run_file_trains_and_publishes_checkpoints() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.toml");
    fs::write(&path, RUN).unwrap();

    let config = RunConfig::from_path(&path).unwrap();
    let summary = run_from_config(&config, None).unwrap();

    assert_eq!(summary.epochs_completed, 3);
    // 4 xor samples in batches of 2
    assert_eq!(summary.global_step, 6);
    assert!(summary.train_loss_history.iter().all(|l| l.is_finite()));
    assert!(summary.validation_loss_history.is_empty());

    let root = dir.path().join("run").join("checkpoints");
    let mut names: Vec<String> = fs::read_dir(&root)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    assert_eq!(names, vec!["checkpoint_1", "checkpoint_2"]);

    let last = root.join("checkpoint_2");
    let network = Network::load_pretrained(&last).unwrap();
    assert_eq!(network.input_size(), 2);
    assert_eq!(network.output_size(), 1);
    let prediction = network.predict(&[1.0, 0.0]).unwrap();
    assert!(prediction[0] > 0.0 && prediction[0] < 1.0);

    let metadata = ModelMetadata::load(&last).unwrap();
    assert_eq!(metadata.description.as_deref(), Some("xor smoke run"));

    let log = fs::read_to_string(dir.path().join("run").join("metrics.jsonl")).unwrap();
    let lines: Vec<serde_json::Value> = log.lines().map(|l| serde_json::from_str(l).unwrap()).collect();
    // 6 step records and 3 epoch records
    assert_eq!(lines.len(), 9);
    assert!(lines[0]["metrics"]["lr"].is_number());
    let epoch_records = lines.iter().filter(|l| l["metrics"].get("train/loss").is_some()).count();
    assert_eq!(epoch_records, 3);
}

#[test]
fn validation_split_adds_validation_loss() {
    let dir = tempdir().unwrap();
    let content = RUN
        .replace("batch_size = 2", "batch_size = 8\nval_split_pct = 25")
        .replace(
            "kind = \"builtin\"\nname = \"xor\"",
            "kind = \"builtin\"\nname = \"blobs\"\nsamples = 40",
        )
        .replace("{ size = 1, input_size = 4, activation = \"sigmoid\" }", "{ size = 2, input_size = 4, activation = \"softmax\" }")
        .replace("loss = \"mse\"", "loss = \"cross_entropy\"");
    let path = dir.path().join("run.toml");
    fs::write(&path, content).unwrap();

    let config = RunConfig::from_path(&path).unwrap();
    let summary = run_from_config(&config, None).unwrap();

    assert_eq!(summary.validation_loss_history.len(), 3);
    // 30 training samples in batches of 8
    assert_eq!(summary.global_step, 12);
}

#[test]
fn invalid_run_files_fail_before_touching_disk() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("run.toml");
    fs::write(&path, RUN.replace("epochs = 3", "epochs = 0")).unwrap();

    let config = RunConfig::from_path(&path).unwrap();
    let err = run_from_config(&config, None).unwrap_err();
    assert!(matches!(err, TrainError::Validation(_)));
    assert!(!dir.path().join("run").exists());
}
