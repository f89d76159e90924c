//! Config connection tests
//!
//! Drives a full run setup against the in-memory tracker: unique name,
//! whole config, summary, user properties and best checkpoint.

use std::io::Write;

use serde_json::json;
use tracklog::config::ConfigTree;
use tracklog::connect::{connect_whole, log_best_ckpt, set_user_properties};
use tracklog::naming::{safe_init, safe_init_from_settings};
use tracklog::settings::{PropertySpec, TrackerSettings};
use tracklog::tracker::{MemoryTracker, TaskStatus, TrackingClient};
use tracklog::Error;

fn training_cfg() -> ConfigTree {
    ConfigTree::from_value(json!({
        "train": true,
        "test": false,
        "model": {"_target_": "models.PointNet2", "lr": 0.001, "num_classes": 6},
        "datamodule": {"_target_": "data.DroneCloudDataModule", "batch_size": 8},
        "load_model": {"path_ckpt": "${paths.root_dir}/ckpt/init.ckpt"},
        "loading_model": {"name_run": "pointnet-baseline"},
        "paths": {"root_dir": "/workspace", "output_dir": "${paths.root_dir}/logs/2024-01-01"},
        "trainer": {"max_epochs": 50},
        "hydra": {"job": {"name": "train"}}
    }))
    .unwrap()
}

#[test]
fn test_connect_whole_end_to_end() {
    let tracker = MemoryTracker::new();
    let cfg = training_cfg();
    let settings = TrackerSettings::default();

    let task = safe_init(&tracker, &settings.default_project, "train/pointnet").unwrap();
    let outcomes = connect_whole(&tracker, &task, &cfg, &settings).unwrap();
    assert!(outcomes.iter().all(Result::is_ok));

    let stored = tracker.get_task(task.id()).unwrap();
    assert_eq!(stored.project(), "drone-cloud-point-segmentation/train");
    assert_eq!(stored.status(), TaskStatus::Created);

    let whole = stored.configuration("whole cfg").unwrap();
    assert_eq!(whole.value, cfg.to_container(false));

    let params = stored.hyperparameters();
    assert_eq!(params["summary config/model.lr"], json!(0.001));
    assert_eq!(params["summary config/train"], json!(true));
    assert!(!params.keys().any(|k| k.starts_with("summary config/trainer")));
    assert!(!params.keys().any(|k| k.starts_with("summary config/hydra")));
    // Unresolved by default
    assert_eq!(
        params["summary config/load_model.path_ckpt"],
        json!("${paths.root_dir}/ckpt/init.ckpt")
    );

    assert_eq!(
        stored.user_property("trained_model").unwrap().value,
        "pointnet-baseline"
    );
    assert_eq!(
        stored.user_property("initial_ckpt").unwrap().value,
        "/workspace/ckpt/init.ckpt"
    );
    assert_eq!(
        stored.user_property("Target Dataset").unwrap().value,
        "data.DroneCloudDataModule"
    );
    assert_eq!(
        stored.user_property("log path").unwrap().value,
        "/workspace/logs/2024-01-01"
    );
}

#[test]
fn test_connect_whole_resolved_summary() {
    let tracker = MemoryTracker::new();
    let task = tracker.create_task("P", "run").unwrap();
    let settings = TrackerSettings::default().resolve_summary(true);

    connect_whole(&tracker, &task, &training_cfg(), &settings).unwrap();

    let stored = tracker.get_task(task.id()).unwrap();
    assert_eq!(
        stored.hyperparameters()["summary config/load_model.path_ckpt"],
        json!("/workspace/ckpt/init.ckpt")
    );
}

#[test]
fn test_missing_property_does_not_block_others() {
    let tracker = MemoryTracker::new();
    let task = tracker.create_task("P", "run").unwrap();
    let cfg = ConfigTree::from_value(json!({"paths": {"output_dir": "/logs"}})).unwrap();

    let outcomes = set_user_properties(&tracker, &task, &cfg, &PropertySpec::defaults());
    let failed: Vec<&Error> = outcomes.iter().filter_map(|r| r.as_ref().err()).collect();

    assert_eq!(failed.len(), 3);
    assert!(failed
        .iter()
        .all(|e| matches!(e, Error::MissingKey { .. })));
    assert_eq!(
        tracker
            .get_task(task.id())
            .unwrap()
            .user_property("log path")
            .unwrap()
            .value,
        "/logs"
    );
}

#[test]
fn test_custom_settings_names() {
    let tracker = MemoryTracker::new();
    let task = tracker.create_task("P", "run").unwrap();
    let settings = TrackerSettings::from_json_str(
        r#"{
            "whole_config_name": "main cfg",
            "summary_name": "summary hyperparams",
            "summary_keys": ["trainer"],
            "user_properties": []
        }"#,
    )
    .unwrap();

    let outcomes = connect_whole(&tracker, &task, &training_cfg(), &settings).unwrap();
    assert!(outcomes.is_empty());

    let stored = tracker.get_task(task.id()).unwrap();
    assert!(stored.configuration("main cfg").is_some());
    assert_eq!(
        stored.hyperparameters()["summary hyperparams/trainer.max_epochs"],
        json!(50)
    );
    assert!(stored.user_properties().is_empty());
}

#[test]
fn test_best_ckpt_overwrites() {
    let tracker = MemoryTracker::new();
    let task = tracker.create_task("P", "run").unwrap();
    let settings = TrackerSettings::default();

    log_best_ckpt(&tracker, &task, "epoch=3.ckpt", &settings.best_ckpt_property).unwrap();
    log_best_ckpt(&tracker, &task, "epoch=7.ckpt", &settings.best_ckpt_property).unwrap();

    let stored = tracker.get_task(task.id()).unwrap();
    assert_eq!(
        stored.user_property("path_best_ckpt").unwrap().value,
        "epoch=7.ckpt"
    );
}

#[test]
fn test_suffix_strategy_from_settings_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"{{"default_project": "P", "suffix_strategy": "highest_suffix"}}"#
    )
    .unwrap();
    let settings = TrackerSettings::from_path(file.path()).unwrap();

    let tracker = MemoryTracker::new();
    for name in ["run", "run/3", "run/2"] {
        tracker.create_task("P", name).unwrap();
    }

    // Registration order leaves run/2 last; the configured strategy still
    // steps past run/3.
    let task = safe_init_from_settings(&tracker, &settings, "run").unwrap();
    assert_eq!((task.project(), task.name()), ("P", "run/4"));
}

#[test]
fn test_default_settings_follow_registration_order() {
    let tracker = MemoryTracker::new();
    for name in ["run", "run/3", "run/2"] {
        tracker.create_task("P", name).unwrap();
    }
    let settings = TrackerSettings::default().default_project("P");

    let task = safe_init_from_settings(&tracker, &settings, "run").unwrap();
    assert_eq!(task.name(), "run/3");
}
