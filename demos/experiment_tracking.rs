//! Experiment Tracking Example
//!
//! Walks through launching runs against the in-memory tracker: unique run
//! names, config connection, user properties and the best checkpoint.
//!
//! Run with: RUST_LOG=tracklog=debug cargo run --example experiment_tracking

use serde_json::json;
use tracklog::config::ConfigTree;
use tracklog::connect::{connect_whole, log_best_ckpt};
use tracklog::naming::{safe_init_from_settings, NameAllocator, SuffixStrategy};
use tracklog::settings::TrackerSettings;
use tracklog::tracker::{MemoryTracker, TaskStatus, TrackingClient};

fn main() -> anyhow::Result<()> {
    tracklog::init_tracing();
    println!("=== tracklog Experiment Tracking ===\n");

    let tracker = MemoryTracker::new();
    let settings = TrackerSettings::default();

    // -------------------------------------------------------------------------
    // 1. Launch the same experiment three times
    // -------------------------------------------------------------------------
    println!("1. Launching runs...");

    let mut tasks = Vec::new();
    for _ in 0..3 {
        let task = safe_init_from_settings(&tracker, &settings, "ablation/pointnet")?;
        println!("   {} -> {}/{}", task.id(), task.project(), task.name());
        tasks.push(task);
    }

    // -------------------------------------------------------------------------
    // 2. Connect the configuration to the latest run
    // -------------------------------------------------------------------------
    println!("\n2. Connecting configuration...");

    let cfg = ConfigTree::from_value(json!({
        "train": true,
        "model": {"_target_": "models.PointNet2", "lr": 0.001},
        "datamodule": {"_target_": "data.DroneCloudDataModule", "batch_size": 8},
        "paths": {"root_dir": "/workspace", "output_dir": "${paths.root_dir}/logs"},
        "trainer": {"max_epochs": 50}
    }))?;

    let task = tasks.last().ok_or_else(|| anyhow::anyhow!("no task launched"))?;
    tracker.start_task(task.id())?;
    for outcome in connect_whole(&tracker, task, &cfg, &settings)? {
        match outcome {
            Ok(property) => println!("   set   {} = {}", property.name, property.value),
            Err(e) => println!("   skip  {e}"),
        }
    }

    // -------------------------------------------------------------------------
    // 3. Training finishes
    // -------------------------------------------------------------------------
    println!("\n3. Logging best checkpoint...");
    log_best_ckpt(
        &tracker,
        task,
        "/workspace/logs/checkpoints/epoch=41.ckpt",
        &settings.best_ckpt_property,
    )?;

    tracker.complete_task(task.id(), TaskStatus::Completed)?;

    let stored = tracker
        .get_task(task.id())
        .ok_or_else(|| anyhow::anyhow!("task {} vanished", task.id()))?;
    println!("   Status: {:?}", stored.status());
    println!("   Hyperparameters: {}", stored.hyperparameters().len());
    println!("   User properties: {}", stored.user_properties().len());

    // -------------------------------------------------------------------------
    // 4. A deleted run and the two suffix strategies
    // -------------------------------------------------------------------------
    println!("\n4. After deleting run/1...");

    let project = tasks[0].project().to_string();
    let removed = tracker
        .remove_task(&project, "pointnet/1")
        .ok_or_else(|| anyhow::anyhow!("pointnet/1 was never registered"))?;
    println!("   removed {}", removed.id());
    tracker.create_task(&project, "pointnet/9")?;
    tracker.create_task(&project, "pointnet/3")?;
    println!(
        "   existing: {:?}",
        tracker
            .query_existing(&project, "pointnet")?
            .iter()
            .map(|t| t.name().to_string())
            .collect::<Vec<_>>()
    );

    for strategy in [SuffixStrategy::LastRecord, SuffixStrategy::HighestSuffix] {
        let allocated = NameAllocator::new(&tracker)
            .with_strategy(strategy)
            .derive_unique_name(&project, "pointnet")?;
        println!("   {strategy:?}: {allocated}");
        for diagnostic in allocated.diagnostics() {
            println!("     warning: {diagnostic}");
        }
    }

    // -------------------------------------------------------------------------
    // 5. Serialization
    // -------------------------------------------------------------------------
    println!("\n5. TaskRecord JSON:");
    println!("{}", serde_json::to_string_pretty(&stored)?);

    println!("\n=== Experiment Tracking Complete ===");
    Ok(())
}
