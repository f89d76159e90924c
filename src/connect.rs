//! Connecting experiment configs to a tracked task
//!
//! Each function forwards one view of a [`ConfigTree`] to the tracking
//! client. Connection failures propagate; user properties report one
//! result per property so the caller decides which missing fields matter.

use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ConfigTree;
use crate::settings::{PropertySpec, TrackerSettings};
use crate::tracker::{TaskRecord, TrackingClient, UserProperty};
use crate::{Error, Result};

/// Log the whole configuration as a configuration object.
///
/// # Errors
///
/// Propagates tracking client errors.
pub fn connect_cfg<C: TrackingClient + ?Sized>(
    client: &C,
    task: &TaskRecord,
    cfg: &ConfigTree,
    name: &str,
    description: &str,
) -> Result<()> {
    client.connect_configuration(task.id(), name, description, &cfg.to_container(false))?;
    debug!(task_id = task.id(), name, "connected configuration");
    Ok(())
}

/// Log the selected top-level sections of `cfg` as hyperparameters.
///
/// With `resolve`, interpolations are resolved against the full tree before
/// masking, so references into sections outside `keys` still resolve.
///
/// # Errors
///
/// Propagates tracking client errors.
pub fn connect_hyperparams_summary<C, S>(
    client: &C,
    task: &TaskRecord,
    cfg: &ConfigTree,
    name: &str,
    keys: &[S],
    resolve: bool,
) -> Result<()>
where
    C: TrackingClient + ?Sized,
    S: AsRef<str>,
{
    let summary = if resolve {
        cfg.resolved().masked_copy(keys)
    } else {
        cfg.masked_copy(keys)
    };
    client.connect_hyperparameters(task.id(), name, &summary.to_container(false))?;
    debug!(
        task_id = task.id(),
        name,
        sections = summary.keys().count(),
        "connected hyperparameter summary"
    );
    Ok(())
}

/// Set one user property per spec, reading values from `cfg`.
///
/// Every spec is attempted; the returned vector holds one result per spec,
/// in order. A config path that does not resolve yields
/// [`crate::Error::MissingKey`] for that property only.
pub fn set_user_properties<C: TrackingClient + ?Sized>(
    client: &C,
    task: &TaskRecord,
    cfg: &ConfigTree,
    specs: &[PropertySpec],
) -> Vec<Result<UserProperty>> {
    specs
        .iter()
        .map(|spec| {
            let result = set_user_property(client, task, cfg, spec);
            if let Err(e) = &result {
                warn!(task_id = task.id(), property = %spec.name, "user property not set: {e}");
            }
            result
        })
        .collect()
}

fn set_user_property<C: TrackingClient + ?Sized>(
    client: &C,
    task: &TaskRecord,
    cfg: &ConfigTree,
    spec: &PropertySpec,
) -> Result<UserProperty> {
    let value = cfg
        .get_resolved(&spec.path)
        .ok_or_else(|| Error::missing_key(&spec.path))?;
    let property = UserProperty::new(&spec.name, &spec.description, render(&value));
    client.set_user_property(task.id(), property.clone())?;
    Ok(property)
}

/// Run the full connection: whole config, hyperparameter summary, then user
/// properties, all named per `settings`.
///
/// # Errors
///
/// Returns an error if connecting the config or the summary fails.
/// Per-property outcomes are returned, not raised.
pub fn connect_whole<C: TrackingClient + ?Sized>(
    client: &C,
    task: &TaskRecord,
    cfg: &ConfigTree,
    settings: &TrackerSettings,
) -> Result<Vec<Result<UserProperty>>> {
    connect_cfg(
        client,
        task,
        cfg,
        &settings.whole_config_name,
        &settings.whole_config_description,
    )?;
    connect_hyperparams_summary(
        client,
        task,
        cfg,
        &settings.summary_name,
        settings.summary_keys.as_slice(),
        settings.resolve_summary,
    )?;
    Ok(set_user_properties(
        client,
        task,
        cfg,
        &settings.user_properties,
    ))
}

/// Record the best checkpoint path as a user property.
///
/// # Errors
///
/// Propagates tracking client errors.
pub fn log_best_ckpt<C: TrackingClient + ?Sized>(
    client: &C,
    task: &TaskRecord,
    best_ckpt: &str,
    property_name: &str,
) -> Result<()> {
    client.set_user_property(
        task.id(),
        UserProperty::new(
            property_name,
            "name of the best ckpt due to training",
            best_ckpt,
        ),
    )
}

// Strings are shown bare, everything else as JSON.
fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::MemoryTracker;
    use serde_json::json;

    fn cfg() -> ConfigTree {
        ConfigTree::from_value(json!({
            "model": {"lr": 0.01},
            "datamodule": {"_target_": "data.Drone", "batch_size": 4},
            "paths": {"root": "/r", "output_dir": "${paths.root}/out"},
            "trainer": {"epochs": 3}
        }))
        .unwrap()
    }

    #[test]
    fn test_connect_cfg_stores_raw_tree() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        connect_cfg(&tracker, &task, &cfg(), "main cfg", "desc").unwrap();

        let stored = tracker.get_task(task.id()).unwrap();
        let obj = stored.configuration("main cfg").unwrap();
        assert_eq!(obj.description, "desc");
        assert_eq!(obj.value["paths"]["output_dir"], json!("${paths.root}/out"));
    }

    #[test]
    fn test_summary_masks_sections() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        connect_hyperparams_summary(&tracker, &task, &cfg(), "summary", &["model", "train"], false)
            .unwrap();

        let params = tracker.get_task(task.id()).unwrap().hyperparameters().clone();
        assert_eq!(params.len(), 1);
        assert_eq!(params["summary/model.lr"], json!(0.01));
    }

    #[test]
    fn test_summary_resolves_against_full_tree() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        let cfg = ConfigTree::from_value(json!({
            "paths": {"root": "/r"},
            "model": {"ckpt_dir": "${paths.root}/ckpt"}
        }))
        .unwrap();
        connect_hyperparams_summary(&tracker, &task, &cfg, "s", &["model"], true).unwrap();

        let params = tracker.get_task(task.id()).unwrap().hyperparameters().clone();
        assert_eq!(params["s/model.ckpt_dir"], json!("/r/ckpt"));
    }

    #[test]
    fn test_user_properties_report_each_outcome() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        let results = set_user_properties(&tracker, &task, &cfg(), &PropertySpec::defaults());

        assert_eq!(results.len(), 4);
        assert!(matches!(&results[0], Err(Error::MissingKey { path }) if path == "loading_model.name_run"));
        assert!(matches!(&results[1], Err(Error::MissingKey { .. })));
        assert_eq!(results[2].as_ref().unwrap().value, "data.Drone");
        assert_eq!(results[3].as_ref().unwrap().value, "/r/out");

        let stored = tracker.get_task(task.id()).unwrap();
        assert_eq!(stored.user_properties().len(), 2);
    }

    #[test]
    fn test_non_string_property_rendered_as_json() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        let spec = PropertySpec::new("batch", "batch size", "datamodule.batch_size");
        let results = set_user_properties(&tracker, &task, &cfg(), &[spec]);
        assert_eq!(results[0].as_ref().unwrap().value, "4");
    }

    #[test]
    fn test_log_best_ckpt() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        log_best_ckpt(&tracker, &task, "/ckpt/best.ckpt", "path_best_ckpt").unwrap();

        let stored = tracker.get_task(task.id()).unwrap();
        assert_eq!(
            stored.user_property("path_best_ckpt").unwrap().value,
            "/ckpt/best.ckpt"
        );
    }

    #[test]
    fn test_unknown_task_propagates() {
        let tracker = MemoryTracker::new();
        let ghost = TaskRecord::new("ghost", "P", "run");
        assert!(matches!(
            connect_cfg(&tracker, &ghost, &cfg(), "n", "d"),
            Err(Error::TaskNotFound(_))
        ));
    }
}
