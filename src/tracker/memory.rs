//! In-memory tracking service using `DashMap`.
//!
//! Stands in for a remote tracking server in tests and demos. Data is lost
//! when the tracker is dropped.

use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;
use tracing::debug;

use super::{in_family, ConfigurationObject, TaskRecord, TaskStatus, TrackingClient, UserProperty};
use crate::config::flatten_value;
use crate::{Error, Result};

/// In-memory tracking service.
///
/// Tasks are kept per project in registration order, so
/// [`TrackingClient::query_existing`] returns them oldest first.
///
/// # Example
///
/// ```rust
/// use tracklog::tracker::{MemoryTracker, TrackingClient};
///
/// # fn example() -> tracklog::Result<()> {
/// let tracker = MemoryTracker::new();
/// let task = tracker.create_task("P", "run")?;
/// assert_eq!(task.id(), "task-000001");
/// assert_eq!(tracker.len(), 1);
/// # Ok(())
/// # }
/// # example().unwrap();
/// ```
pub struct MemoryTracker {
    projects: DashMap<String, Vec<TaskRecord>>,
    // task id -> project
    index: DashMap<String, String>,
    next_id: AtomicU64,
}

impl MemoryTracker {
    /// Create a new, empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self {
            projects: DashMap::new(),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Create with pre-allocated capacity for `capacity` projects.
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            projects: DashMap::with_capacity(capacity),
            index: DashMap::new(),
            next_id: AtomicU64::new(1),
        }
    }

    /// Get the number of registered tasks across all projects.
    #[must_use]
    pub fn len(&self) -> usize {
        self.index.len()
    }

    /// Check if no task is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Remove every task.
    pub fn clear(&self) {
        self.projects.clear();
        self.index.clear();
    }

    /// Seed an existing record, keeping its ID and name as-is.
    ///
    /// Replaces any record with the same ID.
    pub fn insert(&self, record: TaskRecord) {
        if let Some((_, project)) = self.index.remove(record.id()) {
            if let Some(mut tasks) = self.projects.get_mut(&project) {
                tasks.retain(|t| t.id() != record.id());
            }
        }
        self.index
            .insert(record.id().to_string(), record.project().to_string());
        self.projects
            .entry(record.project().to_string())
            .or_default()
            .push(record);
    }

    /// Get every task of a project, in registration order.
    #[must_use]
    pub fn tasks(&self, project: &str) -> Vec<TaskRecord> {
        self.projects
            .get(project)
            .map(|tasks| tasks.value().clone())
            .unwrap_or_default()
    }

    /// Get a task by ID.
    #[must_use]
    pub fn get_task(&self, task_id: &str) -> Option<TaskRecord> {
        let project = self.index.get(task_id)?.value().clone();
        let tasks = self.projects.get(&project)?;
        let task = tasks.iter().find(|t| t.id() == task_id).cloned();
        task
    }

    /// Delete the task named exactly `name`, returning it.
    #[must_use]
    pub fn remove_task(&self, project: &str, name: &str) -> Option<TaskRecord> {
        let mut tasks = self.projects.get_mut(project)?;
        let pos = tasks.iter().position(|t| t.name() == name)?;
        let removed = tasks.remove(pos);
        drop(tasks);
        self.index.remove(removed.id());
        Some(removed)
    }

    /// Mark a task as running.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if no task has this ID.
    pub fn start_task(&self, task_id: &str) -> Result<()> {
        self.update_task(task_id, TaskRecord::start)?;
        debug!(task_id, "task started");
        Ok(())
    }

    /// Close a task with its final status.
    ///
    /// # Errors
    ///
    /// Returns [`Error::TaskNotFound`] if no task has this ID.
    pub fn complete_task(&self, task_id: &str, status: TaskStatus) -> Result<()> {
        self.update_task(task_id, |task| task.complete(status))?;
        debug!(task_id, ?status, "task closed");
        Ok(())
    }

    fn update_task(&self, task_id: &str, f: impl FnOnce(&mut TaskRecord)) -> Result<()> {
        let project = self
            .index
            .get(task_id)
            .map(|p| p.value().clone())
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let mut tasks = self
            .projects
            .get_mut(&project)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        let task = tasks
            .iter_mut()
            .find(|t| t.id() == task_id)
            .ok_or_else(|| Error::TaskNotFound(task_id.to_string()))?;
        f(task);
        Ok(())
    }
}

impl Default for MemoryTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl TrackingClient for MemoryTracker {
    fn query_existing(&self, project: &str, name: &str) -> Result<Vec<TaskRecord>> {
        Ok(self
            .projects
            .get(project)
            .map(|tasks| {
                tasks
                    .iter()
                    .filter(|t| in_family(t.name(), name))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    fn fetch(&self, project: &str, name: &str) -> Result<Option<TaskRecord>> {
        Ok(self
            .projects
            .get(project)
            .and_then(|tasks| tasks.iter().find(|t| t.name() == name).cloned()))
    }

    fn create_task(&self, project: &str, name: &str) -> Result<TaskRecord> {
        let n = self.next_id.fetch_add(1, Ordering::Relaxed);
        let record = TaskRecord::new(format!("task-{n:06}"), project, name);
        debug!(task_id = record.id(), project, name, "registered task");
        self.insert(record.clone());
        Ok(record)
    }

    fn connect_configuration(
        &self,
        task_id: &str,
        name: &str,
        description: &str,
        config: &serde_json::Value,
    ) -> Result<()> {
        self.update_task(task_id, |task| {
            task.insert_configuration(
                name,
                ConfigurationObject {
                    description: description.to_string(),
                    value: config.clone(),
                },
            );
        })
    }

    fn connect_hyperparameters(
        &self,
        task_id: &str,
        section: &str,
        params: &serde_json::Value,
    ) -> Result<()> {
        let flat = flatten_value(params);
        self.update_task(task_id, |task| {
            for (key, value) in flat {
                task.insert_hyperparameter(format!("{section}/{key}"), value);
            }
        })
    }

    fn set_user_property(&self, task_id: &str, property: UserProperty) -> Result<()> {
        self.update_task(task_id, |task| task.insert_user_property(property))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_memory_tracker_default() {
        let tracker = MemoryTracker::default();
        assert!(tracker.is_empty());
        assert_eq!(tracker.len(), 0);
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let tracker = MemoryTracker::new();
        let a = tracker.create_task("P", "run").unwrap();
        let b = tracker.create_task("P", "run/1").unwrap();
        assert_eq!(a.id(), "task-000001");
        assert_eq!(b.id(), "task-000002");
        assert_eq!(tracker.len(), 2);
    }

    #[test]
    fn test_query_existing_preserves_registration_order() {
        let tracker = MemoryTracker::new();
        tracker.create_task("P", "run/3").unwrap();
        tracker.create_task("P", "run").unwrap();
        tracker.create_task("P", "runner").unwrap();
        tracker.create_task("Q", "run").unwrap();

        let names: Vec<String> = tracker
            .query_existing("P", "run")
            .unwrap()
            .iter()
            .map(|t| t.name().to_string())
            .collect();
        assert_eq!(names, vec!["run/3", "run"]);
    }

    #[test]
    fn test_query_unknown_project_is_empty() {
        let tracker = MemoryTracker::new();
        assert!(tracker.query_existing("nope", "run").unwrap().is_empty());
    }

    #[test]
    fn test_fetch_is_exact() {
        let tracker = MemoryTracker::new();
        tracker.create_task("P", "run/1").unwrap();
        assert!(tracker.fetch("P", "run").unwrap().is_none());
        assert!(tracker.fetch("P", "run/1").unwrap().is_some());
    }

    #[test]
    fn test_remove_task() {
        let tracker = MemoryTracker::new();
        tracker.create_task("P", "run").unwrap();
        let removed = tracker.remove_task("P", "run").unwrap();
        assert_eq!(removed.name(), "run");
        assert!(tracker.is_empty());
        assert!(tracker.remove_task("P", "run").is_none());
    }

    #[test]
    fn test_status_updates_are_stored() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();

        tracker.start_task(task.id()).unwrap();
        assert_eq!(tracker.get_task(task.id()).unwrap().status(), TaskStatus::InProgress);

        tracker.complete_task(task.id(), TaskStatus::Completed).unwrap();
        assert_eq!(tracker.get_task(task.id()).unwrap().status(), TaskStatus::Completed);
        // The handle returned at registration is a snapshot
        assert_eq!(task.status(), TaskStatus::Created);
    }

    #[test]
    fn test_status_update_unknown_task_fails() {
        let tracker = MemoryTracker::new();
        assert!(matches!(
            tracker.complete_task("missing", TaskStatus::Failed),
            Err(Error::TaskNotFound(id)) if id == "missing"
        ));
        assert!(tracker.start_task("missing").is_err());
    }

    #[test]
    fn test_insert_replaces_same_id() {
        let tracker = MemoryTracker::new();
        tracker.insert(TaskRecord::new("t1", "P", "run"));
        tracker.insert(TaskRecord::new("t1", "P", "run/7"));
        assert_eq!(tracker.len(), 1);
        assert_eq!(tracker.tasks("P").len(), 1);
        assert_eq!(tracker.get_task("t1").unwrap().name(), "run/7");
    }

    #[test]
    fn test_connect_hyperparameters_flattens_under_section() {
        let tracker = MemoryTracker::new();
        let task = tracker.create_task("P", "run").unwrap();
        tracker
            .connect_hyperparameters(
                task.id(),
                "summary",
                &json!({"model": {"lr": 0.1, "layers": [1, 2]}}),
            )
            .unwrap();

        let stored = tracker.get_task(task.id()).unwrap();
        assert_eq!(stored.hyperparameters()["summary/model.lr"], json!(0.1));
        assert_eq!(stored.hyperparameters()["summary/model.layers.1"], json!(2));
    }

    #[test]
    fn test_update_unknown_task_fails() {
        let tracker = MemoryTracker::new();
        let err = tracker
            .set_user_property("missing", UserProperty::new("a", "b", "c"))
            .unwrap_err();
        assert!(matches!(err, Error::TaskNotFound(id) if id == "missing"));
    }

    #[test]
    fn test_concurrent_registration() {
        use std::sync::Arc;
        use std::thread;

        let tracker = Arc::new(MemoryTracker::new());
        let handles: Vec<_> = (0..16)
            .map(|i| {
                let tracker = Arc::clone(&tracker);
                thread::spawn(move || {
                    tracker.create_task("P", &format!("run/{i}")).unwrap();
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(tracker.len(), 16);
        assert_eq!(tracker.query_existing("P", "run").unwrap().len(), 16);
    }
}
