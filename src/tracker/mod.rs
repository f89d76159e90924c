//! Tracking collaborator
//!
//! The tracking service owns every piece of shared state: registered tasks,
//! their configurations and their user properties. This crate only reaches
//! it through [`TrackingClient`].
//!
//! # Example
//!
//! ```rust
//! use tracklog::tracker::{MemoryTracker, TrackingClient};
//!
//! # fn example() -> tracklog::Result<()> {
//! let tracker = MemoryTracker::new();
//! tracker.create_task("P", "run")?;
//! tracker.create_task("P", "run/1")?;
//!
//! assert_eq!(tracker.query_existing("P", "run")?.len(), 2);
//! assert!(tracker.fetch("P", "run/1")?.is_some());
//! assert!(tracker.fetch("P", "run/2")?.is_none());
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod memory;
mod record;

pub use memory::MemoryTracker;
pub use record::{ConfigurationObject, TaskRecord, TaskRecordBuilder, TaskStatus, UserProperty};

use crate::Result;

/// Client for an experiment-tracking service.
///
/// Every call reads or writes the service directly; implementations must
/// not cache query results, since the allocator relies on fresh reads.
pub trait TrackingClient: Send + Sync {
    /// Get every task in `project` whose name is `name` or `name/<anything>`.
    ///
    /// Ordering is implementation-defined.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    fn query_existing(&self, project: &str, name: &str) -> Result<Vec<TaskRecord>>;

    /// Get the task in `project` named exactly `name`.
    ///
    /// Returns `None` if no such task exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    fn fetch(&self, project: &str, name: &str) -> Result<Option<TaskRecord>>;

    /// Register a new task.
    ///
    /// # Errors
    ///
    /// Returns an error if the service call fails.
    fn create_task(&self, project: &str, name: &str) -> Result<TaskRecord>;

    /// Attach a whole configuration tree to a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is unknown or the service call fails.
    fn connect_configuration(
        &self,
        task_id: &str,
        name: &str,
        description: &str,
        config: &serde_json::Value,
    ) -> Result<()>;

    /// Attach a hyperparameter section to a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is unknown or the service call fails.
    fn connect_hyperparameters(
        &self,
        task_id: &str,
        section: &str,
        params: &serde_json::Value,
    ) -> Result<()>;

    /// Set (or overwrite) a user property on a task.
    ///
    /// # Errors
    ///
    /// Returns an error if the task is unknown or the service call fails.
    fn set_user_property(&self, task_id: &str, property: UserProperty) -> Result<()>;
}

/// Whether `candidate` belongs to the family of `base` (`base` or `base/...`).
#[must_use]
pub fn in_family(candidate: &str, base: &str) -> bool {
    candidate
        .strip_prefix(base)
        .is_some_and(|rest| rest.is_empty() || rest.starts_with('/'))
}
