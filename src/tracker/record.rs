//! Task Record - a registered run on the tracking service

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TaskStatus {
    /// Task is registered but nothing has run yet.
    Created,
    /// Task is currently executing.
    InProgress,
    /// Task completed successfully.
    Completed,
    /// Task failed with an error.
    Failed,
}

/// A user property displayed next to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct UserProperty {
    /// Property name (the key shown in the UI)
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Rendered value
    pub value: String,
}

impl UserProperty {
    /// Create a new user property.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            value: value.into(),
        }
    }
}

/// A configuration object connected to a task.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ConfigurationObject {
    /// Description shown with the configuration
    pub description: String,
    /// The connected configuration tree
    pub value: serde_json::Value,
}

/// Task Record represents a previously registered run.
///
/// The allocator only ever reads [`TaskRecord::name`]; the remaining fields
/// are what the connector writes through the tracking client.
///
/// ## Name Format
///
/// Names are either a bare base name (`run`) or a base name followed by a
/// numeric suffix (`run/3`).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskRecord {
    id: String,
    project: String,
    name: String,
    status: TaskStatus,
    created_at: DateTime<Utc>,
    #[serde(default)]
    configurations: BTreeMap<String, ConfigurationObject>,
    #[serde(default)]
    hyperparameters: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    user_properties: BTreeMap<String, UserProperty>,
}

impl TaskRecord {
    /// Create a new task record in `Created` status.
    ///
    /// # Arguments
    ///
    /// * `id` - Unique identifier assigned by the tracking service
    /// * `project` - Project the task belongs to
    /// * `name` - Task name, e.g. `run` or `run/2`
    #[must_use]
    pub fn new(id: impl Into<String>, project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            name: name.into(),
            status: TaskStatus::Created,
            created_at: Utc::now(),
            configurations: BTreeMap::new(),
            hyperparameters: BTreeMap::new(),
            user_properties: BTreeMap::new(),
        }
    }

    /// Create a builder for constructing a task record with optional fields.
    #[must_use]
    pub fn builder(
        id: impl Into<String>,
        project: impl Into<String>,
        name: impl Into<String>,
    ) -> TaskRecordBuilder {
        TaskRecordBuilder::new(id, project, name)
    }

    /// Get the task ID.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Get the project name.
    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// Get the task name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get the current status.
    #[must_use]
    pub const fn status(&self) -> TaskStatus {
        self.status
    }

    /// Get the creation timestamp.
    #[must_use]
    pub const fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Get a connected configuration object by name.
    #[must_use]
    pub fn configuration(&self, name: &str) -> Option<&ConfigurationObject> {
        self.configurations.get(name)
    }

    /// Get all flattened hyperparameters (`section/dotted.key`).
    #[must_use]
    pub const fn hyperparameters(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.hyperparameters
    }

    /// Get a user property by name.
    #[must_use]
    pub fn user_property(&self, name: &str) -> Option<&UserProperty> {
        self.user_properties.get(name)
    }

    /// Get all user properties.
    #[must_use]
    pub const fn user_properties(&self) -> &BTreeMap<String, UserProperty> {
        &self.user_properties
    }

    /// Mark the task as running.
    pub fn start(&mut self) {
        self.status = TaskStatus::InProgress;
    }

    /// Close the task with the given final status.
    pub fn complete(&mut self, status: TaskStatus) {
        self.status = status;
    }

    pub(crate) fn insert_configuration(
        &mut self,
        name: impl Into<String>,
        configuration: ConfigurationObject,
    ) {
        self.configurations.insert(name.into(), configuration);
    }

    pub(crate) fn insert_hyperparameter(&mut self, key: String, value: serde_json::Value) {
        self.hyperparameters.insert(key, value);
    }

    pub(crate) fn insert_user_property(&mut self, property: UserProperty) {
        self.user_properties.insert(property.name.clone(), property);
    }
}

/// Builder for `TaskRecord`.
#[derive(Debug)]
pub struct TaskRecordBuilder {
    id: String,
    project: String,
    name: String,
    status: TaskStatus,
    created_at: DateTime<Utc>,
}

impl TaskRecordBuilder {
    /// Create a new builder with required fields.
    #[must_use]
    pub fn new(id: impl Into<String>, project: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            project: project.into(),
            name: name.into(),
            status: TaskStatus::Created,
            created_at: Utc::now(),
        }
    }

    /// Set the initial status.
    #[must_use]
    pub const fn status(mut self, status: TaskStatus) -> Self {
        self.status = status;
        self
    }

    /// Set a custom creation timestamp (useful for deserialization/testing).
    #[must_use]
    pub const fn created_at(mut self, created_at: DateTime<Utc>) -> Self {
        self.created_at = created_at;
        self
    }

    /// Build the `TaskRecord`.
    #[must_use]
    pub fn build(self) -> TaskRecord {
        TaskRecord {
            id: self.id,
            project: self.project,
            name: self.name,
            status: self.status,
            created_at: self.created_at,
            configurations: BTreeMap::new(),
            hyperparameters: BTreeMap::new(),
            user_properties: BTreeMap::new(),
        }
    }
}
