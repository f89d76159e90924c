//! Tracker settings
//!
//! Names, descriptions and key lists that the connector uses when talking
//! to the tracking service. Every field has a default, so a partial JSON
//! document (or none at all) is enough.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::naming::SuffixStrategy;
use crate::Result;

/// Project used when the caller does not name one.
pub const DEFAULT_PROJECT: &str = "drone-cloud-point-segmentation";

/// Top-level config sections included in the hyperparameter summary.
pub const DEFAULT_SUMMARY_KEYS: &[&str] =
    &["train", "test", "model", "datamodule", "best_ckpt", "load_model"];

/// A user property read from a config path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PropertySpec {
    /// Property name shown on the task
    pub name: String,
    /// Property description
    pub description: String,
    /// Dotted config path the value is read from
    pub path: String,
}

impl PropertySpec {
    /// Create a new property spec.
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        description: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            path: path.into(),
        }
    }

    /// The four properties logged for every run: trained model, initial
    /// checkpoint, target dataset and log path.
    #[must_use]
    pub fn defaults() -> Vec<Self> {
        vec![
            Self::new(
                "trained_model",
                "name of the trained model",
                "loading_model.name_run",
            ),
            Self::new(
                "initial_ckpt",
                "name of the initial ckpt",
                "load_model.path_ckpt",
            ),
            Self::new(
                "Target Dataset",
                "name of the dataset we try to predict or train",
                "datamodule._target_",
            ),
            Self::new("log path", "path of the log", "paths.output_dir"),
        ]
    }
}

/// Settings for connecting configs and naming tasks.
///
/// # Example
///
/// ```rust
/// use tracklog::settings::TrackerSettings;
///
/// let settings = TrackerSettings::from_json_str(r#"{"summary_keys": ["model"]}"#).unwrap();
/// assert_eq!(settings.summary_keys, vec!["model".to_string()]);
/// assert_eq!(settings.default_project, "drone-cloud-point-segmentation");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerSettings {
    /// Project used by [`crate::naming::safe_init_from_settings`]
    pub default_project: String,
    /// Name of the whole-config configuration object
    pub whole_config_name: String,
    /// Description of the whole-config configuration object
    pub whole_config_description: String,
    /// Hyperparameter section name for the summary
    pub summary_name: String,
    /// Top-level keys kept in the summary
    pub summary_keys: Vec<String>,
    /// Resolve `${...}` interpolations before connecting the summary
    pub resolve_summary: bool,
    /// User property name for the best checkpoint path
    pub best_ckpt_property: String,
    /// User properties read from the config
    pub user_properties: Vec<PropertySpec>,
    /// How the next run suffix is chosen; read by
    /// [`crate::naming::NameAllocator::from_settings`] and
    /// [`crate::naming::safe_init_from_settings`]
    pub suffix_strategy: SuffixStrategy,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            default_project: DEFAULT_PROJECT.to_string(),
            whole_config_name: "whole cfg".to_string(),
            whole_config_description: " Name of the configuration used for the inference "
                .to_string(),
            summary_name: "summary config".to_string(),
            summary_keys: DEFAULT_SUMMARY_KEYS.iter().map(ToString::to_string).collect(),
            resolve_summary: false,
            best_ckpt_property: "path_best_ckpt".to_string(),
            user_properties: PropertySpec::defaults(),
            suffix_strategy: SuffixStrategy::default(),
        }
    }
}

impl TrackerSettings {
    /// Parse settings from JSON; missing fields take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON for these settings.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read settings from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Set the default project.
    #[must_use]
    pub fn default_project(mut self, project: impl Into<String>) -> Self {
        self.default_project = project.into();
        self
    }

    /// Set the summary keys.
    #[must_use]
    pub fn summary_keys<S: Into<String>>(mut self, keys: impl IntoIterator<Item = S>) -> Self {
        self.summary_keys = keys.into_iter().map(Into::into).collect();
        self
    }

    /// Resolve interpolations in the summary.
    #[must_use]
    pub const fn resolve_summary(mut self, resolve: bool) -> Self {
        self.resolve_summary = resolve;
        self
    }

    /// Replace the user property specs.
    #[must_use]
    pub fn user_properties(mut self, specs: Vec<PropertySpec>) -> Self {
        self.user_properties = specs;
        self
    }

    /// Set the suffix strategy.
    #[must_use]
    pub const fn suffix_strategy(mut self, strategy: SuffixStrategy) -> Self {
        self.suffix_strategy = strategy;
        self
    }
}
