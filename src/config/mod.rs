//! Hierarchical experiment configuration
//!
//! [`ConfigTree`] wraps an object-rooted JSON tree and offers the handful of
//! views the connector needs: dotted-path lookup, top-level masking,
//! `${path}` interpolation and flattening into leaf keys.
//!
//! ## Usage
//!
//! ```rust
//! use tracklog::config::ConfigTree;
//! use serde_json::json;
//!
//! let cfg = ConfigTree::from_value(json!({
//!     "paths": {"root": "/data", "output_dir": "${paths.root}/logs"},
//!     "model": {"lr": 0.001},
//!     "trainer": {"epochs": 10}
//! })).unwrap();
//!
//! assert_eq!(cfg.get("model.lr"), Some(&json!(0.001)));
//!
//! let resolved = cfg.to_container(true);
//! assert_eq!(resolved["paths"]["output_dir"], json!("/data/logs"));
//!
//! let summary = cfg.masked_copy(&["model"]);
//! assert!(summary.get("trainer").is_none());
//! ```

mod interpolation;

use std::collections::BTreeMap;
use std::path::Path;

use serde_json::{Map, Value};

use crate::{Error, Result};

/// Object-rooted configuration tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigTree {
    root: Value,
}

impl ConfigTree {
    /// Wrap a JSON value. The root must be an object.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] if `root` is not an object.
    pub fn from_value(root: Value) -> Result<Self> {
        if root.is_object() {
            Ok(Self { root })
        } else {
            Err(Error::InvalidInput(format!(
                "config root must be an object, got {}",
                kind(&root)
            )))
        }
    }

    /// Parse a JSON document.
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid JSON or not an object.
    pub fn from_json_str(text: &str) -> Result<Self> {
        Self::from_value(serde_json::from_str(text)?)
    }

    /// Read and parse a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// Create an empty tree.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            root: Value::Object(Map::new()),
        }
    }

    /// Borrow the raw tree, interpolations unresolved.
    #[must_use]
    pub const fn as_value(&self) -> &Value {
        &self.root
    }

    /// Top-level keys, in key order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.root
            .as_object()
            .into_iter()
            .flat_map(|map| map.keys().map(String::as_str))
    }

    /// Look up a dotted path such as `load_model.path_ckpt`.
    ///
    /// Numeric segments index into arrays. The returned value is raw: an
    /// interpolation comes back as its `${...}` string.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<&Value> {
        lookup(&self.root, path)
    }

    /// Like [`ConfigTree::get`], but resolves interpolations in the result.
    #[must_use]
    pub fn get_resolved(&self, path: &str) -> Option<Value> {
        self.get(path)
            .map(|value| interpolation::resolve(value, &self.root))
    }

    /// Look up a dotted path that must exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingKey`] if the path does not resolve.
    pub fn require(&self, path: &str) -> Result<&Value> {
        self.get(path).ok_or_else(|| Error::missing_key(path))
    }

    /// Convert to a plain container.
    ///
    /// With `resolve`, `${path}` references are resolved against this tree;
    /// references to missing keys are kept as written.
    #[must_use]
    pub fn to_container(&self, resolve: bool) -> Value {
        if resolve {
            interpolation::resolve(&self.root, &self.root)
        } else {
            self.root.clone()
        }
    }

    /// Resolve every interpolation, returning a new tree.
    #[must_use]
    pub fn resolved(&self) -> Self {
        Self {
            root: self.to_container(true),
        }
    }

    /// Keep only the given top-level keys. Keys absent from the tree are skipped.
    #[must_use]
    pub fn masked_copy<S: AsRef<str>>(&self, keys: &[S]) -> Self {
        let mut masked = Map::new();
        if let Some(map) = self.root.as_object() {
            for (k, v) in map {
                if keys.iter().any(|key| key.as_ref() == k) {
                    masked.insert(k.clone(), v.clone());
                }
            }
        }
        Self {
            root: Value::Object(masked),
        }
    }

    /// Flatten into dotted leaf paths.
    #[must_use]
    pub fn flatten(&self) -> BTreeMap<String, Value> {
        flatten_value(&self.root)
    }
}

impl Default for ConfigTree {
    fn default() -> Self {
        Self::empty()
    }
}

impl TryFrom<Value> for ConfigTree {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self> {
        Self::from_value(value)
    }
}

/// Flatten a JSON value into dotted leaf paths.
///
/// Objects and arrays recurse (array elements are keyed by index); empty
/// nested containers are kept as leaves so they are not silently dropped.
/// An empty root flattens to nothing, a scalar root to a single entry under
/// the empty key.
#[must_use]
pub fn flatten_value(value: &Value) -> BTreeMap<String, Value> {
    let mut out = BTreeMap::new();
    match value {
        Value::Object(map) if map.is_empty() => {}
        Value::Array(items) if items.is_empty() => {}
        _ => flatten_into(value, String::new(), &mut out),
    }
    out
}

fn flatten_into(value: &Value, prefix: String, out: &mut BTreeMap<String, Value>) {
    let join = |key: &str| {
        if prefix.is_empty() {
            key.to_string()
        } else {
            format!("{prefix}.{key}")
        }
    };
    match value {
        Value::Object(map) if !map.is_empty() => {
            for (k, v) in map {
                flatten_into(v, join(k), out);
            }
        }
        Value::Array(items) if !items.is_empty() => {
            for (i, v) in items.iter().enumerate() {
                flatten_into(v, join(&i.to_string()), out);
            }
        }
        leaf => {
            out.insert(prefix, leaf.clone());
        }
    }
}

pub(crate) fn lookup<'a>(root: &'a Value, path: &str) -> Option<&'a Value> {
    if path.is_empty() {
        return None;
    }
    path.split('.').try_fold(root, |node, segment| match node {
        Value::Object(map) => map.get(segment),
        Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
        _ => None,
    })
}

const fn kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
