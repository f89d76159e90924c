//! Run name allocation
//!
//! Derives a name for a new run that is very likely unused within its
//! project, by looking at the runs already registered under the same base
//! name and appending `/<n>`.
//!
//! ## Guarantees
//!
//! None are hard. The allocator reads the tracking service twice (family
//! query, then an exact lookup of the candidate) and the caller registers the
//! run afterwards; nothing locks the namespace in between, so two allocators
//! racing on the same base name can pick the same candidate.
//!
//! ## Usage
//!
//! ```rust
//! use tracklog::naming::NameAllocator;
//! use tracklog::tracker::{MemoryTracker, TrackingClient};
//!
//! # fn example() -> tracklog::Result<()> {
//! let tracker = MemoryTracker::new();
//! let allocator = NameAllocator::new(&tracker);
//!
//! assert_eq!(allocator.derive_unique_name("P", "run")?.name(), "run");
//!
//! tracker.create_task("P", "run")?;
//! assert_eq!(allocator.derive_unique_name("P", "run")?.name(), "run/1");
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```

mod suffix;

use std::fmt;

use tracing::{debug, info, warn};

pub use suffix::SuffixStrategy;

use crate::settings::TrackerSettings;
use crate::tracker::{TaskRecord, TrackingClient};
use crate::{Error, Result};

/// Something noteworthy that happened while allocating a name.
///
/// Diagnostics never abort allocation; they are logged at `warn` level and
/// returned alongside the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NameDiagnostic {
    /// The last existing record's trailing segment is not an integer; the
    /// suffix fell back to 1 before the count floor was applied.
    UnparsableSuffix {
        /// Full name of the record that was inspected
        last_name: String,
        /// Segment after its final `/`
        segment: String,
    },
    /// The candidate is already registered. It is returned anyway.
    AlreadyTaken {
        /// The candidate name
        name: String,
    },
}

impl fmt::Display for NameDiagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnparsableSuffix { last_name, segment } => write!(
                f,
                "last existing run is {last_name}, trailing segment {segment:?} is not a number; suffix reset to 1"
            ),
            Self::AlreadyTaken { name } => {
                write!(f, "run name {name} is already taken")
            }
        }
    }
}

/// Outcome of a name allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocatedName {
    name: String,
    suffix: Option<u64>,
    diagnostics: Vec<NameDiagnostic>,
}

impl AllocatedName {
    /// The allocated name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The numeric suffix, or `None` if the base name was free.
    #[must_use]
    pub const fn suffix(&self) -> Option<u64> {
        self.suffix
    }

    /// Diagnostics emitted during allocation.
    #[must_use]
    pub fn diagnostics(&self) -> &[NameDiagnostic] {
        &self.diagnostics
    }

    /// Whether the secondary lookup found the candidate already registered.
    #[must_use]
    pub fn is_taken(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| matches!(d, NameDiagnostic::AlreadyTaken { .. }))
    }

    /// Consume into the bare name.
    #[must_use]
    pub fn into_name(self) -> String {
        self.name
    }
}

impl fmt::Display for AllocatedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// Derives collision-avoiding run names against a tracking service.
///
/// Holds no state of its own: every call reads the service afresh, so
/// repeated calls without an intervening registration return the same name.
pub struct NameAllocator<'c, C: ?Sized> {
    client: &'c C,
    strategy: SuffixStrategy,
}

impl<'c, C: TrackingClient + ?Sized> NameAllocator<'c, C> {
    /// Create an allocator using [`SuffixStrategy::LastRecord`].
    #[must_use]
    pub fn new(client: &'c C) -> Self {
        Self {
            client,
            strategy: SuffixStrategy::default(),
        }
    }

    /// Create an allocator using the strategy configured in `settings`.
    #[must_use]
    pub const fn from_settings(client: &'c C, settings: &TrackerSettings) -> Self {
        Self {
            client,
            strategy: settings.suffix_strategy,
        }
    }

    /// Use a different suffix strategy.
    #[must_use]
    pub const fn with_strategy(mut self, strategy: SuffixStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Get the suffix strategy.
    #[must_use]
    pub const fn strategy(&self) -> SuffixStrategy {
        self.strategy
    }

    /// Derive a name for a new run of `base_name` in `project`.
    ///
    /// Returns `base_name` unchanged when no run of that family exists,
    /// otherwise `base_name/<n>` where `n` is at least the number of
    /// existing runs. `/` inside `base_name` is not interpreted; see
    /// [`split_nested_name`] for folding it into the project.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidInput`] for an empty project or base name, and
    /// propagates any error from the tracking client unchanged.
    pub fn derive_unique_name(&self, project: &str, base_name: &str) -> Result<AllocatedName> {
        if project.is_empty() {
            return Err(Error::InvalidInput("project must not be empty".to_string()));
        }
        if base_name.is_empty() {
            return Err(Error::InvalidInput("base name must not be empty".to_string()));
        }

        let existing = self.client.query_existing(project, base_name)?;
        debug!(project, base_name, count = existing.len(), "queried existing runs");

        if existing.is_empty() {
            return Ok(AllocatedName {
                name: base_name.to_string(),
                suffix: None,
                diagnostics: Vec::new(),
            });
        }

        let mut diagnostics = Vec::new();
        let (suffix, parse_diagnostic) = suffix::next_suffix(&existing, self.strategy);
        if let Some(diagnostic) = parse_diagnostic {
            warn!(project, base_name, "{diagnostic}");
            diagnostics.push(diagnostic);
        }

        let candidate = format!("{base_name}/{suffix}");
        if self.client.fetch(project, &candidate)?.is_some() {
            let diagnostic = NameDiagnostic::AlreadyTaken {
                name: candidate.clone(),
            };
            warn!(project, "{diagnostic}, continuing with it");
            diagnostics.push(diagnostic);
        }

        Ok(AllocatedName {
            name: candidate,
            suffix: Some(suffix),
            diagnostics,
        })
    }
}

/// Derive a unique name with the default strategy.
///
/// # Errors
///
/// See [`NameAllocator::derive_unique_name`].
pub fn derive_unique_name<C: TrackingClient + ?Sized>(
    client: &C,
    project: &str,
    base_name: &str,
) -> Result<AllocatedName> {
    NameAllocator::new(client).derive_unique_name(project, base_name)
}

/// Fold the leading `/`-separated segments of `task_name` into `project`.
///
/// `("P", "a/b/run")` becomes `("P/a/b", "run")`; names without `/` pass
/// through unchanged.
#[must_use]
pub fn split_nested_name(project: &str, task_name: &str) -> (String, String) {
    match task_name.rsplit_once('/') {
        Some((prefix, name)) => (format!("{project}/{prefix}"), name.to_string()),
        None => (project.to_string(), task_name.to_string()),
    }
}

/// Register a new task under a collision-avoiding name.
///
/// Nested task names are folded into the project first, then a unique name
/// is derived and the task is created with it.
///
/// # Errors
///
/// Propagates allocation and registration errors.
pub fn safe_init<C: TrackingClient + ?Sized>(
    client: &C,
    project: &str,
    task_name: &str,
) -> Result<TaskRecord> {
    safe_init_with(client, project, task_name, SuffixStrategy::default())
}

/// [`safe_init`] with an explicit suffix strategy.
///
/// # Errors
///
/// Propagates allocation and registration errors.
pub fn safe_init_with<C: TrackingClient + ?Sized>(
    client: &C,
    project: &str,
    task_name: &str,
    strategy: SuffixStrategy,
) -> Result<TaskRecord> {
    let (project, base_name) = split_nested_name(project, task_name);
    if base_name.is_empty() {
        return Err(Error::InvalidInput(format!(
            "task name {task_name:?} has an empty final segment"
        )));
    }
    if task_name.contains('/') {
        info!(project = %project, "nested task name folded into project");
    }

    let allocated = NameAllocator::new(client)
        .with_strategy(strategy)
        .derive_unique_name(&project, &base_name)?;
    let task = client.create_task(&project, allocated.name())?;
    info!(task_id = task.id(), project = %project, name = task.name(), "task initialized");
    Ok(task)
}

/// [`safe_init`] driven by `settings`: the task is registered under
/// `settings.default_project` using `settings.suffix_strategy`.
///
/// # Errors
///
/// Propagates allocation and registration errors.
pub fn safe_init_from_settings<C: TrackingClient + ?Sized>(
    client: &C,
    settings: &TrackerSettings,
    task_name: &str,
) -> Result<TaskRecord> {
    safe_init_with(
        client,
        &settings.default_project,
        task_name,
        settings.suffix_strategy,
    )
}
