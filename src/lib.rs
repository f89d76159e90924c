//! # tracklog: experiment-tracking bridge
//!
//! Connects a hierarchical experiment configuration to an experiment-tracking
//! service and picks collision-avoiding names for new runs.
//!
//! ## Components
//!
//! - [`naming`]: derives `base`, `base/1`, `base/2`, ... from the runs already
//!   registered, reading the service fresh on every call
//! - [`tracker`]: the [`tracker::TrackingClient`] seam plus an in-memory service
//! - [`config`]: dotted lookup, masking, `${path}` interpolation, flattening
//! - [`connect`]: whole config, hyperparameter summary and user properties
//!
//! ## Example Usage
//!
//! ```rust
//! use tracklog::config::ConfigTree;
//! use tracklog::connect::connect_whole;
//! use tracklog::naming::safe_init;
//! use tracklog::settings::TrackerSettings;
//! use tracklog::tracker::MemoryTracker;
//!
//! let tracker = MemoryTracker::new();
//! let cfg = ConfigTree::from_json_str(r#"{"model": {"lr": 0.01}}"#)?;
//!
//! let task = safe_init(&tracker, "segmentation", "baseline")?;
//! let properties = connect_whole(&tracker, &task, &cfg, &TrackerSettings::default())?;
//! assert!(properties.iter().all(Result::is_err)); // none of the default paths exist
//!
//! let rerun = safe_init(&tracker, "segmentation", "baseline")?;
//! assert_eq!(rerun.name(), "baseline/1");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

pub mod config;
pub mod connect;
pub mod error;
pub mod naming;
pub mod settings;
pub mod tracker;

pub use error::{Error, Result};
pub use naming::{
    derive_unique_name, safe_init, safe_init_from_settings, AllocatedName, NameAllocator,
    NameDiagnostic,
};

/// Install a `tracing` subscriber filtered by `RUST_LOG`.
///
/// Does nothing if a global subscriber is already set, so it is safe to call
/// from tests and binaries alike.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_target(true)
        .try_init();
}
