//! # cadence_runtime
//!
//! A modular real-time workload runtime for robotics and simulation.
//!
//! Named computational units ("workloads") declared in a configuration
//! document are composed into a running graph: each workload publishes typed
//! state fields, consumes peer fields via declared bindings, and is executed
//! on a periodic tick by a scheduler that honors both independent rate
//! groups and synchronous parent/child nesting.
//!
//! ## Architecture
//!
//! - [`Registry`] — type-name → constructor, type-name → instances,
//!   name-based lookup.
//! - [`Workload`] / [`WorkloadCell`] — lifecycle hooks, the tick loop,
//!   bindings, parent/child co-tick, timing stats.
//! - [`Transform`] — stateless on-demand compute nodes (no tick).
//! - [`Composer`] — loads the config, instantiates, runs the lifecycle
//!   phases (`pre_load` → parallel `load` → bindings + `setup` → `start`),
//!   and returns a [`Running`] stop handle.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use cadence_runtime::{Composer, Registry};
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = Registry::new();
//!     // registry.register_type::<MyWorkload>();
//!     let composer = Composer::new(registry);
//!     let running = composer.load("config.yaml")?;
//!     std::thread::sleep(std::time::Duration::from_secs(5));
//!     running.stop_all();
//!     Ok(())
//! }
//! ```

pub mod bindings;
pub mod cell;
pub mod composer;
pub mod config;
pub mod error;
pub mod registry;
mod tick;
pub mod transform;
pub mod workload;

pub use bindings::BindingSpec;
pub use cell::{WorkloadCell, WorkloadIo};
pub use composer::{Composer, Running, STOP_GRACE};
pub use config::{ComposeConfig, WorkloadArgs, WorkloadEntry};
pub use error::{ComposeError, ConfigError};
pub use registry::{Registry, canonical_type_name};
pub use transform::Transform;
pub use workload::{Workload, config_f64};

pub use cadence_state::{StateContainer, StateError, Value};
