//! # cadence_state
//!
//! Field value model and state container for the cadence workload runtime.
//!
//! Every workload publishes its observable state as named **fields**, each
//! classified as *readable* (an output of the workload) or *writable* (an
//! input). A field holds a dynamically typed [`Value`] (scalar, list, or
//! string-keyed map) so heterogeneous workloads can exchange data without
//! agreeing on Rust types, and the same taxonomy serialises directly for
//! configuration documents and telemetry seams.
//!
//! The [`StateContainer`] is deliberately lock-free: the owning workload
//! guards it with its own mutex and holds that lock only for the duration of
//! a map access, never across user code.

mod container;
mod error;
mod value;

pub use container::StateContainer;
pub use error::StateError;
pub use value::Value;
