//! The [`Workload`] trait — lifecycle hooks implemented by computational
//! units.
//!
//! Every hook has a no-op default so implementations override only what they
//! need. Hooks receive a [`WorkloadIo`] handle giving mediated access to the
//! instance's own fields; they never see the runtime cell directly.
//!
//! Lifecycle, as driven by the composer:
//!
//! 1. `apply_config` — once per extra config key, at instantiation.
//! 2. `pre_load` — serial; publish field declarations.
//! 3. `load` — concurrent across all instances; long-running work.
//! 4. `setup` — serial, after bindings resolve; peers are loaded.
//! 5. `pre_tick` / `tick` / `post_tick` — per cycle, on the owning loop.
//! 6. `stop` — release resources.

use anyhow::Result;
use cadence_state::Value;

use crate::cell::WorkloadIo;
use crate::error::ConfigError;
use crate::transform::Transform;

/// A unit of work with declared fields, a lifecycle, and optional periodic
/// execution.
pub trait Workload: Send {
    /// Serial pre-load pass. Declare fields derived from construction-time
    /// configuration here.
    ///
    /// # Errors
    ///
    /// A failure aborts composition.
    fn pre_load(&mut self, _io: &WorkloadIo<'_>) -> Result<()> {
        Ok(())
    }

    /// Potentially long-running load (file I/O, model loading). Run
    /// concurrently across all instances.
    ///
    /// # Errors
    ///
    /// A failure aborts composition.
    fn load(&mut self, _io: &WorkloadIo<'_>) -> Result<()> {
        Ok(())
    }

    /// Serial fixup pass after bindings are resolved; all peers are loaded.
    ///
    /// # Errors
    ///
    /// A failure aborts composition.
    fn setup(&mut self, _io: &WorkloadIo<'_>) -> Result<()> {
        Ok(())
    }

    /// Invoked by the owning loop immediately before [`Workload::tick`].
    fn pre_tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) {}

    /// Main per-cycle work. `time_delta` is the measured interval since the
    /// owning loop's previous cycle, in seconds.
    ///
    /// # Errors
    ///
    /// A failure is logged and contained; the loop continues.
    fn tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) -> Result<()> {
        Ok(())
    }

    /// Invoked after [`Workload::tick`], on the owning loop's thread.
    fn post_tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) {}

    /// Release resources. Called once during shutdown.
    fn stop(&mut self) {}

    /// Nominal tick rate when the config does not override it. `0` means the
    /// workload does not schedule itself.
    fn default_tick_rate_hz(&self) -> f64 {
        10.0
    }

    /// Apply one configuration key copied from the config document's `args`.
    ///
    /// # Errors
    ///
    /// Unknown keys and mis-shaped values are fatal to composition.
    fn apply_config(&mut self, key: &str, _value: &Value) -> Result<(), ConfigError> {
        Err(ConfigError::UnknownKey(key.to_string()))
    }

    /// On-demand compute seam; `Some` for transformer workloads.
    fn as_transform(&mut self) -> Option<&mut dyn Transform> {
        None
    }
}

/// Read an `f64` config value, coercing integers.
///
/// Convenience for `apply_config` implementations.
///
/// # Errors
///
/// Returns [`ConfigError::InvalidValue`] for non-numeric values.
pub fn config_f64(key: &str, value: &Value) -> Result<f64, ConfigError> {
    value.as_f64().ok_or(ConfigError::InvalidValue {
        key: key.to_string(),
        expected: "a number",
    })
}
