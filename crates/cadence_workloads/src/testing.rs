//! Test and bring-up workloads.

use anyhow::Result;
use tracing::info;

use cadence_runtime::{ConfigError, Workload, WorkloadIo};
use cadence_state::Value;

/// Minimal periodic workload: counts ticks, publishes the count as
/// `greeting`, and logs the observed rate. Handy for smoke-testing a config
/// before wiring real workloads in.
#[derive(Debug, Default)]
pub struct HelloWorkload {
    count: u64,
    /// When set, every tick fails; exercises failure containment.
    force_error: bool,
}

impl Workload for HelloWorkload {
    fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
        io.declare_readable("greeting", Value::Float(0.0))?;
        Ok(())
    }

    fn tick(&mut self, time_delta: f64, io: &WorkloadIo<'_>) -> Result<()> {
        if self.force_error {
            anyhow::bail!("simulated failure");
        }

        self.count += 1;
        io.safe_set("greeting", Value::Float(self.count as f64))?;

        if time_delta > 0.0 {
            info!(
                workload = io.name(),
                rate_hz = 1.0 / time_delta,
                "hello"
            );
        }
        Ok(())
    }

    fn default_tick_rate_hz(&self) -> f64 {
        2.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "force_error" => {
                self.force_error = value.as_bool().ok_or(ConfigError::InvalidValue {
                    key: key.to_string(),
                    expected: "a boolean",
                })?;
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use cadence_runtime::WorkloadCell;

    use super::*;

    #[test]
    fn test_greeting_counts_ticks() {
        let cell = WorkloadCell::new(HelloWorkload::default(), "hello");
        cell.with_behavior(|behavior, io| behavior.pre_load(io)).unwrap();

        cell.with_behavior(|behavior, io| behavior.tick(0.5, io)).unwrap();
        cell.with_behavior(|behavior, io| behavior.tick(0.5, io)).unwrap();
        assert_eq!(cell.safe_get("greeting"), Some(Value::Float(2.0)));
    }

    #[test]
    fn test_forced_error() {
        let cell = WorkloadCell::new(HelloWorkload::default(), "hello");
        cell.with_behavior(|behavior, io| behavior.pre_load(io)).unwrap();
        cell.configure("force_error", &Value::Bool(true)).unwrap();

        let result = cell.with_behavior(|behavior, io| behavior.tick(0.5, io));
        assert!(result.is_err());
    }
}
