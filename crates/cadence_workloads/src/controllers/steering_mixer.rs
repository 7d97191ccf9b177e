//! Differential-drive steering mixer.
//!
//! Mixes a forward/balance command and a turn-rate command into left/right
//! motor powers. Motor outputs are scaled to ±100 and the left channel is
//! inverted to match the mirrored motor mounting.

use anyhow::Result;

use cadence_runtime::{ConfigError, Workload, WorkloadIo, config_f64};
use cadence_state::Value;

/// Motor power full-scale.
const POWER_SCALE: f64 = 100.0;

/// Two-channel steering mixer for differential drive bases.
#[derive(Debug)]
pub struct SteeringMixer {
    /// How much of the turn command is mixed into each side.
    max_speed_differential: f64,
}

impl Default for SteeringMixer {
    fn default() -> Self {
        Self {
            max_speed_differential: 0.4,
        }
    }
}

impl Workload for SteeringMixer {
    fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
        io.declare_readable("balance_input", Value::Float(0.0))?;
        io.declare_readable("turn_input", Value::Float(0.0))?;

        io.declare_writable("left_motor", Value::Float(0.0))?;
        io.declare_writable("right_motor", Value::Float(0.0))?;
        Ok(())
    }

    fn tick(&mut self, _time_delta: f64, io: &WorkloadIo<'_>) -> Result<()> {
        let balance = io
            .safe_get("balance_input")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);
        let turn = io
            .safe_get("turn_input")
            .and_then(|v| v.as_f64())
            .unwrap_or(0.0);

        let left = balance + turn * self.max_speed_differential;
        let right = balance - turn * self.max_speed_differential;

        let left = POWER_SCALE * left.clamp(-1.0, 1.0);
        let right = POWER_SCALE * right.clamp(-1.0, 1.0);

        io.safe_set("left_motor", Value::Float(-left))?;
        io.safe_set("right_motor", Value::Float(right))?;
        Ok(())
    }

    fn default_tick_rate_hz(&self) -> f64 {
        20.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "max_speed_differential" => self.max_speed_differential = config_f64(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
