//! On-demand steering mixer.
//!
//! Transformer variant of the steering mixer: no tick, recomputed whenever
//! an input is written or an output is read. Outputs stay normalized;
//! per-side power trims let a build compensate for mismatched motors.

use cadence_runtime::{ConfigError, Transform, Workload, config_f64};
use cadence_state::Value;

/// Speed + turn-rate → per-motor commands, derived on demand.
#[derive(Debug)]
pub struct SteeringMixerTransformer {
    max_speed_differential: f64,
    power_scale_both: f64,
    power_scale_left: f64,
    power_scale_right: f64,
}

impl Default for SteeringMixerTransformer {
    fn default() -> Self {
        Self {
            max_speed_differential: 0.4,
            power_scale_both: 1.0,
            power_scale_left: 1.0,
            power_scale_right: 1.0,
        }
    }
}

impl Transform for SteeringMixerTransformer {
    fn input_names(&self) -> &'static [&'static str] {
        &["input_speed", "input_turn_rate"]
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["output_left_motor", "output_right_motor"]
    }

    fn transform(&mut self, inputs: &[Value]) -> Vec<Value> {
        let speed = inputs.first().and_then(Value::as_f64).unwrap_or(0.0);
        let turn_rate = inputs.get(1).and_then(Value::as_f64).unwrap_or(0.0);

        let left = speed + turn_rate * self.max_speed_differential;
        let right = speed - turn_rate * self.max_speed_differential;

        let left = left.clamp(-1.0, 1.0) * self.power_scale_left * self.power_scale_both;
        let right = right.clamp(-1.0, 1.0) * self.power_scale_right * self.power_scale_both;

        vec![Value::Float(left), Value::Float(right)]
    }
}

impl Workload for SteeringMixerTransformer {
    fn default_tick_rate_hz(&self) -> f64 {
        0.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "max_speed_differential" => self.max_speed_differential = config_f64(key, value)?,
            "power_scale_both" => self.power_scale_both = config_f64(key, value)?,
            "power_scale_left" => self.power_scale_left = config_f64(key, value)?,
            "power_scale_right" => self.power_scale_right = config_f64(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn as_transform(&mut self) -> Option<&mut dyn Transform> {
        Some(self)
    }
}
