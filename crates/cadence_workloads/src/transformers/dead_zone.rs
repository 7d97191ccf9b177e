//! Dead-zone, scale and split transformer.
//!
//! Conditions a two-axis stick input: values inside the dead zone read as
//! zero, the remainder is rescaled to preserve full range, and the two axes
//! come out as separate fields for independent binding.

use cadence_runtime::{ConfigError, Transform, Workload, config_f64};
use cadence_state::Value;

/// Splits a 2-component stick vector into dead-zoned, scaled axes.
#[derive(Debug)]
pub struct DeadZoneScaleAndSplitTransformer {
    dead_zone: f64,
    scale_x: f64,
    scale_y: f64,
}

impl Default for DeadZoneScaleAndSplitTransformer {
    fn default() -> Self {
        Self {
            dead_zone: 0.2,
            scale_x: 1.0,
            scale_y: 1.0,
        }
    }
}

impl DeadZoneScaleAndSplitTransformer {
    fn apply_dead_zone(&self, value: f64) -> f64 {
        if value.abs() < self.dead_zone {
            0.0
        } else {
            (value.abs() - self.dead_zone) / (1.0 - self.dead_zone) * value.signum()
        }
    }
}

impl Transform for DeadZoneScaleAndSplitTransformer {
    fn input_names(&self) -> &'static [&'static str] {
        &["input_vector"]
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["output_x", "output_y"]
    }

    fn transform(&mut self, inputs: &[Value]) -> Vec<Value> {
        let Some(vector) = inputs.first().and_then(Value::as_list) else {
            return vec![Value::Float(0.0), Value::Float(0.0)];
        };
        if vector.len() < 2 {
            return vec![Value::Float(0.0), Value::Float(0.0)];
        }

        let x = self.apply_dead_zone(vector[0].as_f64().unwrap_or(0.0)) * self.scale_x;
        let y = self.apply_dead_zone(vector[1].as_f64().unwrap_or(0.0)) * self.scale_y;
        vec![Value::Float(x), Value::Float(y)]
    }
}

impl Workload for DeadZoneScaleAndSplitTransformer {
    fn default_tick_rate_hz(&self) -> f64 {
        0.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "dead_zone" => self.dead_zone = config_f64(key, value)?,
            "scale_x" => self.scale_x = config_f64(key, value)?,
            "scale_y" => self.scale_y = config_f64(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn as_transform(&mut self) -> Option<&mut dyn Transform> {
        Some(self)
    }
}
