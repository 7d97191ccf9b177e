//! Frame-axis to tilt-angle transformer.
//!
//! Takes a body-frame unit axis expressed in world coordinates (as a
//! 3-component list) and derives the approximate tilt from vertical of one
//! configurable component: `angle = asin(−axis[i])`.

use cadence_runtime::{ConfigError, Transform, Workload};
use cadence_state::Value;

/// Derives an angle-from-vertical from one component of a frame axis.
#[derive(Debug)]
pub struct AxisToAngleTransformer {
    /// Which component to read: 0 = x, 1 = y, 2 = z.
    axis_index: usize,
}

impl Default for AxisToAngleTransformer {
    fn default() -> Self {
        Self { axis_index: 0 }
    }
}

impl Transform for AxisToAngleTransformer {
    fn input_names(&self) -> &'static [&'static str] {
        &["input_vector"]
    }

    fn output_names(&self) -> &'static [&'static str] {
        &["output_angle"]
    }

    fn transform(&mut self, inputs: &[Value]) -> Vec<Value> {
        let Some(vector) = inputs.first().and_then(Value::as_list) else {
            return vec![Value::Float(0.0)];
        };
        if vector.len() < 3 {
            return vec![Value::Float(0.0)];
        }
        let component = vector[self.axis_index].as_f64().unwrap_or(0.0);
        let angle = (-component).clamp(-1.0, 1.0).asin();
        vec![Value::Float(angle)]
    }
}

impl Workload for AxisToAngleTransformer {
    fn default_tick_rate_hz(&self) -> f64 {
        0.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "axis_name" => {
                self.axis_index = match value.as_str() {
                    Some("x") => 0,
                    Some("y") => 1,
                    Some("z") => 2,
                    _ => {
                        return Err(ConfigError::InvalidValue {
                            key: key.to_string(),
                            expected: "one of \"x\", \"y\", \"z\"",
                        });
                    }
                };
            }
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }

    fn as_transform(&mut self) -> Option<&mut dyn Transform> {
        Some(self)
    }
}

#[cfg(test)]
mod tests {
    use cadence_runtime::WorkloadCell;

    use super::*;

    fn axis(x: f64, y: f64, z: f64) -> Value {
        Value::List(vec![Value::Float(x), Value::Float(y), Value::Float(z)])
    }

    #[test]
    fn test_upright_axis_is_zero_angle() {
        let cell = WorkloadCell::new(AxisToAngleTransformer::default(), "tilt");
        cell.safe_set("input_vector", axis(0.0, 0.0, 1.0)).unwrap();
        assert_eq!(cell.safe_get("output_angle"), Some(Value::Float(0.0)));
    }

    #[test]
    fn test_tilted_axis_yields_asin() {
        let mut transform = AxisToAngleTransformer::default();
        let out = transform.transform(&[axis(0.5, 0.0, 0.0)]);
        let angle = out[0].as_f64().unwrap();
        assert!((angle - (-0.5f64).asin()).abs() < 1e-12);
    }

    #[test]
    fn test_axis_selection() {
        let mut transform = AxisToAngleTransformer::default();
        transform.apply_config("axis_name", &Value::from("z")).unwrap();
        let out = transform.transform(&[axis(0.5, 0.0, -1.0)]);
        let angle = out[0].as_f64().unwrap();
        assert!((angle - 1.0f64.asin()).abs() < 1e-12);
    }

    #[test]
    fn test_short_or_missing_vector_is_zero() {
        let mut transform = AxisToAngleTransformer::default();
        assert_eq!(transform.transform(&[Value::Float(0.0)]), vec![Value::Float(0.0)]);
        assert_eq!(
            transform.transform(&[Value::List(vec![Value::Float(1.0)])]),
            vec![Value::Float(0.0)]
        );
    }

    #[test]
    fn test_invalid_axis_rejected() {
        let mut transform = AxisToAngleTransformer::default();
        assert!(transform.apply_config("axis_name", &Value::from("w")).is_err());
        assert!(transform.apply_config("axis_name", &Value::Int(1)).is_err());
    }
}
