//! PID controller workload.
//!
//! Inputs (`setpoint`, `measured`) arrive via writable fields, usually fed
//! by bindings; the per-term breakdown and the summed `control_output` are
//! published as readable fields every tick.

use anyhow::Result;

use cadence_runtime::{ConfigError, Workload, WorkloadIo, config_f64};
use cadence_state::Value;

/// Proportional-integral-derivative controller.
#[derive(Debug)]
pub struct PidController {
    /// Proportional gain.
    kp: f64,
    /// Integral gain.
    ki: f64,
    /// Derivative gain.
    kd: f64,
    integral: f64,
    prev_error: f64,
}

impl Default for PidController {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.0,
            kd: 0.0,
            integral: 0.0,
            prev_error: 0.0,
        }
    }
}

impl Workload for PidController {
    fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
        io.declare_writable("setpoint", Value::Float(0.0))?;
        io.declare_writable("measured", Value::Float(0.0))?;

        io.declare_readable("error", Value::Float(0.0))?;
        io.declare_readable("p_term", Value::Float(0.0))?;
        io.declare_readable("i_term", Value::Float(0.0))?;
        io.declare_readable("d_term", Value::Float(0.0))?;
        io.declare_readable("control_output", Value::Float(0.0))?;
        Ok(())
    }

    fn tick(&mut self, time_delta: f64, io: &WorkloadIo<'_>) -> Result<()> {
        let setpoint = io.safe_get("setpoint").and_then(|v| v.as_f64()).unwrap_or(0.0);
        let measured = io.safe_get("measured").and_then(|v| v.as_f64()).unwrap_or(0.0);

        let error = setpoint - measured;
        if time_delta > 0.0 {
            self.integral += error * time_delta;
        } else {
            self.integral += error;
        }
        let derivative = if time_delta > 0.0 {
            (error - self.prev_error) / time_delta
        } else {
            0.0
        };

        let p_term = self.kp * error;
        let i_term = self.ki * self.integral;
        let d_term = self.kd * derivative;
        let output = p_term + i_term + d_term;

        self.prev_error = error;

        // Readable outputs; bindings propagate each write eagerly.
        io.safe_set("error", Value::Float(error))?;
        io.safe_set("p_term", Value::Float(p_term))?;
        io.safe_set("i_term", Value::Float(i_term))?;
        io.safe_set("d_term", Value::Float(d_term))?;
        io.safe_set("control_output", Value::Float(output))?;
        Ok(())
    }

    fn default_tick_rate_hz(&self) -> f64 {
        100.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "kp" => self.kp = config_f64(key, value)?,
            "ki" => self.ki = config_f64(key, value)?,
            "kd" => self.kd = config_f64(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
