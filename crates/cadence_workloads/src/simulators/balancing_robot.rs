//! Planar balancing-robot simulator.
//!
//! A lightweight two-wheeled inverted-pendulum model: wheel torques drive
//! the base in the plane, and the body pitches under gravity plus the
//! reaction to base acceleration. Good enough to close a control loop
//! against without a full physics engine.
//!
//! Writable inputs: `wheel_torque_L`, `wheel_torque_R`, `leg_height_L`,
//! `leg_height_R`. Readable pose: `x`, `y`, `yaw`, `pitch`, `roll`,
//! `legs_height` and rates `dx`, `dy`, `dyaw`, `dpitch`.

use anyhow::Result;
use glam::DVec2;

use cadence_runtime::{ConfigError, Workload, WorkloadIo, config_f64};
use cadence_state::Value;

const GRAVITY: f64 = 9.81;
const MAX_TILT: f64 = std::f64::consts::FRAC_PI_2;

/// Planar inverted-pendulum simulator for a two-wheeled base.
#[derive(Debug)]
pub struct BalancingRobotSimulator {
    mass: f64,
    wheel_radius: f64,
    track_width: f64,

    /// World-frame position of the base.
    position: DVec2,
    /// World-frame velocity of the base.
    velocity: DVec2,
    yaw: f64,
    yaw_rate: f64,
    pitch: f64,
    pitch_rate: f64,
}

impl Default for BalancingRobotSimulator {
    fn default() -> Self {
        Self {
            mass: 10.0,
            wheel_radius: 0.025,
            track_width: 0.2,
            position: DVec2::ZERO,
            velocity: DVec2::ZERO,
            yaw: 0.0,
            yaw_rate: 0.0,
            pitch: 0.0,
            pitch_rate: 0.0,
        }
    }
}

impl Workload for BalancingRobotSimulator {
    fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
        for field in [
            "x",
            "y",
            "yaw",
            "pitch",
            "roll",
            "legs_height",
            "dx",
            "dy",
            "dyaw",
            "dpitch",
        ] {
            io.declare_readable(field, Value::Float(0.0))?;
        }

        io.declare_writable("wheel_torque_L", Value::Float(0.0))?;
        io.declare_writable("wheel_torque_R", Value::Float(0.0))?;
        io.declare_writable("leg_height_L", Value::Float(0.3))?;
        io.declare_writable("leg_height_R", Value::Float(0.3))?;
        Ok(())
    }

    fn tick(&mut self, time_delta: f64, io: &WorkloadIo<'_>) -> Result<()> {
        let dt = if time_delta > 0.0 {
            time_delta
        } else {
            io.tick_interval()
        };

        let input = |field: &str| io.safe_get(field).and_then(|v| v.as_f64()).unwrap_or(0.0);
        let force_left = input("wheel_torque_L") / self.wheel_radius;
        let force_right = input("wheel_torque_R") / self.wheel_radius;
        let leg_left = input("leg_height_L");
        let leg_right = input("leg_height_R");

        // Translation: both wheel forces accelerate the base along its
        // heading.
        let accel_forward = (force_left + force_right) / self.mass;
        let accel_world = DVec2::from_angle(self.yaw) * accel_forward;
        self.velocity += accel_world * dt;
        self.position += self.velocity * dt;

        // Yaw from differential wheel force.
        let yaw_moment = (force_right - force_left) * self.track_width / 2.0;
        self.yaw_rate += yaw_moment / (self.mass * self.track_width) * dt;
        self.yaw += self.yaw_rate * dt;

        // Legs set the pendulum length and the static roll.
        let legs_height = (leg_left + leg_right) / 2.0;
        let roll = if self.track_width != 0.0 {
            ((leg_left - leg_right) / self.track_width).atan()
        } else {
            0.0
        };

        // Inverted pendulum about the wheel axle.
        let inertia = self.mass * legs_height * legs_height;
        let pitch_accel = if inertia != 0.0 {
            (self.mass * GRAVITY * legs_height * self.pitch.sin()
                + self.mass * legs_height * accel_forward * self.pitch.cos())
                / inertia
        } else {
            0.0
        };
        self.pitch_rate += pitch_accel * dt;
        self.pitch += self.pitch_rate * dt;

        // The body rests against the hard stop at horizontal.
        if self.pitch > MAX_TILT {
            self.pitch = MAX_TILT;
            self.pitch_rate = 0.0;
        } else if self.pitch < -MAX_TILT {
            self.pitch = -MAX_TILT;
            self.pitch_rate = 0.0;
        }

        io.safe_set("x", Value::Float(self.position.x))?;
        io.safe_set("y", Value::Float(self.position.y))?;
        io.safe_set("yaw", Value::Float(self.yaw))?;
        io.safe_set("pitch", Value::Float(self.pitch))?;
        io.safe_set("roll", Value::Float(roll))?;
        io.safe_set("legs_height", Value::Float(legs_height))?;
        io.safe_set("dx", Value::Float(self.velocity.x))?;
        io.safe_set("dy", Value::Float(self.velocity.y))?;
        io.safe_set("dyaw", Value::Float(self.yaw_rate))?;
        io.safe_set("dpitch", Value::Float(self.pitch_rate))?;
        Ok(())
    }

    fn default_tick_rate_hz(&self) -> f64 {
        500.0
    }

    fn apply_config(&mut self, key: &str, value: &Value) -> Result<(), ConfigError> {
        match key {
            "mass" => self.mass = config_f64(key, value)?,
            "wheel_radius" => self.wheel_radius = config_f64(key, value)?,
            "track_width" => self.track_width = config_f64(key, value)?,
            _ => return Err(ConfigError::UnknownKey(key.to_string())),
        }
        Ok(())
    }
}
