//! # cadence_workloads
//!
//! Built-in workload library for the cadence runtime: controllers,
//! on-demand transformers, simulators, and test workloads.
//!
//! Call [`register_builtin_types`] to make every built-in constructible by
//! name from a configuration document:
//!
//! ```rust
//! use cadence_runtime::{Composer, Registry};
//!
//! let registry = Registry::new();
//! cadence_workloads::register_builtin_types(&registry);
//! let composer = Composer::new(registry);
//! ```

pub mod controllers;
pub mod simulators;
pub mod testing;
pub mod transformers;

use cadence_runtime::Registry;

use controllers::pid::PidController;
use controllers::steering_mixer::SteeringMixer;
use simulators::balancing_robot::BalancingRobotSimulator;
use testing::HelloWorkload;
use transformers::axis_to_angle::AxisToAngleTransformer;
use transformers::dead_zone::DeadZoneScaleAndSplitTransformer;
use transformers::steering_mixer::SteeringMixerTransformer;

/// Register every built-in workload type under its canonical name.
pub fn register_builtin_types(registry: &Registry) {
    registry.register_type::<PidController>();
    registry.register_type::<SteeringMixer>();
    registry.register_type::<SteeringMixerTransformer>();
    registry.register_type::<AxisToAngleTransformer>();
    registry.register_type::<DeadZoneScaleAndSplitTransformer>();
    registry.register_type::<BalancingRobotSimulator>();
    registry.register_type::<HelloWorkload>();
}
