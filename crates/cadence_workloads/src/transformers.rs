//! On-demand transformer workloads (no tick; derived on field access).

pub mod axis_to_angle;
pub mod dead_zone;
pub mod steering_mixer;
