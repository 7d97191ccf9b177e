//! On-demand compute nodes.
//!
//! A transformer is a workload with nominal rate 0 that derives outputs from
//! inputs whenever they are touched: a write to any input runs the
//! transform and stores each result component to the corresponding output
//! (by position); a read of any output runs the transform first and returns
//! the freshly stored value. Transformers hold no threads and add no
//! scheduling cost.
//!
//! A transformer type implements both traits: [`Transform`] for the
//! derivation itself, and [`Workload`](crate::Workload) to plug into the
//! graph — returning `Some(self)` from `as_transform`, a default rate of 0,
//! and whatever `apply_config` keys it tunes:
//!
//! ```rust
//! use cadence_runtime::{Transform, Workload};
//! use cadence_state::Value;
//!
//! #[derive(Default)]
//! struct Doubler;
//!
//! impl Transform for Doubler {
//!     fn input_names(&self) -> &'static [&'static str] { &["value"] }
//!     fn output_names(&self) -> &'static [&'static str] { &["doubled"] }
//!     fn transform(&mut self, inputs: &[Value]) -> Vec<Value> {
//!         vec![Value::Float(inputs[0].as_f64().unwrap_or(0.0) * 2.0)]
//!     }
//! }
//!
//! impl Workload for Doubler {
//!     fn default_tick_rate_hz(&self) -> f64 { 0.0 }
//!     fn as_transform(&mut self) -> Option<&mut dyn Transform> { Some(self) }
//! }
//! ```

use cadence_state::Value;

/// A stateless input→output derivation.
///
/// Input and output names are explicit declarations: at cell construction
/// the inputs are registered as writable fields and the outputs as readable
/// fields, all defaulting to `0.0`.
pub trait Transform: Send {
    /// Names of the input fields, in the order `transform` receives them.
    fn input_names(&self) -> &'static [&'static str];

    /// Names of the output fields, in the order `transform` returns them.
    fn output_names(&self) -> &'static [&'static str];

    /// Derive outputs from the current inputs. `inputs` has one entry per
    /// [`Transform::input_names`] element. A result with fewer components
    /// than declared outputs leaves the remaining outputs untouched.
    fn transform(&mut self, inputs: &[Value]) -> Vec<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workload::Workload;

    #[derive(Default)]
    struct Doubler;

    impl Transform for Doubler {
        fn input_names(&self) -> &'static [&'static str] {
            &["value"]
        }

        fn output_names(&self) -> &'static [&'static str] {
            &["doubled"]
        }

        fn transform(&mut self, inputs: &[Value]) -> Vec<Value> {
            let value = inputs[0].as_f64().unwrap_or(0.0);
            vec![Value::Float(value * 2.0)]
        }
    }

    impl Workload for Doubler {
        fn default_tick_rate_hz(&self) -> f64 {
            0.0
        }

        fn as_transform(&mut self) -> Option<&mut dyn Transform> {
            Some(self)
        }
    }

    #[test]
    fn test_transform_is_a_rate_zero_workload() {
        let mut doubler = Doubler;
        let workload: &mut dyn Workload = &mut doubler;
        assert_eq!(workload.default_tick_rate_hz(), 0.0);
        assert!(workload.as_transform().is_some());
    }

    #[test]
    fn test_transform_computes() {
        let mut doubler = Doubler;
        let out = doubler.transform(&[Value::Float(2.5)]);
        assert_eq!(out, vec![Value::Float(5.0)]);
    }
}
