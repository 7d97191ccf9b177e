//! Workload registry — type constructors and live instance tracking.
//!
//! The registry is an explicit value threaded through the composer rather
//! than process-wide state. It has two phases: registration (while the
//! workload library is declared and the graph is instantiated, both serial)
//! and query (binding resolution, parent lookup, introspection, all of which
//! may race the running loops).

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;

use crate::cell::WorkloadCell;
use crate::workload::Workload;

/// Zero-argument constructor for a registered workload type.
pub type WorkloadCtor = fn() -> Box<dyn Workload>;

fn construct<T: Workload + Default + 'static>() -> Box<dyn Workload> {
    Box::new(T::default())
}

/// Derive the canonical registry key from a Rust type name:
/// `BalancingRobotSimulator` → `balancing_robot_simulator`.
#[must_use]
pub fn canonical_type_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for ch in name.chars() {
        if ch.is_ascii_uppercase() {
            if !out.is_empty() {
                out.push('_');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

/// Canonical registry key for a concrete workload type.
#[must_use]
pub fn type_key_of<T>() -> String {
    let full = std::any::type_name::<T>();
    let base = full.rsplit("::").next().unwrap_or(full);
    canonical_type_name(base)
}

/// Registry of workload types and live instances.
#[derive(Debug, Default)]
pub struct Registry {
    /// Canonical type name → constructor.
    types: DashMap<String, WorkloadCtor>,
    /// Canonical type name → instances, in registration order.
    instances: DashMap<String, Vec<Arc<WorkloadCell>>>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the zero-arg constructor for `T` under its canonical type name.
    pub fn register_type<T: Workload + Default + 'static>(&self) {
        self.types.insert(type_key_of::<T>(), construct::<T>);
    }

    /// Look up a constructor by canonical type name.
    #[must_use]
    pub fn get_type(&self, name: &str) -> Option<WorkloadCtor> {
        self.types.get(name).map(|ctor| *ctor)
    }

    /// Number of registered types.
    #[must_use]
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    /// Track a live instance under its canonical type name.
    pub fn register_instance(&self, cell: &Arc<WorkloadCell>) {
        self.instances
            .entry(cell.type_name().to_string())
            .or_default()
            .push(Arc::clone(cell));
    }

    /// Snapshot of all instances, keyed by canonical type name.
    #[must_use]
    pub fn all_instances(&self) -> BTreeMap<String, Vec<Arc<WorkloadCell>>> {
        self.instances
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    /// Instances of one type, in registration order.
    #[must_use]
    pub fn instances_of_type(&self, name: &str) -> Vec<Arc<WorkloadCell>> {
        self.instances
            .get(name)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Total number of tracked instances across all types.
    #[must_use]
    pub fn instance_count(&self) -> usize {
        self.instances.iter().map(|entry| entry.value().len()).sum()
    }

    /// Find an instance by its unique workload name.
    ///
    /// Anonymous instances (empty name) are never returned.
    #[must_use]
    pub fn find_by_name(&self, name: &str) -> Option<Arc<WorkloadCell>> {
        if name.is_empty() {
            return None;
        }
        for entry in self.instances.iter() {
            if let Some(cell) = entry.value().iter().find(|cell| cell.name() == name) {
                return Some(Arc::clone(cell));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct BalancingRobotSimulator;
    impl Workload for BalancingRobotSimulator {}

    #[derive(Default)]
    struct PidController;
    impl Workload for PidController {}

    #[test]
    fn test_canonical_type_name() {
        assert_eq!(
            canonical_type_name("BalancingRobotSimulator"),
            "balancing_robot_simulator"
        );
        assert_eq!(canonical_type_name("PidController"), "pid_controller");
        assert_eq!(canonical_type_name("already_snake"), "already_snake");
    }

    #[test]
    fn test_register_and_get_type() {
        let registry = Registry::new();
        registry.register_type::<BalancingRobotSimulator>();
        assert_eq!(registry.type_count(), 1);
        assert!(registry.get_type("balancing_robot_simulator").is_some());
        assert!(registry.get_type("ghost").is_none());
    }

    #[test]
    fn test_constructed_instances_tracked_per_type() {
        let registry = Registry::new();
        registry.register_type::<PidController>();
        let ctor = registry.get_type("pid_controller").unwrap();

        let first = WorkloadCell::from_ctor(ctor, "pid_controller", "pid_a".to_string());
        let second = WorkloadCell::from_ctor(ctor, "pid_controller", "pid_b".to_string());
        registry.register_instance(&first);
        registry.register_instance(&second);

        assert_eq!(registry.instance_count(), 2);
        let of_type = registry.instances_of_type("pid_controller");
        assert_eq!(of_type.len(), 2);
        assert_eq!(of_type[0].name(), "pid_a");
        assert_eq!(of_type[1].name(), "pid_b");
    }

    #[test]
    fn test_find_by_name() {
        let registry = Registry::new();
        let cell = WorkloadCell::new(PidController, "pid");
        registry.register_instance(&cell);

        assert!(registry.find_by_name("pid").is_some());
        assert!(registry.find_by_name("ghost").is_none());
    }

    #[test]
    fn test_anonymous_instances_not_found_by_name() {
        let registry = Registry::new();
        let cell = WorkloadCell::new(PidController, "");
        registry.register_instance(&cell);

        assert_eq!(registry.instance_count(), 1);
        assert!(registry.find_by_name("").is_none());
    }

    #[test]
    fn test_all_instances_snapshot() {
        let registry = Registry::new();
        registry.register_instance(&WorkloadCell::new(PidController, "pid"));
        registry.register_instance(&WorkloadCell::new(BalancingRobotSimulator, "sim"));

        let all = registry.all_instances();
        assert_eq!(all.len(), 2);
        assert!(all.contains_key("pid_controller"));
        assert!(all.contains_key("balancing_robot_simulator"));
    }
}
