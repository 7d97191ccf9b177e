//! Graph composition — lifecycle orchestration from a config document.
//!
//! The composer materializes the workload graph in phases:
//!
//! 1. **Instantiate** — constructor lookup, name assignment, args.
//! 2. **pre_load** — serial.
//! 3. **load** — parallel, one task per instance on a pool sized to the
//!    available cores.
//! 4. **setup** — serial; bindings are resolved against the full instance
//!    table, then each instance's `setup` runs.
//! 5. **start** — serial, in construction order.
//!
//! Failure in any phase aborts startup; instances already started are
//! best-effort stopped. The returned [`Running`] handle owns cooperative
//! shutdown.

use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::cell::WorkloadCell;
use crate::config::{self, ComposeConfig};
use crate::error::{ComposeError, ConfigError};
use crate::registry::Registry;

/// How long shutdown waits for a loop thread before abandoning it.
pub const STOP_GRACE: Duration = Duration::from_secs(5);

/// Builds and lifecycles workload graphs against a registry.
#[derive(Debug)]
pub struct Composer {
    registry: Arc<Registry>,
}

impl Composer {
    /// Create a composer over the given registry.
    #[must_use]
    pub fn new(registry: Registry) -> Self {
        Self {
            registry: Arc::new(registry),
        }
    }

    /// The registry backing this composer.
    #[must_use]
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Load a configuration file and bring the graph up.
    ///
    /// # Errors
    ///
    /// Any phase failure aborts startup; see [`ComposeError`].
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Running, ComposeError> {
        let path = path.as_ref();
        info!(path = %path.display(), "loading config");
        let document = config::load_file(path)?;
        self.load_config(document)
    }

    /// Bring the graph described by an already-parsed document up.
    ///
    /// # Errors
    ///
    /// Any phase failure aborts startup; see [`ComposeError`].
    pub fn load_config(&self, document: ComposeConfig) -> Result<Running, ComposeError> {
        // Instantiate.
        let mut instances: Vec<Arc<WorkloadCell>> = Vec::with_capacity(document.workloads.len());
        for entry in document.workloads {
            let ctor = self
                .registry
                .get_type(&entry.type_name)
                .ok_or_else(|| ComposeError::UnknownType(entry.type_name.clone()))?;
            let cell =
                WorkloadCell::from_ctor(ctor, &entry.type_name, entry.name.unwrap_or_default());

            if let Some(rate) = entry.args.tick_rate_hz {
                cell.set_tick_rate_hz(rate);
            }
            cell.set_tick_parent_name(entry.args.tick_parent_name);
            cell.set_raw_bindings(entry.args.data_bindings);
            for (key, value) in &entry.args.extra {
                cell.configure(key, value).map_err(|error| match error {
                    ConfigError::UnknownKey(key) => ComposeError::UnknownConfig {
                        workload: cell.display_name().to_string(),
                        key,
                    },
                    ConfigError::InvalidValue { key, expected } => ComposeError::InvalidConfig {
                        workload: cell.display_name().to_string(),
                        key,
                        expected: expected.to_string(),
                    },
                })?;
            }

            debug!(
                workload = %cell.display_name(),
                type_name = %cell.type_name(),
                instance_id = %cell.instance_id(),
                "instantiated"
            );
            self.registry.register_instance(&cell);
            instances.push(cell);
        }
        info!(count = instances.len(), "workloads instantiated");

        // pre_load, serial.
        for cell in &instances {
            cell.with_behavior(|behavior, io| behavior.pre_load(io))
                .map_err(|cause| ComposeError::LoadFailure {
                    workload: cell.display_name().to_string(),
                    cause,
                })?;
        }

        // load, parallel across the instance set.
        debug!("load phase");
        parallel_load(&instances)?;

        // Bindings and setup, serial; every peer is loaded by now.
        debug!("setup phase");
        for cell in &instances {
            cell.resolve_bindings(&self.registry)?;
            cell.with_behavior(|behavior, io| behavior.setup(io))
                .map_err(|cause| ComposeError::SetupFailure {
                    workload: cell.display_name().to_string(),
                    cause,
                })?;
        }

        // Start, serial, in construction order.
        for (index, cell) in instances.iter().enumerate() {
            if let Err(error) = cell.start(&self.registry) {
                warn!(%error, "start failed; stopping already-started workloads");
                stop_cells(&instances[..index]);
                return Err(error);
            }
        }
        info!(count = instances.len(), "workloads started");

        Ok(Running {
            instances,
            stopped: AtomicBool::new(false),
        })
    }
}

/// Run every instance's `load` hook on a worker pool sized to the available
/// cores. The first failure wins; remaining loads still run to completion.
fn parallel_load(instances: &[Arc<WorkloadCell>]) -> Result<(), ComposeError> {
    if instances.is_empty() {
        return Ok(());
    }
    let workers = num_cpus::get().clamp(1, instances.len());
    let next = AtomicUsize::new(0);
    let failure: Mutex<Option<ComposeError>> = Mutex::new(None);

    std::thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                loop {
                    let index = next.fetch_add(1, Ordering::Relaxed);
                    let Some(cell) = instances.get(index) else {
                        break;
                    };
                    if let Err(cause) = cell.with_behavior(|behavior, io| behavior.load(io)) {
                        let mut slot = failure.lock();
                        if slot.is_none() {
                            *slot = Some(ComposeError::LoadFailure {
                                workload: cell.display_name().to_string(),
                                cause,
                            });
                        }
                    }
                }
            });
        }
    });

    match failure.into_inner() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

/// Signal, join, and run the stop hooks for a set of instances.
fn stop_cells(cells: &[Arc<WorkloadCell>]) {
    for cell in cells {
        cell.request_stop();
    }
    for cell in cells {
        if cell.join_loop(STOP_GRACE) {
            cell.with_behavior(|behavior, _io| behavior.stop());
        } else {
            // The loop thread missed the grace period; skipping the stop
            // hook, since the behavior lock may never be released.
            warn!(
                workload = %cell.display_name(),
                grace_ms = STOP_GRACE.as_millis() as u64,
                "loop failed to stop within grace period; thread abandoned"
            );
        }
    }
}

/// Stop handle for a composed graph.
///
/// Dropping the handle stops the graph; [`Running::stop_all`] may also be
/// called explicitly and is idempotent.
#[derive(Debug)]
pub struct Running {
    instances: Vec<Arc<WorkloadCell>>,
    stopped: AtomicBool,
}

impl Running {
    /// The composed instances, in construction order.
    #[must_use]
    pub fn instances(&self) -> &[Arc<WorkloadCell>] {
        &self.instances
    }

    /// Find a composed instance by name.
    #[must_use]
    pub fn instance(&self, name: &str) -> Option<&Arc<WorkloadCell>> {
        self.instances.iter().find(|cell| cell.name() == name)
    }

    /// Signal every instance, wait for all loops to exit (within the grace
    /// period each), and run the stop hooks in construction order.
    ///
    /// Idempotent: the second and later calls return immediately.
    pub fn stop_all(&self) {
        if self.stopped.swap(true, Ordering::SeqCst) {
            return;
        }
        info!(count = self.instances.len(), "stopping workloads");
        stop_cells(&self.instances);
        info!("all workloads stopped");
    }
}

impl Drop for Running {
    fn drop(&mut self) {
        self.stop_all();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicU64;

    use anyhow::Result;

    use super::*;
    use crate::cell::WorkloadIo;
    use crate::config::from_yaml_str;
    use crate::workload::Workload;

    use cadence_state::Value;

    /// Publishes a monotonically increasing `out` each tick.
    #[derive(Default)]
    struct Emitter {
        count: u64,
    }

    impl Workload for Emitter {
        fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
            io.declare_readable("out", Value::Float(0.0))?;
            Ok(())
        }

        fn tick(&mut self, _time_delta: f64, io: &WorkloadIo<'_>) -> Result<()> {
            self.count += 1;
            io.safe_set("out", Value::Float(self.count as f64))?;
            Ok(())
        }
    }

    /// Passive sink with a writable `in` field.
    #[derive(Default)]
    struct Sink;

    impl Workload for Sink {
        fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
            io.declare_writable("in", Value::Float(0.0))?;
            Ok(())
        }

        fn default_tick_rate_hz(&self) -> f64 {
            0.0
        }
    }

    static GHOST_PEER_TICKS: AtomicU64 = AtomicU64::new(0);

    /// Ticks must never run if composition fails before start.
    #[derive(Default)]
    struct TickProbe;

    impl Workload for TickProbe {
        fn pre_load(&mut self, io: &WorkloadIo<'_>) -> Result<()> {
            io.declare_readable("out", Value::Float(0.0))?;
            Ok(())
        }

        fn tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) -> Result<()> {
            GHOST_PEER_TICKS.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[derive(Default)]
    struct FailsToLoad;

    impl Workload for FailsToLoad {
        fn load(&mut self, _io: &WorkloadIo<'_>) -> Result<()> {
            anyhow::bail!("corrupt model file")
        }
    }

    fn registry() -> Registry {
        let registry = Registry::new();
        registry.register_type::<Emitter>();
        registry.register_type::<Sink>();
        registry.register_type::<TickProbe>();
        registry.register_type::<FailsToLoad>();
        registry
    }

    #[test]
    fn test_pipeline_composes_and_propagates() {
        let composer = Composer::new(registry());
        let running = composer
            .load_config(
                from_yaml_str(
                    r#"
workloads:
  - type: emitter
    name: src
    args:
      tick_rate_hz: 50
      data_bindings:
        - "out -> sink.in"
  - type: sink
    name: sink
    args:
      tick_parent_name: src
"#,
                )
                .unwrap(),
            )
            .unwrap();

        std::thread::sleep(Duration::from_millis(120));
        running.stop_all();

        let src = running.instance("src").unwrap();
        let sink = running.instance("sink").unwrap();
        let out = src.safe_get("out").unwrap();
        assert!(out.as_f64().unwrap() >= 1.0);
        assert_eq!(sink.safe_get("in"), Some(out));

        // The sink co-ticked with its parent; its no-op tick still counts
        // and contributes (near) zero duration.
        assert!(sink.tick_count() > 0);
        assert!(!sink.has_loop_thread());
        assert!(sink.last_tick_duration() < Duration::from_millis(5));
    }

    #[test]
    fn test_unknown_type_is_fatal() {
        let composer = Composer::new(registry());
        let err = composer
            .load_config(from_yaml_str("workloads: [{type: ghost_type, name: g}]").unwrap())
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownType(name) if name == "ghost_type"));
    }

    #[test]
    fn test_unknown_config_key_is_fatal() {
        let composer = Composer::new(registry());
        let err = composer
            .load_config(
                from_yaml_str("workloads: [{type: sink, name: s, args: {mystery: 1}}]").unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownConfig { key, .. } if key == "mystery"));
    }

    #[test]
    fn test_unknown_peer_fails_before_start() {
        let composer = Composer::new(registry());
        let err = composer
            .load_config(
                from_yaml_str(
                    r#"
workloads:
  - type: tick_probe
    name: probe
    args:
      tick_rate_hz: 500
      data_bindings:
        - "out -> ghost.y"
"#,
                )
                .unwrap(),
            )
            .unwrap_err();
        assert!(matches!(err, ComposeError::UnknownPeer { peer, .. } if peer == "ghost"));

        // Nothing started: the probe never ticks.
        std::thread::sleep(Duration::from_millis(50));
        assert_eq!(GHOST_PEER_TICKS.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_load_failure_aborts() {
        let composer = Composer::new(registry());
        let err = composer
            .load_config(from_yaml_str("workloads: [{type: fails_to_load, name: f}]").unwrap())
            .unwrap_err();
        assert!(matches!(err, ComposeError::LoadFailure { workload, .. } if workload == "f"));
    }

    #[test]
    fn test_stop_all_is_idempotent() {
        let composer = Composer::new(registry());
        let running = composer
            .load_config(
                from_yaml_str("workloads: [{type: emitter, name: e, args: {tick_rate_hz: 100}}]")
                    .unwrap(),
            )
            .unwrap();

        running.stop_all();
        let count_after_first = running.instance("e").unwrap().tick_count();
        // Second call returns immediately and changes nothing.
        running.stop_all();
        assert_eq!(running.instance("e").unwrap().tick_count(), count_after_first);
    }

    #[test]
    fn test_start_then_immediate_stop() {
        let composer = Composer::new(registry());
        let running = composer
            .load_config(
                from_yaml_str("workloads: [{type: emitter, name: e, args: {tick_rate_hz: 10}}]")
                    .unwrap(),
            )
            .unwrap();
        running.stop_all();
    }
}
