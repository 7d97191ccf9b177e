//! Runtime workload instances.
//!
//! A [`WorkloadCell`] pairs a behavior (`Box<dyn Workload>`) with everything
//! the runtime tracks about it: its field store, scheduling state, resolved
//! bindings, stop signal, and timing bookkeeping. Cells are shared as
//! `Arc<WorkloadCell>` between the composer, the registry, loop threads, and
//! binding fan-out.
//!
//! Locking discipline: the state lock is held only for the duration of a map
//! access. A push fan-out captures the value, releases the local lock, then
//! writes peers. The behavior lock is held across a hook invocation by the
//! owning loop; field access from other threads never takes it, except to
//! run a transformer's on-demand derivation.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use parking_lot::{Condvar, Mutex, RwLock};
use tracing::{debug, warn};
use uuid::Uuid;

use cadence_state::{StateContainer, StateError, Value};

use crate::bindings::BindingSpec;
use crate::error::{ComposeError, ConfigError};
use crate::registry::{Registry, WorkloadCtor, type_key_of};
use crate::tick;
use crate::workload::Workload;

/// Scheduling state mutated between construction and `start`.
#[derive(Debug, Default)]
struct SchedState {
    /// Nominal tick rate; 0 means the instance does not schedule itself.
    tick_rate_hz: f64,
    /// Declared parent name, resolved at `start`.
    tick_parent_name: Option<String>,
    /// Resolved parent, held non-owning (the parent owns the child list).
    parent: Option<Weak<WorkloadCell>>,
}

/// Resolved binding tables.
#[derive(Debug, Default)]
struct BindingTable {
    /// local field → push targets, in declaration order.
    outgoing: std::collections::HashMap<String, Vec<(Arc<WorkloadCell>, String)>>,
    /// local field → pull source (last declaration wins).
    incoming: std::collections::HashMap<String, (Arc<WorkloadCell>, String)>,
}

/// Transformer field lists, snapshotted at construction.
#[derive(Debug)]
struct TransformFields {
    inputs: Vec<String>,
    outputs: Vec<String>,
}

/// Cooperative stop flag with an interruptible wait.
#[derive(Debug, Default)]
struct StopSignal {
    flag: AtomicBool,
    lock: Mutex<()>,
    condvar: Condvar,
}

impl StopSignal {
    fn request(&self) {
        self.flag.store(true, Ordering::SeqCst);
        let _guard = self.lock.lock();
        self.condvar.notify_all();
    }

    fn is_requested(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }

    /// Sleep for up to `duration`, returning early if stop is requested.
    fn sleep_for(&self, duration: Duration) {
        let mut guard = self.lock.lock();
        if self.flag.load(Ordering::SeqCst) {
            return;
        }
        let _ = self.condvar.wait_for(&mut guard, duration);
    }
}

/// Tracks whether the owning loop thread is still running, so shutdown can
/// join with a grace period.
#[derive(Debug, Default)]
struct LoopGate {
    running: Mutex<bool>,
    exited: Condvar,
}

/// A live workload instance.
pub struct WorkloadCell {
    /// Unique workload name; may be empty for anonymous instances.
    name: String,
    /// Canonical registry type name.
    type_name: String,
    /// Per-instance id for log correlation.
    instance_id: Uuid,
    behavior: Mutex<Box<dyn Workload>>,
    state: Mutex<StateContainer>,
    sched: Mutex<SchedState>,
    /// Ordered child handles, appended as children resolve their parent.
    children: Mutex<Vec<Arc<WorkloadCell>>>,
    bindings: RwLock<BindingTable>,
    /// Raw binding directives from config, resolved during setup.
    raw_bindings: Mutex<Vec<String>>,
    transform_fields: Option<TransformFields>,
    stop: StopSignal,
    loop_gate: LoopGate,
    loop_handle: Mutex<Option<JoinHandle<()>>>,
    last_tick_duration_ns: AtomicU64,
    tick_count: AtomicU64,
}

impl std::fmt::Debug for WorkloadCell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkloadCell")
            .field("name", &self.name)
            .field("type_name", &self.type_name)
            .field("instance_id", &self.instance_id)
            .finish_non_exhaustive()
    }
}

impl WorkloadCell {
    /// Wrap a concrete behavior, deriving the canonical type name from the
    /// Rust type.
    pub fn new<T: Workload + 'static>(behavior: T, name: impl Into<String>) -> Arc<Self> {
        Self::build(Box::new(behavior), type_key_of::<T>(), name.into())
    }

    /// Composer path: construct from a registered type's constructor.
    pub(crate) fn from_ctor(ctor: WorkloadCtor, type_name: &str, name: String) -> Arc<Self> {
        Self::build(ctor(), type_name.to_string(), name)
    }

    fn build(mut behavior: Box<dyn Workload>, type_name: String, name: String) -> Arc<Self> {
        let default_rate = behavior.default_tick_rate_hz();
        let mut state = StateContainer::new();

        // Transformers declare their field sets at construction.
        let transform_fields = behavior.as_transform().map(|t| TransformFields {
            inputs: t.input_names().iter().map(|s| (*s).to_string()).collect(),
            outputs: t.output_names().iter().map(|s| (*s).to_string()).collect(),
        });
        if let Some(fields) = &transform_fields {
            for input in &fields.inputs {
                let _ = state.declare_writable(input.clone(), Value::Float(0.0));
            }
            for output in &fields.outputs {
                let _ = state.declare_readable(output.clone(), Value::Float(0.0));
            }
        }

        Arc::new(Self {
            name,
            type_name,
            instance_id: Uuid::new_v4(),
            behavior: Mutex::new(behavior),
            state: Mutex::new(state),
            sched: Mutex::new(SchedState {
                tick_rate_hz: default_rate,
                tick_parent_name: None,
                parent: None,
            }),
            children: Mutex::new(Vec::new()),
            bindings: RwLock::new(BindingTable::default()),
            raw_bindings: Mutex::new(Vec::new()),
            transform_fields,
            stop: StopSignal::default(),
            loop_gate: LoopGate::default(),
            loop_handle: Mutex::new(None),
            last_tick_duration_ns: AtomicU64::new(0),
            tick_count: AtomicU64::new(0),
        })
    }

    /// Unique workload name; empty for anonymous instances.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Canonical registry type name.
    #[must_use]
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Per-instance id for log correlation.
    #[must_use]
    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    /// Name for logs: the workload name, or the type name when anonymous.
    #[must_use]
    pub fn display_name(&self) -> &str {
        if self.name.is_empty() {
            &self.type_name
        } else {
            &self.name
        }
    }

    // ------------------------------------------------------------------
    // Scheduling state

    /// Current nominal tick rate in Hz.
    #[must_use]
    pub fn tick_rate_hz(&self) -> f64 {
        self.sched.lock().tick_rate_hz
    }

    /// Override the nominal tick rate. Takes effect at `start`.
    pub fn set_tick_rate_hz(&self, rate: f64) {
        self.sched.lock().tick_rate_hz = rate;
    }

    /// Declared parent name, if any.
    #[must_use]
    pub fn tick_parent_name(&self) -> Option<String> {
        self.sched.lock().tick_parent_name.clone()
    }

    /// Declare the parent this instance attaches to at `start`.
    pub fn set_tick_parent_name(&self, parent: Option<String>) {
        self.sched.lock().tick_parent_name = parent;
    }

    /// The resolved parent, if this instance attached to one.
    #[must_use]
    pub fn parent(&self) -> Option<Arc<WorkloadCell>> {
        self.sched.lock().parent.as_ref().and_then(Weak::upgrade)
    }

    /// Ordered child handles.
    #[must_use]
    pub fn children(&self) -> Vec<Arc<WorkloadCell>> {
        self.children.lock().clone()
    }

    /// Seconds per cycle (`1 / rate`), or 0 when the rate is 0.
    #[must_use]
    pub fn tick_interval(&self) -> f64 {
        let rate = self.tick_rate_hz();
        if rate > 0.0 { 1.0 / rate } else { 0.0 }
    }

    /// Wall-clock duration of the most recent `tick` call.
    #[must_use]
    pub fn last_tick_duration(&self) -> Duration {
        Duration::from_nanos(self.last_tick_duration_ns.load(Ordering::Relaxed))
    }

    /// Number of completed `tick` calls.
    #[must_use]
    pub fn tick_count(&self) -> u64 {
        self.tick_count.load(Ordering::Relaxed)
    }

    /// `true` while an owning loop thread exists for this instance.
    #[must_use]
    pub fn has_loop_thread(&self) -> bool {
        self.loop_handle.lock().is_some()
    }

    // ------------------------------------------------------------------
    // Field access

    /// Declare an output field.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateField`] if the name is taken.
    pub fn declare_readable(
        &self,
        field: impl Into<String>,
        default: Value,
    ) -> Result<(), StateError> {
        self.state.lock().declare_readable(field, default)
    }

    /// Declare an input field.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateField`] if the name is taken.
    pub fn declare_writable(
        &self,
        field: impl Into<String>,
        default: Value,
    ) -> Result<(), StateError> {
        self.state.lock().declare_writable(field, default)
    }

    /// Names of the declared output fields.
    #[must_use]
    pub fn readable_fields(&self) -> Vec<String> {
        self.state.lock().readable_fields()
    }

    /// Names of the declared input fields.
    #[must_use]
    pub fn writable_fields(&self) -> Vec<String> {
        self.state.lock().writable_fields()
    }

    /// Read a field.
    ///
    /// An incoming pull binding shadows the local store: the read is
    /// answered with the source's current *local* value (one link is chased;
    /// the source's own incoming bindings are not followed). Reading a
    /// transformer output refreshes it first. Returns `None` for fields
    /// declared nowhere.
    #[must_use]
    pub fn safe_get(&self, field: &str) -> Option<Value> {
        let source = {
            let bindings = self.bindings.read();
            bindings.incoming.get(field).cloned()
        };
        if let Some((source, source_field)) = source {
            return source.local_get(&source_field);
        }
        self.local_get(field)
    }

    /// Read a field from the local store only, refreshing transformer
    /// outputs but ignoring incoming bindings.
    fn local_get(&self, field: &str) -> Option<Value> {
        if self.is_transform_output(field) {
            self.run_transform();
        }
        self.state.lock().get(field)
    }

    /// Write a field and propagate eagerly.
    ///
    /// The local store is updated first (lock held for the map access only),
    /// a transformer input triggers the derivation, and the value then fans
    /// out synchronously to every push target: the call returns only after
    /// all peer writes have returned.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownField`] if the field (or a push
    /// target's field) is declared nowhere.
    pub fn safe_set(&self, field: &str, value: Value) -> Result<(), StateError> {
        self.state.lock().set(field, value.clone())?;
        if self.is_transform_input(field) {
            self.run_transform();
        }
        self.propagate(field, &value)
    }

    fn propagate(&self, field: &str, value: &Value) -> Result<(), StateError> {
        let targets = {
            let bindings = self.bindings.read();
            bindings.outgoing.get(field).cloned()
        };
        let Some(targets) = targets else {
            return Ok(());
        };
        for (target, target_field) in targets {
            target.safe_set(&target_field, value.clone())?;
        }
        Ok(())
    }

    fn is_transform_input(&self, field: &str) -> bool {
        self.transform_fields
            .as_ref()
            .is_some_and(|fields| fields.inputs.iter().any(|name| name == field))
    }

    fn is_transform_output(&self, field: &str) -> bool {
        self.transform_fields
            .as_ref()
            .is_some_and(|fields| fields.outputs.iter().any(|name| name == field))
    }

    /// Run the transform over the current inputs and store each result
    /// component to the corresponding output by position, propagating push
    /// bindings on the outputs.
    fn run_transform(&self) {
        let Some(fields) = &self.transform_fields else {
            return;
        };
        let inputs: Vec<Value> = {
            let state = self.state.lock();
            fields
                .inputs
                .iter()
                .map(|name| state.get(name).unwrap_or(Value::Float(0.0)))
                .collect()
        };
        let outputs = {
            let mut behavior = self.behavior.lock();
            match behavior.as_transform() {
                Some(transform) => transform.transform(&inputs),
                None => return,
            }
        };
        for (name, value) in fields.outputs.iter().zip(outputs) {
            if self.state.lock().set(name, value.clone()).is_err() {
                continue;
            }
            if let Err(error) = self.propagate(name, &value) {
                warn!(
                    workload = %self.display_name(),
                    field = %name,
                    %error,
                    "transform output propagation failed"
                );
            }
        }
    }

    // ------------------------------------------------------------------
    // Configuration and bindings

    /// Apply one extra configuration key to the behavior.
    ///
    /// # Errors
    ///
    /// Propagates the behavior's [`ConfigError`].
    pub fn configure(&self, key: &str, value: &Value) -> Result<(), ConfigError> {
        self.behavior.lock().apply_config(key, value)
    }

    /// Store raw binding directives for later resolution during setup.
    pub fn set_raw_bindings(&self, bindings: Vec<String>) {
        *self.raw_bindings.lock() = bindings;
    }

    /// Resolve the stored directives against the registry's instance table.
    ///
    /// Malformed directives are skipped (permissive parse); duplicate push
    /// targets accumulate; duplicate pull sources overwrite (last wins).
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownPeer`] for a peer name that does not
    /// resolve.
    pub fn resolve_bindings(&self, registry: &Registry) -> Result<(), ComposeError> {
        let raw = self.raw_bindings.lock().clone();
        let mut table = BindingTable::default();

        for directive in &raw {
            let Some(spec) = BindingSpec::parse(directive) else {
                debug!(
                    workload = %self.display_name(),
                    binding = %directive,
                    "ignoring malformed binding"
                );
                continue;
            };
            let peer = registry.find_by_name(spec.peer()).ok_or_else(|| {
                ComposeError::UnknownPeer {
                    workload: self.display_name().to_string(),
                    peer: spec.peer().to_string(),
                }
            })?;
            match spec {
                BindingSpec::Push { local, field, .. } => {
                    table.outgoing.entry(local).or_default().push((peer, field));
                }
                BindingSpec::Pull { local, field, .. } => {
                    table.incoming.insert(local, (peer, field));
                }
            }
        }

        *self.bindings.write() = table;
        Ok(())
    }

    /// Programmatically add a push binding: writes to `local` are forwarded
    /// to `peer.field`.
    pub fn bind_push(&self, local: impl Into<String>, peer: &Arc<WorkloadCell>, field: impl Into<String>) {
        self.bindings
            .write()
            .outgoing
            .entry(local.into())
            .or_default()
            .push((Arc::clone(peer), field.into()));
    }

    /// Programmatically add a pull binding: reads of `local` are answered by
    /// `peer.field`. Replaces any existing pull for `local`.
    pub fn bind_pull(&self, local: impl Into<String>, peer: &Arc<WorkloadCell>, field: impl Into<String>) {
        self.bindings
            .write()
            .incoming
            .insert(local.into(), (Arc::clone(peer), field.into()));
    }

    // ------------------------------------------------------------------
    // Lifecycle

    /// Run a closure against the behavior with this cell's io handle.
    ///
    /// The behavior lock is held for the duration of the closure; this is
    /// how the composer and the tick loops drive the lifecycle hooks.
    pub fn with_behavior<R>(&self, f: impl FnOnce(&mut dyn Workload, &WorkloadIo<'_>) -> R) -> R {
        let mut behavior = self.behavior.lock();
        let io = WorkloadIo { cell: self };
        f(behavior.as_mut(), &io)
    }

    /// Start this instance.
    ///
    /// With a declared parent: resolve it, attach to its child list, and
    /// relinquish self-scheduling (rate forced to 0). With a positive rate
    /// and no parent: spawn the owning loop thread. Otherwise the instance
    /// stays passive (on-demand).
    ///
    /// # Errors
    ///
    /// Returns [`ComposeError::UnknownParent`] if the declared parent does
    /// not resolve.
    pub fn start(self: &Arc<Self>, registry: &Registry) -> Result<(), ComposeError> {
        let parent_name = self.tick_parent_name();
        if let Some(parent_name) = parent_name {
            let parent = registry.find_by_name(&parent_name).ok_or_else(|| {
                ComposeError::UnknownParent {
                    workload: self.display_name().to_string(),
                    parent: parent_name.clone(),
                }
            })?;
            parent.attach_child(Arc::clone(self));
            let mut sched = self.sched.lock();
            sched.parent = Some(Arc::downgrade(&parent));
            sched.tick_rate_hz = 0.0;
            debug!(
                workload = %self.display_name(),
                parent = %parent.display_name(),
                "attached to tick parent"
            );
            return Ok(());
        }

        let rate = self.tick_rate_hz();
        if rate > 0.0 && !self.has_loop_thread() {
            *self.loop_gate.running.lock() = true;
            let handle = tick::spawn_loop(Arc::clone(self), rate);
            *self.loop_handle.lock() = Some(handle);
            debug!(
                workload = %self.display_name(),
                instance_id = %self.instance_id,
                rate_hz = rate,
                "spawned tick loop"
            );
        }
        Ok(())
    }

    /// Append a child to this instance's ordered child list.
    pub fn attach_child(&self, child: Arc<WorkloadCell>) {
        self.children.lock().push(child);
    }

    /// Request cooperative shutdown. The flag is checked between cycles; a
    /// long-running `tick` is not interrupted.
    pub fn request_stop(&self) {
        self.stop.request();
    }

    /// `true` once shutdown has been requested.
    #[must_use]
    pub fn stop_requested(&self) -> bool {
        self.stop.is_requested()
    }

    /// Wait for the owning loop to exit, up to `grace`. Returns `true` if
    /// the loop is gone (or never existed); `false` means the thread missed
    /// the grace period and was abandoned.
    pub(crate) fn join_loop(&self, grace: Duration) -> bool {
        {
            let mut running = self.loop_gate.running.lock();
            if *running {
                let deadline = Instant::now() + grace;
                while *running {
                    let result = self.loop_gate.exited.wait_until(&mut running, deadline);
                    if result.timed_out() && *running {
                        return false;
                    }
                }
            }
        }
        if let Some(handle) = self.loop_handle.lock().take() {
            let _ = handle.join();
        }
        true
    }

    // ------------------------------------------------------------------
    // Loop-side plumbing

    pub(crate) fn sleep_for(&self, duration: Duration) {
        self.stop.sleep_for(duration);
    }

    pub(crate) fn record_tick(&self, duration: Duration) {
        self.last_tick_duration_ns
            .store(duration.as_nanos() as u64, Ordering::Relaxed);
        self.tick_count.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn mark_loop_exited(&self) {
        let mut running = self.loop_gate.running.lock();
        *running = false;
        self.loop_gate.exited.notify_all();
    }
}

/// Mediated field access handed to lifecycle hooks.
///
/// The io handle exposes the instance's own fields and timing, nothing
/// else; hooks never see the runtime cell directly.
pub struct WorkloadIo<'a> {
    cell: &'a WorkloadCell,
}

impl WorkloadIo<'_> {
    /// The owning workload's name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.cell.name()
    }

    /// Read a field; see [`WorkloadCell::safe_get`].
    #[must_use]
    pub fn safe_get(&self, field: &str) -> Option<Value> {
        self.cell.safe_get(field)
    }

    /// Write a field; see [`WorkloadCell::safe_set`].
    ///
    /// # Errors
    ///
    /// Returns [`StateError::UnknownField`] for undeclared fields.
    pub fn safe_set(&self, field: &str, value: Value) -> Result<(), StateError> {
        self.cell.safe_set(field, value)
    }

    /// Declare an output field.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateField`] if the name is taken.
    pub fn declare_readable(
        &self,
        field: impl Into<String>,
        default: Value,
    ) -> Result<(), StateError> {
        self.cell.declare_readable(field, default)
    }

    /// Declare an input field.
    ///
    /// # Errors
    ///
    /// Returns [`StateError::DuplicateField`] if the name is taken.
    pub fn declare_writable(
        &self,
        field: impl Into<String>,
        default: Value,
    ) -> Result<(), StateError> {
        self.cell.declare_writable(field, default)
    }

    /// Seconds per cycle at the nominal rate, or 0 for on-demand instances.
    #[must_use]
    pub fn tick_interval(&self) -> f64 {
        self.cell.tick_interval()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ConfigError;
    use crate::transform::Transform;

    #[derive(Default)]
    struct Probe;
    impl Workload for Probe {}

    fn probe_cell(name: &str, readable: &[(&str, f64)], writable: &[(&str, f64)]) -> Arc<WorkloadCell> {
        let cell = WorkloadCell::new(Probe, name);
        for (field, default) in readable {
            cell.declare_readable(*field, Value::Float(*default)).unwrap();
        }
        for (field, default) in writable {
            cell.declare_writable(*field, Value::Float(*default)).unwrap();
        }
        cell
    }

    #[test]
    fn test_push_binding_propagates_on_set() {
        let src = probe_cell("src", &[("out", 0.0)], &[]);
        let sink = probe_cell("sink", &[], &[("in", 0.0)]);
        src.bind_push("out", &sink, "in");

        src.safe_set("out", Value::Float(4.2)).unwrap();
        assert_eq!(sink.safe_get("in"), Some(Value::Float(4.2)));
        assert_eq!(src.safe_get("out"), Some(Value::Float(4.2)));
    }

    #[test]
    fn test_duplicate_push_targets_accumulate() {
        let src = probe_cell("src", &[("out", 0.0)], &[]);
        let a = probe_cell("a", &[], &[("in", 0.0)]);
        let b = probe_cell("b", &[], &[("in", 0.0)]);
        src.bind_push("out", &a, "in");
        src.bind_push("out", &b, "in");

        src.safe_set("out", Value::Float(1.0)).unwrap();
        assert_eq!(a.safe_get("in"), Some(Value::Float(1.0)));
        assert_eq!(b.safe_get("in"), Some(Value::Float(1.0)));
    }

    #[test]
    fn test_pull_binding_shadows_local_value() {
        let a = probe_cell("a", &[("x", 1.0)], &[]);
        let b = probe_cell("b", &[("x", 2.0)], &[]);
        a.bind_pull("x", &b, "x");

        assert_eq!(a.safe_get("x"), Some(Value::Float(2.0)));
        // The local value is still there, just shadowed.
        a.safe_set("x", Value::Float(9.0)).unwrap();
        assert_eq!(a.safe_get("x"), Some(Value::Float(2.0)));
    }

    #[test]
    fn test_duplicate_pull_source_last_wins() {
        let a = probe_cell("a", &[("x", 1.0)], &[]);
        let b = probe_cell("b", &[("x", 2.0)], &[]);
        let c = probe_cell("c", &[("x", 3.0)], &[]);
        a.bind_pull("x", &b, "x");
        a.bind_pull("x", &c, "x");

        assert_eq!(a.safe_get("x"), Some(Value::Float(3.0)));
    }

    #[test]
    fn test_pull_chases_one_link_only() {
        let a = probe_cell("a", &[("x", 1.0)], &[]);
        let b = probe_cell("b", &[("x", 2.0)], &[]);
        let c = probe_cell("c", &[("x", 3.0)], &[]);
        a.bind_pull("x", &b, "x");
        b.bind_pull("x", &c, "x");

        // A sees B's local value, not C's.
        assert_eq!(a.safe_get("x"), Some(Value::Float(2.0)));
        // B itself still pulls from C.
        assert_eq!(b.safe_get("x"), Some(Value::Float(3.0)));
    }

    #[test]
    fn test_set_unknown_field_fails() {
        let cell = probe_cell("w", &[], &[]);
        let err = cell.safe_set("ghost", Value::Int(1)).unwrap_err();
        assert_eq!(err, StateError::UnknownField("ghost".into()));
        assert_eq!(cell.safe_get("ghost"), None);
    }

    #[test]
    fn test_configure_rejects_unknown_key() {
        let cell = probe_cell("w", &[], &[]);
        let err = cell.configure("mystery", &Value::Int(1)).unwrap_err();
        assert!(matches!(err, ConfigError::UnknownKey(_)));
    }

    #[test]
    fn test_resolve_bindings_skips_malformed_and_fails_unknown_peer() {
        let registry = Registry::new();
        let src = probe_cell("src", &[("out", 0.0)], &[]);
        let sink = probe_cell("sink", &[], &[("in", 0.0)]);
        registry.register_instance(&src);
        registry.register_instance(&sink);

        src.set_raw_bindings(vec![
            "not a binding".to_string(),
            "out -> sink.in".to_string(),
        ]);
        src.resolve_bindings(&registry).unwrap();
        src.safe_set("out", Value::Float(5.0)).unwrap();
        assert_eq!(sink.safe_get("in"), Some(Value::Float(5.0)));

        src.set_raw_bindings(vec!["out -> ghost.in".to_string()]);
        let err = src.resolve_bindings(&registry).unwrap_err();
        assert!(matches!(err, ComposeError::UnknownPeer { peer, .. } if peer == "ghost"));
    }

    // ------------------------------------------------------------------
    // Transformer cells

    #[derive(Default)]
    struct Gain {
        factor: f64,
    }

    impl Transform for Gain {
        fn input_names(&self) -> &'static [&'static str] {
            &["input"]
        }

        fn output_names(&self) -> &'static [&'static str] {
            &["output"]
        }

        fn transform(&mut self, inputs: &[Value]) -> Vec<Value> {
            let input = inputs[0].as_f64().unwrap_or(0.0);
            vec![Value::Float(input * self.factor)]
        }
    }

    impl Workload for Gain {
        fn default_tick_rate_hz(&self) -> f64 {
            0.0
        }

        fn as_transform(&mut self) -> Option<&mut dyn Transform> {
            Some(self)
        }
    }

    #[test]
    fn test_transformer_fields_declared_at_construction() {
        let cell = WorkloadCell::new(Gain { factor: 2.0 }, "gain");
        assert_eq!(cell.writable_fields(), vec!["input".to_string()]);
        assert_eq!(cell.readable_fields(), vec!["output".to_string()]);
        assert!((cell.tick_rate_hz() - 0.0).abs() < f64::EPSILON);
    }

    #[test]
    fn test_transformer_runs_on_input_write() {
        let cell = WorkloadCell::new(Gain { factor: 2.0 }, "gain");
        cell.safe_set("input", Value::Float(3.0)).unwrap();
        // Output was refreshed by the write; read it from the raw store.
        assert_eq!(cell.safe_get("output"), Some(Value::Float(6.0)));
    }

    #[test]
    fn test_transformer_refreshes_on_output_read() {
        let cell = WorkloadCell::new(Gain { factor: 10.0 }, "gain");
        // Feed the input through a peer push; the read still refreshes.
        let feeder = probe_cell("feeder", &[("out", 0.0)], &[]);
        feeder.bind_push("out", &cell, "input");
        feeder.safe_set("out", Value::Float(1.5)).unwrap();
        assert_eq!(cell.safe_get("output"), Some(Value::Float(15.0)));
    }

    #[test]
    fn test_transformer_output_pushes_downstream() {
        let cell = WorkloadCell::new(Gain { factor: 2.0 }, "gain");
        let sink = probe_cell("sink", &[], &[("in", 0.0)]);
        cell.bind_push("output", &sink, "in");

        cell.safe_set("input", Value::Float(4.0)).unwrap();
        assert_eq!(sink.safe_get("in"), Some(Value::Float(8.0)));
    }
}
