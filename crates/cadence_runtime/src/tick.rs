//! Periodic tick loops and parent/child co-tick.
//!
//! Each periodic instance with a positive rate and no parent owns exactly
//! one loop thread. Per cycle the loop:
//!
//! 1. Measures `now` and the delta since the previous cycle.
//! 2. Runs `pre_tick`.
//! 3. If children exist, submits a single tick-all-children task to the
//!    parent-owned single-worker child executor.
//! 4. Concurrently runs its own `tick`, recording `last_tick_duration`.
//! 5. Waits for the child task, then runs `post_tick`.
//! 6. Sleeps for `max(0, period − elapsed)` — an overrun cycle starts the
//!    next one immediately (no catch-up, no drift correction).
//!
//! The stop flag is checked only between cycles; a long-running `tick` is
//! not interrupted. Children are ticked in attach order with the parent's
//! measured dt, and a child failure never aborts the parent's cycle.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::cell::WorkloadCell;

/// Spawn the owning loop thread for a periodic instance.
pub(crate) fn spawn_loop(cell: Arc<WorkloadCell>, tick_rate_hz: f64) -> JoinHandle<()> {
    thread::spawn(move || run_loop(&cell, tick_rate_hz))
}

fn run_loop(cell: &Arc<WorkloadCell>, tick_rate_hz: f64) {
    let period = Duration::from_secs_f64(1.0 / tick_rate_hz);
    let mut child_executor: Option<ChildExecutor> = None;
    let mut last_time = Instant::now();

    debug!(
        workload = %cell.display_name(),
        instance_id = %cell.instance_id(),
        rate_hz = tick_rate_hz,
        "tick loop starting"
    );

    while !cell.stop_requested() {
        let now = Instant::now();
        let time_delta = now.duration_since(last_time).as_secs_f64();
        last_time = now;

        cell.with_behavior(|behavior, io| behavior.pre_tick(time_delta, io));

        // Fan the children out on the single-worker executor, concurrently
        // with our own tick.
        let children = cell.children();
        let pending = if children.is_empty() {
            None
        } else {
            let executor = child_executor.get_or_insert_with(ChildExecutor::spawn);
            Some(executor.submit(move || tick_children(&children, time_delta)))
        };

        let started = Instant::now();
        let result = cell.with_behavior(|behavior, io| behavior.tick(time_delta, io));
        cell.record_tick(started.elapsed());
        if let Err(error) = result {
            warn!(workload = %cell.display_name(), %error, "tick failed");
        }

        if let Some(task) = pending {
            task.wait();
        }

        cell.with_behavior(|behavior, io| behavior.post_tick(time_delta, io));

        let elapsed = now.elapsed();
        if elapsed < period {
            cell.sleep_for(period - elapsed);
        } else {
            debug!(
                workload = %cell.display_name(),
                elapsed_us = elapsed.as_micros() as u64,
                period_us = period.as_micros() as u64,
                "cycle exceeded its period"
            );
        }
    }

    if let Some(executor) = child_executor {
        executor.shutdown();
    }
    cell.mark_loop_exited();
    debug!(workload = %cell.display_name(), "tick loop exited");
}

/// Tick every child in attach order with the parent's dt. Failures are
/// contained per child.
fn tick_children(children: &[Arc<WorkloadCell>], time_delta: f64) {
    for child in children {
        child.with_behavior(|behavior, io| behavior.pre_tick(time_delta, io));
        let started = Instant::now();
        let result = child.with_behavior(|behavior, io| behavior.tick(time_delta, io));
        child.record_tick(started.elapsed());
        if let Err(error) = result {
            warn!(workload = %child.display_name(), %error, "child tick failed");
        }
        child.with_behavior(|behavior, io| behavior.post_tick(time_delta, io));
    }
}

type Job = Box<dyn FnOnce() + Send>;

/// Single-worker pool a parent uses to fan out its children.
///
/// Spawned lazily on the first cycle that observes children; shut down when
/// the owning loop exits. Shutdown waits for the in-flight task.
struct ChildExecutor {
    sender: mpsc::Sender<Job>,
    worker: JoinHandle<()>,
}

/// Completion handle for one submitted child task.
struct ChildTask {
    done: mpsc::Receiver<()>,
}

impl ChildTask {
    /// Block until the task has run (or the worker is gone).
    fn wait(self) {
        let _ = self.done.recv();
    }
}

impl ChildExecutor {
    fn spawn() -> Self {
        let (sender, receiver) = mpsc::channel::<Job>();
        let worker = thread::spawn(move || {
            while let Ok(job) = receiver.recv() {
                job();
            }
        });
        Self { sender, worker }
    }

    fn submit(&self, job: impl FnOnce() + Send + 'static) -> ChildTask {
        let (done_tx, done_rx) = mpsc::channel();
        let wrapped: Job = Box::new(move || {
            job();
            let _ = done_tx.send(());
        });
        if self.sender.send(wrapped).is_err() {
            warn!("child executor worker is gone; dropping task");
        }
        ChildTask { done: done_rx }
    }

    fn shutdown(self) {
        drop(self.sender);
        let _ = self.worker.join();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU64, Ordering};

    use anyhow::Result;

    use super::*;
    use crate::cell::WorkloadIo;
    use crate::registry::Registry;
    use crate::workload::Workload;

    /// Counts ticks and remembers the last dt it saw.
    #[derive(Default)]
    struct Counter {
        ticks: Arc<AtomicU64>,
    }

    impl Workload for Counter {
        fn tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) -> Result<()> {
            self.ticks.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    fn counter_cell(name: &str, rate_hz: f64) -> (Arc<WorkloadCell>, Arc<AtomicU64>) {
        let ticks = Arc::new(AtomicU64::new(0));
        let cell = WorkloadCell::new(
            Counter {
                ticks: Arc::clone(&ticks),
            },
            name,
        );
        cell.set_tick_rate_hz(rate_hz);
        (cell, ticks)
    }

    #[test]
    fn test_periodic_loop_holds_rate() {
        let registry = Registry::new();
        let (cell, ticks) = counter_cell("fast", 100.0);
        cell.start(&registry).unwrap();
        assert!(cell.has_loop_thread());

        thread::sleep(Duration::from_millis(300));
        cell.request_stop();
        assert!(cell.join_loop(Duration::from_secs(5)));

        // 300ms at 100Hz, with generous bounds to absorb scheduler jitter.
        let count = ticks.load(Ordering::Relaxed);
        assert!(count >= 10, "expected at least 10 ticks, got {count}");
        assert!(count <= 60, "expected at most 60 ticks, got {count}");
        assert_eq!(cell.tick_count(), count);
    }

    #[test]
    fn test_zero_rate_spawns_no_thread() {
        let registry = Registry::new();
        let (cell, ticks) = counter_cell("idle", 0.0);
        cell.start(&registry).unwrap();
        assert!(!cell.has_loop_thread());
        assert_eq!(ticks.load(Ordering::Relaxed), 0);
    }

    #[test]
    fn test_start_then_immediate_stop_is_clean() {
        let registry = Registry::new();
        let (cell, _ticks) = counter_cell("brief", 50.0);
        cell.start(&registry).unwrap();
        cell.request_stop();
        assert!(cell.join_loop(Duration::from_secs(5)));
    }

    #[test]
    fn test_child_ticks_with_parent() {
        let registry = Registry::new();
        let (parent, parent_ticks) = counter_cell("parent", 200.0);
        let (child, child_ticks) = counter_cell("child", 0.0);
        registry.register_instance(&parent);
        registry.register_instance(&child);

        child.set_tick_parent_name(Some("parent".to_string()));
        parent.start(&registry).unwrap();
        child.start(&registry).unwrap();

        // Attaching relinquishes self-scheduling.
        assert!((child.tick_rate_hz() - 0.0).abs() < f64::EPSILON);
        assert!(!child.has_loop_thread());
        assert_eq!(parent.children().len(), 1);
        assert!(child.parent().is_some_and(|p| p.name() == "parent"));

        thread::sleep(Duration::from_millis(200));
        parent.request_stop();
        assert!(parent.join_loop(Duration::from_secs(5)));

        // The child ticks in every parent cycle that saw it attached, and
        // never outside one. The first cycle may race the attach.
        let parent_count = parent_ticks.load(Ordering::Relaxed);
        let child_count = child_ticks.load(Ordering::Relaxed);
        assert!(parent_count > 0, "parent never ticked");
        assert!(child_count > 0, "child never ticked");
        assert!(child_count <= parent_count);
        assert!(
            parent_count - child_count <= 1,
            "parent {parent_count} vs child {child_count}"
        );
        assert!(child.last_tick_duration() >= Duration::ZERO);
    }

    #[test]
    fn test_unknown_parent_is_fatal() {
        let registry = Registry::new();
        let (child, _ticks) = counter_cell("orphan", 0.0);
        registry.register_instance(&child);
        child.set_tick_parent_name(Some("ghost".to_string()));

        let err = child.start(&registry).unwrap_err();
        assert!(matches!(
            err,
            crate::error::ComposeError::UnknownParent { parent, .. } if parent == "ghost"
        ));
    }

    #[test]
    fn test_failing_tick_does_not_kill_loop() {
        #[derive(Default)]
        struct Flaky {
            ticks: Arc<AtomicU64>,
        }

        impl Workload for Flaky {
            fn tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) -> Result<()> {
                self.ticks.fetch_add(1, Ordering::Relaxed);
                anyhow::bail!("simulated failure")
            }
        }

        let registry = Registry::new();
        let ticks = Arc::new(AtomicU64::new(0));
        let cell = WorkloadCell::new(
            Flaky {
                ticks: Arc::clone(&ticks),
            },
            "flaky",
        );
        cell.set_tick_rate_hz(200.0);
        cell.start(&registry).unwrap();

        thread::sleep(Duration::from_millis(100));
        cell.request_stop();
        assert!(cell.join_loop(Duration::from_secs(5)));

        // The loop kept cycling despite every tick failing.
        assert!(ticks.load(Ordering::Relaxed) > 1);
    }

    #[test]
    fn test_overrun_tick_starts_next_cycle_immediately() {
        #[derive(Default)]
        struct Slow {
            ticks: Arc<AtomicU64>,
        }

        impl Workload for Slow {
            fn tick(&mut self, _time_delta: f64, _io: &WorkloadIo<'_>) -> Result<()> {
                self.ticks.fetch_add(1, Ordering::Relaxed);
                thread::sleep(Duration::from_millis(20));
                Ok(())
            }
        }

        let registry = Registry::new();
        let ticks = Arc::new(AtomicU64::new(0));
        let cell = WorkloadCell::new(
            Slow {
                ticks: Arc::clone(&ticks),
            },
            "slow",
        );
        // 1kHz nominal, 20ms ticks: every cycle overruns.
        cell.set_tick_rate_hz(1000.0);
        cell.start(&registry).unwrap();

        thread::sleep(Duration::from_millis(150));
        cell.request_stop();
        assert!(cell.join_loop(Duration::from_secs(5)));

        // ~150ms of wall clock over 20ms ticks: the loop never slept a
        // negative duration and kept going back-to-back.
        let count = ticks.load(Ordering::Relaxed);
        assert!(count >= 3, "expected back-to-back cycles, got {count}");
    }
}
