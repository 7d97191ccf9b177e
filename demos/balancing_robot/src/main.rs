//! Balancing-robot demo.
//!
//! Composes the planar simulator, a pitch PID, and the steering mixer from
//! `config.yaml`, runs the graph for a few seconds while logging the pose,
//! then stops everything cooperatively.

use std::time::Duration;

use anyhow::Result;
use tracing::info;
use tracing_subscriber::EnvFilter;

use cadence_runtime::{Composer, Registry};

fn main() -> Result<()> {
    // Initialise structured logging.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("balancing_robot=info".parse()?),
        )
        .init();

    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "demos/balancing_robot/config.yaml".to_string());

    let registry = Registry::new();
    cadence_workloads::register_builtin_types(&registry);

    let composer = Composer::new(registry);
    let running = composer.load(&config_path)?;
    info!(workloads = running.instances().len(), "graph running");

    let sim = running
        .instance("sim")
        .ok_or_else(|| anyhow::anyhow!("config declares no workload named `sim`"))?;
    let pid = running
        .instance("pitch_pid")
        .ok_or_else(|| anyhow::anyhow!("config declares no workload named `pitch_pid`"))?;

    for _ in 0..10 {
        std::thread::sleep(Duration::from_millis(500));
        let field = |cell: &cadence_runtime::WorkloadCell, name: &str| {
            cell.safe_get(name).and_then(|v| v.as_f64()).unwrap_or(0.0)
        };
        info!(
            x = field(sim, "x"),
            pitch = field(sim, "pitch"),
            control = field(pid, "control_output"),
            sim_ticks = sim.tick_count(),
            "pose"
        );
    }

    running.stop_all();
    info!("demo shut down");
    Ok(())
}
