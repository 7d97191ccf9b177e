//! Configuration document model.
//!
//! A config is a single top-level object with a `workloads` list. Each entry
//! names a registered type, a unique instance name, and an `args` block:
//! the scheduling keys (`tick_rate_hz`, `tick_parent_name`,
//! `data_bindings`) are consumed by the runtime; every other key is handed
//! to the workload's `apply_config`.
//!
//! ```yaml
//! workloads:
//!   - type: pid_controller
//!     name: pitch_pid
//!     args:
//!       tick_rate_hz: 100
//!       kp: 1.0
//!       data_bindings:
//!         - "control_output -> mixer.balance_input"
//! ```
//!
//! YAML and JSON both carry the shape; [`load_file`] picks the parser by
//! file extension.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use cadence_state::Value;

use crate::error::ComposeError;

/// Top-level configuration document.
#[derive(Debug, Default, Deserialize)]
pub struct ComposeConfig {
    /// The workload entries, in declaration order.
    #[serde(default)]
    pub workloads: Vec<WorkloadEntry>,
}

/// One workload declaration.
#[derive(Debug, Deserialize)]
pub struct WorkloadEntry {
    /// Canonical registry type name.
    #[serde(rename = "type")]
    pub type_name: String,
    /// Unique instance name; omitted for anonymous instances.
    #[serde(default)]
    pub name: Option<String>,
    /// Instance arguments.
    #[serde(default)]
    pub args: WorkloadArgs,
}

/// The `args` block of a workload entry.
#[derive(Debug, Default, Deserialize)]
pub struct WorkloadArgs {
    /// Tick rate override; the class default applies when omitted.
    #[serde(default)]
    pub tick_rate_hz: Option<f64>,
    /// Parent to attach to at start.
    #[serde(default)]
    pub tick_parent_name: Option<String>,
    /// Raw binding directives, resolved during setup.
    #[serde(default)]
    pub data_bindings: Vec<String>,
    /// Everything else, handed to the workload's `apply_config`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

/// Parse a YAML configuration document.
///
/// # Errors
///
/// Returns [`ComposeError::Yaml`] for malformed documents.
pub fn from_yaml_str(input: &str) -> Result<ComposeConfig, ComposeError> {
    Ok(serde_yaml::from_str(input)?)
}

/// Parse a JSON configuration document.
///
/// # Errors
///
/// Returns [`ComposeError::Json`] for malformed documents.
pub fn from_json_str(input: &str) -> Result<ComposeConfig, ComposeError> {
    Ok(serde_json::from_str(input)?)
}

/// Read and parse a configuration file, choosing the parser by extension
/// (`.json` → JSON; anything else, including `.yaml`/`.yml`, → YAML).
///
/// # Errors
///
/// Returns [`ComposeError::Io`] if the file cannot be read, or the parser's
/// error for malformed documents.
pub fn load_file(path: &Path) -> Result<ComposeConfig, ComposeError> {
    let text = std::fs::read_to_string(path).map_err(|source| ComposeError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => from_json_str(&text),
        _ => from_yaml_str(&text),
    }
}
