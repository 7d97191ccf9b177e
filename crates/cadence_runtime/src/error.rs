//! Runtime error types.
//!
//! Composition errors abort startup; runtime failures inside ticks are
//! contained per workload and reported through logging instead.

use std::path::PathBuf;

/// Errors raised while applying configuration to a single workload.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// The configuration document carried a key the workload does not accept.
    #[error("unknown config key `{0}`")]
    UnknownKey(String),

    /// The key is known but the value has the wrong shape.
    #[error("invalid value for config key `{key}`: expected {expected}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// Human-readable description of the expected shape.
        expected: &'static str,
    },
}

/// Errors that can abort graph composition.
#[derive(Debug, thiserror::Error)]
pub enum ComposeError {
    /// The config names a type not present in the registry.
    #[error("unknown workload type `{0}`")]
    UnknownType(String),

    /// A binding references a workload name not among loaded instances.
    #[error("workload `{workload}`: binding references unknown peer `{peer}`")]
    UnknownPeer {
        /// The workload whose binding failed to resolve.
        workload: String,
        /// The unresolved peer name.
        peer: String,
    },

    /// A declared tick parent could not be found at start.
    #[error("workload `{workload}`: unknown tick parent `{parent}`")]
    UnknownParent {
        /// The workload declaring the parent.
        workload: String,
        /// The unresolved parent name.
        parent: String,
    },

    /// The config carried a key the workload does not accept.
    #[error("workload `{workload}`: unknown config key `{key}`")]
    UnknownConfig {
        /// The workload being configured.
        workload: String,
        /// The rejected key.
        key: String,
    },

    /// A config key carried a value of the wrong shape.
    #[error("workload `{workload}`: invalid value for config key `{key}`: expected {expected}")]
    InvalidConfig {
        /// The workload being configured.
        workload: String,
        /// The offending key.
        key: String,
        /// Expected value shape.
        expected: String,
    },

    /// A `pre_load` or `load` hook failed.
    #[error("workload `{workload}`: load failed: {cause}")]
    LoadFailure {
        /// The failing workload.
        workload: String,
        /// The underlying hook error.
        cause: anyhow::Error,
    },

    /// A `setup` hook failed.
    #[error("workload `{workload}`: setup failed: {cause}")]
    SetupFailure {
        /// The failing workload.
        workload: String,
        /// The underlying hook error.
        cause: anyhow::Error,
    },

    /// The configuration file could not be read.
    #[error("failed to read config `{path}`: {source}")]
    Io {
        /// Path of the file.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration document is not valid YAML.
    #[error("failed to parse YAML config: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// The configuration document is not valid JSON.
    #[error("failed to parse JSON config: {0}")]
    Json(#[from] serde_json::Error),
}
