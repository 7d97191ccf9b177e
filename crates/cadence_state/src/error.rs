//! State-layer error types.

/// Errors that can occur when accessing or declaring workload fields.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StateError {
    /// A write targeted a field that is declared in neither map.
    #[error("unknown field `{0}`")]
    UnknownField(String),

    /// A declaration reused a name already present in either map.
    #[error("field `{0}` is already declared")]
    DuplicateField(String),
}
