use thiserror::Error;

/// Engine configuration defects. Per-session input problems (missing
/// signals, malformed rules, unevaluable conditions) are never errors;
/// they degrade to "no match" and are logged by the caller.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A defect in the fixed engine configuration (duplicate detector
    /// names, empty registry). Fatal at construction, never per session.
    #[error("invariant violation: {0}")]
    InvariantViolation(String),
}
