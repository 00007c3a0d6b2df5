use std::fmt;

/// Errors raised by the traffic core.
///
/// Neither kind is transient: a configuration is either valid or it is not,
/// and an invariant violation points at a defect in the update rule. Callers
/// surface both immediately and never receive a partial run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimError {
    /// Parameters rejected before a run starts (road too short, non-positive
    /// counts, out-of-range probabilities or speeds, warm-up too long).
    InvalidConfiguration(String),
    /// A road state failed its consistency check.
    InvariantViolation(String),
}

impl SimError {
    pub fn invalid_config(msg: impl Into<String>) -> Self {
        SimError::InvalidConfiguration(msg.into())
    }

    pub fn invariant(msg: impl Into<String>) -> Self {
        SimError::InvariantViolation(msg.into())
    }
}

impl fmt::Display for SimError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SimError::InvalidConfiguration(msg) => write!(f, "Invalid configuration: {msg}"),
            SimError::InvariantViolation(msg) => write!(f, "Invariant violation: {msg}"),
        }
    }
}

impl std::error::Error for SimError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_configuration() {
        let err = SimError::invalid_config("vehicle count 12 exceeds road length 10");
        let msg = format!("{err}");
        assert!(msg.contains("Invalid configuration"), "got: {msg}");
        assert!(msg.contains("exceeds road length"), "got: {msg}");
    }

    #[test]
    fn test_display_invariant_violation() {
        let err = SimError::invariant("two vehicles at cell 4");
        let msg = format!("{err}");
        assert!(msg.contains("Invariant violation"), "got: {msg}");
        assert!(msg.contains("cell 4"), "got: {msg}");
    }

    #[test]
    fn test_converts_into_anyhow() {
        let err: anyhow::Error = SimError::invalid_config("bad").into();
        assert!(err.downcast_ref::<SimError>().is_some());
    }
}
