use crate::model::TimeInterval;

/// Failures a booking attempt can hit. "No slot available" is deliberately
/// not here: it is a legitimate outcome, not an error. Route-feasibility
/// failures never surface either; they degrade to an unconstrained filter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// Calendar store unreachable. Fatal for the attempt; the caller may retry.
    Lookup(String),
    /// The chosen slot was taken between selection and persist. Retryable:
    /// the caller should re-run the whole attempt, availability has changed.
    PersistConflict(TimeInterval),
    /// Non-retryable backend failure while creating the appointment.
    Persist(String),
}

impl EngineError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Lookup(_) | EngineError::PersistConflict(_))
    }

    /// Short label for metrics and wire responses.
    pub fn label(&self) -> &'static str {
        match self {
            EngineError::Lookup(_) => "lookup",
            EngineError::PersistConflict(_) => "persist_conflict",
            EngineError::Persist(_) => "persist",
        }
    }
}

impl std::fmt::Display for EngineError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EngineError::Lookup(msg) => write!(f, "calendar lookup failed: {msg}"),
            EngineError::PersistConflict(slot) => {
                write!(
                    f,
                    "slot [{}, {}) was taken concurrently",
                    slot.start, slot.end
                )
            }
            EngineError::Persist(msg) => write!(f, "failed to persist appointment: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {}
