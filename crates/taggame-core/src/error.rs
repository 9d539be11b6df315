use thiserror::Error;

use crate::lifecycle::EngineState;

/// Errors surfaced by the tag engine.
///
/// `InvalidState` and `InvalidInput` are raised before any mutation, so the
/// engine is unchanged when they are returned. `InvariantViolation` is fatal:
/// the engine has already moved to [`EngineState::Terminated`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    #[error("cannot {operation} while engine is {state}")]
    InvalidState {
        operation: &'static str,
        state: EngineState,
    },
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
}

impl EngineError {
    /// Whether this error ends the engine's life.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::InvariantViolation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_invariant_violation_is_fatal() {
        assert!(EngineError::InvariantViolation("speed".into()).is_fatal());
        assert!(!EngineError::InvalidInput("dt".into()).is_fatal());
        assert!(
            !EngineError::InvalidState {
                operation: "step",
                state: EngineState::Uninitialized,
            }
            .is_fatal()
        );
    }

    #[test]
    fn display_names_operation_and_state() {
        let err = EngineError::InvalidState {
            operation: "step",
            state: EngineState::Terminated,
        };
        assert_eq!(err.to_string(), "cannot step while engine is terminated");
    }
}
