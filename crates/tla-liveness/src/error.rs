//! Error types for liveness checking
//!
//! Three families, kept apart so reports can tell a broken model from a
//! broken checker:
//! - [`EvalError`]: the model evaluator failed (successors, predicates).
//! - [`LivenessError`]: the property was rejected, or an internal invariant of
//!   the engine did not hold.
//! - [`ConfigError`](crate::config::ConfigError): configuration parsing.

use crate::fingerprint::Fingerprint;
use crate::model::PredicateId;
use thiserror::Error;

/// Result type for liveness operations
pub type LivenessResult<T> = Result<T, LivenessError>;

/// Result type for model evaluator calls
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors raised by a [`ModelEvaluator`](crate::model::ModelEvaluator).
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EvalError {
    /// Computing initial states failed
    #[error("failed to compute initial states: {message}")]
    InitialStates { message: String },

    /// Computing the successors of a state failed
    #[error("failed to compute successors of state {state}: {message}")]
    Successors { state: Fingerprint, message: String },

    /// Evaluating an atomic predicate failed
    #[error("failed to evaluate predicate {predicate} on state {state}: {message}")]
    Predicate {
        predicate: PredicateId,
        state: Fingerprint,
        message: String,
    },

    /// The evaluator does not know the predicate
    #[error("unknown predicate {0}")]
    UnknownPredicate(PredicateId),

    /// Evaluation exceeded its time budget
    #[error("evaluation timed out: {0}")]
    Timeout(String),

    /// Any other evaluator failure
    #[error("{0}")]
    Other(String),
}

impl EvalError {
    pub fn successors(state: Fingerprint, message: impl Into<String>) -> Self {
        EvalError::Successors {
            state,
            message: message.into(),
        }
    }

    pub fn predicate(predicate: PredicateId, state: Fingerprint, message: impl Into<String>) -> Self {
        EvalError::Predicate {
            predicate,
            state,
            message: message.into(),
        }
    }
}

/// Errors that end a property check without a verdict.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum LivenessError {
    /// The property is not a liveness formula this engine accepts
    #[error("malformed liveness property: {reason}")]
    MalformedProperty { reason: String },

    /// A violating SCC could not be turned into a lasso.
    ///
    /// This is a checker bug, never a property violation.
    #[error("internal error: violating SCC of {scc_size} node(s) is unusable: {detail}")]
    UnreachableScc { scc_size: usize, detail: String },

    /// The model evaluator failed while guards were evaluated
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),
}

impl LivenessError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        LivenessError::MalformedProperty {
            reason: reason.into(),
        }
    }

    pub fn unreachable_scc(scc_size: usize, detail: impl Into<String>) -> Self {
        LivenessError::UnreachableScc {
            scc_size,
            detail: detail.into(),
        }
    }

    /// True for errors that indicate a bug in the checker rather than in the
    /// model or the property.
    pub fn is_internal(&self) -> bool {
        matches!(self, LivenessError::UnreachableScc { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = LivenessError::malformed("no eventuality");
        assert_eq!(
            err.to_string(),
            "malformed liveness property: no eventuality"
        );

        let err = EvalError::successors(Fingerprint(0xab), "boom");
        assert_eq!(
            err.to_string(),
            "failed to compute successors of state 00000000000000ab: boom"
        );
    }

    #[test]
    fn test_internal_classification() {
        assert!(LivenessError::unreachable_scc(3, "no root").is_internal());
        assert!(!LivenessError::malformed("x").is_internal());
        let eval: LivenessError = EvalError::Other("x".into()).into();
        assert!(!eval.is_internal());
    }
}
