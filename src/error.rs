//! Engine error taxonomy.

use thiserror::Error;

use crate::geo::GeocodeError;
use crate::store::StoreError;

/// Errors surfaced by engine operations.
///
/// The calling layer owns the transaction and maps these kinds to responses.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Malformed or missing input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// A status precondition does not hold.
    #[error("invalid state: {0}")]
    InvalidState(String),

    /// The caller's status does not grant the capability.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// A multi-step update could not complete; the enclosing transaction must roll back.
    #[error("consistency error during {stage}: {source}")]
    Consistency {
        stage: &'static str,
        #[source]
        source: StoreError,
    },

    #[error("not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Geocoding(#[from] GeocodeError),
}

impl EngineError {
    /// Wrap a store failure that interrupted `stage`.
    pub fn consistency(stage: &'static str) -> impl FnOnce(StoreError) -> EngineError {
        move |source| EngineError::Consistency { stage, source }
    }

    /// Stable label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::InvalidInput(_) => "invalid_input",
            EngineError::InvalidState(_) => "invalid_state",
            EngineError::Unauthorized(_) => "unauthorized",
            EngineError::Consistency { .. } => "consistency",
            EngineError::NotFound(_) => "not_found",
            EngineError::Store(_) => "store",
            EngineError::Geocoding(_) => "geocoding",
        }
    }
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = EngineError::consistency("reconcile:final")(StoreError::Backend("down".into()));
        assert_eq!(
            err.to_string(),
            "consistency error during reconcile:final: backend error: down"
        );
        assert_eq!(err.kind(), "consistency");

        let err: EngineError = StoreError::NotFound("via".into()).into();
        assert_eq!(err.kind(), "store");
    }
}
