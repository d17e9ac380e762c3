// ============================================================================
// spark-reactive - Errors
// Failures surfaced by the public API
// ============================================================================

use thiserror::Error;

/// Result alias for fallible reactive operations.
pub type Result<T> = std::result::Result<T, ReactiveError>;

/// Errors reported by observables, computeds and holders.
///
/// A failing compute function is not represented here: compute functions are
/// infallible closures, and a panic inside one unwinds to whoever triggered
/// the evaluation with the computed's previous value left in place.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReactiveError {
    /// The entity was disposed before the call.
    #[error("{entity} used after it was disposed")]
    Disposed { entity: &'static str },

    /// `set` was called on a computed that has no write-back function.
    #[error("computed is read-only: it was created without a write-back function")]
    ReadOnly,

    /// A computed was re-triggered while its own compute function was running.
    #[error(
        "computed re-triggered during its own evaluation; \
         compute functions must not write to values they read"
    )]
    CyclicEvaluation,
}

impl ReactiveError {
    pub fn disposed(entity: &'static str) -> Self {
        Self::Disposed { entity }
    }
}
