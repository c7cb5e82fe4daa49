//! Crate-level error type.
//!
//! The engine distinguishes the failure kinds described in the design: a
//! precondition violation (`policy` called before `explore!`), an oracle
//! failure propagated from the evaluator, and a worker task failure (which
//! also carries panics from game/oracle code, since the reference `Game`
//! contract treats board operations as infallible).

use std::fmt;
use std::sync::Arc;

/// Opaque error returned by an [`Oracle`](crate::oracle::Oracle) evaluation.
pub type OracleError = Arc<dyn std::error::Error + Send + Sync + 'static>;

/// Errors surfaced by the search engine.
#[derive(Debug, Clone)]
pub enum EngineError {
    /// `policy` was called on a state whose root has not been explored yet.
    ExploreFirst,
    /// The oracle returned an error while serving a request; no local retry
    /// is attempted and the search that triggered it is abandoned.
    Oracle(OracleError),
    /// A worker task ended unexpectedly (panicked, or the runtime dropped
    /// it) before finishing its share of the simulations.
    Worker(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::ExploreFirst => {
                write!(f, "policy() called before explore!() populated the root")
            }
            EngineError::Oracle(e) => write!(f, "oracle evaluation failed: {}", e),
            EngineError::Worker(msg) => write!(f, "worker task failed: {}", msg),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Oracle(e) => Some(e.as_ref()),
            _ => None,
        }
    }
}

/// Convenience alias for fallible engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;
