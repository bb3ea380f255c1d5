//! Engine errors.

use serde::Serialize;
use thiserror::Error;

/// Engine result type.
pub type Result<T> = std::result::Result<T, Error>;

/// Engine errors. Every variant carries enough context (stage index, step
/// index, elapsed time) for a caller to report a precise failure location.
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
pub enum Error {
    /// Malformed geometry or scenario structure, detected before any state
    /// exists. Always fatal; nothing is partially applied.
    #[error("invalid geometry: {reason}")]
    Validation {
        /// What was malformed, with the offending index where applicable.
        reason: String,
    },

    /// A stage whose own parameters make it unrunnable (non-positive
    /// timestep, unreachable target). Detected at stage entry before any
    /// state mutation for that stage.
    #[error("stage {stage} rejected: {reason}")]
    Configuration {
        /// Zero-based index of the rejected stage.
        stage: usize,
        /// Why the stage is unrunnable.
        reason: String,
    },

    /// The iterative per-step solve failed to reduce its residual within the
    /// bounded attempt count.
    #[error("solver diverged at stage {stage}, step {step} (t = {t_days:.4} d): residual {residual:.3e}")]
    Divergence {
        /// Zero-based index of the stage being integrated.
        stage: usize,
        /// Step index within the run at which divergence was declared.
        step: u64,
        /// Elapsed simulation time in days.
        t_days: f64,
        /// Final residual of the failed solve.
        residual: f64,
    },
}
