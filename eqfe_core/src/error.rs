//! Error and warning types for the amplification engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that abort an EQFE computation.
#[derive(Debug, Error)]
pub enum EqfeError {
    /// Invalid physical or run parameters (fatal, user-facing)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A component produced NaN or infinity
    #[error("Non-finite value in {context}: {value}")]
    NonFinite {
        context: &'static str,
        value: f64,
    },

    /// Too few observations for a statistical routine
    #[error("Insufficient data: need {needed}, got {got}")]
    InsufficientData { needed: usize, got: usize },

    /// Sample with no spread where a variance is required
    #[error("Degenerate sample: {0}")]
    DegenerateSample(String),

    /// Distribution construction or evaluation failed
    #[error("Statistics error: {0}")]
    Statistics(String),
}

impl EqfeError {
    /// Creates a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Creates a non-finite error for `value` produced in `context`.
    pub fn non_finite(context: &'static str, value: f64) -> Self {
        Self::NonFinite { context, value }
    }
}

/// Result alias used across the EQFE crates.
pub type Result<T> = std::result::Result<T, EqfeError>;

/// Fails fast if `value` is NaN or infinite.
pub fn ensure_finite(context: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(EqfeError::non_finite(context, value))
    }
}

/// Fails fast on the first non-finite element of `values`.
pub fn ensure_all_finite(context: &'static str, values: &[f64]) -> Result<()> {
    match values.iter().find(|v| !v.is_finite()) {
        Some(&bad) => Err(EqfeError::non_finite(context, bad)),
        None => Ok(()),
    }
}

/// Advisory physics events. Logged when they occur and accumulated in
/// result structures; never raised.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PhysicsWarning {
    /// Coupling above the perturbative regime threshold
    PerturbativeCoupling { coupling: f64 },

    /// Amplified values clipped back to the Tsirelson bound
    TsirelsonClipped { count: usize, max_unclipped: f64 },

    /// Noisy observations above the Tsirelson bound (expected, not corrected)
    PostNoiseExcess { count: usize, max: f64 },
}

impl std::fmt::Display for PhysicsWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PhysicsWarning::PerturbativeCoupling { coupling } => {
                write!(f, "coupling {coupling} may violate the perturbative approximation")
            }
            PhysicsWarning::TsirelsonClipped { count, max_unclipped } => write!(
                f,
                "Tsirelson bound clipping on {count} value(s), max unclipped {max_unclipped:.6}"
            ),
            PhysicsWarning::PostNoiseExcess { count, max } => write!(
                f,
                "{count} noisy observation(s) exceed the Tsirelson bound, max {max:.6}"
            ),
        }
    }
}
