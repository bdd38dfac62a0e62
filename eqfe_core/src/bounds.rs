//! Quantum bound validation for CHSH values.
//!
//! Stateless checks against the classical (2) and Tsirelson (2√2) bounds.
//! Scalars are validated through `std::slice::from_ref`.

use crate::constants::{CLASSICAL_BOUND, PHYSICS_TOLERANCE, TSIRELSON_BOUND};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Key in [`ValidationResult::bounds_checked`] for the Tsirelson bound.
pub const TSIRELSON_KEY: &str = "tsirelson";

/// Key in [`ValidationResult::bounds_checked`] for classical-bound violation.
pub const QUANTUM_ADVANTAGE_KEY: &str = "quantum_advantage";

/// A value exceeding the Tsirelson bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundViolation {
    /// Position in the checked array
    pub index: usize,

    /// Offending value
    pub value: f64,

    /// Amount above 2√2 (NaN for non-finite input)
    pub excess: f64,
}

/// Outcome of [`BoundsValidator::validate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ValidationResult {
    /// True when no value violates the Tsirelson bound
    pub is_valid: bool,

    /// Every value above 2√2 + tolerance (or not comparable)
    pub violations: Vec<BoundViolation>,

    /// Named bound → satisfied. `tsirelson` is true when respected;
    /// `quantum_advantage` is true when the classical bound is exceeded.
    pub bounds_checked: BTreeMap<String, bool>,
}

impl ValidationResult {
    /// Looks up a named check, defaulting to `default` when absent.
    pub fn bound(&self, name: &str, default: bool) -> bool {
        self.bounds_checked.get(name).copied().unwrap_or(default)
    }
}

/// Stateless validator for CHSH parameters.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundsValidator;

impl BoundsValidator {
    /// True iff every element is ≤ 2√2 + 1e-10.
    pub fn check_tsirelson_bound(values: &[f64]) -> bool {
        values.iter().all(|&s| s <= TSIRELSON_BOUND + PHYSICS_TOLERANCE)
    }

    /// True iff at least one element exceeds the classical bound of 2.
    ///
    /// A true result signals quantum-regime behavior.
    pub fn check_bell_inequality(values: &[f64]) -> bool {
        values.iter().any(|&s| s > CLASSICAL_BOUND)
    }

    /// Runs both checks and lists every Tsirelson violation.
    pub fn validate(values: &[f64]) -> ValidationResult {
        let violations: Vec<BoundViolation> = values
            .iter()
            .enumerate()
            .filter(|(_, &s)| !(s <= TSIRELSON_BOUND + PHYSICS_TOLERANCE))
            .map(|(index, &value)| BoundViolation {
                index,
                value,
                excess: value - TSIRELSON_BOUND,
            })
            .collect();

        let tsirelson = Self::check_tsirelson_bound(values);
        let mut bounds_checked = BTreeMap::new();
        bounds_checked.insert(TSIRELSON_KEY.to_string(), tsirelson);
        bounds_checked.insert(
            QUANTUM_ADVANTAGE_KEY.to_string(),
            Self::check_bell_inequality(values),
        );

        ValidationResult {
            is_valid: violations.is_empty(),
            violations,
            bounds_checked,
        }
    }
}
