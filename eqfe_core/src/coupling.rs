//! Classical electromagnetic coupling between an oscillatory source and the
//! quantum system.
//!
//! The source is modelled as an oscillating electric dipole observed in the
//! near field (r ≪ c/ω). The resulting field acts on an atomic-scale
//! transition dipole, and the interaction energy in units of the elementary
//! charge is the dimensionless coupling.

use crate::constants::PhysicalConstants;
use crate::error::{ensure_all_finite, EqfeError, Result};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Near-field dipole coupling model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EMCouplingModel {
    /// Source dipole moment (A·m)
    pub dipole_moment: f64,

    /// Characteristic oscillation frequency (Hz)
    pub frequency: f64,

    /// Source to quantum system distance (m)
    pub distance: f64,

    /// Sampling rate of input series (Hz)
    pub sampling_rate: f64,

    /// Transition dipole of the quantum system (C·m)
    pub quantum_dipole: f64,

    #[serde(skip, default)]
    constants: PhysicalConstants,
}

impl Default for EMCouplingModel {
    fn default() -> Self {
        Self {
            dipole_moment: 1e-12,
            frequency: 40.0,
            distance: 0.1,
            sampling_rate: 1000.0,
            quantum_dipole: 1e-29,
            constants: PhysicalConstants::CODATA_2018,
        }
    }
}

impl EMCouplingModel {
    /// Creates a model with the given source parameters.
    pub fn new(dipole_moment: f64, frequency: f64, distance: f64) -> Result<Self> {
        let model = Self {
            dipole_moment,
            frequency,
            distance,
            ..Self::default()
        };
        model.validate()?;
        Ok(model)
    }

    /// Sets the transition dipole of the quantum system (C·m).
    pub fn with_quantum_dipole(mut self, quantum_dipole: f64) -> Result<Self> {
        self.quantum_dipole = quantum_dipole;
        self.validate()?;
        Ok(self)
    }

    /// Replaces the constants registry.
    pub fn with_constants(mut self, constants: PhysicalConstants) -> Self {
        self.constants = constants;
        self
    }

    fn validate(&self) -> Result<()> {
        if !(self.distance > 0.0 && self.distance.is_finite()) {
            return Err(EqfeError::config("Dipole distance must be positive"));
        }
        if !(self.frequency >= 0.0 && self.frequency.is_finite()) {
            return Err(EqfeError::config("Oscillation frequency must be non-negative"));
        }
        if !(self.sampling_rate > 0.0 && self.sampling_rate.is_finite()) {
            return Err(EqfeError::config("Sampling rate must be positive"));
        }
        if !self.dipole_moment.is_finite() || !self.quantum_dipole.is_finite() {
            return Err(EqfeError::config("Dipole moments must be finite"));
        }
        Ok(())
    }

    /// Angular frequency ω = 2πf.
    pub fn angular_frequency(&self) -> f64 {
        2.0 * PI * self.frequency
    }

    /// Near-field amplitude μ₀·ω²·p / (4π·r).
    pub fn field_amplitude(&self) -> f64 {
        let omega = self.angular_frequency();
        self.constants.mu_0 * omega * omega * self.dipole_moment / (4.0 * PI * self.distance)
    }

    /// Electromagnetic field at each time for the given signal.
    ///
    /// Without a signal, a pure oscillation `sin(ωt)` at the model frequency
    /// is used.
    pub fn neural_electromagnetic_field(
        &self,
        time: &[f64],
        signal: Option<&[f64]>,
    ) -> Result<Vec<f64>> {
        let amplitude = self.field_amplitude();
        let field: Vec<f64> = match signal {
            Some(signal) => {
                if signal.len() != time.len() {
                    return Err(EqfeError::config(format!(
                        "Signal length {} does not match time length {}",
                        signal.len(),
                        time.len()
                    )));
                }
                signal.iter().map(|s| amplitude * s).collect()
            }
            None => {
                let omega = self.angular_frequency();
                time.iter().map(|t| amplitude * (omega * t).sin()).collect()
            }
        };
        ensure_all_finite("electromagnetic field", &field)?;
        Ok(field)
    }

    /// Dimensionless coupling for a time-ordered signal sampled at
    /// `sampling_rate`.
    pub fn coupling(&self, series: &[f64]) -> Result<Vec<f64>> {
        ensure_all_finite("coupling series", series)?;
        let time: Vec<f64> = (0..series.len())
            .map(|i| i as f64 / self.sampling_rate)
            .collect();
        let field = self.neural_electromagnetic_field(&time, Some(series))?;
        Ok(field
            .iter()
            .map(|e| self.quantum_dipole * e / self.constants.e)
            .collect())
    }
}

/// Resamples `series` to `n` points by linear interpolation over a
/// normalized [0, 1] index.
pub fn resample_linear(series: &[f64], n: usize) -> Result<Vec<f64>> {
    match series.len() {
        0 => Err(EqfeError::config("Cannot resample an empty series")),
        len if len == n => Ok(series.to_vec()),
        1 => Ok(vec![series[0]; n]),
        len => {
            let last = (len - 1) as f64;
            Ok((0..n)
                .map(|i| {
                    let x = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
                    let pos = x * last;
                    let lo = (pos.floor() as usize).min(len - 2);
                    let frac = pos - lo as f64;
                    series[lo] + frac * (series[lo + 1] - series[lo])
                })
                .collect())
        }
    }
}
