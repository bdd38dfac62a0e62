//! Parameter sweeps over the field configuration.
//!
//! Each swept point gets a fresh, validated [`FieldConfiguration`] derived
//! from the base one, passed explicitly into the experiment. The simulator's
//! own configuration is never mutated, so nothing needs restoring whether the
//! sweep succeeds or fails.

use crate::experiment::{BellExperimentSimulator, ExperimentConfig};
use eqfe_core::{FieldParameter, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Outcome at a single swept value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanPoint {
    pub value: f64,
    pub mean_chsh: f64,
    pub std_chsh: f64,
    /// S_mean / S_ideal
    pub amplification_ratio: f64,
    /// Fraction of observations above the classical bound
    pub violation_fraction: f64,
}

/// Curve collected by [`ParameterScanner::scan`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub parameter: FieldParameter,
    pub points: Vec<ScanPoint>,
}

impl ScanResult {
    pub fn parameter_values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn mean_chsh(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.mean_chsh).collect()
    }

    pub fn std_chsh(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.std_chsh).collect()
    }

    pub fn amplification_factors(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.amplification_ratio).collect()
    }

    pub fn violation_fractions(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.violation_fraction).collect()
    }
}

/// Sweeps one configuration field while rerunning the experiment.
///
/// Borrows the simulator mutably for its random generator only.
#[derive(Debug)]
pub struct ParameterScanner<'a> {
    simulator: &'a mut BellExperimentSimulator,
    run: ExperimentConfig,
}

impl<'a> ParameterScanner<'a> {
    /// Creates a scanner using default noise (0.01) and measurement time (1 s).
    pub fn new(simulator: &'a mut BellExperimentSimulator) -> Self {
        Self {
            simulator,
            run: ExperimentConfig::default(),
        }
    }

    /// Sets the measurement noise used at every point.
    pub fn with_noise(mut self, measurement_noise: f64) -> Self {
        self.run.measurement_noise = measurement_noise;
        self
    }

    /// Sets the measurement time used at every point.
    pub fn with_measurement_time(mut self, measurement_time: f64) -> Self {
        self.run.measurement_time = measurement_time;
        self
    }

    /// Sweeps `parameter` over `values` with `n_trials` per point.
    pub fn scan(
        &mut self,
        parameter: FieldParameter,
        values: &[f64],
        n_trials: usize,
    ) -> Result<ScanResult> {
        let base = *self.simulator.field().config();
        let run = ExperimentConfig {
            n_trials,
            ..self.run
        };
        run.validate()?;

        let mut points = Vec::with_capacity(values.len());
        for &value in values {
            let config = base.with_parameter(parameter, value)?;
            let field = self.simulator.field().with_configuration(config)?;
            let result = self.simulator.simulate_with(&field, &run, None)?;

            info!(
                "Scan {}={:e}: S_mean={:.6} violation_fraction={:.4}",
                parameter,
                value,
                result.s_mean(),
                result.violation_fraction()
            );

            points.push(ScanPoint {
                value,
                mean_chsh: result.s_mean(),
                std_chsh: result.s_std(),
                amplification_ratio: result.s_mean() / result.s_ideal,
                violation_fraction: result.violation_fraction(),
            });
        }

        Ok(ScanResult { parameter, points })
    }

    /// Like [`Self::scan`], with the parameter given by name.
    pub fn scan_named(
        &mut self,
        parameter_name: &str,
        values: &[f64],
        n_trials: usize,
    ) -> Result<ScanResult> {
        self.scan(parameter_name.parse()?, values, n_trials)
    }
}
