//! CHSH Bell test experiment driver.
//!
//! One simulated experiment runs the full pipeline:
//!
//! ```text
//! field samples → amplification (clipped) → EM perturbation (optional)
//!              → measurement noise (unclipped) → validation → statistics
//! ```
//!
//! The amplification step never exceeds 2√2, while the final noisy
//! observations may. Excess observations are counted and warned about,
//! never corrected.

use crate::statistics::{moments, Moments};
use eqfe_core::{
    ensure_all_finite, resample_linear, BoundsValidator, EMCouplingModel, EqfeError,
    FieldConfiguration, FieldSimulator, PhysicsWarning, Result, SimulationParameters,
    ValidationResult, CLASSICAL_BOUND, QUANTUM_ADVANTAGE_KEY, TSIRELSON_BOUND, TSIRELSON_KEY,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Maximum relative deviation the EM coupling may introduce.
pub const EM_COUPLING_CAP: f64 = 0.01;

/// Per-run experiment parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Number of measurement trials
    pub n_trials: usize,

    /// Standard deviation of Gaussian measurement noise (dimensionless)
    pub measurement_noise: f64,

    /// Total measurement time in seconds
    pub measurement_time: f64,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            n_trials: 10_000,
            measurement_noise: 0.01,
            measurement_time: 1.0,
        }
    }
}

impl ExperimentConfig {
    /// Creates a config with the given trial count and default noise/time.
    pub fn with_trials(n_trials: usize) -> Self {
        Self {
            n_trials,
            ..Default::default()
        }
    }

    /// Checks the run parameters.
    pub fn validate(&self) -> Result<()> {
        if self.n_trials == 0 {
            return Err(EqfeError::config("Number of trials must be positive"));
        }
        if !(self.measurement_noise >= 0.0 && self.measurement_noise.is_finite()) {
            return Err(EqfeError::config(format!(
                "Measurement noise must be finite and non-negative, got {}",
                self.measurement_noise
            )));
        }
        if !(self.measurement_time > 0.0 && self.measurement_time.is_finite()) {
            return Err(EqfeError::config(format!(
                "Measurement time must be positive, got {}",
                self.measurement_time
            )));
        }
        Ok(())
    }
}

/// Summary statistics over the final observation array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementStatistics {
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Standard error of the mean (n − 1 estimator, 0 for a single trial)
    pub sem: f64,
    pub min: f64,
    pub max: f64,
    /// Observations above the classical bound 2
    pub classical_violations: usize,
    /// Observations above the Tsirelson bound 2√2
    pub tsirelson_violations: usize,
}

impl MeasurementStatistics {
    /// Computes summary statistics. `values` must be non-empty and finite.
    pub fn from_values(values: &[f64]) -> Self {
        let Moments { mean, std, sem } = moments(values);

        Self {
            mean,
            std,
            sem,
            min: values.iter().cloned().fold(f64::INFINITY, f64::min),
            max: values.iter().cloned().fold(f64::NEG_INFINITY, f64::max),
            classical_violations: values.iter().filter(|&&s| s > CLASSICAL_BOUND).count(),
            tsirelson_violations: values.iter().filter(|&&s| s > TSIRELSON_BOUND).count(),
        }
    }
}

/// Complete output of one simulated experiment.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentResult {
    /// Final noisy CHSH observations
    pub chsh_values: Vec<f64>,

    /// Ideal quantum value (2√2)
    pub s_ideal: f64,

    /// Per-trial amplification after clipping (amplified / ideal)
    pub amplification: Vec<f64>,

    /// Environmental field samples, one per trial
    pub env_field: Vec<f64>,

    /// Amplified correlations before EM coupling and noise
    pub s_env_modified: Vec<f64>,

    /// EM-perturbed correlations, when coupling was applied
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s_em_modified: Option<Vec<f64>>,

    pub statistics: MeasurementStatistics,

    /// At least one observation above the classical bound
    pub classical_violation: bool,

    /// Every observation within the Tsirelson bound (plus tolerance)
    pub tsirelson_respected: bool,

    pub validation: ValidationResult,

    pub run: ExperimentConfig,

    /// Configuration the experiment ran with
    pub configuration: FieldConfiguration,

    pub simulation_parameters: SimulationParameters,

    /// Advisory physics events raised during the run
    pub warnings: Vec<PhysicsWarning>,
}

impl ExperimentResult {
    pub fn s_mean(&self) -> f64 {
        self.statistics.mean
    }

    pub fn s_std(&self) -> f64 {
        self.statistics.std
    }

    pub fn s_sem(&self) -> f64 {
        self.statistics.sem
    }

    pub fn n_trials(&self) -> usize {
        self.chsh_values.len()
    }

    /// Fraction of observations above the classical bound.
    pub fn violation_fraction(&self) -> f64 {
        self.statistics.classical_violations as f64 / self.chsh_values.len() as f64
    }
}

/// Simulates CHSH Bell tests under environmental field effects.
///
/// Each instance owns its own seeded ChaCha8 generator, so two simulators are
/// statistically independent whenever their seeds differ.
#[derive(Debug, Clone)]
pub struct BellExperimentSimulator {
    field: FieldSimulator,
    coupling: Option<EMCouplingModel>,
    rng: ChaCha8Rng,
    seed: u64,
}

impl BellExperimentSimulator {
    /// Creates a simulator. `coupling` is the optional EM collaborator.
    pub fn new(field: FieldSimulator, coupling: Option<EMCouplingModel>, seed: u64) -> Self {
        Self {
            field,
            coupling,
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }

    /// Builds the field simulator from a configuration, propagating its
    /// validation errors.
    pub fn from_config(config: FieldConfiguration, seed: u64) -> Result<Self> {
        Ok(Self::new(FieldSimulator::new(config)?, None, seed))
    }

    pub fn field(&self) -> &FieldSimulator {
        &self.field
    }

    pub fn coupling(&self) -> Option<&EMCouplingModel> {
        self.coupling.as_ref()
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Ideal quantum mechanical CHSH parameter (the Tsirelson bound).
    pub fn ideal_quantum_correlation(&self) -> f64 {
        TSIRELSON_BOUND
    }

    /// Runs one experiment with this simulator's field configuration.
    pub fn simulate(
        &mut self,
        run: &ExperimentConfig,
        external: Option<&[f64]>,
    ) -> Result<ExperimentResult> {
        run_experiment(&self.field, self.coupling.as_ref(), &mut self.rng, run, external)
    }

    /// Runs one experiment against an explicitly supplied field simulator,
    /// leaving this simulator's own configuration untouched. Randomness is
    /// still drawn from this instance's generator.
    pub fn simulate_with(
        &mut self,
        field: &FieldSimulator,
        run: &ExperimentConfig,
        external: Option<&[f64]>,
    ) -> Result<ExperimentResult> {
        run_experiment(field, self.coupling.as_ref(), &mut self.rng, run, external)
    }
}

fn run_experiment(
    field: &FieldSimulator,
    coupling: Option<&EMCouplingModel>,
    rng: &mut ChaCha8Rng,
    run: &ExperimentConfig,
    external: Option<&[f64]>,
) -> Result<ExperimentResult> {
    run.validate()?;
    let n = run.n_trials;
    let config = *field.config();
    let mut warnings = Vec::new();

    info!(
        "Bell experiment: n_trials={} noise={} t={} g={} m={} T={}",
        n,
        run.measurement_noise,
        run.measurement_time,
        config.coupling_strength(),
        config.field_mass(),
        config.temperature()
    );

    if !config.is_perturbative() {
        warnings.push(PhysicsWarning::PerturbativeCoupling {
            coupling: config.coupling_strength(),
        });
    }

    // 1. One field sample per trial
    let env_field = field.thermal_field_fluctuations(n, rng)?;

    // 2–3. Amplification law on the ideal value, clipped per trial
    let s_ideal = TSIRELSON_BOUND;
    let amplified =
        field.modify_correlations_for_samples(s_ideal, &env_field, run.measurement_time)?;
    if amplified.clipped > 0 {
        warnings.push(PhysicsWarning::TsirelsonClipped {
            count: amplified.clipped,
            max_unclipped: amplified.max_unclipped,
        });
    }
    let s_env_modified = amplified.values;
    let amplification: Vec<f64> = s_env_modified.iter().map(|s| s / s_ideal).collect();

    // 4. Optional EM perturbation, capped at 1%
    let s_em_modified = match (coupling, external) {
        (Some(model), Some(series)) => Some(apply_em_coupling(model, &s_env_modified, series)?),
        _ => None,
    };
    let pre_noise = s_em_modified.as_deref().unwrap_or(&s_env_modified[..]);

    // 5. Measurement noise; no clipping past this point
    let noise = Normal::new(0.0, run.measurement_noise)
        .map_err(|e| EqfeError::Statistics(format!("noise distribution: {}", e)))?;
    let chsh_values: Vec<f64> = pre_noise.iter().map(|s| s + noise.sample(rng)).collect();
    ensure_all_finite("CHSH observations", &chsh_values)?;

    // 6. Validation is reported, not enforced
    let validation = BoundsValidator::validate(&chsh_values);
    let tsirelson_respected = validation.bound(TSIRELSON_KEY, true);
    let classical_violation = validation.bound(QUANTUM_ADVANTAGE_KEY, false);

    // 7. Summary
    let statistics = MeasurementStatistics::from_values(&chsh_values);

    if !tsirelson_respected {
        warn!(
            "Simulation produced {} value(s) exceeding Tsirelson bound (max {:.6})",
            validation.violations.len(),
            statistics.max
        );
        warnings.push(PhysicsWarning::PostNoiseExcess {
            count: validation.violations.len(),
            max: statistics.max,
        });
    }

    debug!(
        "S_mean={:.6} S_std={:.6} classical_violations={} tsirelson_violations={}",
        statistics.mean,
        statistics.std,
        statistics.classical_violations,
        statistics.tsirelson_violations
    );

    Ok(ExperimentResult {
        chsh_values,
        s_ideal,
        amplification,
        env_field,
        s_env_modified,
        s_em_modified,
        statistics,
        classical_violation,
        tsirelson_respected,
        validation,
        run: *run,
        configuration: config,
        simulation_parameters: field.simulation_parameters(),
        warnings,
    })
}

/// Multiplies each correlation by `1 + 0.01·coupling`, after resampling the
/// external series to the trial count. The coupling itself is clamped to
/// [−1, 1] so the relative deviation never exceeds 1%.
fn apply_em_coupling(
    model: &EMCouplingModel,
    correlations: &[f64],
    series: &[f64],
) -> Result<Vec<f64>> {
    let resampled = resample_linear(series, correlations.len())?;
    let coupling = model.coupling(&resampled)?;
    Ok(correlations
        .iter()
        .zip(&coupling)
        .map(|(s, c)| s * (1.0 + EM_COUPLING_CAP * c.clamp(-1.0, 1.0)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn baseline(seed: u64) -> BellExperimentSimulator {
        BellExperimentSimulator::from_config(FieldConfiguration::default(), seed).unwrap()
    }

    #[test]
    fn test_zero_trials_rejected() {
        let mut sim = baseline(42);
        let run = ExperimentConfig::with_trials(0);
        assert!(matches!(sim.simulate(&run, None), Err(EqfeError::Configuration(_))));
    }

    #[test]
    fn test_invalid_run_parameters() {
        let mut sim = baseline(42);
        let negative_noise = ExperimentConfig {
            measurement_noise: -0.1,
            ..Default::default()
        };
        assert!(sim.simulate(&negative_noise, None).is_err());

        let zero_time = ExperimentConfig {
            measurement_time: 0.0,
            ..Default::default()
        };
        assert!(sim.simulate(&zero_time, None).is_err());
    }

    #[test]
    fn test_scenario_full_experiment() {
        let mut sim = baseline(42);
        let result = sim.simulate(&ExperimentConfig::default(), None).unwrap();

        assert_eq!(result.n_trials(), 10_000);
        assert!(result.s_mean() > 2.0);
        assert!(result.s_mean() <= TSIRELSON_BOUND + 0.05);
        assert!(result.s_std() > 0.0);
        assert!(result.classical_violation);
        assert_eq!(result.s_ideal, TSIRELSON_BOUND);
    }

    #[test]
    fn test_amplified_array_respects_bound() {
        let mut sim = baseline(7);
        let result = sim.simulate(&ExperimentConfig::with_trials(2_000), None).unwrap();

        assert!(BoundsValidator::check_tsirelson_bound(&result.s_env_modified));
        assert!(result.amplification.iter().all(|&a| a > 0.0 && a <= 1.0 + 1e-12));
        assert_eq!(result.env_field.len(), 2_000);
    }

    #[test]
    fn test_noise_may_exceed_bound_without_error() {
        let mut sim = baseline(3);
        let run = ExperimentConfig {
            n_trials: 5_000,
            measurement_noise: 0.05,
            measurement_time: 1.0,
        };
        let result = sim.simulate(&run, None).unwrap();

        // Amplified values sit at 2√2, so roughly half the noisy ones exceed it
        assert!(result.statistics.tsirelson_violations > 0);
        assert!(!result.tsirelson_respected);
        assert!(!result.validation.is_valid);
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, PhysicsWarning::PostNoiseExcess { .. })));
        assert!(result
            .warnings
            .iter()
            .any(|w| matches!(w, PhysicsWarning::TsirelsonClipped { .. })));
    }

    #[test]
    fn test_zero_noise_zero_coupling_is_ideal() {
        let config = FieldConfiguration::new(1e-6, 0.0, 300.0).unwrap();
        let mut sim = BellExperimentSimulator::from_config(config, 1).unwrap();
        let run = ExperimentConfig {
            n_trials: 100,
            measurement_noise: 0.0,
            measurement_time: 1.0,
        };
        let result = sim.simulate(&run, None).unwrap();

        assert!(result.chsh_values.iter().all(|&s| s == TSIRELSON_BOUND));
        assert!(result.s_std() < 1e-12);
        assert!(result.tsirelson_respected);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_same_seed_reproduces() {
        let run = ExperimentConfig::with_trials(500);
        let a = baseline(99).simulate(&run, None).unwrap();
        let b = baseline(99).simulate(&run, None).unwrap();
        let c = baseline(100).simulate(&run, None).unwrap();

        assert_eq!(a.chsh_values, b.chsh_values);
        assert_ne!(a.chsh_values, c.chsh_values);
    }

    #[test]
    fn test_em_coupling_applied_only_with_series() {
        let field = FieldSimulator::new(FieldConfiguration::default()).unwrap();
        let mut sim = BellExperimentSimulator::new(field, Some(EMCouplingModel::default()), 5);
        let run = ExperimentConfig::with_trials(200);

        let without = sim.simulate(&run, None).unwrap();
        assert!(without.s_em_modified.is_none());

        let series: Vec<f64> = (0..50).map(|i| (i as f64 * 0.3).sin()).collect();
        let with = sim.simulate(&run, Some(&series)).unwrap();
        let em = with.s_em_modified.as_ref().unwrap();
        assert_eq!(em.len(), 200);
        for (m, s) in em.iter().zip(&with.s_env_modified) {
            assert!(((m - s) / s).abs() <= EM_COUPLING_CAP);
        }
    }

    #[test]
    fn test_series_ignored_without_model() {
        let mut sim = baseline(5);
        let result = sim
            .simulate(&ExperimentConfig::with_trials(10), Some(&[1.0, 2.0]))
            .unwrap();
        assert!(result.s_em_modified.is_none());
    }

    #[test]
    fn test_em_cap_holds_for_large_coupling() {
        let strong = EMCouplingModel::default().with_quantum_dipole(1e10).unwrap();
        let out = apply_em_coupling(&strong, &[2.0, 2.0, 2.0], &[1e6, -1e6, 0.0]).unwrap();
        assert_relative_eq!(out[0], 2.02);
        assert_relative_eq!(out[1], 1.98);
        assert_eq!(out[2], 2.0);
    }

    #[test]
    fn test_em_cap_holds_through_simulate() {
        let field = FieldSimulator::new(FieldConfiguration::default()).unwrap();
        let strong = EMCouplingModel::default().with_quantum_dipole(1e10).unwrap();
        let mut sim = BellExperimentSimulator::new(field, Some(strong), 8);

        let series: Vec<f64> = (0..100).map(|i| (i as f64 * 0.2).sin()).collect();
        let result = sim
            .simulate(&ExperimentConfig::with_trials(300), Some(&series))
            .unwrap();
        let em = result.s_em_modified.as_ref().unwrap();

        let deviations: Vec<f64> = em
            .iter()
            .zip(&result.s_env_modified)
            .map(|(m, s)| ((m - s) / s).abs())
            .collect();
        assert!(deviations.iter().all(|&d| d <= EM_COUPLING_CAP + 1e-12));
        // Coupling saturates, so the cap is actually reached
        assert!(deviations.iter().any(|&d| d > 0.99 * EM_COUPLING_CAP));
    }

    #[test]
    fn test_empty_series_rejected() {
        let field = FieldSimulator::new(FieldConfiguration::default()).unwrap();
        let mut sim = BellExperimentSimulator::new(field, Some(EMCouplingModel::default()), 5);
        assert!(sim.simulate(&ExperimentConfig::with_trials(10), Some(&[])).is_err());
    }

    #[test]
    fn test_measurement_statistics() {
        let stats = MeasurementStatistics::from_values(&[1.0, 2.0, 3.0, 4.0]);
        assert_relative_eq!(stats.mean, 2.5);
        assert_relative_eq!(stats.std, 1.25f64.sqrt());
        assert_relative_eq!(stats.sem, (5.0f64 / 3.0).sqrt() / 2.0);
        assert_eq!(stats.min, 1.0);
        assert_eq!(stats.max, 4.0);
        assert_eq!(stats.classical_violations, 2);
        assert_eq!(stats.tsirelson_violations, 2);

        let single = MeasurementStatistics::from_values(&[2.5]);
        assert_eq!(single.sem, 0.0);
        assert_eq!(single.std, 0.0);
    }

    #[test]
    fn test_result_carries_configuration() {
        let config = FieldConfiguration::new(0.0, 0.05, 77.0).unwrap();
        let mut sim = BellExperimentSimulator::from_config(config, 11).unwrap();
        let result = sim.simulate(&ExperimentConfig::with_trials(50), None).unwrap();
        assert_eq!(result.configuration, config);
        assert_eq!(
            result.simulation_parameters.massless_variance_model.as_deref(),
            Some("thermal_cutoff")
        );
    }

    #[test]
    fn test_invalid_configuration_propagates() {
        let err = FieldConfiguration::new(1e-6, 1e-3, -1.0)
            .and_then(|c| BellExperimentSimulator::from_config(c, 0));
        assert!(matches!(err, Err(EqfeError::Configuration(_))));
    }
}
