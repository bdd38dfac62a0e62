//! The amplification law engine.
//!
//! Implements
//!
//! ```text
//! A(φ,t) = exp[α⟨φ²⟩t − β∫₀ᵗ C(τ) dτ]
//! ```
//!
//! where α = g²/2 is the enhancement parameter, β = g⁴/4 the decoherence
//! parameter, ⟨φ²⟩ the thermal field variance and C(τ) = ⟨φ²⟩·exp(−τ/τ_c)
//! the exponential field correlation function.

use crate::bounds::BoundsValidator;
use crate::config::FieldConfiguration;
use crate::constants::{PhysicalConstants, TSIRELSON_BOUND};
use crate::error::{ensure_all_finite, ensure_finite, EqfeError, Result};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

/// Strategy for the field variance of a massless field.
///
/// Equipartition gives no finite variance without a mass, so massless
/// fields need an infrared cutoff. Implementations are swappable.
pub trait MasslessVariance: std::fmt::Debug + Send + Sync {
    /// Returns ⟨φ²⟩ for the given temperature.
    fn variance(&self, constants: &PhysicalConstants, temperature: f64) -> f64;

    /// Short identifier used in reports.
    fn name(&self) -> &'static str;
}

/// Thermal-scale infrared cutoff surrogate: ⟨φ²⟩ = k_B·T / e.
///
/// An approximation, not a first-principles result. It should not be assumed
/// to hold for other massless-field regimes.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThermalCutoff;

impl MasslessVariance for ThermalCutoff {
    fn variance(&self, constants: &PhysicalConstants, temperature: f64) -> f64 {
        constants.thermal_energy(temperature) / constants.e
    }

    fn name(&self) -> &'static str {
        "thermal_cutoff"
    }
}

/// Output of the per-trial clip step.
#[derive(Debug, Clone, PartialEq)]
pub struct ClippedCorrelations {
    /// Correlations clipped to [0, 2√2]
    pub values: Vec<f64>,

    /// Number of values that exceeded the Tsirelson bound before clipping
    pub clipped: usize,

    /// Largest unclipped value, floored at 0.0
    pub max_unclipped: f64,
}

/// Snapshot of the configuration plus derived quantities.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationParameters {
    pub field_mass_ev: f64,
    pub coupling_strength: f64,
    pub temperature_k: f64,
    pub field_speed_fraction_c: f64,
    pub enhancement_parameter_alpha: f64,
    pub decoherence_parameter_beta: f64,
    pub field_variance: f64,
    pub correlation_time_s: f64,
    /// `None` when the coupling vanishes and the optimum is undefined
    pub optimal_temperature_k: Option<f64>,
    pub massless_variance_model: Option<String>,
}

/// Environmental scalar field simulator.
#[derive(Debug, Clone)]
pub struct FieldSimulator {
    config: FieldConfiguration,
    constants: PhysicalConstants,
    massless: Arc<dyn MasslessVariance>,
}

impl FieldSimulator {
    /// Creates a simulator with CODATA constants and the thermal cutoff surrogate.
    pub fn new(config: FieldConfiguration) -> Result<Self> {
        Self::with_constants(config, PhysicalConstants::CODATA_2018)
    }

    /// Creates a simulator with an injected constants registry.
    pub fn with_constants(
        config: FieldConfiguration,
        constants: PhysicalConstants,
    ) -> Result<Self> {
        config.validate(&constants)?;
        Ok(Self {
            config,
            constants,
            massless: Arc::new(ThermalCutoff),
        })
    }

    /// Creates a simulator and runs 1000 trial field samples through it, failing if
    /// the amplification law yields values outside the Tsirelson bound.
    pub fn validated<R: Rng + ?Sized>(config: FieldConfiguration, rng: &mut R) -> Result<Self> {
        let simulator = Self::new(config)?;
        let samples = simulator.thermal_field_fluctuations(1000, rng)?;
        let modified = simulator.modify_correlations_for_samples(TSIRELSON_BOUND, &samples, 1.0)?;
        if !BoundsValidator::check_tsirelson_bound(&modified.values) {
            return Err(EqfeError::config(
                "Simulator parameters produce unphysical results",
            ));
        }
        Ok(simulator)
    }

    /// Replaces the massless-field variance strategy.
    pub fn with_massless_variance(mut self, model: Arc<dyn MasslessVariance>) -> Self {
        self.massless = model;
        self
    }

    /// Returns a simulator for a different configuration sharing this one's
    /// constants and massless strategy.
    pub fn with_configuration(&self, config: FieldConfiguration) -> Result<Self> {
        config.validate(&self.constants)?;
        Ok(Self {
            config,
            constants: self.constants,
            massless: Arc::clone(&self.massless),
        })
    }

    pub fn config(&self) -> &FieldConfiguration {
        &self.config
    }

    pub fn constants(&self) -> &PhysicalConstants {
        &self.constants
    }

    /// Thermal field variance ⟨φ²⟩.
    ///
    /// Massive fields use equipartition, ⟨φ²⟩ = k_B·T / (m·c²); massless
    /// fields defer to the configured [`MasslessVariance`] strategy.
    pub fn field_variance(&self) -> f64 {
        let k = &self.constants;
        let t = self.config.temperature();
        if self.config.is_massless() {
            self.massless.variance(k, t)
        } else {
            let mass_kg = k.ev_to_kg(self.config.field_mass());
            k.thermal_energy(t) / (mass_kg * k.c * k.c)
        }
    }

    /// Draws `n` i.i.d. zero-mean Gaussian field samples with variance ⟨φ²⟩.
    pub fn thermal_field_fluctuations<R: Rng + ?Sized>(
        &self,
        n: usize,
        rng: &mut R,
    ) -> Result<Vec<f64>> {
        let std_dev = ensure_finite("field variance", self.field_variance())?.sqrt();
        let normal = Normal::new(0.0, std_dev)
            .map_err(|e| EqfeError::Statistics(format!("field distribution: {}", e)))?;
        Ok((0..n).map(|_| normal.sample(rng)).collect())
    }

    /// Field correlation time τ_c.
    ///
    /// ħ/(m·c²) for massive fields, ħ/(k_B·T) for massless ones.
    pub fn correlation_time(&self) -> f64 {
        let k = &self.constants;
        if self.config.is_massless() {
            k.hbar / k.thermal_energy(self.config.temperature())
        } else {
            let mass_kg = k.ev_to_kg(self.config.field_mass());
            k.hbar / (mass_kg * k.c * k.c)
        }
    }

    /// Correlation integral ∫₀ᵗ C(τ) dτ = ⟨φ²⟩·τ_c·(1 − exp(−t/τ_c)).
    pub fn correlation_integral(&self, variance: f64, measurement_time: f64) -> f64 {
        let tau_c = self.correlation_time();
        // 1 - exp(-x) without cancellation for small x
        variance * tau_c * -(-measurement_time / tau_c).exp_m1()
    }

    /// Exponent of the amplification law for a given variance.
    fn exponent(&self, variance: f64, measurement_time: f64) -> f64 {
        let enhancement = self.config.alpha() * variance * measurement_time;
        let decoherence =
            self.config.beta() * self.correlation_integral(variance, measurement_time);
        enhancement - decoherence
    }

    /// Amplification factor for the configuration's thermal variance.
    pub fn amplification_factor(&self, measurement_time: f64) -> Result<f64> {
        check_measurement_time(measurement_time)?;
        let variance = self.field_variance();
        let factor = self.exponent(variance, measurement_time).exp();
        debug!(
            "variance={:.6e} tau_c={:.6e} t={} amplification={:.12}",
            variance,
            self.correlation_time(),
            measurement_time,
            factor
        );
        ensure_finite("amplification factor", factor)
    }

    /// Per-trial amplification factors.
    ///
    /// Each trial uses its instantaneous φ_i² as the variance in both the
    /// enhancement and decoherence terms.
    pub fn amplification_for_samples(
        &self,
        samples: &[f64],
        measurement_time: f64,
    ) -> Result<Vec<f64>> {
        check_measurement_time(measurement_time)?;
        ensure_all_finite("field samples", samples)?;
        let factors: Vec<f64> = samples
            .iter()
            .map(|phi| self.exponent(phi * phi, measurement_time).exp())
            .collect();
        ensure_all_finite("amplification factor", &factors)?;
        Ok(factors)
    }

    /// Applies the amplification law to an ideal correlation value, clipping
    /// to [0, 2√2].
    ///
    /// Clipping is advisory: a warning is logged and the clipped value
    /// returned.
    pub fn modify_quantum_correlations(&self, ideal: f64, measurement_time: f64) -> Result<f64> {
        ensure_finite("ideal correlation", ideal)?;
        let modified = ideal * self.amplification_factor(measurement_time)?;
        let clipped = modified.clamp(0.0, TSIRELSON_BOUND);
        if modified > TSIRELSON_BOUND {
            warn!(
                "Tsirelson bound clipping: {:.6} -> {:.6}",
                modified, clipped
            );
        }
        Ok(clipped)
    }

    /// Per-trial version of [`Self::modify_quantum_correlations`].
    pub fn modify_correlations_for_samples(
        &self,
        ideal: f64,
        samples: &[f64],
        measurement_time: f64,
    ) -> Result<ClippedCorrelations> {
        ensure_finite("ideal correlation", ideal)?;
        let factors = self.amplification_for_samples(samples, measurement_time)?;

        let mut clipped = 0;
        let mut max_unclipped = 0.0_f64;
        let values = factors
            .iter()
            .map(|a| {
                let modified = ideal * a;
                if modified > TSIRELSON_BOUND {
                    clipped += 1;
                }
                max_unclipped = max_unclipped.max(modified);
                modified.clamp(0.0, TSIRELSON_BOUND)
            })
            .collect();

        if clipped > 0 {
            warn!(
                "Tsirelson bound clipping on {}/{} trials (max unclipped {:.6})",
                clipped,
                samples.len(),
                max_unclipped
            );
        }

        Ok(ClippedCorrelations {
            values,
            clipped,
            max_unclipped,
        })
    }

    /// Temperature maximizing amplification, from the dA/dT = 0 condition.
    ///
    /// Undefined (error) when the coupling vanishes, for massive and massless
    /// fields alike.
    pub fn optimal_temperature(&self) -> Result<f64> {
        if self.config.alpha() == 0.0 {
            return Err(EqfeError::non_finite("optimal temperature", f64::NAN));
        }
        let k = &self.constants;
        let tau_c = self.correlation_time();
        let optimum = if self.config.is_massless() {
            k.hbar / (k.k_b * tau_c)
        } else {
            let mass_kg = k.ev_to_kg(self.config.field_mass());
            self.config.beta() * tau_c * mass_kg * k.c * k.c / (self.config.alpha() * k.k_b)
        };
        ensure_finite("optimal temperature", optimum)
    }

    /// Complete set of simulation parameters and derived quantities.
    pub fn simulation_parameters(&self) -> SimulationParameters {
        SimulationParameters {
            field_mass_ev: self.config.field_mass(),
            coupling_strength: self.config.coupling_strength(),
            temperature_k: self.config.temperature(),
            field_speed_fraction_c: self.config.field_speed() / self.constants.c,
            enhancement_parameter_alpha: self.config.alpha(),
            decoherence_parameter_beta: self.config.beta(),
            field_variance: self.field_variance(),
            correlation_time_s: self.correlation_time(),
            optimal_temperature_k: self.optimal_temperature().ok(),
            massless_variance_model: self
                .config
                .is_massless()
                .then(|| self.massless.name().to_string()),
        }
    }
}

fn check_measurement_time(measurement_time: f64) -> Result<()> {
    if measurement_time.is_finite() && measurement_time >= 0.0 {
        Ok(())
    } else {
        Err(EqfeError::config(format!(
            "Measurement time must be finite and non-negative, got {}",
            measurement_time
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::PHYSICS_TOLERANCE;
    use approx::assert_relative_eq;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    fn baseline() -> FieldSimulator {
        FieldSimulator::new(FieldConfiguration::default()).unwrap()
    }

    #[test]
    fn test_massive_variance_equipartition() {
        let sim = baseline();
        let k = PhysicalConstants::CODATA_2018;
        // m·c² = 1e-6 eV
        let expected = k.k_b * 300.0 / (1e-6 * k.e);
        assert_relative_eq!(sim.field_variance(), expected, max_relative = 1e-12);
    }

    #[test]
    fn test_massless_variance_uses_cutoff() {
        let config = FieldConfiguration::new(0.0, 1e-3, 300.0).unwrap();
        let sim = FieldSimulator::new(config).unwrap();
        let k = PhysicalConstants::CODATA_2018;
        assert_relative_eq!(sim.field_variance(), k.k_b * 300.0 / k.e);
        assert_relative_eq!(sim.correlation_time(), k.hbar / (k.k_b * 300.0));
    }

    #[derive(Debug)]
    struct FixedVariance(f64);

    impl MasslessVariance for FixedVariance {
        fn variance(&self, _: &PhysicalConstants, _: f64) -> f64 {
            self.0
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    #[test]
    fn test_massless_strategy_is_swappable() {
        let config = FieldConfiguration::new(0.0, 1e-3, 300.0).unwrap();
        let sim = FieldSimulator::new(config)
            .unwrap()
            .with_massless_variance(Arc::new(FixedVariance(4.0)));
        assert_eq!(sim.field_variance(), 4.0);
        assert_eq!(
            sim.simulation_parameters().massless_variance_model.as_deref(),
            Some("fixed")
        );

        // Massive fields ignore the strategy
        let massive = sim.with_configuration(FieldConfiguration::default()).unwrap();
        assert_relative_eq!(massive.field_variance(), baseline().field_variance());
    }

    #[test]
    fn test_fluctuation_statistics() {
        let config = FieldConfiguration::new(0.0, 1e-3, 300.0).unwrap();
        let sim = FieldSimulator::new(config).unwrap();
        let mut rng = ChaCha8Rng::seed_from_u64(7);

        let samples = sim.thermal_field_fluctuations(20_000, &mut rng).unwrap();
        assert_eq!(samples.len(), 20_000);

        let n = samples.len() as f64;
        let mean = samples.iter().sum::<f64>() / n;
        let var = samples.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / n;
        assert!(mean.abs() < 0.01, "mean {}", mean);
        assert_relative_eq!(var, sim.field_variance(), max_relative = 0.05);
    }

    #[test]
    fn test_fluctuations_are_seed_deterministic() {
        let sim = baseline();
        let a = sim
            .thermal_field_fluctuations(16, &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();
        let b = sim
            .thermal_field_fluctuations(16, &mut ChaCha8Rng::seed_from_u64(42))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_correlation_integral_limits() {
        let sim = baseline();
        let tau_c = sim.correlation_time();

        assert_eq!(sim.correlation_integral(2.0, 0.0), 0.0);
        // t >> τ_c saturates at ⟨φ²⟩·τ_c
        assert_relative_eq!(sim.correlation_integral(2.0, 1.0), 2.0 * tau_c, max_relative = 1e-12);
        // t << τ_c grows linearly
        let t = tau_c * 1e-6;
        assert_relative_eq!(sim.correlation_integral(2.0, t), 2.0 * t, max_relative = 1e-5);
    }

    #[test]
    fn test_scenario_small_deviation_from_unity() {
        let sim = baseline();
        let a = sim.amplification_factor(1e-6).unwrap();
        assert!(a > 1.0 && a < 1.0 + 1e-3, "amplification {}", a);
        assert!(a.is_finite());
    }

    #[test]
    fn test_zero_coupling_is_identity() {
        let config = FieldConfiguration::new(1e-6, 0.0, 300.0).unwrap();
        let sim = FieldSimulator::new(config).unwrap();

        for t in [0.0, 1e-9, 1e-6, 1.0, 1e3] {
            assert_eq!(sim.amplification_factor(t).unwrap(), 1.0);
        }
        assert_eq!(sim.modify_quantum_correlations(TSIRELSON_BOUND, 1.0).unwrap(), TSIRELSON_BOUND);
        assert_eq!(sim.modify_quantum_correlations(2.5, 10.0).unwrap(), 2.5);

        let samples = [0.3, -12.0, 155.0];
        let factors = sim.amplification_for_samples(&samples, 1.0).unwrap();
        assert!(factors.iter().all(|&a| a == 1.0));
    }

    #[test]
    fn test_amplification_at_zero_time_is_one() {
        assert_eq!(baseline().amplification_factor(0.0).unwrap(), 1.0);
    }

    #[test]
    fn test_invalid_measurement_time() {
        let sim = baseline();
        assert!(sim.amplification_factor(-1.0).is_err());
        assert!(sim.amplification_factor(f64::NAN).is_err());
    }

    #[test]
    fn test_overflow_is_reported_not_propagated() {
        let config = FieldConfiguration::new(1e-12, 0.1, 1e4).unwrap();
        let sim = FieldSimulator::new(config).unwrap();
        assert!(matches!(
            sim.amplification_factor(1e6),
            Err(EqfeError::NonFinite { .. })
        ));
    }

    #[test]
    fn test_clipping_at_tsirelson_bound() {
        let sim = baseline();
        // Amplification > 1 at t = 1 s, so the ideal value must be clipped
        let clipped = sim.modify_quantum_correlations(TSIRELSON_BOUND, 1.0).unwrap();
        assert_eq!(clipped, TSIRELSON_BOUND);

        let below = sim.modify_quantum_correlations(1.0, 1.0).unwrap();
        assert!(below > 1.0 && below < TSIRELSON_BOUND);

        assert_eq!(sim.modify_quantum_correlations(-1.0, 1.0).unwrap(), 0.0);
    }

    #[test]
    fn test_per_sample_clipping_counts() {
        let sim = baseline();
        let samples = [0.0, 1.0, 500.0];
        let out = sim.modify_correlations_for_samples(2.8, &samples, 1.0).unwrap();

        assert_eq!(out.values[0], 2.8);
        assert_eq!(out.values[2], TSIRELSON_BOUND);
        assert_eq!(out.clipped, 1);
        assert!(out.max_unclipped > TSIRELSON_BOUND);
    }

    #[test]
    fn test_non_finite_samples_rejected() {
        let sim = baseline();
        assert!(sim.amplification_for_samples(&[1.0, f64::NAN], 1.0).is_err());
        assert!(sim.modify_quantum_correlations(f64::INFINITY, 1.0).is_err());
    }

    #[test]
    fn test_optimal_temperature() {
        let sim = baseline();
        let k = PhysicalConstants::CODATA_2018;
        let c = sim.config();
        let expected = c.beta() * sim.correlation_time() * 1e-6 * k.e / (c.alpha() * k.k_b);
        assert_relative_eq!(sim.optimal_temperature().unwrap(), expected, max_relative = 1e-12);

        let decoupled = sim
            .with_configuration(FieldConfiguration::new(1e-6, 0.0, 300.0).unwrap())
            .unwrap();
        assert!(decoupled.optimal_temperature().is_err());
        assert!(decoupled.simulation_parameters().optimal_temperature_k.is_none());

        // Massless optimum recovers the configured temperature
        let massless = sim
            .with_configuration(FieldConfiguration::new(0.0, 1e-3, 77.0).unwrap())
            .unwrap();
        assert_relative_eq!(massless.optimal_temperature().unwrap(), 77.0, max_relative = 1e-12);

        let massless_decoupled = sim
            .with_configuration(FieldConfiguration::new(0.0, 0.0, 77.0).unwrap())
            .unwrap();
        assert!(matches!(
            massless_decoupled.optimal_temperature(),
            Err(EqfeError::NonFinite { .. })
        ));
        assert!(massless_decoupled
            .simulation_parameters()
            .optimal_temperature_k
            .is_none());
    }

    #[test]
    fn test_simulation_parameters() {
        let params = baseline().simulation_parameters();
        assert_eq!(params.field_mass_ev, 1e-6);
        assert_eq!(params.field_speed_fraction_c, 1.0);
        assert_relative_eq!(params.enhancement_parameter_alpha, 5e-7);
        assert!(params.massless_variance_model.is_none());
    }

    #[test]
    fn test_validated_constructor() {
        let mut rng = ChaCha8Rng::seed_from_u64(1);
        assert!(FieldSimulator::validated(FieldConfiguration::default(), &mut rng).is_ok());
    }

    #[test]
    fn test_injected_constants_revalidate_speed() {
        let slow_light = PhysicalConstants {
            c: 1.0e8,
            ..PhysicalConstants::CODATA_2018
        };
        assert!(FieldSimulator::with_constants(FieldConfiguration::default(), slow_light).is_err());
    }

    fn valid_config() -> impl Strategy<Value = FieldConfiguration> {
        (
            prop_oneof![Just(0.0), 1e-6f64..1.0],
            0.0f64..0.1,
            1.0f64..1000.0,
        )
            .prop_map(|(m, g, t)| FieldConfiguration::new(m, g, t).unwrap())
    }

    proptest! {
        #[test]
        fn prop_amplification_positive_and_finite(config in valid_config(), t in 0.0f64..1e-2) {
            let sim = FieldSimulator::new(config).unwrap();
            let a = sim.amplification_factor(t).unwrap();
            prop_assert!(a > 0.0);
            prop_assert!(a.is_finite());
        }

        #[test]
        fn prop_modified_never_exceeds_tsirelson(
            config in valid_config(),
            ideal in -10.0f64..10.0,
            samples in proptest::collection::vec(-1e3f64..1e3, 1..32),
            t in 0.0f64..1e-2,
        ) {
            let sim = FieldSimulator::new(config).unwrap();
            let scalar = sim.modify_quantum_correlations(ideal, t).unwrap();
            prop_assert!(scalar <= TSIRELSON_BOUND + PHYSICS_TOLERANCE);

            let per_trial = sim.modify_correlations_for_samples(ideal, &samples, t).unwrap();
            prop_assert!(per_trial
                .values
                .iter()
                .all(|&s| s <= TSIRELSON_BOUND + PHYSICS_TOLERANCE));
        }

        #[test]
        fn prop_correlation_time_decreasing_in_mass(
            m1 in 1e-9f64..1e3,
            factor in 1.001f64..1e3,
            temperature in 1.0f64..1000.0,
        ) {
            let light_config = FieldConfiguration::new(m1, 1e-3, temperature).unwrap();
            let heavy_config = FieldConfiguration::new(m1 * factor, 1e-3, temperature).unwrap();
            let light = FieldSimulator::new(light_config).unwrap();
            let heavy = FieldSimulator::new(heavy_config).unwrap();
            prop_assert!(heavy.correlation_time() < light.correlation_time());
        }
    }
}
