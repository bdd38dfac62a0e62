//! Inferential statistics over one experiment's CHSH observations.
//!
//! Everything here is a pure function of the observation array and the
//! ideal value; the analyzer holds thresholds only.

use crate::experiment::ExperimentResult;
use crate::normality::{shapiro_wilk, MAX_SAMPLE};
use eqfe_core::{
    ensure_all_finite, BoundsValidator, EqfeError, Result, CLASSICAL_BOUND, QUANTUM_ADVANTAGE_KEY,
    TSIRELSON_BOUND, TSIRELSON_KEY,
};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, StudentsT};
use tracing::debug;

/// One-sample t-test against a reference value, plus its effect size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HypothesisTest {
    pub reference: f64,
    pub t_statistic: f64,
    /// Two-sided
    pub p_value: f64,
    pub degrees_of_freedom: f64,
    /// (mean − reference) / population std
    pub cohen_d: f64,
    /// p below the analyzer's significance level
    pub significant: bool,
}

/// Comparison against the classical bound.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClassicalComparison {
    pub test: HypothesisTest,
    /// Fraction of observations above the classical bound
    pub violation_fraction: f64,
}

/// Comparison against the ideal quantum value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuantumComparison {
    pub test: HypothesisTest,
    /// mean − ideal
    pub deviation_from_ideal: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DescriptiveStatistics {
    pub n: usize,
    pub mean: f64,
    /// Population standard deviation
    pub std: f64,
    /// Standard error (n − 1 estimator)
    pub sem: f64,
    pub median: f64,
    pub q25: f64,
    pub q75: f64,
    pub min: f64,
    pub max: f64,
}

/// Two-sided t-interval for the mean.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub level: f64,
    pub lower: f64,
    pub upper: f64,
    pub width: f64,
}

impl ConfidenceInterval {
    pub fn contains(&self, value: f64) -> bool {
        self.lower <= value && value <= self.upper
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NormalityTest {
    pub shapiro_statistic: f64,
    pub shapiro_p_value: f64,
    /// Observations the test actually used
    pub sample_size: usize,
    /// p above the analyzer's significance level
    pub is_normal: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsValidation {
    pub tsirelson_bound_respected: bool,
    pub classical_bound_violated: bool,
    /// max − 2√2; negative when every observation is within the bound
    pub max_violation: f64,
    /// Fraction of observations above 2√2
    pub bound_violation_fraction: f64,
}

/// Result of [`StatisticalAnalyzer::analyze`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticalReport {
    pub classical_comparison: ClassicalComparison,
    pub quantum_comparison: QuantumComparison,
    pub descriptive_statistics: DescriptiveStatistics,
    pub confidence_interval: ConfidenceInterval,
    pub normality_test: NormalityTest,
    pub physics_validation: PhysicsValidation,
}

/// Hypothesis tests, intervals and normality check for CHSH observations.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StatisticalAnalyzer {
    pub classical_bound: f64,
    pub tsirelson_bound: f64,
    pub confidence_level: f64,
    pub significance: f64,
    /// Shapiro-Wilk uses at most this many leading observations
    pub normality_cap: usize,
}

impl Default for StatisticalAnalyzer {
    fn default() -> Self {
        Self {
            classical_bound: CLASSICAL_BOUND,
            tsirelson_bound: TSIRELSON_BOUND,
            confidence_level: 0.95,
            significance: 0.05,
            normality_cap: MAX_SAMPLE,
        }
    }
}

impl StatisticalAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzes an experiment's final observations against its ideal value.
    pub fn analyze(&self, result: &ExperimentResult) -> Result<StatisticalReport> {
        self.analyze_values(&result.chsh_values, result.s_ideal)
    }

    /// Analyzes raw observations. Needs at least three finite values with
    /// non-zero spread.
    pub fn analyze_values(&self, values: &[f64], ideal: f64) -> Result<StatisticalReport> {
        self.check_settings()?;
        if values.len() < 3 {
            return Err(EqfeError::InsufficientData {
                needed: 3,
                got: values.len(),
            });
        }
        ensure_all_finite("observations", values)?;

        let descriptive = describe(values);
        if descriptive.std <= 1e-12 * descriptive.mean.abs().max(1.0) {
            return Err(EqfeError::DegenerateSample(format!(
                "standard deviation {:e} is zero to working precision",
                descriptive.std
            )));
        }

        let df = (descriptive.n - 1) as f64;
        let t_dist =
            StudentsT::new(0.0, 1.0, df).map_err(|e| EqfeError::Statistics(e.to_string()))?;

        let classical_test = self.one_sample_test(&descriptive, self.classical_bound, &t_dist, df);
        let quantum_test = self.one_sample_test(&descriptive, ideal, &t_dist, df);

        let t_crit = t_dist.inverse_cdf(1.0 - (1.0 - self.confidence_level) / 2.0);
        let half_width = t_crit * descriptive.sem;
        let confidence_interval = ConfidenceInterval {
            level: self.confidence_level,
            lower: descriptive.mean - half_width,
            upper: descriptive.mean + half_width,
            width: 2.0 * half_width,
        };

        let head = &values[..values.len().min(self.normality_cap)];
        let sw = shapiro_wilk(head)?;
        let normality_test = NormalityTest {
            shapiro_statistic: sw.statistic,
            shapiro_p_value: sw.p_value,
            sample_size: head.len(),
            is_normal: sw.p_value > self.significance,
        };

        let n = values.len() as f64;
        let validation = BoundsValidator::validate(values);
        let physics_validation = PhysicsValidation {
            tsirelson_bound_respected: validation.bound(TSIRELSON_KEY, true),
            classical_bound_violated: validation.bound(QUANTUM_ADVANTAGE_KEY, false),
            max_violation: descriptive.max - self.tsirelson_bound,
            bound_violation_fraction: values.iter().filter(|&&s| s > self.tsirelson_bound).count()
                as f64
                / n,
        };

        let classical_comparison = ClassicalComparison {
            test: classical_test,
            violation_fraction: values.iter().filter(|&&s| s > self.classical_bound).count() as f64
                / n,
        };

        debug!(
            "Analysis: n={} t_classical={:.3} p_classical={:.3e} shapiro_p={:.3}",
            descriptive.n, classical_test.t_statistic, classical_test.p_value, sw.p_value
        );

        Ok(StatisticalReport {
            classical_comparison,
            quantum_comparison: QuantumComparison {
                test: quantum_test,
                deviation_from_ideal: descriptive.mean - ideal,
            },
            descriptive_statistics: descriptive,
            confidence_interval,
            normality_test,
            physics_validation,
        })
    }

    fn check_settings(&self) -> Result<()> {
        if !(self.confidence_level > 0.0 && self.confidence_level < 1.0) {
            return Err(EqfeError::config(format!(
                "Confidence level must lie in (0, 1), got {}",
                self.confidence_level
            )));
        }
        if !(self.significance > 0.0 && self.significance < 1.0) {
            return Err(EqfeError::config(format!(
                "Significance level must lie in (0, 1), got {}",
                self.significance
            )));
        }
        if self.normality_cap < 3 || self.normality_cap > MAX_SAMPLE {
            return Err(EqfeError::config(format!(
                "Normality cap must lie in [3, {}], got {}",
                MAX_SAMPLE, self.normality_cap
            )));
        }
        Ok(())
    }

    fn one_sample_test(
        &self,
        descriptive: &DescriptiveStatistics,
        reference: f64,
        t_dist: &StudentsT,
        df: f64,
    ) -> HypothesisTest {
        let diff = descriptive.mean - reference;
        let t_statistic = diff / descriptive.sem;
        let p_value = (2.0 * t_dist.sf(t_statistic.abs())).min(1.0);
        HypothesisTest {
            reference,
            t_statistic,
            p_value,
            degrees_of_freedom: df,
            cohen_d: diff / descriptive.std,
            significant: p_value < self.significance,
        }
    }
}

/// Mean, population standard deviation and standard error (n − 1
/// estimator, 0 for a single value). `values` must be non-empty.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct Moments {
    pub mean: f64,
    pub std: f64,
    pub sem: f64,
}

pub(crate) fn moments(values: &[f64]) -> Moments {
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let ss = values.iter().map(|x| (x - mean).powi(2)).sum::<f64>();
    let sem = if values.len() > 1 {
        (ss / (n - 1.0)).sqrt() / n.sqrt()
    } else {
        0.0
    };
    Moments {
        mean,
        std: (ss / n).sqrt(),
        sem,
    }
}

/// Descriptive statistics. `values` must be non-empty and finite.
pub fn describe(values: &[f64]) -> DescriptiveStatistics {
    let n = values.len();
    let Moments { mean, std, sem } = moments(values);

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));

    DescriptiveStatistics {
        n,
        mean,
        std,
        sem,
        median: percentile(&sorted, 50.0),
        q25: percentile(&sorted, 25.0),
        q75: percentile(&sorted, 75.0),
        min: sorted[0],
        max: sorted[n - 1],
    }
}

/// Linear-interpolation percentile of already sorted data, `q` in [0, 100].
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    let pos = (q / 100.0).clamp(0.0, 1.0) * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = (lo + 1).min(sorted.len() - 1);
    sorted[lo] + (pos - lo as f64) * (sorted[hi] - sorted[lo])
}
