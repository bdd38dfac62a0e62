//! Shapiro-Wilk normality test (Royston's approximation).
//!
//! Coefficients follow Royston (1992, 1995, algorithm AS R94): polynomial
//! corrections for the two extreme weights, normal-score weights elsewhere,
//! and a normalizing transform of W for the p-value. Valid for 3 ≤ n ≤ 5000.

use eqfe_core::{EqfeError, Result};
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::f64::consts::PI;

/// Largest sample the approximation supports.
pub const MAX_SAMPLE: usize = 5000;

/// Shapiro-Wilk test outcome.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ShapiroWilk {
    /// W statistic in (0, 1]
    pub statistic: f64,
    pub p_value: f64,
}

fn poly(coefficients: &[f64], x: f64) -> f64 {
    // Horner, coefficients in ascending order
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Runs the test on `data` (order irrelevant, 3 ≤ len ≤ 5000).
pub fn shapiro_wilk(data: &[f64]) -> Result<ShapiroWilk> {
    let n = data.len();
    if n < 3 {
        return Err(EqfeError::InsufficientData { needed: 3, got: n });
    }
    if n > MAX_SAMPLE {
        return Err(EqfeError::Statistics(format!(
            "Shapiro-Wilk supports at most {} observations, got {}",
            MAX_SAMPLE, n
        )));
    }

    let mut x = data.to_vec();
    x.sort_by(|a, b| a.total_cmp(b));

    let range = x[n - 1] - x[0];
    if !(range > 0.0) {
        return Err(EqfeError::DegenerateSample(
            "all observations are identical".to_string(),
        ));
    }

    let weights = coefficients(n)?;

    let mean = x.iter().sum::<f64>() / n as f64;
    let ssq: f64 = x.iter().map(|v| (v - mean).powi(2)).sum();
    let numerator: f64 = weights.iter().zip(&x).map(|(a, v)| a * v).sum();
    let w = (numerator * numerator / ssq).min(1.0);

    let p_value = p_value(w, n)?;
    Ok(ShapiroWilk {
        statistic: w,
        p_value: p_value.clamp(0.0, 1.0),
    })
}

/// Antisymmetric weights a_1..a_n.
fn coefficients(n: usize) -> Result<Vec<f64>> {
    if n == 3 {
        let a = std::f64::consts::FRAC_1_SQRT_2;
        return Ok(vec![-a, 0.0, a]);
    }

    let normal = standard_normal()?;
    let nf = n as f64;
    let m: Vec<f64> = (1..=n)
        .map(|i| normal.inverse_cdf((i as f64 - 0.375) / (nf + 0.25)))
        .collect();
    let mm: f64 = m.iter().map(|v| v * v).sum();
    let rsn = 1.0 / nf.sqrt();

    let c_n = m[n - 1] / mm.sqrt();
    let a_n = c_n + poly(&[0.0, 0.221157, -0.147981, -2.071190, 4.434685, -2.706056], rsn);

    let mut a = vec![0.0; n];
    if n > 5 {
        let c_n1 = m[n - 2] / mm.sqrt();
        let a_n1 = c_n1 + poly(&[0.0, 0.042981, -0.293762, -1.752461, 5.682633, -3.582633], rsn);
        let phi = (mm - 2.0 * m[n - 1].powi(2) - 2.0 * m[n - 2].powi(2))
            / (1.0 - 2.0 * a_n.powi(2) - 2.0 * a_n1.powi(2));
        for i in 2..n - 2 {
            a[i] = m[i] / phi.sqrt();
        }
        a[1] = -a_n1;
        a[n - 2] = a_n1;
    } else {
        let phi = (mm - 2.0 * m[n - 1].powi(2)) / (1.0 - 2.0 * a_n.powi(2));
        for i in 1..n - 1 {
            a[i] = m[i] / phi.sqrt();
        }
    }
    a[0] = -a_n;
    a[n - 1] = a_n;
    Ok(a)
}

fn p_value(w: f64, n: usize) -> Result<f64> {
    if n == 3 {
        let p = 6.0 / PI * (w.sqrt().asin() - 0.75f64.sqrt().asin());
        return Ok(p.max(0.0));
    }

    let one_minus_w = 1.0 - w;
    if one_minus_w <= 0.0 {
        return Ok(1.0);
    }

    let nf = n as f64;
    let z = if n <= 11 {
        let gamma = poly(&[-2.273, 0.459], nf);
        let inner = gamma - one_minus_w.ln();
        if inner <= 0.0 {
            // W far below anything attainable under normality
            return Ok(0.0);
        }
        let mu = poly(&[0.5440, -0.39978, 0.025054, -0.0006714], nf);
        let sigma = poly(&[1.3822, -0.77857, 0.062767, -0.0020322], nf).exp();
        (-inner.ln() - mu) / sigma
    } else {
        let ln_n = nf.ln();
        let mu = poly(&[-1.5861, -0.31082, -0.083751, 0.0038915], ln_n);
        let sigma = poly(&[-0.4803, -0.082676, 0.0030302], ln_n).exp();
        (one_minus_w.ln() - mu) / sigma
    };

    Ok(standard_normal()?.sf(z))
}

fn standard_normal() -> Result<Normal> {
    Normal::new(0.0, 1.0).map_err(|e| EqfeError::Statistics(e.to_string()))
}
