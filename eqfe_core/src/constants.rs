//! Physical constants registry and quantum correlation bounds.
//!
//! All components read constants through a [`PhysicalConstants`] value that is
//! injected at construction, so alternative unit systems (or deliberately
//! perturbed constants in tests) never require touching scattered literals.

use serde::{Deserialize, Serialize};

/// Maximum CHSH value attainable by quantum mechanics (2√2).
pub const TSIRELSON_BOUND: f64 = 2.0 * std::f64::consts::SQRT_2;

/// Maximum CHSH value attainable by local hidden-variable theories.
pub const CLASSICAL_BOUND: f64 = 2.0;

/// Absolute tolerance applied when checking values against the Tsirelson bound.
pub const PHYSICS_TOLERANCE: f64 = 1e-10;

/// Coupling strength above which the perturbative expansion is suspect.
pub const PERTURBATIVE_COUPLING_LIMIT: f64 = 0.1;

/// Physical constants in SI units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicalConstants {
    /// Speed of light (m/s)
    pub c: f64,

    /// Reduced Planck constant (J·s)
    pub hbar: f64,

    /// Elementary charge (C)
    pub e: f64,

    /// Vacuum permeability (H/m)
    pub mu_0: f64,

    /// Boltzmann constant (J/K)
    pub k_b: f64,
}

impl PhysicalConstants {
    /// CODATA 2018 values (μ₀ taken as the classical 4π·10⁻⁷).
    pub const CODATA_2018: PhysicalConstants = PhysicalConstants {
        c: 299_792_458.0,
        hbar: 1.054_571_817e-34,
        e: 1.602_176_634e-19,
        mu_0: 4e-7 * std::f64::consts::PI,
        k_b: 1.380_649e-23,
    };

    /// Vacuum permittivity (F/m), derived so that `c = 1/√(μ₀ε₀)`.
    pub fn epsilon_0(&self) -> f64 {
        1.0 / (self.mu_0 * self.c * self.c)
    }

    /// Converts a rest energy in eV into a mass in kg.
    pub fn ev_to_kg(&self, energy_ev: f64) -> f64 {
        energy_ev * self.e / (self.c * self.c)
    }

    /// Thermal energy k_B·T in joules.
    pub fn thermal_energy(&self, temperature: f64) -> f64 {
        self.k_b * temperature
    }
}

impl Default for PhysicalConstants {
    fn default() -> Self {
        Self::CODATA_2018
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_speed_of_light_identity() {
        let k = PhysicalConstants::CODATA_2018;
        let c = 1.0 / (k.mu_0 * k.epsilon_0()).sqrt();
        assert_relative_eq!(c, k.c, max_relative = 1e-14);
    }

    #[test]
    fn test_identity_holds_for_injected_constants() {
        let k = PhysicalConstants {
            c: 1.0,
            mu_0: 2.0,
            ..PhysicalConstants::CODATA_2018
        };
        assert_relative_eq!(k.epsilon_0(), 0.5);
        assert_relative_eq!(1.0 / (k.mu_0 * k.epsilon_0()).sqrt(), 1.0);
    }

    #[test]
    fn test_bounds() {
        assert_relative_eq!(TSIRELSON_BOUND, 2.8284271247461903);
        assert!(TSIRELSON_BOUND > CLASSICAL_BOUND);
    }

    #[test]
    fn test_ev_to_kg_round_trip_through_rest_energy() {
        let k = PhysicalConstants::default();
        let m = k.ev_to_kg(1.0);
        assert_relative_eq!(m * k.c * k.c, k.e, max_relative = 1e-15);
    }
}
