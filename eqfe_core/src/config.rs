//! Physical configuration of the environmental scalar field.

use crate::constants::{PhysicalConstants, PERTURBATIVE_COUPLING_LIMIT};
use crate::error::{EqfeError, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A configuration field that can be swept by a parameter scan.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldParameter {
    FieldMass,
    CouplingStrength,
    Temperature,
    FieldSpeed,
}

impl FieldParameter {
    /// Returns all sweepable parameters.
    pub fn all() -> [FieldParameter; 4] {
        [
            FieldParameter::FieldMass,
            FieldParameter::CouplingStrength,
            FieldParameter::Temperature,
            FieldParameter::FieldSpeed,
        ]
    }

    /// Returns the parameter name.
    pub fn name(&self) -> &'static str {
        match self {
            FieldParameter::FieldMass => "field_mass",
            FieldParameter::CouplingStrength => "coupling_strength",
            FieldParameter::Temperature => "temperature",
            FieldParameter::FieldSpeed => "field_speed",
        }
    }
}

impl std::fmt::Display for FieldParameter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for FieldParameter {
    type Err = EqfeError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "field_mass" | "mass" => Ok(FieldParameter::FieldMass),
            "coupling_strength" | "coupling" => Ok(FieldParameter::CouplingStrength),
            "temperature" => Ok(FieldParameter::Temperature),
            "field_speed" | "speed" => Ok(FieldParameter::FieldSpeed),
            _ => Err(EqfeError::config(format!("Unknown scan parameter: {}", s))),
        }
    }
}

/// Scalar field configuration.
///
/// Immutable once built: every constructor validates the physical bounds and
/// derives the enhancement (`alpha = g²/2`) and decoherence (`beta = g⁴/4`)
/// parameters. Changing a field yields a new configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FieldConfiguration {
    /// Scalar field rest energy in eV (0 = massless)
    field_mass: f64,

    /// Dimensionless coupling constant g
    coupling_strength: f64,

    /// Environmental temperature in Kelvin
    temperature: f64,

    /// Field propagation speed in m/s
    field_speed: f64,

    alpha: f64,
    beta: f64,
}

impl FieldConfiguration {
    /// Creates a configuration propagating at the speed of light.
    pub fn new(field_mass: f64, coupling_strength: f64, temperature: f64) -> Result<Self> {
        Self::with_speed(
            field_mass,
            coupling_strength,
            temperature,
            PhysicalConstants::CODATA_2018.c,
        )
    }

    /// Creates a configuration with an explicit propagation speed.
    pub fn with_speed(
        field_mass: f64,
        coupling_strength: f64,
        temperature: f64,
        field_speed: f64,
    ) -> Result<Self> {
        let config = Self {
            field_mass,
            coupling_strength,
            temperature,
            field_speed,
            alpha: coupling_strength * coupling_strength / 2.0,
            beta: coupling_strength.powi(4) / 4.0,
        };
        config.validate(&PhysicalConstants::CODATA_2018)?;

        if !config.is_perturbative() {
            warn!(
                "Coupling strength {} exceeds perturbative limit {}",
                coupling_strength, PERTURBATIVE_COUPLING_LIMIT
            );
        }

        Ok(config)
    }

    /// Returns a copy with `field_speed` replaced.
    pub fn with_field_speed(&self, field_speed: f64) -> Result<Self> {
        self.with_parameter(FieldParameter::FieldSpeed, field_speed)
    }

    /// Returns a new validated configuration with one field replaced.
    ///
    /// Derived `alpha`/`beta` are recomputed from the resulting coupling.
    pub fn with_parameter(&self, parameter: FieldParameter, value: f64) -> Result<Self> {
        let (mut mass, mut g, mut t, mut v) = (
            self.field_mass,
            self.coupling_strength,
            self.temperature,
            self.field_speed,
        );
        match parameter {
            FieldParameter::FieldMass => mass = value,
            FieldParameter::CouplingStrength => g = value,
            FieldParameter::Temperature => t = value,
            FieldParameter::FieldSpeed => v = value,
        }
        Self::with_speed(mass, g, t, v)
    }

    /// Checks every physical bound against the given constants.
    pub fn validate(&self, constants: &PhysicalConstants) -> Result<()> {
        let fields = [
            ("field_mass", self.field_mass),
            ("coupling_strength", self.coupling_strength),
            ("temperature", self.temperature),
            ("field_speed", self.field_speed),
        ];
        if let Some((name, value)) = fields.iter().find(|(_, v)| !v.is_finite()) {
            return Err(EqfeError::config(format!("{} must be finite, got {}", name, value)));
        }
        if self.field_speed > constants.c {
            return Err(EqfeError::config(format!(
                "Field speed {} exceeds c",
                self.field_speed
            )));
        }
        if self.field_speed <= 0.0 {
            return Err(EqfeError::config("Field speed must be positive"));
        }
        if self.coupling_strength < 0.0 {
            return Err(EqfeError::config("Coupling strength must be non-negative"));
        }
        if self.field_mass < 0.0 {
            return Err(EqfeError::config("Field mass must be non-negative"));
        }
        if self.temperature <= 0.0 {
            return Err(EqfeError::config("Temperature must be positive"));
        }
        Ok(())
    }

    /// Returns true if the coupling is inside the perturbative regime.
    pub fn is_perturbative(&self) -> bool {
        self.coupling_strength <= PERTURBATIVE_COUPLING_LIMIT
    }

    /// Returns true for a massless field.
    pub fn is_massless(&self) -> bool {
        self.field_mass == 0.0
    }

    pub fn field_mass(&self) -> f64 {
        self.field_mass
    }

    pub fn coupling_strength(&self) -> f64 {
        self.coupling_strength
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn field_speed(&self) -> f64 {
        self.field_speed
    }

    /// Enhancement parameter α = g²/2.
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    /// Decoherence parameter β = g⁴/4.
    pub fn beta(&self) -> f64 {
        self.beta
    }

    /// Returns the current value of a sweepable parameter.
    pub fn get(&self, parameter: FieldParameter) -> f64 {
        match parameter {
            FieldParameter::FieldMass => self.field_mass,
            FieldParameter::CouplingStrength => self.coupling_strength,
            FieldParameter::Temperature => self.temperature,
            FieldParameter::FieldSpeed => self.field_speed,
        }
    }
}

impl Default for FieldConfiguration {
    fn default() -> Self {
        let coupling_strength = 1e-3;
        Self {
            field_mass: 1e-6,
            coupling_strength,
            temperature: 300.0,
            field_speed: PhysicalConstants::CODATA_2018.c,
            alpha: coupling_strength * coupling_strength / 2.0,
            beta: coupling_strength.powi(4) / 4.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_default_matches_constructor() {
        let built = FieldConfiguration::new(1e-6, 1e-3, 300.0).unwrap();
        assert_eq!(built, FieldConfiguration::default());
    }

    #[test]
    fn test_derived_parameters() {
        let config = FieldConfiguration::new(1.0, 0.05, 1.0).unwrap();
        assert_relative_eq!(config.alpha(), 0.00125);
        assert_relative_eq!(config.beta(), 1.5625e-6);
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert!(FieldConfiguration::new(-1.0, 0.05, 1.0).is_err());
        assert!(FieldConfiguration::new(1.0, -0.05, 1.0).is_err());
        assert!(FieldConfiguration::new(1.0, 0.05, -1.0).is_err());
        assert!(FieldConfiguration::new(1.0, 0.05, 0.0).is_err());
        assert!(FieldConfiguration::new(f64::NAN, 0.05, 1.0).is_err());

        let superluminal = FieldConfiguration::with_speed(1.0, 0.05, 1.0, 4e8);
        assert!(matches!(superluminal, Err(EqfeError::Configuration(_))));

        for speed in [0.0, -1.0] {
            assert!(matches!(
                FieldConfiguration::with_speed(1.0, 0.05, 1.0, speed),
                Err(EqfeError::Configuration(_))
            ));
        }
    }

    #[test]
    fn test_large_coupling_is_accepted() {
        let config = FieldConfiguration::new(1.0, 0.5, 1.0).unwrap();
        assert!(!config.is_perturbative());
        assert!(FieldConfiguration::new(1.0, 0.1, 1.0).unwrap().is_perturbative());
    }

    #[test]
    fn test_with_parameter_recomputes_derived() {
        let base = FieldConfiguration::default();
        let swept = base.with_parameter(FieldParameter::CouplingStrength, 0.02).unwrap();

        assert_relative_eq!(swept.alpha(), 0.0002);
        assert_relative_eq!(swept.beta(), 0.02f64.powi(4) / 4.0);
        assert_eq!(swept.temperature(), base.temperature());
        // Base configuration is untouched
        assert_eq!(base, FieldConfiguration::default());
    }

    #[test]
    fn test_with_parameter_validates() {
        let base = FieldConfiguration::default();
        assert!(base.with_parameter(FieldParameter::Temperature, -5.0).is_err());
        assert!(base.with_field_speed(3.5e8).is_err());
        assert!(base.with_field_speed(1.0e8).is_ok());
    }

    #[test]
    fn test_parameter_from_str() {
        assert_eq!(
            "coupling_strength".parse::<FieldParameter>().unwrap(),
            FieldParameter::CouplingStrength
        );
        assert_eq!("Temperature".parse::<FieldParameter>().unwrap(), FieldParameter::Temperature);
        assert!("alpha".parse::<FieldParameter>().is_err());

        for p in FieldParameter::all() {
            assert_eq!(p.name().parse::<FieldParameter>().unwrap(), p);
        }
    }
}
