//! EQFE Core - Environmental Quantum Field Effects
//!
//! Models how a classical environmental scalar field statistically modifies
//! CHSH Bell-test correlations through the amplification law
//!
//! ```text
//! A(φ,t) = exp[α⟨φ²⟩t − β∫₀ᵗ C(τ) dτ],   α = g²/2,  β = g⁴/4
//! ```
//!
//! and guarantees that every amplified correlation respects the Tsirelson
//! bound 2√2.
//!
//! # Components
//!
//! - [`PhysicalConstants`]: injected constants registry
//! - [`FieldConfiguration`]: immutable, validated physical configuration
//! - [`FieldSimulator`]: field statistics and the amplification law
//! - [`BoundsValidator`]: classical and Tsirelson bound checks
//! - [`EMCouplingModel`]: optional near-field dipole perturbation
//!
//! # Example
//!
//! ```
//! use eqfe_core::{FieldConfiguration, FieldSimulator, TSIRELSON_BOUND};
//!
//! let config = FieldConfiguration::new(1e-6, 1e-3, 300.0).unwrap();
//! let simulator = FieldSimulator::new(config).unwrap();
//!
//! let a = simulator.amplification_factor(1e-6).unwrap();
//! assert!(a > 1.0);
//!
//! let s = simulator.modify_quantum_correlations(TSIRELSON_BOUND, 1.0).unwrap();
//! assert!(s <= TSIRELSON_BOUND);
//! ```

pub mod bounds;
pub mod config;
pub mod constants;
pub mod coupling;
pub mod error;
pub mod field;

pub use bounds::{
    BoundViolation, BoundsValidator, ValidationResult, QUANTUM_ADVANTAGE_KEY, TSIRELSON_KEY,
};
pub use config::{FieldConfiguration, FieldParameter};
pub use constants::{
    PhysicalConstants, CLASSICAL_BOUND, PERTURBATIVE_COUPLING_LIMIT, PHYSICS_TOLERANCE,
    TSIRELSON_BOUND,
};
pub use coupling::{resample_linear, EMCouplingModel};
pub use error::{ensure_all_finite, ensure_finite, EqfeError, PhysicsWarning, Result};
pub use field::{
    ClippedCorrelations, FieldSimulator, MasslessVariance, SimulationParameters, ThermalCutoff,
};
