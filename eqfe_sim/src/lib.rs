//! EQFE Simulation Harness
//!
//! Runs simulated CHSH Bell tests on top of [`eqfe_core`] and characterizes
//! their output statistically.
//!
//! # Pipeline
//!
//! ```text
//! FieldConfiguration ─► FieldSimulator ─► BellExperimentSimulator ─► ExperimentResult
//!                                              │    ▲                       │
//!                                              │    └ EMCouplingModel       ▼
//!                                       ParameterScanner            StatisticalAnalyzer
//!                                              │                            │
//!                                              ▼                            ▼
//!                                          ScanResult               StatisticalReport
//! ```
//!
//! Every simulator owns a ChaCha8 generator seeded explicitly, so runs are
//! reproducible and independent instances never share random state.
//!
//! # Usage
//!
//! ```
//! use eqfe_sim::{BellExperimentSimulator, ExperimentConfig, StatisticalAnalyzer};
//! use eqfe_core::FieldConfiguration;
//!
//! let config = FieldConfiguration::new(1e-6, 1e-3, 300.0).unwrap();
//! let mut sim = BellExperimentSimulator::from_config(config, 42).unwrap();
//!
//! let result = sim.simulate(&ExperimentConfig::with_trials(1_000), None).unwrap();
//! assert!(result.s_mean() > 2.0);
//!
//! let report = StatisticalAnalyzer::default().analyze(&result).unwrap();
//! assert!(report.classical_comparison.test.significant);
//! ```

pub mod experiment;
pub mod exporter;
mod normality;
pub mod scanner;
pub mod scenarios;
pub mod statistics;

pub use experiment::{
    BellExperimentSimulator, ExperimentConfig, ExperimentResult, MeasurementStatistics,
    EM_COUPLING_CAP,
};
pub use exporter::ExperimentExport;
pub use normality::{shapiro_wilk, ShapiroWilk};
pub use scanner::{ParameterScanner, ScanPoint, ScanResult};
pub use scenarios::{comprehensive_experiment, ComprehensiveResult, ExperimentMetadata, Preset};
pub use statistics::{
    ClassicalComparison, ConfidenceInterval, DescriptiveStatistics, HypothesisTest, NormalityTest,
    PhysicsValidation, QuantumComparison, StatisticalAnalyzer, StatisticalReport,
};
