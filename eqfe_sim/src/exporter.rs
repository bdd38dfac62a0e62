//! JSON exporter for experiment results.
//!
//! Writes the result contract (experiment, optional analysis and scans) for
//! external report generators and notebooks.

use crate::experiment::ExperimentResult;
use crate::scanner::ScanResult;
use crate::scenarios::{ComprehensiveResult, ExperimentMetadata};
use crate::statistics::StatisticalReport;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Complete experiment export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentExport {
    /// Preset or run label
    pub label: String,

    /// Seed used
    pub seed: u64,

    pub experiment: ExperimentResult,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub statistics: Option<StatisticalReport>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<ExperimentMetadata>,

    /// Parameter sweeps run alongside the experiment
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub scans: Vec<ScanResult>,
}

impl ExperimentExport {
    /// Creates a new export container.
    pub fn new(label: &str, seed: u64, experiment: ExperimentResult) -> Self {
        Self {
            label: label.to_string(),
            seed,
            experiment,
            statistics: None,
            metadata: None,
            scans: Vec::new(),
        }
    }

    /// Wraps a comprehensive experiment, analysis included.
    pub fn from_comprehensive(label: &str, result: ComprehensiveResult) -> Self {
        Self {
            label: label.to_string(),
            seed: result.metadata.seed,
            experiment: result.experiment,
            statistics: Some(result.statistics),
            metadata: Some(result.metadata),
            scans: Vec::new(),
        }
    }

    /// Attaches a statistical report.
    pub fn with_statistics(mut self, report: StatisticalReport) -> Self {
        self.statistics = Some(report);
        self
    }

    /// Adds a parameter sweep.
    pub fn add_scan(&mut self, scan: ScanResult) {
        self.scans.push(scan);
    }

    /// Serializes to pretty-printed JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }

    /// Writes to a JSON file.
    pub fn write_to_file<P: AsRef<Path>>(&self, path: P) -> std::io::Result<()> {
        let json = self.to_json()?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
