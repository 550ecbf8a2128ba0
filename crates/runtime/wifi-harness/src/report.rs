//! Conformance report

use crate::config::HarnessConfig;
use crate::scenario::{ScenarioOutcome, ScenarioResult};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Write;
use std::path::Path;
use wifi_error::{HarnessError, HarnessResult};

/// Outcome counts over every recorded scenario
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub skipped: usize,
}

/// Result of one conformance run, serialized to JSON by the runner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConformanceReport {
    /// RFC 3339
    pub start_time: String,
    pub end_time: String,
    pub config: HarnessConfig,
    pub results: Vec<ScenarioResult>,
    pub summary: ReportSummary,
}

impl ConformanceReport {
    /// Start a report; `start_time` is taken now
    pub fn new(config: HarnessConfig) -> Self {
        Self {
            start_time: chrono::Utc::now().to_rfc3339(),
            end_time: String::new(),
            config,
            results: Vec::new(),
            summary: ReportSummary::default(),
        }
    }

    /// Record one scenario result and update the summary
    pub fn add_result(&mut self, result: ScenarioResult) {
        self.summary.total += 1;
        match &result.outcome {
            ScenarioOutcome::Passed => self.summary.passed += 1,
            ScenarioOutcome::Failed { .. } => self.summary.failed += 1,
            ScenarioOutcome::Skipped { .. } => self.summary.skipped += 1,
        }
        self.results.push(result);
    }

    pub fn extend(&mut self, results: impl IntoIterator<Item = ScenarioResult>) {
        for result in results {
            self.add_result(result);
        }
    }

    /// Stamp `end_time`
    pub fn finish(&mut self) {
        self.end_time = chrono::Utc::now().to_rfc3339();
    }

    /// No scenario failed; skipped scenarios do not count against the run
    pub fn is_success(&self) -> bool {
        self.summary.failed == 0
    }

    /// Failed results in execution order
    pub fn failures(&self) -> impl Iterator<Item = &ScenarioResult> {
        self.results.iter().filter(|r| r.outcome.is_failed())
    }

    pub fn to_json(&self) -> HarnessResult<String> {
        serde_json::to_string_pretty(self)
            .map_err(|e| HarnessError::Configuration(format!("report serialization: {}", e)))
    }

    /// Write the pretty-printed JSON report to `path`
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let json = serde_json::to_string_pretty(self)?;
        let mut file = File::create(path)?;
        file.write_all(json.as_bytes())?;
        Ok(())
    }
}
