//! Execution results and reporting

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

use super::verification::VerificationResult;

/// Report from scenario execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionReport {
    pub scenario_name: String,

    /// Timestamp (ISO 8601)
    pub timestamp: String,

    pub passed: bool,

    /// Simulation ticks executed
    pub ticks_executed: usize,

    /// Simulated time covered by those ticks (seconds)
    pub simulated_seconds: f32,

    pub actions_executed: usize,

    /// Input events whose edit was rejected
    pub rejected_inputs: usize,

    /// Verification failures (empty if all passed)
    pub verification_failures: Vec<VerificationResult>,

    /// Execution log messages
    pub log: Vec<String>,

    /// Total wall-clock time (milliseconds)
    pub duration_ms: f64,
}

impl ExecutionReport {
    pub fn new(scenario_name: String) -> Self {
        Self {
            scenario_name,
            timestamp: chrono::Utc::now().to_rfc3339(),
            passed: false,
            ticks_executed: 0,
            simulated_seconds: 0.0,
            actions_executed: 0,
            rejected_inputs: 0,
            verification_failures: Vec::new(),
            log: Vec::new(),
            duration_ms: 0.0,
        }
    }

    /// Check if all verifications passed
    pub fn success(&self) -> bool {
        self.verification_failures.is_empty()
    }

    pub fn summary(&self) -> String {
        format!(
            "{}: {} | {} actions, {} ticks ({:.2}s simulated) in {:.1}ms",
            self.scenario_name,
            if self.passed { "PASSED" } else { "FAILED" },
            self.actions_executed,
            self.ticks_executed,
            self.simulated_seconds,
            self.duration_ms
        )
    }

    /// Save report to JSON file
    pub fn save_json(&self, path: impl AsRef<Path>) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize execution report to JSON")?;

        if let Some(parent) = path.as_ref().parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        std::fs::write(path.as_ref(), json).with_context(|| {
            format!(
                "Failed to write execution report: {}",
                path.as_ref().display()
            )
        })?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_execution_report_json() {
        let mut report = ExecutionReport::new("Test Scenario".to_string());
        report.passed = true;
        report.ticks_executed = 120;
        report.log.push("Test log message".to_string());

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("reports").join("report.json");
        report.save_json(&path).unwrap();

        let json = std::fs::read_to_string(&path).unwrap();
        assert!(json.contains("Test Scenario"));
        assert!(json.contains("\"ticks_executed\": 120"));
    }

    #[test]
    fn test_success_check() {
        let mut report = ExecutionReport::new("Test".to_string());
        assert!(report.success(), "Should succeed with no failures");

        report.verification_failures.push(VerificationResult {
            passed: false,
            message: "Test failure".to_string(),
            actual_value: None,
        });
        assert!(!report.success(), "Should fail with verification failures");
    }
}
