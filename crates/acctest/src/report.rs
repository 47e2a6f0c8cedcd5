//! Run reports.

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use declarative::ExecuteSummary;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseStatus {
    Passed,
    Failed,
    Skipped,
}

impl CaseStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Passed => "passed",
            Self::Failed => "failed",
            Self::Skipped => "skipped",
        }
    }
}

/// Result of one step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    pub index: usize,
    pub passed: bool,
    /// Pending changes of the pre-apply plan
    pub plan: String,
    /// Error the step expected and got
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Device commands the apply sent
    #[serde(default)]
    pub applied: ExecuteSummary,
    pub duration_ms: u64,
}

/// Result of one scenario case.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaseReport {
    pub name: String,
    pub prefix: String,
    pub status: CaseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub steps: Vec<StepReport>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub teardown_error: Option<String>,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
}

impl CaseReport {
    pub fn skipped(name: &str, reason: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            prefix: String::new(),
            status: CaseStatus::Skipped,
            reason: Some(reason.into()),
            steps: Vec::new(),
            teardown_error: None,
            started_at: now,
            finished_at: now,
            duration_ms: 0,
        }
    }

    pub fn passed(&self) -> bool {
        self.status == CaseStatus::Passed
    }

    /// Device commands sent across every step.
    pub fn applied(&self) -> ExecuteSummary {
        let mut total = ExecuteSummary::default();
        for step in &self.steps {
            total.merge(&step.applied);
        }
        total
    }

    /// First failure message, step errors before teardown.
    pub fn failure(&self) -> Option<&str> {
        self.steps
            .iter()
            .find_map(|s| s.error.as_deref())
            .or(self.teardown_error.as_deref())
    }
}

/// Result of a whole run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub cases: Vec<CaseReport>,
}

impl RunReport {
    fn count(&self, status: CaseStatus) -> usize {
        self.cases.iter().filter(|c| c.status == status).count()
    }

    pub fn passed(&self) -> usize {
        self.count(CaseStatus::Passed)
    }

    pub fn failed(&self) -> usize {
        self.count(CaseStatus::Failed)
    }

    pub fn skipped(&self) -> usize {
        self.count(CaseStatus::Skipped)
    }

    pub fn success(&self) -> bool {
        self.failed() == 0
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        fs::write(path, self.to_json()?)
            .with_context(|| format!("Failed to write report {}", path.display()))
    }
}
