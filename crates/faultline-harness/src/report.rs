//! Whole-run report: every suite summary plus per-test records.

use std::path::Path;
use std::time::Duration;

use faultline_core::{Outcome, RunSummary};
use serde::{Deserialize, Serialize};

use crate::error::HarnessError;

/// One test invocation as it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TestRecord {
    pub name: String,
    pub outcome: Outcome,
    pub elapsed_secs: f64,
}

impl TestRecord {
    #[must_use]
    pub fn new(name: impl Into<String>, outcome: Outcome, elapsed: Duration) -> Self {
        Self {
            name: name.into(),
            outcome,
            elapsed_secs: elapsed.as_secs_f64(),
        }
    }

    /// Short status column: PASS, FAIL or FAULT.
    #[must_use]
    pub fn status(&self) -> &'static str {
        match &self.outcome {
            Outcome::Passed => "PASS",
            Outcome::FailedFault(_) => "FAULT",
            Outcome::FailedAssertion { .. } | Outcome::FailedExplicit { .. } => "FAIL",
        }
    }

    fn detail(&self) -> String {
        match &self.outcome {
            Outcome::Passed => String::new(),
            Outcome::FailedAssertion {
                condition,
                location,
            } => format!("`{condition}` at {location}"),
            Outcome::FailedExplicit { location } => format!("explicit fail at {location}"),
            Outcome::FailedFault(fault) => fault.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuiteRecord {
    pub summary: RunSummary,
    pub tests: Vec<TestRecord>,
}

/// Report over every suite run by one harness.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub title: String,
    /// Start of the run (UTC, RFC 3339).
    pub timestamp: String,
    pub suites: Vec<SuiteRecord>,
}

impl RunReport {
    #[must_use]
    pub fn new(title: impl Into<String>, timestamp: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            timestamp: timestamp.into(),
            suites: Vec::new(),
        }
    }

    pub fn push(&mut self, suite: SuiteRecord) {
        self.suites.push(suite);
    }

    /// `(total, passed, failed)` over all suites.
    #[must_use]
    pub fn totals(&self) -> (usize, usize, usize) {
        self.suites.iter().fold((0, 0, 0), |(t, p, f), s| {
            (t + s.summary.total, p + s.summary.passed, f + s.summary.failed)
        })
    }

    /// Number of tests that ended in a fault.
    #[must_use]
    pub fn faults(&self) -> usize {
        self.suites
            .iter()
            .flat_map(|s| &s.tests)
            .filter(|t| t.outcome.fault().is_some())
            .count()
    }

    /// Render the report as markdown.
    #[must_use]
    pub fn to_markdown(&self) -> String {
        let (total, passed, failed) = self.totals();
        let mut out = String::new();
        out.push_str(&format!("# {}\n\n", self.title));
        out.push_str(&format!("- Timestamp: {}\n", self.timestamp));
        out.push_str(&format!("- Suites: {}\n", self.suites.len()));
        out.push_str(&format!("- Total: {total}\n"));
        out.push_str(&format!("- Passed: {passed}\n"));
        out.push_str(&format!("- Failed: {failed}\n"));
        out.push_str(&format!("- Faults: {}\n\n", self.faults()));

        out.push_str("| Suite | Test | Status | Detail |\n");
        out.push_str("|-------|------|--------|--------|\n");
        for suite in &self.suites {
            for test in &suite.tests {
                out.push_str(&format!(
                    "| {} | {} | {} | {} |\n",
                    suite.summary.suite,
                    test.name,
                    test.status(),
                    test.detail().replace('|', "\\|")
                ));
            }
        }
        out
    }

    /// Render the report as JSON.
    #[must_use]
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
    }

    pub fn write_json(&self, path: &Path) -> Result<(), HarnessError> {
        std::fs::write(path, self.to_json()).map_err(|source| HarnessError::Report {
            path: path.to_path_buf(),
            source,
        })
    }
}
