//! Per-suite aggregation.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::outcome::Outcome;

/// Counts for one suite run. Derived per run, never persisted across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub suite: String,
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub elapsed: Duration,
}

impl RunSummary {
    #[must_use]
    pub fn new(suite: impl Into<String>) -> Self {
        Self {
            suite: suite.into(),
            total: 0,
            passed: 0,
            failed: 0,
            elapsed: Duration::ZERO,
        }
    }

    /// Count one outcome. Faults count as ordinary failures.
    pub fn record(&mut self, outcome: &Outcome) {
        self.total += 1;
        if outcome.is_passed() {
            self.passed += 1;
        } else {
            self.failed += 1;
        }
    }

    #[must_use]
    pub fn pass_rate(&self) -> PassRate {
        if self.total == 0 {
            return PassRate::NoTests;
        }
        PassRate::Percent(self.passed as f64 / self.total as f64 * 100.0)
    }

    #[must_use]
    pub fn all_passed(&self) -> bool {
        self.failed == 0
    }
}

/// Pass rate with a defined value for empty suites.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PassRate {
    NoTests,
    Percent(f64),
}

impl fmt::Display for PassRate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoTests => f.write_str("no tests"),
            Self::Percent(pct) => write!(f, "{pct:.2}%"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::outcome::{Fault, FaultKind, Location};

    #[test]
    fn empty_suite_reports_no_tests() {
        let summary = RunSummary::new("Empty");
        assert_eq!(summary.pass_rate(), PassRate::NoTests);
        assert_eq!(summary.pass_rate().to_string(), "no tests");
        assert!(summary.all_passed());
    }

    #[test]
    fn half_passing_is_fifty_percent() {
        let mut summary = RunSummary::new("Example");
        summary.record(&Outcome::Passed);
        summary.record(&Outcome::FailedAssertion {
            condition: "x > 10".to_string(),
            location: Location::new("t.rs", 1),
        });
        assert_eq!(summary.total, 2);
        assert_eq!(summary.passed, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.pass_rate().to_string(), "50.00%");
    }

    #[test]
    fn faults_count_as_failures() {
        let mut summary = RunSummary::new("Crash");
        summary.record(&Outcome::FailedFault(Fault::signal(
            FaultKind::SegmentationFault,
            11,
        )));
        summary.record(&Outcome::FailedExplicit {
            location: Location::new("t.rs", 2),
        });
        summary.record(&Outcome::Passed);
        assert_eq!(summary.passed + summary.failed, summary.total);
        assert_eq!(summary.failed, 2);
        assert_eq!(summary.pass_rate().to_string(), "33.33%");
    }
}
