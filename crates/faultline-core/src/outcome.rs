//! Test outcomes and fault classification.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Source location of an assertion or explicit failure.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: u32,
}

impl Location {
    #[must_use]
    pub fn new(file: impl Into<String>, line: u32) -> Self {
        Self {
            file: file.into(),
            line,
        }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.file, self.line)
    }
}

/// Class of fatal runtime fault observed while a test body was running.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FaultKind {
    /// Invalid memory access (`SIGSEGV`).
    SegmentationFault,
    /// Misaligned or unmapped bus access (`SIGBUS`).
    BusError,
    /// Arithmetic trap (`SIGFPE`).
    FloatingPointException,
    /// Illegal instruction (`SIGILL`).
    IllegalInstruction,
    /// Abnormal termination request (`SIGABRT`).
    Aborted,
    /// Any other terminating signal.
    OtherSignal,
    /// The body panicked.
    Panic,
    /// The isolated body exited without reporting an outcome.
    AbnormalExit,
}

impl FaultKind {
    /// Human-readable name.
    #[must_use]
    pub const fn description(self) -> &'static str {
        match self {
            Self::SegmentationFault => "Segmentation fault",
            Self::BusError => "Bus error",
            Self::FloatingPointException => "Floating point exception",
            Self::IllegalInstruction => "Illegal instruction",
            Self::Aborted => "Aborted",
            Self::OtherSignal => "Unknown signal",
            Self::Panic => "Panic",
            Self::AbnormalExit => "Abnormal exit",
        }
    }

    /// Stable snake_case label used in machine-readable logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SegmentationFault => "segmentation_fault",
            Self::BusError => "bus_error",
            Self::FloatingPointException => "floating_point_exception",
            Self::IllegalInstruction => "illegal_instruction",
            Self::Aborted => "aborted",
            Self::OtherSignal => "other_signal",
            Self::Panic => "panic",
            Self::AbnormalExit => "abnormal_exit",
        }
    }
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.description())
    }
}

/// A classified fault attributed to one test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fault {
    pub kind: FaultKind,
    /// Terminating signal number, when the fault was a signal.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    /// Panic message or exit status, when available.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl Fault {
    /// Fault raised by a terminating signal.
    #[must_use]
    pub fn signal(kind: FaultKind, signo: i32) -> Self {
        Self {
            kind,
            signal: Some(signo),
            detail: None,
        }
    }

    /// Fault raised by a panic inside the test body.
    #[must_use]
    pub fn panic(message: impl Into<String>) -> Self {
        Self {
            kind: FaultKind::Panic,
            signal: None,
            detail: Some(message.into()),
        }
    }

    /// The isolated body exited with `code` before reporting an outcome.
    #[must_use]
    pub fn abnormal_exit(code: i32) -> Self {
        Self {
            kind: FaultKind::AbnormalExit,
            signal: None,
            detail: Some(format!("status {code}")),
        }
    }
}

impl fmt::Display for Fault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (self.signal, &self.detail) {
            (Some(signo), _) => write!(f, "signal {signo} ({})", self.kind),
            (None, Some(detail)) => write!(f, "{} ({detail})", self.kind),
            (None, None) => write!(f, "{}", self.kind),
        }
    }
}

/// Failure returned by a test body through `Err`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// A boolean check evaluated to false.
    Assertion { condition: String, location: Location },
    /// The test author declared failure directly.
    Explicit { location: Location },
}

/// Return type of every test body.
pub type TestResult = Result<(), Failure>;

/// Classified result of one test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum Outcome {
    Passed,
    FailedAssertion {
        condition: String,
        location: Location,
    },
    FailedExplicit {
        location: Location,
    },
    FailedFault(Fault),
}

/// Outcome discriminant without payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeKind {
    Pass,
    Assertion,
    Explicit,
    Fault,
}

impl OutcomeKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pass => "pass",
            Self::Assertion => "assertion",
            Self::Explicit => "explicit",
            Self::Fault => "fault",
        }
    }
}

impl Outcome {
    #[must_use]
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }

    #[must_use]
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Passed => OutcomeKind::Pass,
            Self::FailedAssertion { .. } => OutcomeKind::Assertion,
            Self::FailedExplicit { .. } => OutcomeKind::Explicit,
            Self::FailedFault(_) => OutcomeKind::Fault,
        }
    }

    /// The fault, if this outcome was a trapped crash.
    #[must_use]
    pub fn fault(&self) -> Option<&Fault> {
        match self {
            Self::FailedFault(fault) => Some(fault),
            _ => None,
        }
    }
}

impl From<Failure> for Outcome {
    fn from(failure: Failure) -> Self {
        match failure {
            Failure::Assertion {
                condition,
                location,
            } => Self::FailedAssertion {
                condition,
                location,
            },
            Failure::Explicit { location } => Self::FailedExplicit { location },
        }
    }
}

impl From<TestResult> for Outcome {
    fn from(result: TestResult) -> Self {
        match result {
            Ok(()) => Self::Passed,
            Err(failure) => failure.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ok_result_is_passed() {
        let outcome = Outcome::from(Ok(()));
        assert!(outcome.is_passed());
        assert_eq!(outcome.kind(), OutcomeKind::Pass);
        assert!(outcome.fault().is_none());
    }

    #[test]
    fn assertion_failure_keeps_condition_and_location() {
        let outcome = Outcome::from(Err(Failure::Assertion {
            condition: "x > 10".to_string(),
            location: Location::new("tests/demo.rs", 17),
        }));
        assert_eq!(outcome.kind(), OutcomeKind::Assertion);
        match outcome {
            Outcome::FailedAssertion {
                condition,
                location,
            } => {
                assert_eq!(condition, "x > 10");
                assert_eq!(location.to_string(), "tests/demo.rs:17");
            }
            other => panic!("unexpected outcome {other:?}"),
        }
    }

    #[test]
    fn fault_display_prefers_signal_number() {
        let fault = Fault::signal(FaultKind::SegmentationFault, 11);
        assert_eq!(fault.to_string(), "signal 11 (Segmentation fault)");
        assert_eq!(
            Fault::panic("index out of bounds").to_string(),
            "Panic (index out of bounds)"
        );
        assert_eq!(
            Fault::abnormal_exit(3).to_string(),
            "Abnormal exit (status 3)"
        );
    }

    #[test]
    fn outcome_wire_format_is_tagged() {
        let outcome = Outcome::FailedFault(Fault::signal(FaultKind::Aborted, 6));
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["outcome"], "failed_fault");
        assert_eq!(json["kind"], "aborted");
        assert_eq!(json["signal"], 6);
        assert!(json.get("detail").is_none());

        let restored: Outcome = serde_json::from_value(json).unwrap();
        assert_eq!(restored, outcome);
    }
}
