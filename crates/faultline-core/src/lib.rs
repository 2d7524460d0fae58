//! Core data model for the faultline test harness.
//!
//! This crate provides:
//! - Suite registry: [`Suite`] and [`Test`], ordered and append-only
//! - Outcomes: [`Outcome`], [`Fault`], [`FaultKind`] and the body-level [`Failure`]
//! - Attribution: [`ExecutionContext`] for the suite/test in flight
//! - Assertion protocol: [`TestContext`] plus the `check*!`, `pass!`, `fail!` macros
//! - Aggregation: [`RunSummary`] and [`PassRate`]

#![deny(unsafe_code)]

pub mod context;
mod macros;
pub mod outcome;
pub mod registry;
pub mod summary;
pub mod test_context;

pub use context::{ExecutionContext, log_prefix};
pub use outcome::{Failure, Fault, FaultKind, Location, Outcome, OutcomeKind, TestResult};
pub use registry::{Suite, Test, TestBody};
pub use summary::{PassRate, RunSummary};
pub use test_context::{BufferedEvents, EventSink, TestContext, TestEvent};
