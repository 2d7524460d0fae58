//! Runner, reporter and log sink for the faultline test harness.
//!
//! ```ignore
//! let mut harness = Harness::init(&HarnessConfig::from_cli())?;
//! harness.run_suite(Suite::new("Example").with_test("T1", |ctx| {
//!     check!(ctx, 5 + 10 == 15);
//!     pass!();
//! }))?;
//! harness.finish()?;
//! ```

pub mod config;
pub mod error;
pub mod log_sink;
pub mod report;
pub mod reporter;
pub mod runner;
pub mod structured_log;

pub use config::{ColorPolicy, HarnessArgs, HarnessConfig, LogMode, detect_color_support};
pub use error::HarnessError;
pub use log_sink::{LogSink, MemoryLog};
pub use report::{RunReport, SuiteRecord, TestRecord};
pub use reporter::{Reporter, Tone};
pub use runner::{Harness, ProcessSummary};
pub use structured_log::{LogEmitter, LogEntry, LogLevel, validate_log_file, validate_log_line};
