//! Test runner: drives suites through the fault trap and the reporter.

use std::time::{Duration, Instant};

use chrono::{SecondsFormat, Utc};
use faultline_core::{ExecutionContext, RunSummary, Suite};
use faultline_trap::FaultTrap;
use serde::Serialize;

use crate::config::{HarnessConfig, LogMode};
use crate::error::HarnessError;
use crate::log_sink::LogSink;
use crate::report::{RunReport, SuiteRecord, TestRecord};
use crate::reporter::{Reporter, Tone};
use crate::structured_log::{LogEmitter, new_run_id};

/// Totals returned by [`Harness::finish`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ProcessSummary {
    pub suites_run: usize,
    pub tests_failed: usize,
    pub elapsed: Duration,
}

/// Owns the execution context, reporter and trap for one process run.
#[derive(Debug)]
pub struct Harness {
    ctx: ExecutionContext,
    reporter: Reporter,
    trap: FaultTrap,
    suites_run: usize,
    started: Instant,
    report: RunReport,
    report_path: Option<std::path::PathBuf>,
}

impl Harness {
    /// Open the log sink, build the trap from `config` and log the banner.
    ///
    /// Failing to acquire the log sink is fatal to the run and returned here.
    pub fn init(config: &HarnessConfig) -> Result<Self, HarnessError> {
        let color = config.color_enabled();
        let sink = match config.log_mode {
            LogMode::Handle => LogSink::create(&config.log_path)?,
            LogMode::PerMessage => LogSink::per_message(config.log_path.clone())?,
        };
        let mut reporter = Reporter::stdout(sink);
        if let Some(path) = &config.jsonl_path {
            let emitter =
                LogEmitter::to_file(path, &new_run_id()).map_err(|source| HarnessError::LogSink {
                    path: path.clone(),
                    source,
                })?;
            reporter = reporter.with_structured_log(emitter);
        }
        let trap = FaultTrap::new(config.isolation, config.fault_policy);

        let mut harness = Self::with_parts(reporter, trap, color);
        harness.report_path.clone_from(&config.report_json);
        harness.announce();
        Ok(harness)
    }

    /// Assemble a harness from prebuilt parts without logging anything.
    ///
    /// `color` is the resolved color policy; the reporter reads it from the
    /// execution context.
    #[must_use]
    pub fn with_parts(reporter: Reporter, trap: FaultTrap, color: bool) -> Self {
        Self {
            ctx: ExecutionContext::new(color),
            reporter,
            trap,
            suites_run: 0,
            started: Instant::now(),
            report: RunReport::new(
                "faultline run",
                Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            ),
            report_path: None,
        }
    }

    /// Log the startup banner and time.
    pub fn announce(&mut self) {
        self.reporter.log(&self.ctx, "faultline initialized.");
        self.reporter.log_time(&self.ctx);
    }

    /// Log `message` attributed to whatever is currently running.
    pub fn log(&mut self, message: &str) {
        self.reporter.log(&self.ctx, message);
    }

    #[must_use]
    pub fn context(&self) -> &ExecutionContext {
        &self.ctx
    }

    #[must_use]
    pub fn suites_run(&self) -> usize {
        self.suites_run
    }

    #[must_use]
    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Run every test of `suite` in registration order.
    ///
    /// Test failures of any kind are counted, never returned. Only trap
    /// infrastructure failures (pipe, fork, wait) abort the suite with `Err`.
    pub fn run_suite(&mut self, suite: Suite) -> Result<RunSummary, HarnessError> {
        let started = Instant::now();
        self.ctx.enter_suite(suite.name());
        self.reporter.suite_started(&self.ctx, &suite);
        for name in suite.duplicate_names() {
            self.reporter.log_tone(
                &self.ctx,
                &format!("Duplicate test name \"{name}\"; results are reported in registration order."),
                Tone::Info,
            );
        }

        let mut summary = RunSummary::new(suite.name());
        let mut records = Vec::with_capacity(suite.len());
        for test in suite.tests() {
            self.ctx.enter_test(test.name());
            self.reporter.test_started(&self.ctx);
            let test_started = Instant::now();
            let outcome = match self.trap.invoke(&mut self.ctx, test, &mut self.reporter) {
                Ok(outcome) => outcome,
                Err(err) => {
                    self.ctx.leave_suite();
                    self.reporter.flush();
                    return Err(err.into());
                }
            };
            let elapsed = test_started.elapsed();
            summary.record(&outcome);
            self.reporter.record_outcome(&self.ctx, &outcome, elapsed);
            records.push(TestRecord::new(test.name(), outcome, elapsed));
            self.ctx.leave_test();
        }

        summary.elapsed = started.elapsed();
        self.reporter.record_summary(&self.ctx, &summary);
        self.reporter.suite_finished(&self.ctx, &summary);
        self.reporter.flush();
        self.ctx.leave_suite();
        self.suites_run += 1;
        self.report.push(SuiteRecord {
            summary: summary.clone(),
            tests: records,
        });
        Ok(summary)
    }

    /// Log the closing lines, write the JSON report if configured and
    /// release the log sink.
    pub fn finish(mut self) -> Result<ProcessSummary, HarnessError> {
        let elapsed = self.started.elapsed();
        self.reporter.run_complete(&self.ctx, self.suites_run, elapsed);
        self.reporter.flush();
        if let Some(path) = &self.report_path {
            self.report.write_json(path)?;
        }
        let (_, _, tests_failed) = self.report.totals();
        Ok(ProcessSummary {
            suites_run: self.suites_run,
            tests_failed,
            elapsed,
        })
    }
}
