//! Console and log-file reporting.
//!
//! Every message becomes one `[LOG/<suite>/<test>] <message>` line on the
//! console (colored when enabled) and the same line, uncolored, in the
//! [`LogSink`]. Attribution and the color setting are read from the
//! [`ExecutionContext`] passed to each call. Output failures are swallowed:
//! reporting never fails a test.

use std::io::{self, Write};
use std::time::Duration;

use chrono::Local;
use colored::Colorize;
use faultline_core::{ExecutionContext, Fault, Outcome, RunSummary, Suite};
use faultline_trap::TrapObserver;

use crate::log_sink::LogSink;
use crate::structured_log::{LogEmitter, LogEntry, LogLevel};

/// Coloring class of a console line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Tone {
    Plain,
    Pass,
    Fail,
    Info,
}

pub struct Reporter {
    console: Box<dyn Write>,
    sink: LogSink,
    structured: Option<LogEmitter>,
}

impl Reporter {
    pub fn new(console: impl Write + 'static, sink: LogSink) -> Self {
        Self {
            console: Box::new(console),
            sink,
            structured: None,
        }
    }

    pub fn stdout(sink: LogSink) -> Self {
        Self::new(io::stdout(), sink)
    }

    /// Also write a JSONL event stream.
    #[must_use]
    pub fn with_structured_log(mut self, emitter: LogEmitter) -> Self {
        self.structured = Some(emitter);
        self
    }

    #[must_use]
    pub fn sink(&self) -> &LogSink {
        &self.sink
    }

    /// Log `message` attributed to whatever `ctx` says is running.
    pub fn log(&mut self, ctx: &ExecutionContext, message: &str) {
        self.log_tone(ctx, message, Tone::Plain);
    }

    /// Multi-line messages produce one prefixed line per line.
    pub fn log_tone(&mut self, ctx: &ExecutionContext, message: &str, tone: Tone) {
        let prefix = ctx.prefix();
        let color = ctx.color_enabled();
        if color {
            colored::control::set_override(true);
        }
        for line in message.split('\n') {
            let _ = self.sink.write_line(&format!("{prefix} {line}"));
            let console_line = if color {
                format!("{} {}", prefix.yellow(), paint(line, tone))
            } else {
                format!("{prefix} {line}")
            };
            let _ = writeln!(self.console, "{console_line}");
        }
    }

    /// Log the local date and time.
    pub fn log_time(&mut self, ctx: &ExecutionContext) {
        let now = Local::now().format("%A %c").to_string();
        self.log(ctx, &now);
    }

    /// Opening rule, time line and suite banner.
    pub fn suite_started(&mut self, ctx: &ExecutionContext, suite: &Suite) {
        self.rule('+', suite.name());
        self.log_time(ctx);
        self.log_tone(
            ctx,
            &format!("Running Test Suite: {}", suite.name()),
            Tone::Info,
        );
        self.emit(
            LogEntry::event(LogLevel::Info, "suite_start")
                .with_suite(ctx.suite())
                .with_details(serde_json::json!({ "tests": suite.len() })),
        );
    }

    pub fn test_started(&mut self, ctx: &ExecutionContext) {
        let name = ctx.test().unwrap_or_default().to_string();
        self.log_tone(ctx, &format!("Running Test: {name}..."), Tone::Info);
        self.emit(
            LogEntry::event(LogLevel::Info, "test_start")
                .with_suite(ctx.suite())
                .with_test(ctx.test()),
        );
    }

    /// Standardized pass/fail/fault line plus elapsed time.
    pub fn record_outcome(&mut self, ctx: &ExecutionContext, outcome: &Outcome, elapsed: Duration) {
        let name = ctx.test().unwrap_or_default().to_string();
        let (line, tone) = match outcome {
            Outcome::Passed => (format!("Test \"{name}\" passed."), Tone::Pass),
            Outcome::FailedFault(fault) => match fault.signal {
                Some(signo) => (
                    format!("Test \"{name}\" failed due to signal {signo} ({}).", fault.kind),
                    Tone::Fail,
                ),
                None => (format!("Test \"{name}\" failed due to {fault}."), Tone::Fail),
            },
            Outcome::FailedAssertion { .. } | Outcome::FailedExplicit { .. } => {
                (format!("Test \"{name}\" failed."), Tone::Fail)
            }
        };
        self.log_tone(ctx, &line, tone);
        self.log_tone(
            ctx,
            &format!("\tElapsed time: {:.6}s", elapsed.as_secs_f64()),
            Tone::Info,
        );

        let mut entry = LogEntry::event(level_for(outcome), "test_result")
            .with_suite(ctx.suite())
            .with_test(ctx.test())
            .with_outcome(outcome.kind())
            .with_duration(elapsed);
        if let Some(fault) = outcome.fault() {
            entry = entry.with_fault(fault);
        }
        self.emit(entry);
    }

    /// End-of-suite count block. `ctx` still names the suite, no test.
    pub fn record_summary(&mut self, ctx: &ExecutionContext, summary: &RunSummary) {
        self.log_tone(
            ctx,
            &format!("Test suite \"{}\" summary:", summary.suite),
            Tone::Info,
        );
        self.log(ctx, &format!("Total tests: {}", summary.total));
        self.log_tone(ctx, &format!("Passed tests: {}", summary.passed), Tone::Pass);
        self.log_tone(ctx, &format!("Failed tests: {}", summary.failed), Tone::Fail);
        self.log_tone(ctx, &format!("Pass rate: {}", summary.pass_rate()), Tone::Info);
        self.emit(
            LogEntry::event(LogLevel::Info, "suite_summary")
                .with_suite(Some(summary.suite.as_str()))
                .with_duration(summary.elapsed)
                .with_details(serde_json::json!({
                    "total": summary.total,
                    "passed": summary.passed,
                    "failed": summary.failed,
                })),
        );
    }

    /// Suite runtime line and closing rule.
    pub fn suite_finished(&mut self, ctx: &ExecutionContext, summary: &RunSummary) {
        self.log_tone(
            ctx,
            &format!(
                "Test suite \"{}\" tests ran for {:.6}s.",
                summary.suite,
                summary.elapsed.as_secs_f64()
            ),
            Tone::Info,
        );
        self.rule('-', &summary.suite);
    }

    pub fn run_complete(&mut self, ctx: &ExecutionContext, suites_run: usize, elapsed: Duration) {
        self.log(ctx, &format!("Testing complete. {suites_run} suites ran."));
        self.log(
            ctx,
            &format!(
                "Testing process completed in {:.6}s.",
                elapsed.as_secs_f64()
            ),
        );
        self.emit(
            LogEntry::event(LogLevel::Info, "run_complete")
                .with_duration(elapsed)
                .with_details(serde_json::json!({ "suites_run": suites_run })),
        );
    }

    pub fn flush(&mut self) {
        let _ = self.console.flush();
        let _ = self.sink.flush();
        if let Some(emitter) = self.structured.as_mut() {
            let _ = emitter.flush();
        }
    }

    /// Console-only separator, `20 + len(name)` wide.
    fn rule(&mut self, ch: char, name: &str) {
        let width = 20 + name.chars().count();
        let _ = writeln!(self.console, "{}", ch.to_string().repeat(width));
    }

    fn emit(&mut self, entry: LogEntry) {
        if let Some(emitter) = self.structured.as_mut() {
            let _ = emitter.emit_entry(entry);
        }
    }
}

impl TrapObserver for Reporter {
    fn test_log(&mut self, ctx: &ExecutionContext, message: &str) {
        self.log(ctx, message);
        self.emit(
            LogEntry::event(LogLevel::Debug, "test_log")
                .with_suite(ctx.suite())
                .with_test(ctx.test())
                .with_message(message),
        );
    }

    fn fault_caught(&mut self, ctx: &ExecutionContext, fault: &Fault) {
        let headline = match fault.signal {
            Some(_) => format!("Caught {fault}"),
            None => format!("Caught fault: {fault}"),
        };
        let message = format!(
            "{headline}\n\tError occurred during test: {}\n\tIn test suite: {}",
            ctx.test().unwrap_or("<none>"),
            ctx.suite().unwrap_or("<none>"),
        );
        self.log_tone(ctx, &message, Tone::Fail);
        self.emit(
            LogEntry::event(LogLevel::Error, "fault")
                .with_suite(ctx.suite())
                .with_test(ctx.test())
                .with_fault(fault)
                .with_message(headline),
        );
    }

    fn flush(&mut self) {
        Reporter::flush(self);
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("sink", &self.sink)
            .field("structured", &self.structured)
            .finish_non_exhaustive()
    }
}

fn paint(line: &str, tone: Tone) -> String {
    match tone {
        Tone::Plain => line.to_string(),
        Tone::Pass => line.green().to_string(),
        Tone::Fail => line.red().to_string(),
        Tone::Info => line.yellow().to_string(),
    }
}

fn level_for(outcome: &Outcome) -> LogLevel {
    match outcome {
        Outcome::Passed => LogLevel::Info,
        Outcome::FailedAssertion { .. } | Outcome::FailedExplicit { .. } => LogLevel::Warn,
        Outcome::FailedFault(_) => LogLevel::Error,
    }
}
