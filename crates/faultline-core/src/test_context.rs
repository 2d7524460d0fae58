//! Per-invocation handle given to test bodies.
//!
//! A body never writes to the console or log file itself. Everything it wants
//! reported travels as a [`TestEvent`] through an [`EventSink`], which lets an
//! isolated child process stream its log lines to the parent runner.

use std::cell::RefCell;

use serde::{Deserialize, Serialize};

use crate::outcome::{Failure, Location, Outcome};

/// Message emitted from inside a test invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TestEvent {
    Log { message: String },
    Finished { outcome: Outcome },
}

/// Destination for events produced by a running test body.
pub trait EventSink {
    fn emit(&self, event: TestEvent);
}

/// Sink that keeps events in memory, in emission order.
#[derive(Debug, Default)]
pub struct BufferedEvents {
    events: RefCell<Vec<TestEvent>>,
}

impl BufferedEvents {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Drain everything recorded so far.
    pub fn take(&self) -> Vec<TestEvent> {
        std::mem::take(&mut *self.events.borrow_mut())
    }
}

impl EventSink for BufferedEvents {
    fn emit(&self, event: TestEvent) {
        self.events.borrow_mut().push(event);
    }
}

/// Handle through which a test body logs and fails.
pub struct TestContext<'a> {
    suite: &'a str,
    test: &'a str,
    sink: &'a dyn EventSink,
}

impl<'a> TestContext<'a> {
    #[must_use]
    pub fn new(suite: &'a str, test: &'a str, sink: &'a dyn EventSink) -> Self {
        Self { suite, test, sink }
    }

    #[must_use]
    pub fn suite(&self) -> &str {
        self.suite
    }

    #[must_use]
    pub fn test(&self) -> &str {
        self.test
    }

    /// Log a message attributed to the running suite/test.
    pub fn log(&self, message: impl Into<String>) {
        self.sink.emit(TestEvent::Log {
            message: message.into(),
        });
    }

    /// Record a failed assertion and produce the failure that ends the test.
    ///
    /// Order is fixed: the condition text, then `message`, then `cleanup`
    /// (run exactly once), then the failure banner. Called by the `check*!`
    /// macros; the cleanup is only ever constructed on this failing path.
    pub fn assertion_failed<F: FnOnce()>(
        &self,
        condition: &str,
        location: Location,
        message: Option<String>,
        cleanup: Option<F>,
    ) -> Failure {
        self.log(format!("Assertion failed: {condition}"));
        if let Some(message) = message {
            self.log(message);
        }
        if let Some(cleanup) = cleanup {
            cleanup();
        }
        self.log_fail_banner(&location);
        Failure::Assertion {
            condition: condition.to_string(),
            location,
        }
    }

    /// Record an explicit failure declared by the test author.
    pub fn explicit_failure(&self, location: Location) -> Failure {
        self.log_fail_banner(&location);
        Failure::Explicit { location }
    }

    fn log_fail_banner(&self, location: &Location) {
        self.log(format!(
            "Fail in Suite:\"{}\", Test:\"{}\" at {location}",
            self.suite, self.test
        ));
    }
}

impl std::fmt::Debug for TestContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TestContext")
            .field("suite", &self.suite)
            .field("test", &self.test)
            .finish_non_exhaustive()
    }
}
