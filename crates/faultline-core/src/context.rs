//! Execution context: which suite and test are currently running.
//!
//! The runner owns one [`ExecutionContext`] and hands it by reference to the
//! fault trap and the reporter for attribution. `suite`/`test` are `Some`
//! exactly while a suite/test is executing.

use crate::outcome::Fault;

/// Attribution record for the suite/test in flight.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionContext {
    suite: Option<String>,
    test: Option<String>,
    last_fault: Option<Fault>,
    color_enabled: bool,
}

impl ExecutionContext {
    #[must_use]
    pub fn new(color_enabled: bool) -> Self {
        Self {
            color_enabled,
            ..Self::default()
        }
    }

    /// Mark `name` as the running suite. Clears any stale test attribution.
    pub fn enter_suite(&mut self, name: impl Into<String>) {
        self.suite = Some(name.into());
        self.test = None;
    }

    pub fn enter_test(&mut self, name: impl Into<String>) {
        self.test = Some(name.into());
    }

    pub fn leave_test(&mut self) {
        self.test = None;
    }

    pub fn leave_suite(&mut self) {
        self.test = None;
        self.suite = None;
    }

    pub fn record_fault(&mut self, fault: Fault) {
        self.last_fault = Some(fault);
    }

    #[must_use]
    pub fn suite(&self) -> Option<&str> {
        self.suite.as_deref()
    }

    #[must_use]
    pub fn test(&self) -> Option<&str> {
        self.test.as_deref()
    }

    /// Most recent fault trapped during this context's lifetime.
    #[must_use]
    pub fn last_fault(&self) -> Option<&Fault> {
        self.last_fault.as_ref()
    }

    #[must_use]
    pub fn color_enabled(&self) -> bool {
        self.color_enabled
    }

    /// `[LOG/<suite>/<test>]` prefix for the current attribution.
    #[must_use]
    pub fn prefix(&self) -> String {
        log_prefix(self.suite(), self.test())
    }
}

/// Format the bracketed log prefix, omitting absent segments and their slash.
#[must_use]
pub fn log_prefix(suite: Option<&str>, test: Option<&str>) -> String {
    let mut prefix = String::from("[LOG");
    if let Some(suite) = suite {
        prefix.push('/');
        prefix.push_str(suite);
    }
    if let Some(test) = test {
        prefix.push('/');
        prefix.push_str(test);
    }
    prefix.push(']');
    prefix
}
