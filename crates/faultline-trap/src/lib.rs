//! Fault trap for the faultline harness.
//!
//! Each test body runs in a forked child process. A fatal signal in the body
//! kills only the child; the parent reads the terminating signal from the wait
//! status and turns it into [`Outcome::FailedFault`] attributed to the test in
//! flight. Log lines the body emitted before crashing are streamed to the
//! parent as they are written, so they survive the crash.
//!
//! [`Isolation::InProcess`] skips the fork: panics are still caught, fatal
//! signals are not. It exists for stepping through a body under a debugger.

mod child;
pub mod error;
pub mod policy;
pub mod signal;

use faultline_core::{ExecutionContext, Fault, Outcome, Test};

pub use error::TrapError;
pub use policy::{Escalation, FaultDecider, FaultPolicy, PromptDecider};
pub use signal::{TRAPPED_SIGNALS, classify_signal, fault_from_signal, reraise};

/// Where a test body executes.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Isolation {
    /// One forked child per test.
    #[default]
    Fork,
    /// Same thread as the runner; panics only.
    InProcess,
}

impl Isolation {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fork => "fork",
            Self::InProcess => "in-process",
        }
    }
}

/// Parent-side callbacks fired while a test runs.
pub trait TrapObserver {
    /// A log line arrived from the running body.
    fn test_log(&mut self, ctx: &ExecutionContext, message: &str);
    /// A fault was attributed to `ctx`'s current test, before any escalation.
    fn fault_caught(&mut self, ctx: &ExecutionContext, fault: &Fault);
    /// Push buffered output to its destination. Called after `fault_caught`
    /// and before the fault policy runs, since a re-raise never returns.
    fn flush(&mut self) {}
}

/// Observer that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullObserver;

impl TrapObserver for NullObserver {
    fn test_log(&mut self, _ctx: &ExecutionContext, _message: &str) {}
    fn fault_caught(&mut self, _ctx: &ExecutionContext, _fault: &Fault) {}
}

/// Runs test bodies under a fault policy.
pub struct FaultTrap {
    isolation: Isolation,
    policy: FaultPolicy,
    decider: Box<dyn FaultDecider>,
}

impl FaultTrap {
    /// Trap that prompts on stdin/stdout under [`FaultPolicy::AskOnFault`].
    #[must_use]
    pub fn new(isolation: Isolation, policy: FaultPolicy) -> Self {
        Self {
            isolation,
            policy,
            decider: Box::new(PromptDecider::stdio()),
        }
    }

    /// Replace the decider consulted under [`FaultPolicy::AskOnFault`].
    #[must_use]
    pub fn with_decider(mut self, decider: impl FaultDecider + 'static) -> Self {
        self.decider = Box::new(decider);
        self
    }

    #[must_use]
    pub fn isolation(&self) -> Isolation {
        self.isolation
    }

    #[must_use]
    pub fn policy(&self) -> FaultPolicy {
        self.policy
    }

    /// Invoke `test` and classify how it ended.
    ///
    /// `ctx` must already name the suite and test being run. On a fault the
    /// fault is recorded in `ctx` and reported to `observer` before the policy
    /// is applied; a re-raise does not return.
    pub fn invoke(
        &mut self,
        ctx: &mut ExecutionContext,
        test: &Test,
        observer: &mut dyn TrapObserver,
    ) -> Result<Outcome, TrapError> {
        let suite = ctx.suite().unwrap_or_default().to_string();
        let outcome = {
            let attributed: &ExecutionContext = ctx;
            let mut on_log = |message: String| observer.test_log(attributed, &message);
            match self.isolation {
                Isolation::Fork => child::run_forked(&suite, test, &mut on_log)?,
                Isolation::InProcess => child::run_in_process(&suite, test, &mut on_log),
            }
        };

        if let Outcome::FailedFault(fault) = &outcome {
            ctx.record_fault(fault.clone());
            observer.fault_caught(ctx, fault);
            observer.flush();
            if self.policy.escalation(fault, ctx, self.decider.as_mut()) == Escalation::Reraise {
                reraise(fault);
            }
        }
        Ok(outcome)
    }
}

impl std::fmt::Debug for FaultTrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FaultTrap")
            .field("isolation", &self.isolation)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}
