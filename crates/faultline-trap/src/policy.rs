//! What happens after a fault has been attributed and reported.

use std::io::{self, BufRead, Write};

use faultline_core::{ExecutionContext, Fault};

/// Response to a caught fault.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultPolicy {
    /// Record the fault and keep running.
    #[default]
    ContinueOnFault,
    /// Ask an operator whether to stop and re-raise.
    AskOnFault,
    /// Re-raise with default handling, ending the run.
    AbortOnFault,
}

impl FaultPolicy {
    /// Parse a policy name. Unknown values fall back to [`FaultPolicy::ContinueOnFault`].
    #[must_use]
    pub fn from_str_loose(s: &str) -> Self {
        match s.trim().to_ascii_lowercase().as_str() {
            "ask" | "prompt" | "interactive" => Self::AskOnFault,
            "abort" | "reraise" | "raise" | "stop" => Self::AbortOnFault,
            _ => Self::ContinueOnFault,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ContinueOnFault => "continue",
            Self::AskOnFault => "ask",
            Self::AbortOnFault => "abort",
        }
    }

    /// Decide whether `fault` ends the run. Only `AskOnFault` consults `decider`.
    pub fn escalation(
        self,
        fault: &Fault,
        ctx: &ExecutionContext,
        decider: &mut dyn FaultDecider,
    ) -> Escalation {
        match self {
            Self::ContinueOnFault => Escalation::Recover,
            Self::AbortOnFault => Escalation::Reraise,
            Self::AskOnFault => {
                if decider.should_reraise(fault, ctx.suite(), ctx.test()) {
                    Escalation::Reraise
                } else {
                    Escalation::Recover
                }
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Escalation {
    Recover,
    Reraise,
}

/// Source of the operator's answer under [`FaultPolicy::AskOnFault`].
pub trait FaultDecider {
    /// `true` stops testing and re-raises the fault.
    fn should_reraise(&mut self, fault: &Fault, suite: Option<&str>, test: Option<&str>) -> bool;
}

/// Line-oriented yes/no prompt.
///
/// Re-prompts until it reads `Y`/`y` or `N`/`n`. End of input or a read error
/// counts as "no".
pub struct PromptDecider {
    input: Box<dyn BufRead>,
    output: Box<dyn Write>,
}

impl PromptDecider {
    pub fn new(input: impl BufRead + 'static, output: impl Write + 'static) -> Self {
        Self {
            input: Box::new(input),
            output: Box::new(output),
        }
    }

    /// Prompt on stdout, answer on stdin.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(io::BufReader::new(io::stdin()), io::stdout())
    }

    fn ask(&mut self, fault: &Fault, suite: Option<&str>, test: Option<&str>) -> io::Result<bool> {
        let mut line = String::new();
        loop {
            write!(
                self.output,
                "Caught {fault} in suite \"{}\", test \"{}\". Stop testing and re-raise? [Y/y|N/n] ",
                suite.unwrap_or("?"),
                test.unwrap_or("?"),
            )?;
            self.output.flush()?;
            line.clear();
            if self.input.read_line(&mut line)? == 0 {
                writeln!(self.output)?;
                return Ok(false);
            }
            match line.trim() {
                "Y" | "y" => return Ok(true),
                "N" | "n" => return Ok(false),
                _ => {}
            }
        }
    }
}

impl FaultDecider for PromptDecider {
    fn should_reraise(&mut self, fault: &Fault, suite: Option<&str>, test: Option<&str>) -> bool {
        self.ask(fault, suite, test).unwrap_or(false)
    }
}

impl std::fmt::Debug for PromptDecider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptDecider").finish_non_exhaustive()
    }
}
