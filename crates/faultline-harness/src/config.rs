//! Harness configuration: defaults, environment overrides and CLI flags.
//!
//! Precedence, lowest first: [`HarnessConfig::default`], environment
//! (`FAULTLINE_LOG`, `NO_COLOR`, `FAULTLINE_FAULT_POLICY`), then
//! [`HarnessArgs`].

use std::env;
use std::path::PathBuf;

use clap::Parser;
use faultline_trap::{FaultPolicy, Isolation};

/// Default human log file, relative to the working directory.
pub const DEFAULT_LOG_PATH: &str = "testing.log";

/// TERM values known to understand ANSI color.
const COLOR_TERMS: [&str; 13] = [
    "xterm", "color", "ansi", "cygwin", "linux", "screen", "tmux", "vt100", "rxvt", "konsole",
    "gnome", "eterm", "vscode",
];

/// Whether console output is colored.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ColorPolicy {
    /// Color when the terminal advertises support.
    #[default]
    Auto,
    Always,
    Never,
}

impl ColorPolicy {
    /// Resolve to a plain on/off, probing the terminal only for `Auto`.
    #[must_use]
    pub fn resolve(self, detect: impl FnOnce() -> bool) -> bool {
        match self {
            Self::Auto => detect(),
            Self::Always => true,
            Self::Never => false,
        }
    }
}

/// How the human log file is held open.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogMode {
    /// One handle for the whole run, truncated at start.
    #[default]
    Handle,
    /// Open and close for every line, appending.
    PerMessage,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessConfig {
    pub log_path: PathBuf,
    pub log_mode: LogMode,
    pub color: ColorPolicy,
    pub fault_policy: FaultPolicy,
    pub isolation: Isolation,
    /// JSONL structured event log.
    pub jsonl_path: Option<PathBuf>,
    /// JSON run report written by `Harness::finish`.
    pub report_json: Option<PathBuf>,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            log_path: PathBuf::from(DEFAULT_LOG_PATH),
            log_mode: LogMode::default(),
            color: ColorPolicy::default(),
            fault_policy: FaultPolicy::default(),
            isolation: Isolation::default(),
            jsonl_path: None,
            report_json: None,
        }
    }
}

impl HarnessConfig {
    /// Defaults with process environment overrides.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Defaults with overrides read through `lookup`.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(path) = lookup("FAULTLINE_LOG").filter(|v| !v.is_empty()) {
            config.log_path = PathBuf::from(path);
        }
        if lookup("NO_COLOR").is_some_and(|v| !v.is_empty()) {
            config.color = ColorPolicy::Never;
        }
        if let Some(policy) = lookup("FAULTLINE_FAULT_POLICY") {
            config.fault_policy = FaultPolicy::from_str_loose(&policy);
        }
        config
    }

    /// Parse the process command line over the environment configuration.
    ///
    /// `--help` prints usage and exits the process with status 0.
    #[must_use]
    pub fn from_cli() -> Self {
        Self::from_env().with_args(&HarnessArgs::parse())
    }

    /// Apply command-line flags on top of `self`.
    #[must_use]
    pub fn with_args(mut self, args: &HarnessArgs) -> Self {
        if args.no_color {
            self.color = ColorPolicy::Never;
        }
        if args.ask_signal {
            self.fault_policy = FaultPolicy::AskOnFault;
        }
        if args.abort_on_fault {
            self.fault_policy = FaultPolicy::AbortOnFault;
        }
        if let Some(path) = &args.log {
            self.log_path.clone_from(path);
        }
        if args.log_per_message {
            self.log_mode = LogMode::PerMessage;
        }
        if args.in_process {
            self.isolation = Isolation::InProcess;
        }
        if args.jsonl.is_some() {
            self.jsonl_path.clone_from(&args.jsonl);
        }
        if args.report_json.is_some() {
            self.report_json.clone_from(&args.report_json);
        }
        self
    }

    /// Resolved color switch for the reporter.
    #[must_use]
    pub fn color_enabled(&self) -> bool {
        self.color.resolve(detect_color_support)
    }
}

/// Command-line flags of a faultline test binary.
#[derive(Debug, Clone, Default, Parser)]
#[command(about = "Run faultline test suites")]
pub struct HarnessArgs {
    /// Disable colored output.
    #[arg(long = "no-color", visible_alias = "nc")]
    pub no_color: bool,
    /// Ask whether to stop and re-raise after a fault is caught.
    #[arg(short = 'a', long = "ask-signal", conflicts_with = "abort_on_fault")]
    pub ask_signal: bool,
    /// Re-raise the first fault caught, ending the run.
    #[arg(long)]
    pub abort_on_fault: bool,
    /// Log file path.
    #[arg(short = 'l', long = "log", value_name = "PATH")]
    pub log: Option<PathBuf>,
    /// Reopen the log file for every line instead of holding it open.
    #[arg(long)]
    pub log_per_message: bool,
    /// Write a JSONL structured event log.
    #[arg(long, value_name = "PATH")]
    pub jsonl: Option<PathBuf>,
    /// Write a JSON run report when testing completes.
    #[arg(long, value_name = "PATH")]
    pub report_json: Option<PathBuf>,
    /// Run test bodies in this process. Panics are caught, fatal signals are not.
    #[arg(long)]
    pub in_process: bool,
}

/// Whether the terminal described by the environment supports color.
#[must_use]
pub fn detect_color_support() -> bool {
    color_support_from(|key| env::var(key).ok())
}

/// [`detect_color_support`] over an explicit variable lookup.
#[must_use]
pub fn color_support_from(lookup: impl Fn(&str) -> Option<String>) -> bool {
    if let Some(term) = lookup("TERM") {
        let term = term.to_ascii_lowercase();
        if COLOR_TERMS.iter().any(|known| term.contains(known)) {
            return true;
        }
    }
    lookup("COLORTERM").is_some_and(|v| {
        let v = v.to_ascii_lowercase();
        v == "truecolor" || v == "24bit"
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env_of(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn defaults() {
        let config = HarnessConfig::from_lookup(env_of(&[]));
        assert_eq!(config, HarnessConfig::default());
        assert_eq!(config.log_path, PathBuf::from("testing.log"));
        assert_eq!(config.fault_policy, FaultPolicy::ContinueOnFault);
        assert_eq!(config.isolation, Isolation::Fork);
    }

    #[test]
    fn environment_overrides() {
        let config = HarnessConfig::from_lookup(env_of(&[
            ("FAULTLINE_LOG", "/tmp/run.log"),
            ("NO_COLOR", "1"),
            ("FAULTLINE_FAULT_POLICY", "Ask"),
        ]));
        assert_eq!(config.log_path, PathBuf::from("/tmp/run.log"));
        assert_eq!(config.color, ColorPolicy::Never);
        assert_eq!(config.fault_policy, FaultPolicy::AskOnFault);
        assert!(!config.color_enabled());
    }

    #[test]
    fn empty_no_color_is_ignored() {
        let config = HarnessConfig::from_lookup(env_of(&[("NO_COLOR", "")]));
        assert_eq!(config.color, ColorPolicy::Auto);
    }

    #[test]
    fn flags_override_environment() {
        let args = HarnessArgs::try_parse_from([
            "demo",
            "--nc",
            "-a",
            "-l",
            "custom.log",
            "--jsonl",
            "events.jsonl",
            "--in-process",
        ])
        .unwrap();
        let config =
            HarnessConfig::from_lookup(env_of(&[("FAULTLINE_LOG", "env.log")])).with_args(&args);
        assert_eq!(config.color, ColorPolicy::Never);
        assert_eq!(config.fault_policy, FaultPolicy::AskOnFault);
        assert_eq!(config.log_path, PathBuf::from("custom.log"));
        assert_eq!(config.jsonl_path, Some(PathBuf::from("events.jsonl")));
        assert_eq!(config.isolation, Isolation::InProcess);
        assert_eq!(config.report_json, None);
    }

    #[test]
    fn ask_and_abort_conflict() {
        assert!(HarnessArgs::try_parse_from(["demo", "-a", "--abort-on-fault"]).is_err());
        let args = HarnessArgs::try_parse_from(["demo", "--abort-on-fault"]).unwrap();
        let config = HarnessConfig::default().with_args(&args);
        assert_eq!(config.fault_policy, FaultPolicy::AbortOnFault);
    }

    #[test]
    fn help_is_a_display_request() {
        let err = HarnessArgs::try_parse_from(["demo", "--help"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::DisplayHelp);
        assert_eq!(err.exit_code(), 0);
    }

    #[test]
    fn color_detection_from_term_and_colorterm() {
        assert!(color_support_from(env_of(&[("TERM", "xterm-256color")])));
        assert!(color_support_from(env_of(&[("TERM", "tmux-256color")])));
        assert!(color_support_from(env_of(&[
            ("TERM", "dumb"),
            ("COLORTERM", "truecolor")
        ])));
        assert!(!color_support_from(env_of(&[("TERM", "dumb")])));
        assert!(!color_support_from(env_of(&[])));
    }

    #[test]
    fn policy_resolution_only_probes_for_auto() {
        assert!(ColorPolicy::Always.resolve(|| false));
        assert!(!ColorPolicy::Never.resolve(|| true));
        assert!(ColorPolicy::Auto.resolve(|| true));
    }
}
