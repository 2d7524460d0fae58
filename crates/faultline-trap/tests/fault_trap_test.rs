//! Integration test: fault trap.
//!
//! Validates that:
//! 1. Fatal signals in a body become fault outcomes attributed to that test.
//! 2. Logs written before a crash still reach the observer, in order.
//! 3. Ordinary outcomes pass through the fork unchanged.
//! 4. Fault policy escalation consults the decider only under `AskOnFault`.
//! 5. `reraise` terminates with the original signal.
//! 6. An operator "yes" re-raises through `invoke` only after the observer
//!    has flushed the attribution lines.
//!
//! Run: cargo test -p faultline-trap --test fault_trap_test

use std::io::Cursor;
use std::path::PathBuf;

use faultline_core::{
    ExecutionContext, Fault, FaultKind, Outcome, OutcomeKind, Test, TestContext, TestResult, check,
    pass,
};
use faultline_trap::{
    FaultDecider, FaultPolicy, FaultTrap, Isolation, NullObserver, PromptDecider, TrapObserver,
    reraise,
};

#[derive(Default)]
struct Recorder {
    logs: Vec<(String, String)>,
    faults: Vec<(String, Fault)>,
}

impl TrapObserver for Recorder {
    fn test_log(&mut self, ctx: &ExecutionContext, message: &str) {
        self.logs.push((ctx.prefix(), message.to_string()));
    }

    fn fault_caught(&mut self, ctx: &ExecutionContext, fault: &Fault) {
        self.faults
            .push((ctx.test().unwrap_or_default().to_string(), fault.clone()));
    }
}

/// Keeps lines in memory until `flush`, like a buffered log writer.
struct FileObserver {
    path: PathBuf,
    pending: Vec<String>,
}

impl TrapObserver for FileObserver {
    fn test_log(&mut self, ctx: &ExecutionContext, message: &str) {
        self.pending.push(format!("{} {message}", ctx.prefix()));
    }

    fn fault_caught(&mut self, ctx: &ExecutionContext, fault: &Fault) {
        self.pending.push(format!("{} Caught {fault}", ctx.prefix()));
    }

    fn flush(&mut self) {
        let _ = std::fs::write(&self.path, self.pending.join("\n"));
    }
}

struct Scripted(Vec<bool>);

impl FaultDecider for Scripted {
    fn should_reraise(&mut self, _: &Fault, _: Option<&str>, _: Option<&str>) -> bool {
        self.0.remove(0)
    }
}

fn run_one(test: Test) -> (Outcome, Recorder, ExecutionContext) {
    let mut trap = FaultTrap::new(Isolation::Fork, FaultPolicy::ContinueOnFault);
    let mut ctx = ExecutionContext::new(false);
    ctx.enter_suite("Crash");
    ctx.enter_test(test.name());
    let mut recorder = Recorder::default();
    let outcome = trap.invoke(&mut ctx, &test, &mut recorder).unwrap();
    (outcome, recorder, ctx)
}

fn null_deref(ctx: &TestContext<'_>) -> TestResult {
    ctx.log("about to dereference");
    // Non-null, aligned, and unmapped.
    let addr = std::ptr::null::<i32>().wrapping_add(2);
    let value = unsafe { std::ptr::read_volatile(addr) };
    ctx.log(format!("unreachable: {value}"));
    pass!();
}

#[test]
fn segfault_is_attributed_and_logs_survive() {
    let (outcome, recorder, ctx) = run_one(Test::new("Null_Deref", null_deref));

    let fault = outcome.fault().cloned().unwrap();
    assert_eq!(fault.kind, FaultKind::SegmentationFault);
    assert_eq!(fault.signal, Some(libc::SIGSEGV));
    assert_eq!(ctx.last_fault(), Some(&fault));

    assert_eq!(recorder.faults.len(), 1);
    assert_eq!(recorder.faults[0].0, "Null_Deref");
    assert_eq!(
        recorder.logs,
        vec![(
            "[LOG/Crash/Null_Deref]".to_string(),
            "about to dereference".to_string()
        )]
    );
}

#[test]
fn raised_signals_map_to_their_kinds() {
    let cases = [
        (libc::SIGFPE, FaultKind::FloatingPointException),
        (libc::SIGILL, FaultKind::IllegalInstruction),
        (libc::SIGBUS, FaultKind::BusError),
        (libc::SIGTERM, FaultKind::OtherSignal),
    ];
    for (signo, kind) in cases {
        let test = Test::new("Raise", move |_| {
            unsafe {
                libc::raise(signo);
            }
            pass!();
        });
        let (outcome, _, _) = run_one(test);
        let fault = outcome.fault().cloned().unwrap();
        assert_eq!(fault.kind, kind, "signal {signo}");
        assert_eq!(fault.signal, Some(signo));
    }
}

#[test]
fn abort_is_a_fault() {
    let (outcome, _, _) = run_one(Test::new("Abort", |_| std::process::abort()));
    assert_eq!(outcome.fault().map(|f| f.kind), Some(FaultKind::Aborted));
}

#[test]
fn panic_in_child_is_reported_with_message() {
    let (outcome, _, _) = run_one(Test::new("Panic", |_| panic!("index out of range")));
    let fault = outcome.fault().cloned().unwrap();
    assert_eq!(fault.kind, FaultKind::Panic);
    assert_eq!(fault.detail.as_deref(), Some("index out of range"));
}

#[test]
fn exit_without_outcome_is_abnormal() {
    let (outcome, _, _) = run_one(Test::new("Exit", |_| std::process::exit(3)));
    let fault = outcome.fault().cloned().unwrap();
    assert_eq!(fault.kind, FaultKind::AbnormalExit);
    assert_eq!(fault.to_string(), "Abnormal exit (status 3)");
}

#[test]
fn ordinary_outcomes_cross_the_fork() {
    let (outcome, recorder, ctx) = run_one(Test::new("Pass", |ctx| {
        ctx.log("line one\nline two");
        pass!();
    }));
    assert_eq!(outcome, Outcome::Passed);
    assert!(recorder.faults.is_empty());
    assert!(ctx.last_fault().is_none());
    assert_eq!(recorder.logs.len(), 1);

    let (outcome, recorder, _) = run_one(Test::new("Check", |ctx| {
        let x = 7;
        check!(ctx, x > 10);
        pass!();
    }));
    assert_eq!(outcome.kind(), OutcomeKind::Assertion);
    assert_eq!(recorder.logs[0].1, "Assertion failed: x > 10");
}

#[test]
fn in_process_isolation_catches_panics() {
    let mut trap = FaultTrap::new(Isolation::InProcess, FaultPolicy::ContinueOnFault);
    let mut ctx = ExecutionContext::new(false);
    ctx.enter_suite("Local");
    ctx.enter_test("Panic");
    let test = Test::new("Panic", |_| panic!("local"));
    let outcome = trap.invoke(&mut ctx, &test, &mut NullObserver).unwrap();
    assert_eq!(outcome.fault().map(|f| f.kind), Some(FaultKind::Panic));
    assert_eq!(ctx.last_fault().map(|f| f.kind), Some(FaultKind::Panic));
}

#[test]
fn ask_policy_recovers_when_told_no() {
    let mut trap = FaultTrap::new(Isolation::Fork, FaultPolicy::AskOnFault)
        .with_decider(Scripted(vec![false]));
    let mut ctx = ExecutionContext::new(false);
    ctx.enter_suite("Crash");
    ctx.enter_test("Null_Deref");
    let test = Test::new("Null_Deref", null_deref);
    let outcome = trap.invoke(&mut ctx, &test, &mut NullObserver).unwrap();
    assert_eq!(outcome.kind(), OutcomeKind::Fault);
}

#[test]
fn prompt_decider_reads_yes_no_and_eof() {
    let fault = Fault::signal(FaultKind::SegmentationFault, libc::SIGSEGV);

    let mut decider = PromptDecider::new(Cursor::new("maybe\nn\n"), Vec::new());
    assert!(!decider.should_reraise(&fault, Some("S"), Some("T")));

    let mut decider = PromptDecider::new(Cursor::new("Y\n"), Vec::new());
    assert!(decider.should_reraise(&fault, Some("S"), Some("T")));

    let mut decider = PromptDecider::new(Cursor::new(""), Vec::new());
    assert!(!decider.should_reraise(&fault, None, None));
}

#[test]
fn reraise_terminates_with_the_original_signal() {
    let pid = unsafe { libc::fork() };
    assert!(pid >= 0);
    if pid == 0 {
        reraise(&Fault::signal(FaultKind::SegmentationFault, libc::SIGSEGV));
    }
    let mut status = 0;
    let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
    assert_eq!(rc, pid);
    assert!(libc::WIFSIGNALED(status));
    assert_eq!(libc::WTERMSIG(status), libc::SIGSEGV);
}

#[test]
fn reraise_of_a_panic_aborts() {
    let pid = unsafe { libc::fork() };
    assert!(pid >= 0);
    if pid == 0 {
        reraise(&Fault::panic("boom"));
    }
    let mut status = 0;
    unsafe { libc::waitpid(pid, &mut status, 0) };
    assert!(libc::WIFSIGNALED(status));
    assert_eq!(libc::WTERMSIG(status), libc::SIGABRT);
}

#[test]
fn ask_policy_answered_yes_reraises_after_flushing() {
    let path = std::env::temp_dir().join(format!(
        "faultline-escalation-{}.log",
        std::process::id()
    ));
    let _ = std::fs::remove_file(&path);

    let pid = unsafe { libc::fork() };
    assert!(pid >= 0);
    if pid == 0 {
        let mut trap = FaultTrap::new(Isolation::Fork, FaultPolicy::AskOnFault)
            .with_decider(Scripted(vec![true]));
        let mut ctx = ExecutionContext::new(false);
        ctx.enter_suite("Crash");
        ctx.enter_test("Null_Deref");
        let mut observer = FileObserver {
            path: path.clone(),
            pending: Vec::new(),
        };
        let _ = trap.invoke(&mut ctx, &Test::new("Null_Deref", null_deref), &mut observer);
        unsafe { libc::_exit(0) };
    }

    let mut status = 0;
    let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
    assert_eq!(rc, pid);
    assert!(libc::WIFSIGNALED(status), "child returned from invoke");
    assert_eq!(libc::WTERMSIG(status), libc::SIGSEGV);

    let written = std::fs::read_to_string(&path).unwrap();
    let _ = std::fs::remove_file(&path);
    assert_eq!(
        written,
        "[LOG/Crash/Null_Deref] about to dereference\n\
         [LOG/Crash/Null_Deref] Caught signal 11 (Segmentation fault)"
    );
}
