//! Running one test body, either in a forked child or in-process.
//!
//! The forked child streams [`TestEvent`] JSON lines to the parent over a
//! pipe and ends with `_exit`. The parent forwards log events as they arrive,
//! then classifies the child's wait status.

use std::any::Any;
use std::cell::RefCell;
use std::ffi::c_int;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Write};
use std::os::fd::{AsRawFd, FromRawFd, OwnedFd};
use std::panic::{self, AssertUnwindSafe};

use faultline_core::{EventSink, Fault, Outcome, Test, TestContext, TestEvent};

use crate::error::TrapError;
use crate::signal::{arm_child, fault_from_signal};

/// Run `test` in a forked child and classify how it ended.
pub(crate) fn run_forked(
    suite: &str,
    test: &Test,
    on_log: &mut dyn FnMut(String),
) -> Result<Outcome, TrapError> {
    let (read_end, write_end) = event_pipe()?;
    // Anything still buffered here would be written twice.
    let _ = io::stdout().flush();
    let _ = io::stderr().flush();

    // SAFETY: the child only touches its own copy of `test`, the pipe, and
    // async-signal-safe libc calls before `_exit`.
    let pid = unsafe { libc::fork() };
    if pid < 0 {
        return Err(TrapError::Fork(io::Error::last_os_error()));
    }
    if pid == 0 {
        drop(read_end);
        child_main(write_end, suite, test);
    }

    drop(write_end);
    let reported = drain_events(read_end, on_log);
    let status = wait_for(pid)?;
    Ok(classify_exit(status, reported))
}

/// Run `test` on the calling thread. Panics are caught; signals are not.
pub(crate) fn run_in_process(
    suite: &str,
    test: &Test,
    on_log: &mut dyn FnMut(String),
) -> Outcome {
    let sink = ForwardingSink {
        on_log: RefCell::new(on_log),
    };
    let ctx = TestContext::new(suite, test.name(), &sink);
    invoke_catching(test, &ctx)
}

fn child_main(write_end: OwnedFd, suite: &str, test: &Test) -> ! {
    arm_child();
    let sink = PipeSink {
        file: File::from(write_end),
    };
    let ctx = TestContext::new(suite, test.name(), &sink);
    let outcome = invoke_catching(test, &ctx);
    sink.emit(TestEvent::Finished { outcome });
    // Inherited buffered writers belong to the parent: no destructors, no atexit.
    // SAFETY: _exit takes no pointers and ends the child immediately.
    unsafe { libc::_exit(0) }
}

fn invoke_catching(test: &Test, ctx: &TestContext<'_>) -> Outcome {
    match panic::catch_unwind(AssertUnwindSafe(|| test.invoke(ctx))) {
        Ok(result) => Outcome::from(result),
        Err(payload) => Outcome::FailedFault(Fault::panic(panic_message(payload.as_ref()))),
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "<non-string panic payload>".to_string()
    }
}

/// Child side of the event pipe. One JSON object per line.
struct PipeSink {
    file: File,
}

impl EventSink for PipeSink {
    fn emit(&self, event: TestEvent) {
        if let Ok(mut line) = serde_json::to_string(&event) {
            line.push('\n');
            let _ = (&self.file).write_all(line.as_bytes());
        }
    }
}

struct ForwardingSink<'a> {
    on_log: RefCell<&'a mut dyn FnMut(String)>,
}

impl EventSink for ForwardingSink<'_> {
    fn emit(&self, event: TestEvent) {
        if let TestEvent::Log { message } = event {
            let mut on_log = self.on_log.borrow_mut();
            (*on_log)(message);
        }
    }
}

fn event_pipe() -> Result<(OwnedFd, OwnedFd), TrapError> {
    let mut fds: [c_int; 2] = [-1, -1];
    // SAFETY: `fds` has room for the two descriptors pipe(2) writes.
    if unsafe { libc::pipe(fds.as_mut_ptr()) } != 0 {
        return Err(TrapError::Pipe(io::Error::last_os_error()));
    }
    // SAFETY: pipe(2) succeeded, both descriptors are open and unowned.
    let (read_end, write_end) =
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) };
    for fd in [&read_end, &write_end] {
        // SAFETY: `fd` is open for the duration of the call.
        if unsafe { libc::fcntl(fd.as_raw_fd(), libc::F_SETFD, libc::FD_CLOEXEC) } != 0 {
            return Err(TrapError::Pipe(io::Error::last_os_error()));
        }
    }
    Ok((read_end, write_end))
}

/// Forward log events until EOF; return the reported outcome, if any.
fn drain_events(read_end: OwnedFd, on_log: &mut dyn FnMut(String)) -> Option<Outcome> {
    let reader = BufReader::new(File::from(read_end));
    let mut outcome = None;
    for line in reader.split(b'\n') {
        let Ok(line) = line else { break };
        match serde_json::from_slice::<TestEvent>(&line) {
            Ok(TestEvent::Log { message }) => on_log(message),
            Ok(TestEvent::Finished { outcome: reported }) => outcome = Some(reported),
            // Partial line from a child killed mid-write.
            Err(_) => {}
        }
    }
    outcome
}

fn wait_for(pid: libc::pid_t) -> Result<c_int, TrapError> {
    let mut status: c_int = 0;
    loop {
        // SAFETY: `status` is a valid out-pointer.
        let rc = unsafe { libc::waitpid(pid, &mut status, 0) };
        if rc == pid {
            return Ok(status);
        }
        let err = io::Error::last_os_error();
        if err.kind() != io::ErrorKind::Interrupted {
            return Err(TrapError::Wait { pid, source: err });
        }
    }
}

/// A terminating signal always wins over whatever the child reported.
pub(crate) fn classify_exit(status: c_int, reported: Option<Outcome>) -> Outcome {
    if libc::WIFSIGNALED(status) {
        return Outcome::FailedFault(fault_from_signal(libc::WTERMSIG(status)));
    }
    match reported {
        Some(outcome) => outcome,
        None => {
            let code = if libc::WIFEXITED(status) {
                libc::WEXITSTATUS(status)
            } else {
                -1
            };
            Outcome::FailedFault(Fault::abnormal_exit(code))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faultline_core::FaultKind;

    #[test]
    fn panic_payloads_become_messages() {
        let boxed: Box<dyn Any + Send> = Box::new("static str");
        assert_eq!(panic_message(boxed.as_ref()), "static str");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(boxed.as_ref()), "owned");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(boxed.as_ref()), "<non-string panic payload>");
    }

    #[test]
    fn clean_exit_without_report_is_abnormal() {
        // Exit status 3, encoded as waitpid does on Linux.
        let outcome = classify_exit(3 << 8, None);
        let fault = outcome.fault().cloned().unwrap();
        assert_eq!(fault.kind, FaultKind::AbnormalExit);
        assert_eq!(fault.detail.as_deref(), Some("status 3"));
    }

    #[test]
    fn reported_outcome_is_kept_on_clean_exit() {
        assert_eq!(classify_exit(0, Some(Outcome::Passed)), Outcome::Passed);
    }

    #[test]
    fn signal_status_overrides_report() {
        let outcome = classify_exit(libc::SIGSEGV, Some(Outcome::Passed));
        assert_eq!(
            outcome.fault().map(|f| f.kind),
            Some(FaultKind::SegmentationFault)
        );
    }

    #[test]
    fn in_process_forwards_logs_and_catches_panics() {
        let test = Test::new("boom", |ctx| {
            ctx.log("before");
            panic!("kaboom");
        });
        let mut seen = Vec::new();
        let outcome = run_in_process("Suite", &test, &mut |m: String| seen.push(m));
        assert_eq!(seen, vec!["before".to_string()]);
        let fault = outcome.fault().cloned().unwrap();
        assert_eq!(fault.kind, FaultKind::Panic);
        assert_eq!(fault.detail.as_deref(), Some("kaboom"));
    }
}
