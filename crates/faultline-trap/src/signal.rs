//! Fatal-signal classification and disposition control.

use std::ffi::c_int;
use std::io;

use faultline_core::{Fault, FaultKind};

/// Fatal signals the trap attributes to the test in flight.
pub const TRAPPED_SIGNALS: [c_int; 5] = [
    libc::SIGSEGV,
    libc::SIGBUS,
    libc::SIGFPE,
    libc::SIGILL,
    libc::SIGABRT,
];

/// Map a terminating signal to its fault class.
#[must_use]
pub fn classify_signal(signo: c_int) -> FaultKind {
    match signo {
        libc::SIGSEGV => FaultKind::SegmentationFault,
        libc::SIGBUS => FaultKind::BusError,
        libc::SIGFPE => FaultKind::FloatingPointException,
        libc::SIGILL => FaultKind::IllegalInstruction,
        libc::SIGABRT => FaultKind::Aborted,
        _ => FaultKind::OtherSignal,
    }
}

#[must_use]
pub fn fault_from_signal(signo: c_int) -> Fault {
    Fault::signal(classify_signal(signo), signo)
}

/// Put `signo` back on its default (terminating) disposition.
pub fn restore_default(signo: c_int) -> io::Result<()> {
    // SAFETY: a zeroed sigaction is a valid "no flags, empty mask" value;
    // we only set the handler to SIG_DFL before installing it.
    let mut act = unsafe { std::mem::zeroed::<libc::sigaction>() };
    act.sa_sigaction = libc::SIG_DFL;
    let rc = unsafe {
        libc::sigemptyset(&mut act.sa_mask);
        libc::sigaction(signo, &act, std::ptr::null_mut())
    };
    if rc != 0 {
        return Err(io::Error::last_os_error());
    }
    Ok(())
}

/// Restore default handling for every trapped signal.
pub fn restore_default_handlers() -> io::Result<()> {
    for signo in TRAPPED_SIGNALS {
        restore_default(signo)?;
    }
    Ok(())
}

fn unblock(signo: c_int) {
    // SAFETY: `set` is initialized by sigemptyset before use.
    let rc = unsafe {
        let mut set = std::mem::zeroed::<libc::sigset_t>();
        libc::sigemptyset(&mut set);
        let added = libc::sigaddset(&mut set, signo);
        debug_assert_eq!(added, 0, "sigaddset({signo})");
        libc::pthread_sigmask(libc::SIG_UNBLOCK, &set, std::ptr::null_mut())
    };
    debug_assert_eq!(rc, 0, "pthread_sigmask unblock {signo}");
}

/// Prepare a freshly forked child to run one test body.
///
/// Faults must reach the parent as the raw terminating signal, so any
/// inherited handler (including the runtime's stack-overflow handler) is
/// dropped. Core dumps are disabled for the child only.
pub(crate) fn arm_child() {
    let _ = restore_default_handlers();
    for signo in TRAPPED_SIGNALS {
        unblock(signo);
    }
    let limit = libc::rlimit {
        rlim_cur: 0,
        rlim_max: 0,
    };
    // SAFETY: `limit` is a valid rlimit for the duration of the call.
    let rc = unsafe { libc::setrlimit(libc::RLIMIT_CORE, &limit) };
    debug_assert_eq!(rc, 0, "setrlimit(RLIMIT_CORE)");
}

/// Re-deliver `fault` to the current process with default handling.
///
/// The process terminates with the fault's native status. Faults that did not
/// come from a signal (panics, abnormal exits) are re-raised as `SIGABRT`.
pub fn reraise(fault: &Fault) -> ! {
    let signo = fault.signal.unwrap_or(libc::SIGABRT);
    let _ = restore_default(signo);
    unblock(signo);
    // SAFETY: raise has no memory-safety preconditions.
    unsafe {
        libc::raise(signo);
    }
    std::process::abort()
}
