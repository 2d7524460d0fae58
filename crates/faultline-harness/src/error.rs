use std::io;
use std::path::PathBuf;

use faultline_trap::TrapError;
use thiserror::Error;

/// Infrastructure failures that abort a run. A test's own failure is never one of these.
#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot open log sink {}: {source}", path.display())]
    LogSink {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("cannot write run report {}: {source}", path.display())]
    Report {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error(transparent)]
    Trap(#[from] TrapError),
}
