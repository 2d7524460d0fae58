use std::io;

use thiserror::Error;

/// Failures of the trap machinery itself, as opposed to failures of a test.
#[derive(Debug, Error)]
pub enum TrapError {
    #[error("failed to create test event pipe: {0}")]
    Pipe(#[source] io::Error),
    #[error("failed to fork test process: {0}")]
    Fork(#[source] io::Error),
    #[error("failed to reap test process {pid}: {source}")]
    Wait {
        pid: i32,
        #[source]
        source: io::Error,
    },
}
