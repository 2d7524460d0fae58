//! Append-only text destination for the human-readable run log.
//!
//! Every write is one complete line issued as a single `write_all` on an
//! unbuffered handle, so nothing is left pending across a `fork`.

use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::error::HarnessError;

enum Target {
    /// Long-lived handle opened at startup.
    Handle { file: File, path: PathBuf },
    /// Open, append, close for every line.
    PerMessage(PathBuf),
    Memory(MemoryLog),
    Disabled,
}

pub struct LogSink {
    target: Target,
}

impl LogSink {
    /// Open `path` for the run, truncating any previous log.
    pub fn create(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|source| HarnessError::LogSink {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            target: Target::Handle {
                file,
                path: path.to_path_buf(),
            },
        })
    }

    /// Open `path` keeping existing content.
    pub fn append_to(path: impl AsRef<Path>) -> Result<Self, HarnessError> {
        let path = path.as_ref();
        let file = open_append(path).map_err(|source| HarnessError::LogSink {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Self {
            target: Target::Handle {
                file,
                path: path.to_path_buf(),
            },
        })
    }

    /// Fallback mode: no handle is held between lines.
    ///
    /// `path` is opened once up front so an unwritable destination fails here
    /// instead of on every later line.
    pub fn per_message(path: impl Into<PathBuf>) -> Result<Self, HarnessError> {
        let path = path.into();
        if let Err(source) = open_append(&path) {
            return Err(HarnessError::LogSink { path, source });
        }
        Ok(Self {
            target: Target::PerMessage(path),
        })
    }

    #[must_use]
    pub fn memory(log: MemoryLog) -> Self {
        Self {
            target: Target::Memory(log),
        }
    }

    #[must_use]
    pub fn disabled() -> Self {
        Self {
            target: Target::Disabled,
        }
    }

    #[must_use]
    pub fn path(&self) -> Option<&Path> {
        match &self.target {
            Target::Handle { path, .. } | Target::PerMessage(path) => Some(path.as_path()),
            Target::Memory(_) | Target::Disabled => None,
        }
    }

    /// Append `line` plus a newline as one write.
    pub fn write_line(&mut self, line: &str) -> io::Result<()> {
        let mut buf = String::with_capacity(line.len() + 1);
        buf.push_str(line);
        buf.push('\n');
        match &mut self.target {
            Target::Handle { file, .. } => file.write_all(buf.as_bytes()),
            Target::PerMessage(path) => open_append(path)?.write_all(buf.as_bytes()),
            Target::Memory(log) => log.write_all(buf.as_bytes()),
            Target::Disabled => Ok(()),
        }
    }

    pub fn flush(&mut self) -> io::Result<()> {
        match &mut self.target {
            Target::Handle { file, .. } => file.sync_data(),
            Target::PerMessage(_) | Target::Memory(_) | Target::Disabled => Ok(()),
        }
    }
}

impl std::fmt::Debug for LogSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let kind = match &self.target {
            Target::Handle { .. } => "handle",
            Target::PerMessage(_) => "per-message",
            Target::Memory(_) => "memory",
            Target::Disabled => "disabled",
        };
        f.debug_struct("LogSink")
            .field("kind", &kind)
            .field("path", &self.path())
            .finish()
    }
}

fn open_append(path: &Path) -> io::Result<File> {
    OpenOptions::new().create(true).append(true).open(path)
}

/// Shared in-memory byte buffer. Clones see the same contents.
#[derive(Debug, Clone, Default)]
pub struct MemoryLog {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl MemoryLog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.buf.lock()).into_owned()
    }

    #[must_use]
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for MemoryLog {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        self.buf.lock().extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
