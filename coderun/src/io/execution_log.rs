//! The execution log artifact written into the working directory.
//!
//! # Separation of Concerns
//!
//! - **Execution log (this module)**: product output consumed by the CI job
//!   that composes the pull request. Always written, unaffected by `RUST_LOG`.
//! - **Tracing (`logging`)**: dev diagnostics on stderr.
//!
//! The log is bracketed by a start line and an end line. The end line is only
//! written after every step succeeded, so a log without it records a failed run.

use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::{Context, Result, anyhow};
use chrono::{SecondsFormat, Utc};

pub const START_MARKER: &str = "=== coderun execution started at";
pub const END_MARKER: &str = "=== coderun execution finished at";
pub const STAGE_PREFIX: &str = ">>> ";
pub const ERROR_PREFIX: &str = "ERROR: ";

/// Shared sink for log lines and child output.
///
/// Both pipe readers of a running step write through the same mutex, so stdout
/// and stderr lines land in the file in the order they were read.
#[derive(Debug)]
pub struct ExecutionLog {
    path: PathBuf,
    file: Mutex<File>,
    echo: bool,
}

impl ExecutionLog {
    /// Create (or truncate) the log at `path`. With `echo`, every write is
    /// mirrored to stdout.
    pub fn create(path: &Path, echo: bool) -> Result<Self> {
        let file =
            File::create(path).with_context(|| format!("create log {}", path.display()))?;
        Ok(Self {
            path: path.to_path_buf(),
            file: Mutex::new(file),
            echo,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn started(&self) -> Result<()> {
        self.line(&format!("{START_MARKER} {} ===", timestamp()))
    }

    pub fn finished(&self) -> Result<()> {
        self.line(&format!("{END_MARKER} {} ===", timestamp()))
    }

    pub fn stage(&self, message: &str) -> Result<()> {
        self.line(&format!("{STAGE_PREFIX}{message}"))
    }

    pub fn error(&self, message: &str) -> Result<()> {
        self.line(&format!("{ERROR_PREFIX}{message}"))
    }

    /// Append raw child output verbatim.
    pub fn write_output(&self, bytes: &[u8]) -> Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("execution log lock poisoned"))?;
        file.write_all(bytes)
            .with_context(|| format!("write log {}", self.path.display()))?;
        if self.echo {
            let mut stdout = std::io::stdout().lock();
            // Terminal echo is best effort; the file is the artifact.
            let _ = stdout.write_all(bytes).and_then(|()| stdout.flush());
        }
        Ok(())
    }

    fn line(&self, text: &str) -> Result<()> {
        let mut buf = String::with_capacity(text.len() + 1);
        buf.push_str(text);
        buf.push('\n');
        self.write_output(buf.as_bytes())
    }
}

fn timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
