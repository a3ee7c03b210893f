//! Helpers for running a step's child process with its output teed to the log.

use std::io::{BufRead, BufReader, Read};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::thread;
use std::time::{Duration, Instant};

use anyhow::{Context, Result, anyhow};
use tracing::{debug, error, instrument, warn};
use wait_timeout::ChildExt;

use crate::io::execution_log::ExecutionLog;

/// How a step's child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepOutput {
    /// Exit code, if the process exited normally.
    pub exit_code: Option<i32>,
    pub success: bool,
    pub timed_out: bool,
}

impl StepOutput {
    pub fn exited(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            success: code == 0,
            timed_out: false,
        }
    }

    /// Killed after exceeding the step timeout.
    pub fn after_timeout() -> Self {
        Self {
            exit_code: None,
            success: false,
            timed_out: true,
        }
    }

    /// Ended by a signal it did not handle.
    pub fn signaled() -> Self {
        Self {
            exit_code: None,
            success: false,
            timed_out: false,
        }
    }

    fn from_status(status: ExitStatus, timed_out: bool) -> Self {
        Self {
            exit_code: status.code(),
            success: status.success() && !timed_out,
            timed_out,
        }
    }
}

/// Run a command to completion, writing each stdout/stderr line to `log` as it
/// is read.
///
/// Two reader threads drain the pipes and hand lines to this thread, which is
/// the only writer of the log. `timeout` of `None` waits indefinitely.
///
/// On timeout the child is killed and the readers are detached rather than
/// joined: grandchildren that inherited the pipes may keep them open, and the
/// step must still end at the deadline.
#[instrument(skip_all, fields(timeout_secs = timeout.map(|t| t.as_secs())))]
pub fn run_teed(
    mut cmd: Command,
    timeout: Option<Duration>,
    log: &ExecutionLog,
) -> Result<StepOutput> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());

    debug!("spawning child process");
    let mut child = match cmd.spawn() {
        Ok(c) => c,
        Err(e) => {
            error!(err = %e, "failed to spawn command");
            return Err(e).context("spawn command");
        }
    };
    let deadline = timeout.map(|t| Instant::now() + t);

    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| anyhow!("stdout was not piped"))?;
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| anyhow!("stderr was not piped"))?;

    let (tx, rx) = mpsc::channel();
    let stdout_handle = spawn_reader(stdout, tx.clone());
    let stderr_handle = spawn_reader(stderr, tx);

    if !drain_until(&rx, deadline, log) {
        let output = kill_after_timeout(&mut child, timeout)?;
        for line in rx.try_iter() {
            write_line(log, &line);
        }
        debug!("reader threads detached after timeout");
        return Ok(output);
    }

    join_reader(stdout_handle).context("join stdout")?;
    join_reader(stderr_handle).context("join stderr")?;

    let remaining = deadline.map(|d| d.saturating_duration_since(Instant::now()));
    let output = wait_child(&mut child, remaining)?;
    debug!(exit_code = ?output.exit_code, timed_out = output.timed_out, "command finished");
    Ok(output)
}

/// Write received lines until both pipes close (`true`) or the deadline
/// passes (`false`).
fn drain_until(rx: &Receiver<Vec<u8>>, deadline: Option<Instant>, log: &ExecutionLog) -> bool {
    loop {
        let received = match deadline {
            None => rx.recv().map_err(|_| RecvTimeoutError::Disconnected),
            Some(deadline) => {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    return false;
                }
                rx.recv_timeout(remaining)
            }
        };
        match received {
            Ok(line) => write_line(log, &line),
            Err(RecvTimeoutError::Timeout) => return false,
            Err(RecvTimeoutError::Disconnected) => return true,
        }
    }
}

fn wait_child(child: &mut Child, timeout: Option<Duration>) -> Result<StepOutput> {
    let Some(timeout) = timeout else {
        let status = child.wait().context("wait for command")?;
        return Ok(StepOutput::from_status(status, false));
    };
    match child.wait_timeout(timeout).context("wait for command")? {
        Some(status) => Ok(StepOutput::from_status(status, false)),
        None => kill_after_timeout(child, Some(timeout)),
    }
}

fn kill_after_timeout(child: &mut Child, timeout: Option<Duration>) -> Result<StepOutput> {
    warn!(
        timeout_secs = timeout.map(|t| t.as_secs()),
        "command timed out, killing"
    );
    // The child may have exited on its own between the deadline and here.
    if child.try_wait().context("poll command")?.is_none() {
        child.kill().context("kill command")?;
    }
    let status = child.wait().context("wait command after kill")?;
    Ok(StepOutput::from_status(status, true))
}

fn spawn_reader<R: Read + Send + 'static>(
    reader: R,
    tx: Sender<Vec<u8>>,
) -> thread::JoinHandle<Result<()>> {
    thread::spawn(move || forward_lines(reader, tx))
}

fn join_reader(handle: thread::JoinHandle<Result<()>>) -> Result<()> {
    match handle.join() {
        Ok(result) => result,
        Err(_) => Err(anyhow!("output reader thread panicked")),
    }
}

/// Send a pipe's contents line by line until EOF or until nobody listens.
fn forward_lines<R: Read>(reader: R, tx: Sender<Vec<u8>>) -> Result<()> {
    let mut buf_reader = BufReader::new(reader);
    loop {
        let mut line = Vec::new();
        let n = buf_reader
            .read_until(b'\n', &mut line)
            .context("read line")?;
        if n == 0 || tx.send(line).is_err() {
            break;
        }
    }
    Ok(())
}

fn write_line(log: &ExecutionLog, line: &[u8]) {
    if let Err(e) = log.write_output(line) {
        warn!(err = %e, "failed to write child output to log");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn sh(script: &str) -> Command {
        let mut cmd = Command::new("sh");
        cmd.arg("-c").arg(script);
        cmd
    }

    #[test]
    fn tees_stdout_and_stderr_into_log() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        let output = run_teed(sh("echo out-line; echo err-line >&2"), None, &log).expect("run");
        assert!(output.success);
        assert_eq!(output.exit_code, Some(0));

        let contents = fs::read_to_string(log.path()).expect("read log");
        assert!(contents.contains("out-line\n"));
        assert!(contents.contains("err-line\n"));
    }

    #[test]
    fn reports_non_zero_exit() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        let output = run_teed(sh("echo failing; exit 3"), None, &log).expect("run");
        assert!(!output.success);
        assert_eq!(output.exit_code, Some(3));
        assert!(!output.timed_out);
    }

    #[test]
    fn keeps_final_line_without_newline() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        run_teed(sh("printf 'no newline'"), None, &log).expect("run");
        let contents = fs::read_to_string(log.path()).expect("read log");
        assert_eq!(contents, "no newline");
    }

    #[test]
    fn kills_child_after_timeout() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        let output = run_teed(
            sh("exec sleep 5"),
            Some(Duration::from_millis(100)),
            &log,
        )
        .expect("run");
        assert!(output.timed_out);
        assert!(!output.success);
    }

    #[test]
    fn timeout_returns_while_grandchild_holds_pipes() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        let started = Instant::now();
        let output = run_teed(
            sh("echo before; sleep 3; echo after"),
            Some(Duration::from_millis(200)),
            &log,
        )
        .expect("run");
        let elapsed = started.elapsed();

        assert!(output.timed_out);
        assert!(!output.success);
        assert!(elapsed < Duration::from_secs(2), "took {elapsed:?}");

        let contents = fs::read_to_string(log.path()).expect("read log");
        assert!(contents.contains("before\n"));
        assert!(!contents.contains("after"));
    }

    #[test]
    fn fast_step_within_timeout_succeeds() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        let output = run_teed(sh("echo quick"), Some(Duration::from_secs(10)), &log).expect("run");
        assert!(output.success);
        assert!(!output.timed_out);
        assert!(fs::read_to_string(log.path()).expect("read log").contains("quick\n"));
    }

    #[test]
    fn spawn_failure_is_an_error() {
        let temp = tempfile::tempdir().expect("tempdir");
        let log = ExecutionLog::create(&temp.path().join("run.log"), false).expect("log");

        let err = run_teed(Command::new("coderun-no-such-binary"), None, &log).unwrap_err();
        assert!(err.to_string().contains("spawn command"));
    }
}
