//! Orchestration for `coderun execute`: detect, install, run, log.
//!
//! Fail-fast and sequential. The first failing stage ends the invocation;
//! there is no retry and no fallback to another project kind.

use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, info, instrument};

use crate::core::project::{MARKERS, ProjectKind, Stage, Step, is_marker};
use crate::io::config::ToolchainConfig;
use crate::io::execution_log::ExecutionLog;
use crate::io::toolchain::{StepCommand, StepRunner};
use crate::io::workspace::detect_project_kind_in;

/// Terminal failures of one executor invocation.
#[derive(Debug, Error)]
pub enum ExecuteError {
    #[error("working directory {} does not exist", .0.display())]
    MissingDirectory(PathBuf),
    #[error("log file name {0} collides with a project marker")]
    LogFileIsMarker(String),
    #[error(
        "no recognizable project type found in {} (expected one of {})",
        .0.display(),
        marker_list()
    )]
    UnrecognizedProject(PathBuf),
    #[error("dependency installation failed: {0}")]
    InstallFailed(String),
    #[error("execution failed: {0}")]
    RunFailed(String),
    #[error(transparent)]
    Log(#[from] anyhow::Error),
}

/// Parameters for an executor invocation.
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    /// Directory holding the generated project. Never created here.
    pub workdir: PathBuf,
    /// Log file name inside `workdir`.
    pub log_file: String,
    /// Mirror the log to stdout.
    pub echo: bool,
    pub toolchain: ToolchainConfig,
}

/// Result of a successful invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionReport {
    pub kind: ProjectKind,
    pub log_path: PathBuf,
}

/// Detect the project in `request.workdir` and run its plan.
///
/// The log is only created once the directory is known to exist and the
/// project has been detected. Every failure after that point leaves an `ERROR:` line in the log and no end marker.
#[instrument(skip_all, fields(workdir = %request.workdir.display()))]
pub fn execute<R: StepRunner>(
    request: &ExecuteRequest,
    runner: &R,
) -> Result<ExecutionReport, ExecuteError> {
    let workdir = &request.workdir;
    if !workdir.is_dir() {
        error!("working directory missing");
        return Err(ExecuteError::MissingDirectory(workdir.clone()));
    }
    if is_marker(&request.log_file) {
        error!(log_file = %request.log_file, "log file would shadow a marker");
        return Err(ExecuteError::LogFileIsMarker(request.log_file.clone()));
    }

    // Detect before the log exists so it can never be mistaken for a marker.
    let kind = detect_project_kind_in(workdir);

    let log_path = log_path_for(request);
    let log = ExecutionLog::create(&log_path, request.echo)?;
    log.started()?;

    let Some(plan) = kind.plan() else {
        return Err(fail(&log, ExecuteError::UnrecognizedProject(workdir.clone())));
    };
    info!(%kind, "detected project type");
    log.stage(&format!("detected project type: {kind}"))?;

    for step in plan.steps() {
        run_step(step, request, runner, &log)?;
    }

    log.finished()?;
    info!(log = %log_path.display(), "execution finished");
    Ok(ExecutionReport { kind, log_path })
}

fn run_step<R: StepRunner>(
    step: &Step,
    request: &ExecuteRequest,
    runner: &R,
    log: &ExecutionLog,
) -> Result<(), ExecuteError> {
    let command = StepCommand::resolve(step, &request.toolchain);
    let label = match step.stage {
        Stage::Install => "installing dependencies",
        Stage::Run => "running",
    };
    log.stage(&format!("{label}: {}", command.display()))?;

    let reason = match runner.run(&command, &request.workdir, log) {
        Ok(output) if output.success => return Ok(()),
        Ok(output) if output.timed_out => format!("`{}` timed out", command.display()),
        Ok(output) => match output.exit_code {
            Some(code) => format!("`{}` exited with status {code}", command.display()),
            None => format!("`{}` was terminated by a signal", command.display()),
        },
        Err(err) => format!("{err:#}"),
    };

    let err = match step.stage {
        Stage::Install => ExecuteError::InstallFailed(reason),
        Stage::Run => ExecuteError::RunFailed(reason),
    };
    Err(fail(log, err))
}

/// Record a stage failure in the log and hand the error back.
fn fail(log: &ExecutionLog, err: ExecuteError) -> ExecuteError {
    error!(%err, "execution aborted");
    if let Err(log_err) = log.error(&err.to_string()) {
        return ExecuteError::Log(log_err.context(err.to_string()));
    }
    err
}

fn marker_list() -> String {
    MARKERS
        .iter()
        .map(|(marker, _)| *marker)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Path of the log a request will write, for callers reporting on failures.
pub fn log_path_for(request: &ExecuteRequest) -> PathBuf {
    request.workdir.join(&request.log_file)
}
