//! Step runner abstraction over the external package managers and runtimes.
//!
//! The [`StepRunner`] trait decouples executor orchestration from spawning real
//! processes. Tests use recording runners that never touch `pip` or `npm`.

use std::path::Path;
use std::process::Command;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use tracing::{info, instrument, warn};

use crate::core::project::{Stage, Step, Tool};
use crate::io::config::ToolchainConfig;
use crate::io::execution_log::ExecutionLog;
use crate::io::process::{StepOutput, run_teed};

/// A dispatch-table step resolved to a concrete command line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepCommand {
    pub stage: Stage,
    pub tool: Tool,
    /// Program followed by its arguments.
    pub argv: Vec<String>,
}

impl StepCommand {
    pub fn resolve(step: &Step, toolchain: &ToolchainConfig) -> Self {
        let mut argv = toolchain.command(step.tool).to_vec();
        argv.extend(step.args.iter().map(|arg| (*arg).to_string()));
        Self {
            stage: step.stage,
            tool: step.tool,
            argv,
        }
    }

    pub fn display(&self) -> String {
        self.argv.join(" ")
    }
}

/// Abstraction over step execution backends.
pub trait StepRunner {
    /// Run `command` inside `workdir`, sending its combined output to `log`.
    fn run(&self, command: &StepCommand, workdir: &Path, log: &ExecutionLog) -> Result<StepOutput>;
}

/// Runner that spawns the configured programs from `PATH`.
#[derive(Debug, Clone, Default)]
pub struct SystemStepRunner {
    pub timeout: Option<Duration>,
}

impl StepRunner for SystemStepRunner {
    #[instrument(skip_all, fields(tool = command.tool.as_str()))]
    fn run(&self, command: &StepCommand, workdir: &Path, log: &ExecutionLog) -> Result<StepOutput> {
        let (program, args) = command
            .argv
            .split_first()
            .ok_or_else(|| anyhow!("empty command for {}", command.tool.as_str()))?;
        info!(command = %command.display(), workdir = %workdir.display(), "starting step");

        let mut cmd = Command::new(program);
        cmd.args(args).current_dir(workdir);
        let output = run_teed(cmd, self.timeout, log)
            .with_context(|| format!("could not start `{program}`"))?;

        if !output.success {
            warn!(exit_code = ?output.exit_code, timed_out = output.timed_out, "step failed");
        }
        Ok(output)
    }
}
