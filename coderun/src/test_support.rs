//! Test-only fixtures: scratch project directories, a recording step runner
//! and a scripted generator.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::Path;

use anyhow::{Result, anyhow};
use tempfile::TempDir;

use crate::core::project::Tool;
use crate::io::execution_log::ExecutionLog;
use crate::io::generator::Generator;
use crate::io::process::StepOutput;
use crate::io::toolchain::{StepCommand, StepRunner};

/// Temporary working directory seeded with files.
pub struct ProjectFixture {
    dir: TempDir,
}

impl ProjectFixture {
    pub fn empty() -> Self {
        Self {
            dir: tempfile::tempdir().expect("tempdir"),
        }
    }

    pub fn with_files(files: &[(&str, &str)]) -> Self {
        let fixture = Self::empty();
        for (name, contents) in files {
            fixture.write(name, contents);
        }
        fixture
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn write(&self, name: &str, contents: &str) {
        fs::write(self.dir.path().join(name), contents).expect("write fixture file");
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.dir.path().join(name)).expect("read fixture file")
    }
}

#[derive(Debug, Clone, Copy)]
enum Behavior {
    Finish(StepOutput),
    Unspawnable,
}

/// Step runner that records every command it is asked to run.
///
/// Each call writes `ran <command>` to the log so tests can check that step
/// output reaches the log. Tools without a scripted behavior exit 0.
pub struct RecordingStepRunner {
    behaviors: Vec<(Tool, Behavior)>,
    calls: RefCell<Vec<StepCommand>>,
}

impl RecordingStepRunner {
    pub fn succeeding() -> Self {
        Self {
            behaviors: Vec::new(),
            calls: RefCell::new(Vec::new()),
        }
    }

    /// `tool` exits with `code`; everything else succeeds.
    pub fn failing_with(tool: Tool, code: i32) -> Self {
        let mut runner = Self::succeeding();
        runner.behaviors.push((tool, Behavior::Finish(StepOutput::exited(code))));
        runner
    }

    /// `tool` is killed at the step timeout.
    pub fn timing_out(tool: Tool) -> Self {
        let mut runner = Self::succeeding();
        runner.behaviors.push((tool, Behavior::Finish(StepOutput::after_timeout())));
        runner
    }

    /// `tool` dies from a signal without an exit code.
    pub fn signaled(tool: Tool) -> Self {
        let mut runner = Self::succeeding();
        runner.behaviors.push((tool, Behavior::Finish(StepOutput::signaled())));
        runner
    }

    /// `tool` cannot be spawned, as if it were missing from `PATH`.
    pub fn unspawnable(tool: Tool) -> Self {
        let mut runner = Self::succeeding();
        runner.behaviors.push((tool, Behavior::Unspawnable));
        runner
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().iter().map(StepCommand::display).collect()
    }

    pub fn tools(&self) -> Vec<Tool> {
        self.calls.borrow().iter().map(|call| call.tool).collect()
    }

    fn behavior(&self, tool: Tool) -> Behavior {
        self.behaviors
            .iter()
            .find(|(t, _)| *t == tool)
            .map_or(Behavior::Finish(StepOutput::exited(0)), |(_, b)| *b)
    }
}

impl StepRunner for RecordingStepRunner {
    fn run(
        &self,
        command: &StepCommand,
        _workdir: &Path,
        log: &ExecutionLog,
    ) -> Result<StepOutput> {
        self.calls.borrow_mut().push(command.clone());
        match self.behavior(command.tool) {
            Behavior::Unspawnable => Err(anyhow!("No such file or directory (os error 2)")
                .context(format!("could not start `{}`", command.argv[0]))),
            Behavior::Finish(output) => {
                log.write_output(format!("ran {}\n", command.display()).as_bytes())?;
                Ok(output)
            }
        }
    }
}

/// Generator that replays canned responses and records the prompts it saw.
pub struct ScriptedGenerator {
    model: String,
    responses: RefCell<VecDeque<String>>,
    prompts: RefCell<Vec<(String, String)>>,
}

impl ScriptedGenerator {
    pub fn new(responses: Vec<&str>) -> Self {
        Self {
            model: "scripted-model".to_string(),
            responses: RefCell::new(responses.into_iter().map(str::to_string).collect()),
            prompts: RefCell::new(Vec::new()),
        }
    }

    /// `(system, user)` pairs in request order.
    pub fn prompts(&self) -> Vec<(String, String)> {
        self.prompts.borrow().clone()
    }
}

impl Generator for ScriptedGenerator {
    fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.prompts
            .borrow_mut()
            .push((system.to_string(), user.to_string()));
        self.responses
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| anyhow!("scripted generator exhausted"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
