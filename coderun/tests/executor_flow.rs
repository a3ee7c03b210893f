//! Executor behavior per project shape.
//!
//! Drives `execute` with a recording step runner so no real `pip`, `npm`,
//! `python` or `node` is needed. Each test checks which commands ran, the
//! returned result, and what ended up in `execution.log`.

use std::path::Path;

use coderun::core::project::{ProjectKind, Tool};
use coderun::execute::{ExecuteError, ExecuteRequest, execute};
use coderun::io::config::ToolchainConfig;
use coderun::io::execution_log::{END_MARKER, START_MARKER};
use coderun::test_support::{ProjectFixture, RecordingStepRunner};

fn request(dir: &Path) -> ExecuteRequest {
    ExecuteRequest {
        workdir: dir.to_path_buf(),
        log_file: "execution.log".to_string(),
        echo: false,
        toolchain: ToolchainConfig::default(),
    }
}

#[test]
fn python_project_installs_then_runs() {
    let fixture = ProjectFixture::with_files(&[
        ("requirements.txt", "requests==2.31.0\n"),
        ("main.py", "print('hello')\n"),
    ]);
    let runner = RecordingStepRunner::succeeding();

    let report = execute(&request(fixture.path()), &runner).expect("execute");
    assert_eq!(report.kind, ProjectKind::Python);
    assert_eq!(
        runner.calls(),
        vec!["pip install -r requirements.txt", "python main.py"]
    );

    let log = fixture.read("execution.log");
    assert!(log.starts_with(START_MARKER));
    assert!(log.contains("ran pip install -r requirements.txt\n"));
    assert!(log.contains("ran python main.py\n"));
    assert!(log.lines().last().expect("last line").starts_with(END_MARKER));
}

#[test]
fn node_project_installs_then_runs() {
    let fixture = ProjectFixture::with_files(&[
        ("package.json", "{\"name\": \"demo\"}\n"),
        ("main.js", "console.log('hello')\n"),
    ]);
    let runner = RecordingStepRunner::succeeding();

    let report = execute(&request(fixture.path()), &runner).expect("execute");
    assert_eq!(report.kind, ProjectKind::Node);
    assert_eq!(runner.calls(), vec!["npm install", "node main.js"]);
    assert!(fixture.read("execution.log").contains(END_MARKER));
}

#[test]
fn requirements_and_package_json_runs_python_only() {
    let fixture = ProjectFixture::with_files(&[
        ("requirements.txt", "\n"),
        ("package.json", "{}\n"),
        ("main.py", "print('py')\n"),
        ("main.js", "console.log('js')\n"),
    ]);
    let runner = RecordingStepRunner::succeeding();

    let report = execute(&request(fixture.path()), &runner).expect("execute");
    assert_eq!(report.kind, ProjectKind::Python);
    let tools = runner.tools();
    assert!(!tools.contains(&Tool::Npm));
    assert!(!tools.contains(&Tool::Node));
}

#[test]
fn package_json_with_bare_main_py_runs_node() {
    let fixture = ProjectFixture::with_files(&[
        ("package.json", "{}\n"),
        ("main.py", "print('py')\n"),
    ]);
    let runner = RecordingStepRunner::succeeding();

    let report = execute(&request(fixture.path()), &runner).expect("execute");
    assert_eq!(report.kind, ProjectKind::Node);
    assert_eq!(runner.tools(), vec![Tool::Npm, Tool::Node]);
}

#[test]
fn empty_directory_fails_without_running_anything() {
    let fixture = ProjectFixture::empty();
    let runner = RecordingStepRunner::succeeding();

    let err = execute(&request(fixture.path()), &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::UnrecognizedProject(_)));
    assert!(runner.calls().is_empty());

    let log = fixture.read("execution.log");
    assert!(log.starts_with(START_MARKER));
    assert!(log.contains("ERROR: no recognizable project type found"));
    assert!(!log.contains(END_MARKER));
}

#[test]
fn failed_install_never_runs_main_py() {
    let fixture = ProjectFixture::with_files(&[
        ("requirements.txt", "not a valid requirement ===\n"),
        ("main.py", "print('unreachable')\n"),
    ]);
    let runner = RecordingStepRunner::failing_with(Tool::Pip, 1);

    let err = execute(&request(fixture.path()), &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::InstallFailed(_)));
    assert_eq!(runner.tools(), vec![Tool::Pip]);

    let log = fixture.read("execution.log");
    assert!(log.contains(
        "ERROR: dependency installation failed: \
         `pip install -r requirements.txt` exited with status 1"
    ));
    assert!(!log.contains("python main.py"));
    assert!(!log.contains(END_MARKER));
}

#[test]
fn bare_main_py_runs_without_install() {
    let fixture = ProjectFixture::with_files(&[("main.py", "print('bare')\n")]);
    let runner = RecordingStepRunner::failing_with(Tool::Pip, 1);

    let report = execute(&request(fixture.path()), &runner).expect("execute");
    assert_eq!(report.kind, ProjectKind::BarePython);
    assert_eq!(runner.calls(), vec!["python main.py"]);
    assert!(fixture.read("execution.log").contains(END_MARKER));
}

#[test]
fn bare_main_js_runs_without_install() {
    let fixture = ProjectFixture::with_files(&[("main.js", "console.log('bare')\n")]);
    let runner = RecordingStepRunner::succeeding();

    let report = execute(&request(fixture.path()), &runner).expect("execute");
    assert_eq!(report.kind, ProjectKind::BareNode);
    assert_eq!(runner.calls(), vec!["node main.js"]);
}

#[test]
fn missing_directory_fails_before_logging() {
    let fixture = ProjectFixture::empty();
    let missing = fixture.path().join("generated-code");
    let runner = RecordingStepRunner::succeeding();

    let err = execute(&request(&missing), &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::MissingDirectory(_)));
    assert!(runner.calls().is_empty());
    assert!(!missing.exists());
}

#[test]
fn configured_toolchain_prefixes_commands() {
    let fixture = ProjectFixture::with_files(&[("requirements.txt", "\n")]);
    let mut req = request(fixture.path());
    req.toolchain.pip = vec!["python3".to_string(), "-m".to_string(), "pip".to_string()];
    req.toolchain.python = vec!["python3".to_string()];
    let runner = RecordingStepRunner::succeeding();

    execute(&req, &runner).expect("execute");
    assert_eq!(
        runner.calls(),
        vec!["python3 -m pip install -r requirements.txt", "python3 main.py"]
    );
}

#[test]
fn timed_out_run_fails_without_end_marker() {
    let fixture = ProjectFixture::with_files(&[("main.py", "while True: pass\n")]);
    let runner = RecordingStepRunner::timing_out(Tool::Python);

    let err = execute(&request(fixture.path()), &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::RunFailed(_)));
    assert_eq!(err.to_string(), "execution failed: `python main.py` timed out");

    let log = fixture.read("execution.log");
    assert!(log.contains("ERROR: execution failed: `python main.py` timed out"));
    assert!(!log.contains(END_MARKER));
}

#[test]
fn timed_out_install_skips_run() {
    let fixture = ProjectFixture::with_files(&[
        ("package.json", "{}\n"),
        ("main.js", "console.log('unreachable')\n"),
    ]);
    let runner = RecordingStepRunner::timing_out(Tool::Npm);

    let err = execute(&request(fixture.path()), &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::InstallFailed(_)));
    assert_eq!(runner.tools(), vec![Tool::Npm]);

    let log = fixture.read("execution.log");
    assert!(log.contains("ERROR: dependency installation failed: `npm install` timed out"));
    assert!(!log.contains(END_MARKER));
}

#[test]
fn signal_death_is_reported_as_run_failure() {
    let fixture = ProjectFixture::with_files(&[("main.js", "process.kill(process.pid)\n")]);
    let runner = RecordingStepRunner::signaled(Tool::Node);

    let err = execute(&request(fixture.path()), &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::RunFailed(_)));

    let log = fixture.read("execution.log");
    assert!(log.contains("ERROR: execution failed: `node main.js` was terminated by a signal"));
    assert!(!log.contains(END_MARKER));
}

#[test]
fn log_file_named_like_a_marker_is_refused() {
    let fixture = ProjectFixture::with_files(&[("main.js", "console.log('bare')\n")]);
    let mut req = request(fixture.path());
    req.log_file = "requirements.txt".to_string();
    let runner = RecordingStepRunner::succeeding();

    let err = execute(&req, &runner).unwrap_err();
    assert!(matches!(err, ExecuteError::LogFileIsMarker(_)));
    assert!(runner.calls().is_empty());
    assert!(!fixture.path().join("requirements.txt").exists());
}

#[test]
fn detection_ignores_log_left_by_previous_run() {
    let fixture = ProjectFixture::with_files(&[("main.js", "console.log('bare')\n")]);
    let runner = RecordingStepRunner::succeeding();

    execute(&request(fixture.path()), &runner).expect("first run");
    let report = execute(&request(fixture.path()), &runner).expect("second run");
    assert_eq!(report.kind, ProjectKind::BareNode);
    assert_eq!(runner.calls(), vec!["node main.js", "node main.js"]);
}
