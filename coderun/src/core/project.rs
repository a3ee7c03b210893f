//! Project-type detection and the install/run dispatch table.
//!
//! Detection is an ordered existence check over marker file names. The first
//! marker present decides the kind; later markers are never consulted. Manifest
//! markers (`requirements.txt`, `package.json`) outrank bare entry points, so a
//! directory holding `package.json` and `main.py` is a Node project.

use std::fmt;

pub const REQUIREMENTS_TXT: &str = "requirements.txt";
pub const PACKAGE_JSON: &str = "package.json";
pub const MAIN_PY: &str = "main.py";
pub const MAIN_JS: &str = "main.js";

/// Marker files in detection order.
pub const MARKERS: [(&str, ProjectKind); 4] = [
    (REQUIREMENTS_TXT, ProjectKind::Python),
    (PACKAGE_JSON, ProjectKind::Node),
    (MAIN_PY, ProjectKind::BarePython),
    (MAIN_JS, ProjectKind::BareNode),
];

/// Shape of the project found in a working directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ProjectKind {
    /// `requirements.txt` present: pip install, then `main.py`.
    Python,
    /// `package.json` present: npm install, then `main.js`.
    Node,
    /// Bare `main.py`, no manifest.
    BarePython,
    /// Bare `main.js`, no manifest.
    BareNode,
    /// No marker file present.
    Unknown,
}

impl ProjectKind {
    pub fn as_str(self) -> &'static str {
        match self {
            ProjectKind::Python => "python",
            ProjectKind::Node => "node",
            ProjectKind::BarePython => "bare-python",
            ProjectKind::BareNode => "bare-node",
            ProjectKind::Unknown => "unknown",
        }
    }

    /// Install and run steps for this kind. `Unknown` has no plan.
    pub fn plan(self) -> Option<ExecutionPlan> {
        match self {
            ProjectKind::Python => Some(ExecutionPlan {
                install: Some(PIP_INSTALL),
                run: PYTHON_RUN,
            }),
            ProjectKind::Node => Some(ExecutionPlan {
                install: Some(NPM_INSTALL),
                run: NODE_RUN,
            }),
            ProjectKind::BarePython => Some(ExecutionPlan {
                install: None,
                run: PYTHON_RUN,
            }),
            ProjectKind::BareNode => Some(ExecutionPlan {
                install: None,
                run: NODE_RUN,
            }),
            ProjectKind::Unknown => None,
        }
    }
}

impl fmt::Display for ProjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// External program a step invokes. Resolved to a concrete command line by the
/// toolchain config.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Tool {
    Pip,
    Python,
    Npm,
    Node,
}

impl Tool {
    pub fn as_str(self) -> &'static str {
        match self {
            Tool::Pip => "pip",
            Tool::Python => "python",
            Tool::Npm => "npm",
            Tool::Node => "node",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Install,
    Run,
}

/// One entry of the dispatch table: a tool plus its fixed arguments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Step {
    pub stage: Stage,
    pub tool: Tool,
    pub args: &'static [&'static str],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPlan {
    pub install: Option<Step>,
    pub run: Step,
}

impl ExecutionPlan {
    /// Steps in execution order.
    pub fn steps(&self) -> impl Iterator<Item = &Step> {
        self.install.iter().chain(std::iter::once(&self.run))
    }
}

const PIP_INSTALL: Step = Step {
    stage: Stage::Install,
    tool: Tool::Pip,
    args: &["install", "-r", REQUIREMENTS_TXT],
};

const PYTHON_RUN: Step = Step {
    stage: Stage::Run,
    tool: Tool::Python,
    args: &[MAIN_PY],
};

const NPM_INSTALL: Step = Step {
    stage: Stage::Install,
    tool: Tool::Npm,
    args: &["install"],
};

const NODE_RUN: Step = Step {
    stage: Stage::Run,
    tool: Tool::Node,
    args: &[MAIN_JS],
};

/// Pick the project kind from the first marker for which `has_marker` is true.
pub fn detect_project_kind<F: Fn(&str) -> bool>(has_marker: F) -> ProjectKind {
    MARKERS
        .iter()
        .find(|(marker, _)| has_marker(marker))
        .map_or(ProjectKind::Unknown, |(_, kind)| *kind)
}

/// Whether `name` is one of the detection markers.
pub fn is_marker(name: &str) -> bool {
    MARKERS.iter().any(|(marker, _)| *marker == name)
}
