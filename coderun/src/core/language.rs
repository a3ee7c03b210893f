//! Language guess for generated source text.

use serde::Serialize;

use crate::core::project::{MAIN_JS, MAIN_PY};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    Python,
    JavaScript,
}

impl Language {
    /// Entry-point file the executor looks for.
    pub fn entry_file(self) -> &'static str {
        match self {
            Language::Python => MAIN_PY,
            Language::JavaScript => MAIN_JS,
        }
    }
}

/// Python if the text imports something and looks like a Python module,
/// JavaScript otherwise.
pub fn detect_language(code: &str) -> Language {
    let python_like =
        code.contains("import os") || code.contains("import sys") || code.contains("def ");
    if code.contains("import") && python_like {
        Language::Python
    } else {
        Language::JavaScript
    }
}
