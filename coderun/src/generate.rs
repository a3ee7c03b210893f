//! Orchestration for `coderun generate`: topic in, project directory out.

use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::{info, instrument};

use crate::core::language::{Language, detect_language};
use crate::io::generator::Generator;
use crate::io::workspace::{GeneratedArtifacts, save_generated};

/// Fixed system prompt for the code request. The topic is the user message.
pub const SYSTEM_PROMPT: &str = "You are an autonomous coding agent. Given a topic, write a \
complete, working program that implements it. Prefer Python with a `main.py` entry point, or \
Node.js with a `main.js` entry point. Use popular, stable libraries only, handle errors, and \
comment the architecture. Output ONLY the code, ready to run.";

const REQUIREMENTS_SYSTEM_PROMPT: &str = "You list the third-party Python packages a program \
needs, in requirements.txt format.";

/// Characters of generated code shown to the requirements request.
const REQUIREMENTS_SNIPPET_CHARS: usize = 500;

#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub topic: String,
    pub output_dir: PathBuf,
    /// Follow up with a requirements request when the code is Python.
    pub generate_requirements: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationSummary {
    pub output_dir: PathBuf,
    pub language: Language,
    pub files: Vec<String>,
}

/// Ask the generator for code on `request.topic` and write the result into
/// `request.output_dir`.
#[instrument(skip_all, fields(topic = %request.topic))]
pub fn generate_project<G: Generator>(
    generator: &G,
    request: &GenerateRequest,
) -> Result<GenerationSummary> {
    info!("requesting code");
    let code = generator
        .complete(SYSTEM_PROMPT, &request.topic)
        .context("generate code")?;
    let language = detect_language(&code);
    info!(?language, chars = code.len(), "code generated");

    let requirements = if request.generate_requirements && language == Language::Python {
        let prompt = requirements_prompt(&request.topic, &code);
        Some(
            generator
                .complete(REQUIREMENTS_SYSTEM_PROMPT, &prompt)
                .context("generate requirements")?,
        )
    } else {
        None
    };

    let files = save_generated(
        &request.output_dir,
        &GeneratedArtifacts {
            topic: &request.topic,
            model: generator.model(),
            language,
            code: &code,
            requirements: requirements.as_deref(),
        },
    )?;

    Ok(GenerationSummary {
        output_dir: request.output_dir.clone(),
        language,
        files,
    })
}

fn requirements_prompt(topic: &str, code: &str) -> String {
    let snippet: String = code.chars().take(REQUIREMENTS_SNIPPET_CHARS).collect();
    format!(
        "Given this topic and code, what Python packages are needed?\n\n\
         Topic: {topic}\n\n\
         Code snippet:\n{snippet}...\n\n\
         List ONLY package names and versions (one per line), like:\n\
         requests==2.28.1\n\
         numpy==1.23.0\n\n\
         If no external packages needed, return: # No external dependencies"
    )
}
