//! Filesystem side of the working directory: marker lookup and generated
//! artifacts.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{SecondsFormat, Utc};
use serde::Serialize;
use tracing::warn;

use crate::core::language::Language;
use crate::core::project::{MARKERS, ProjectKind, REQUIREMENTS_TXT, detect_project_kind};

pub const DEFAULT_WORKDIR: &str = "generated-code";
pub const METADATA_JSON: &str = "metadata.json";

/// Detect the project kind from the regular files present in `dir`.
pub fn detect_project_kind_in(dir: &Path) -> ProjectKind {
    detect_project_kind(|marker| dir.join(marker).is_file())
}

/// Description of one generation run, written beside the generated code.
#[derive(Debug, Clone, Serialize)]
pub struct GenerationMetadata {
    pub topic: String,
    pub language: Language,
    pub model: String,
    pub generated_at: String,
    pub files: Vec<String>,
}

/// Generated text for one topic, stored verbatim.
#[derive(Debug, Clone)]
pub struct GeneratedArtifacts<'a> {
    pub topic: &'a str,
    pub model: &'a str,
    pub language: Language,
    pub code: &'a str,
    pub requirements: Option<&'a str>,
}

/// Write the entry point, optional requirements and `metadata.json` into
/// `output_dir`, creating it if needed. Returns the names written.
pub fn save_generated(
    output_dir: &Path,
    artifacts: &GeneratedArtifacts<'_>,
) -> Result<Vec<String>> {
    fs::create_dir_all(output_dir)
        .with_context(|| format!("create output dir {}", output_dir.display()))?;
    remove_stale_markers(output_dir)?;

    let mut files = Vec::new();
    let entry = artifacts.language.entry_file();
    write_text(&output_dir.join(entry), artifacts.code)?;
    files.push(entry.to_string());

    if let (Some(requirements), Language::Python) = (artifacts.requirements, artifacts.language) {
        write_text(&output_dir.join(REQUIREMENTS_TXT), requirements)?;
        files.push(REQUIREMENTS_TXT.to_string());
    }

    let metadata = GenerationMetadata {
        topic: artifacts.topic.to_string(),
        language: artifacts.language,
        model: artifacts.model.to_string(),
        generated_at: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
        files: files.clone(),
    };
    write_json(&output_dir.join(METADATA_JSON), &metadata)?;
    files.push(METADATA_JSON.to_string());

    Ok(files)
}

/// Delete marker files left by an earlier generation so detection only sees
/// what this run writes.
fn remove_stale_markers(output_dir: &Path) -> Result<()> {
    for (marker, _) in &MARKERS {
        let path = output_dir.join(marker);
        if path.is_file() {
            warn!(path = %path.display(), "removing stale marker file");
            fs::remove_file(&path).with_context(|| format!("remove {}", path.display()))?;
        }
    }
    Ok(())
}

/// Resolve the working directory argument, falling back to the default name.
pub fn workdir_or_default(dir: Option<PathBuf>) -> PathBuf {
    dir.unwrap_or_else(|| PathBuf::from(DEFAULT_WORKDIR))
}

fn write_text(path: &Path, contents: &str) -> Result<()> {
    fs::write(path, contents).with_context(|| format!("write {}", path.display()))
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let mut buf = serde_json::to_string_pretty(value).context("serialize json")?;
    buf.push('\n');
    write_text(path, &buf)
}
