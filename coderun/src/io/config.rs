//! Configuration stored in `coderun.toml`.

use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use serde::{Deserialize, Serialize};

use crate::core::project::{Tool, is_marker};

pub const DEFAULT_CONFIG_PATH: &str = "coderun.toml";

/// Tool configuration (TOML).
///
/// Intended to be edited by humans and checked into the repository that hosts
/// the workflow. Missing fields default to the values the CI job expects.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Log file name, created inside the working directory.
    pub log_file: String,

    /// Kill a step after this many seconds. Unset means no limit; the CI job
    /// timeout is the only bound.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_timeout_secs: Option<u64>,

    pub toolchain: ToolchainConfig,

    pub generator: GeneratorConfig,
}

/// Command prefixes for the external tools. Step arguments are appended.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolchainConfig {
    pub pip: Vec<String>,
    pub python: Vec<String>,
    pub npm: Vec<String>,
    pub node: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GeneratorConfig {
    /// Base URL of an OpenAI-compatible API; `/chat/completions` is appended.
    pub endpoint: String,
    pub model: String,
    /// Environment variable holding the API key.
    pub api_key_env: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub request_timeout_secs: u64,
    /// Ask a second time for a `requirements.txt` when the code is Python.
    pub generate_requirements: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_file: "execution.log".to_string(),
            step_timeout_secs: None,
            toolchain: ToolchainConfig::default(),
            generator: GeneratorConfig::default(),
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            pip: vec!["pip".to_string()],
            python: vec!["python".to_string()],
            npm: vec!["npm".to_string()],
            node: vec!["node".to_string()],
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://models.inference.ai.azure.com".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: "GITHUB_MODEL_API_KEY".to_string(),
            temperature: 0.7,
            max_tokens: 4000,
            request_timeout_secs: 120,
            generate_requirements: false,
        }
    }
}

impl ToolchainConfig {
    pub fn command(&self, tool: Tool) -> &[String] {
        match tool {
            Tool::Pip => &self.pip,
            Tool::Python => &self.python,
            Tool::Npm => &self.npm,
            Tool::Node => &self.node,
        }
    }

    fn validate(&self) -> Result<()> {
        for tool in [Tool::Pip, Tool::Python, Tool::Npm, Tool::Node] {
            let command = self.command(tool);
            if command.is_empty() || command[0].trim().is_empty() {
                return Err(anyhow!(
                    "toolchain.{} must be a non-empty array",
                    tool.as_str()
                ));
            }
        }
        Ok(())
    }
}

impl GeneratorConfig {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    fn validate(&self) -> Result<()> {
        if self.endpoint.trim().is_empty() {
            return Err(anyhow!("generator.endpoint must not be empty"));
        }
        if self.model.trim().is_empty() {
            return Err(anyhow!("generator.model must not be empty"));
        }
        if self.api_key_env.trim().is_empty() {
            return Err(anyhow!("generator.api_key_env must not be empty"));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(anyhow!("generator.temperature must be within 0.0..=2.0"));
        }
        if self.max_tokens == 0 {
            return Err(anyhow!("generator.max_tokens must be > 0"));
        }
        if self.request_timeout_secs == 0 {
            return Err(anyhow!("generator.request_timeout_secs must be > 0"));
        }
        Ok(())
    }
}

impl Config {
    pub fn step_timeout(&self) -> Option<Duration> {
        self.step_timeout_secs.map(Duration::from_secs)
    }

    pub fn validate(&self) -> Result<()> {
        let log_name = Path::new(&self.log_file);
        if self.log_file.trim().is_empty()
            || log_name.file_name() != Some(log_name.as_os_str())
        {
            return Err(anyhow!("log_file must be a plain file name"));
        }
        if is_marker(&self.log_file) {
            return Err(anyhow!(
                "log_file must not be a project marker name, got {}",
                self.log_file
            ));
        }
        if self.step_timeout_secs == Some(0) {
            return Err(anyhow!("step_timeout_secs must be > 0 when set"));
        }
        self.toolchain.validate()?;
        self.generator.validate()?;
        Ok(())
    }
}

/// Load config from a TOML file.
///
/// If the file is missing, returns `Config::default()`.
pub fn load_config(path: &Path) -> Result<Config> {
    if !path.exists() {
        let cfg = Config::default();
        cfg.validate()?;
        return Ok(cfg);
    }
    let contents = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    let cfg: Config =
        toml::from_str(&contents).with_context(|| format!("parse {}", path.display()))?;
    cfg.validate()
        .with_context(|| format!("invalid config {}", path.display()))?;
    Ok(cfg)
}

/// Atomically write config to disk (temp file + rename).
pub fn write_config(path: &Path, cfg: &Config) -> Result<()> {
    cfg.validate()?;
    let mut buf = toml::to_string_pretty(cfg).context("serialize config toml")?;
    buf.push('\n');
    write_atomic(path, &buf)
}

fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("create directory {}", parent.display()))?;
    }
    let tmp_path = path.with_extension("toml.tmp");
    fs::write(&tmp_path, contents)
        .with_context(|| format!("write temp config {}", tmp_path.display()))?;
    fs::rename(&tmp_path, path).with_context(|| format!("replace config {}", path.display()))?;
    Ok(())
}
