//! Run generated projects and generate them from topics.
//!
//! `coderun generate` writes a project into a working directory (default
//! `generated-code/`); `coderun execute` detects its type, installs
//! dependencies, runs it and leaves `execution.log` behind for the CI job.

use std::env;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow, bail};
use clap::{Parser, Subcommand};
use tracing::debug;

use coderun::core::project::ProjectKind;
use coderun::core::topic::topic_from_issue_title;
use coderun::execute::{ExecuteRequest, execute};
use coderun::exit_codes;
use coderun::generate::{GenerateRequest, generate_project};
use coderun::io::config::{Config, DEFAULT_CONFIG_PATH, load_config, write_config};
use coderun::io::generator::ChatCompletionGenerator;
use coderun::io::toolchain::SystemStepRunner;
use coderun::io::workspace::{detect_project_kind_in, workdir_or_default};
use coderun::logging;

#[derive(Parser)]
#[command(
    name = "coderun",
    version,
    about = "Generate code from a topic and run it by project type"
)]
struct Cli {
    /// Path to the TOML config. Missing file means defaults.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write the default config file if missing.
    Init {
        /// Overwrite an existing file.
        #[arg(short, long)]
        force: bool,
    },
    /// Print the project type found in a directory.
    Detect {
        /// Working directory (default `generated-code`).
        dir: Option<PathBuf>,
    },
    /// Install dependencies and run the project in a directory.
    Execute {
        /// Working directory (default `generated-code`).
        dir: Option<PathBuf>,
        /// Write the log file only; do not echo it to stdout.
        #[arg(short, long)]
        quiet: bool,
    },
    /// Ask the model for code on a topic and write it to a directory.
    Generate {
        /// Topic text, or a full issue title with `--issue-title`.
        topic: String,
        /// Treat TOPIC as an issue title and strip its `Topic:` prefix.
        #[arg(long)]
        issue_title: bool,
        /// Output directory (default `generated-code`).
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// API key; defaults to the variable named by `generator.api_key_env`.
        #[arg(long)]
        api_key: Option<String>,
    },
}

fn main() {
    logging::init();
    if let Err(err) = run() {
        eprintln!("{:#}", err);
        std::process::exit(exit_codes::FAILURE);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Command::Init { force } => cmd_init(&cli.config, force),
        Command::Detect { dir } => cmd_detect(workdir_or_default(dir)),
        Command::Execute { dir, quiet } => {
            let cfg = load_config(&cli.config)?;
            cmd_execute(&cfg, workdir_or_default(dir), quiet)
        }
        Command::Generate {
            topic,
            issue_title,
            output,
            api_key,
        } => {
            let cfg = load_config(&cli.config)?;
            let topic = if issue_title {
                topic_from_issue_title(&topic)
                    .ok_or_else(|| anyhow!("issue title {topic:?} does not start with `Topic:`"))?
                    .to_string()
            } else {
                topic
            };
            cmd_generate(&cfg, topic, workdir_or_default(output), api_key)
        }
    }
}

fn cmd_init(path: &Path, force: bool) -> Result<()> {
    if !force && path.exists() {
        debug!(path = %path.display(), "config exists, leaving it");
        return Ok(());
    }
    write_config(path, &Config::default()).with_context(|| format!("write {}", path.display()))
}

fn cmd_detect(dir: PathBuf) -> Result<()> {
    if !dir.is_dir() {
        bail!("working directory {} does not exist", dir.display());
    }
    let kind = detect_project_kind_in(&dir);
    if kind == ProjectKind::Unknown {
        bail!("no recognizable project type found in {}", dir.display());
    }
    println!("{kind}");
    Ok(())
}

fn cmd_execute(cfg: &Config, dir: PathBuf, quiet: bool) -> Result<()> {
    let request = ExecuteRequest {
        workdir: dir,
        log_file: cfg.log_file.clone(),
        echo: !quiet,
        toolchain: cfg.toolchain.clone(),
    };
    let runner = SystemStepRunner {
        timeout: cfg.step_timeout(),
    };
    let report = execute(&request, &runner)?;
    debug!(kind = %report.kind, log = %report.log_path.display(), "execute complete");
    Ok(())
}

fn cmd_generate(
    cfg: &Config,
    topic: String,
    output_dir: PathBuf,
    api_key: Option<String>,
) -> Result<()> {
    let api_key = match api_key {
        Some(key) => key,
        None => env::var(&cfg.generator.api_key_env).with_context(|| {
            format!(
                "{} environment variable not set (or pass --api-key)",
                cfg.generator.api_key_env
            )
        })?,
    };
    let generator = ChatCompletionGenerator::new(&cfg.generator, api_key)?;
    let summary = generate_project(
        &generator,
        &GenerateRequest {
            topic,
            output_dir,
            generate_requirements: cfg.generator.generate_requirements,
        },
    )?;
    println!(
        "generated: dir={} language={:?} files={}",
        summary.output_dir.display(),
        summary.language,
        summary.files.join(",")
    );
    Ok(())
}
