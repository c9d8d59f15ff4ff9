//! This module implements the CLI interface for nugu: argument parsing, option
//! layering, and handing the job to the core pipeline.
//!
//! All posting logic (manifest building, argument encoding, process supervision,
//! progress decoding) lives in [`nugu-core`]. This module is CLI glue only.
//!
//! ## Option layering
//! Built-in defaults, then `USENET_POST_*` environment variables, then the YAML
//! option file given with `--config`, then the flags after the source paths.
//! Output defaults to the terminal (`--out -`).
//!
//! [`nugu-core`]: ../../nugu-core/

use crate::load_config::load_config;
use crate::passthrough::{parse_options, split_sources};
use anyhow::{bail, Context, Result};
use clap::Parser;
use nugu_core::archive::TarProbe;
use nugu_core::config::Defaults;
use nugu_core::listing::RcloneLister;
use nugu_core::manifest::FetchCommands;
use nugu_core::options::{JobOptions, OUT_KEY};
use nugu_core::post::Poster;
use nugu_core::progress::ProgressRecord;
use nugu_core::supervisor::EngineConfig;
use std::path::PathBuf;
use tokio::io::AsyncWriteExt;

/// CLI for nugu: post files from any rclone remote into a single NZB.
#[derive(Parser, Debug)]
#[clap(
    name = "nugu",
    version,
    about = "Post local or remote files to Usenet without downloading them first"
)]
pub struct Cli {
    /// YAML file of default posting options
    #[clap(long, env = "NUGU_CONFIG")]
    pub config: Option<PathBuf>,

    /// Posting engine executable
    #[clap(long, env = "NUGU_ENGINE", default_value = "nyuu")]
    pub engine: String,

    /// Argument placed before the posting options (repeatable, e.g. `--engine npx --engine-arg nyuu`)
    #[clap(long = "engine-arg", allow_hyphen_values = true)]
    pub engine_args: Vec<String>,

    /// rclone executable used to list sources and stream their bytes
    #[clap(long, env = "NUGU_RCLONE", default_value = "rclone")]
    pub rclone: String,

    /// Log decoded upload progress
    #[clap(long)]
    pub track_progress: bool,

    /// Source paths, then posting options (`--host news.example.com --port 563 ...`)
    #[clap(
        required = true,
        num_args = 1..,
        trailing_var_arg = true,
        allow_hyphen_values = true
    )]
    pub args: Vec<String>,
}

/// Target of the `--track-progress` events, enabled even under the default filter.
pub const PROGRESS_TARGET: &str = "nugu::progress";

/// Filter used when `RUST_LOG` is unset.
pub fn default_log_filter(track_progress: bool) -> String {
    if track_progress {
        format!("warn,{PROGRESS_TARGET}=info")
    } else {
        "warn".to_string()
    }
}

fn log_progress(record: &ProgressRecord) {
    tracing::info!(
        target: PROGRESS_TARGET,
        files = record.files,
        articles = record.articles,
        total_size = record.total_size.as_deref().unwrap_or("?"),
        read = record.read,
        posted = record.posted,
        checked = record.checked,
        "Upload progress"
    );
}

/// Async CLI entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    let (sources, flags) = split_sources(&cli.args);
    if sources.is_empty() {
        bail!("at least one source path is required before the posting options");
    }

    let mut overrides = match &cli.config {
        Some(path) => load_config(path)?,
        None => Default::default(),
    };
    overrides.merge(&parse_options(flags)?);
    if !overrides.contains_key(OUT_KEY) {
        overrides.set(OUT_KEY, "-");
    }

    let defaults = Defaults::from_env();
    let mut options = JobOptions::new(&defaults, overrides);
    if cli.track_progress {
        options = options.on_progress(log_progress);
    }

    let poster = Poster::new(
        RcloneLister::new(cli.rclone.clone()),
        TarProbe,
        FetchCommands::new(cli.rclone.clone()),
        EngineConfig {
            program: cli.engine.clone(),
            leading_args: cli.engine_args.clone(),
        },
    );

    tracing::info!(command = "post", sources = ?sources, "Starting posting job");
    let outcome = poster
        .post(&sources, options)
        .await
        .context("Posting job failed")?;

    if let Some(nzb) = outcome.finish().await.context("Posting engine failed")? {
        let mut stdout = tokio::io::stdout();
        stdout.write_all(&nzb).await?;
        stdout.flush().await?;
    }
    tracing::info!(command = "post", "Posting job complete");
    Ok(())
}
