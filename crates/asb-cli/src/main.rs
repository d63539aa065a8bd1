//! `asb`: resolve a corpus of annotated case files and write the exports.
//!
//! Settings come from `asb.toml` (or `--config`), then `ASB_*` environment
//! variables, then command-line flags.
//!
//! ```text
//! asb --input cases --output out --strict
//! ```

mod discover;
mod summary;

use std::path::PathBuf;

use anyhow::Context as _;
use asb_core::{PassConfig, ResolutionMode, resolve_corpus};
use clap::Parser;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "asb", version, about = "Resolve ASB case files into a corpus")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "asb.toml")]
  config: PathBuf,

  /// Directory searched for `*.xml` case files.
  #[arg(short, long)]
  input: Option<PathBuf>,

  /// Root of the output tree.
  #[arg(short, long)]
  output: Option<PathBuf>,

  /// Abort on the first fatal collision.
  #[arg(long)]
  strict: bool,
}

fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("ASB"))
    .build()
    .context("failed to read config file")?;
  let mut pass: PassConfig = settings
    .try_deserialize()
    .context("failed to deserialise PassConfig")?;

  if let Some(input) = cli.input {
    pass.input_dir = input;
  }
  if let Some(output) = cli.output {
    pass.output_dir = output;
  }
  if cli.strict {
    pass.mode = ResolutionMode::Strict;
  }

  let files = discover::case_files(&pass.input_dir).with_context(|| {
    format!("failed to list case files in {}", pass.input_dir.display())
  })?;
  info!(
    input = %pass.input_dir.display(),
    documents = files.len(),
    mode = %pass.mode,
    "starting pass"
  );

  let corpus = resolve_corpus(&files, pass.mode).context("pass aborted")?;

  let written = asb_export::export(&corpus, &pass.output_dir, &pass)
    .with_context(|| {
      format!("failed to write exports to {}", pass.output_dir.display())
    })?;
  info!(files = written.len(), "exports written");

  print!("{}", summary::render(&corpus));
  Ok(())
}
