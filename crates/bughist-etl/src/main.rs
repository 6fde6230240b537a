//! `bughist`: rebase freshly extracted bug histories onto the persisted ones,
//! derive status metrics, and write the result to SQLite.
//!
//! Reads `bughist.toml` (or the path given with `--config`) and `BUGHIST_*`
//! environment variables, then processes every input file:
//!
//! ```text
//! bughist extracted/2011-04-*.json
//! extract-bugs --since 2011-04-01 | bughist --now 2011-04-08T00:00:00Z -
//! ```

use std::{
  fs::File,
  io::{self, BufReader, Read},
  path::{Path, PathBuf},
};

use anyhow::Context as _;
use bughist_core::{observe::TracingObserver, pipeline::Pipeline};
use bughist_etl::{EtlConfig, ExtractedBug, build_timelines, expand_tilde};
use bughist_store_sqlite::SqliteStore;
use chrono::{DateTime, Utc};
use clap::Parser;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Incremental bug history loader")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "bughist.toml")]
  config: PathBuf,

  /// Reference time for "latest version" detection (RFC 3339). Defaults to
  /// the current time.
  #[arg(long)]
  now: Option<DateTime<Utc>>,

  /// JSON files with extracted bugs; `-` reads standard input.
  #[arg(required = true)]
  inputs: Vec<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  // Initialise tracing. Logs go to stderr; stdout carries the report.
  tracing_subscriber::fmt()
    .with_writer(io::stderr)
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  // Load configuration.
  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.clone()).required(false))
    .add_source(config::Environment::with_prefix("BUGHIST"))
    .build()
    .context("failed to read config file")?;

  let etl_cfg: EtlConfig = settings
    .try_deserialize()
    .context("failed to deserialise EtlConfig")?;

  let mut bugs = Vec::new();
  for input in &cli.inputs {
    bugs.extend(read_bugs(input)?);
  }
  let (timelines, rejected) = build_timelines(bugs);

  let store_path = expand_tilde(&etl_cfg.store_path);
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  let now = cli.now.unwrap_or_else(Utc::now);
  tracing::info!(bugs = timelines.len(), %now, "processing");

  let pipeline = Pipeline::new(&store, &store, &etl_cfg.taxonomy, &TracingObserver);
  let mut report = pipeline.process_batch(timelines, now).await;
  report.failed.extend(rejected);

  serde_json::to_writer_pretty(io::stdout().lock(), &report)
    .context("failed to write report")?;
  println!();

  if !report.is_success() {
    anyhow::bail!("{} bug(s) failed", report.failed.len());
  }
  Ok(())
}

/// Read a JSON array of extracted bugs from a file, or stdin for `-`.
fn read_bugs(path: &Path) -> anyhow::Result<Vec<ExtractedBug>> {
  let reader: Box<dyn Read> = if path.as_os_str() == "-" {
    Box::new(io::stdin().lock())
  } else {
    let file = File::open(path)
      .with_context(|| format!("failed to open {}", path.display()))?;
    Box::new(file)
  };
  serde_json::from_reader(BufReader::new(reader))
    .with_context(|| format!("failed to parse {}", path.display()))
}
