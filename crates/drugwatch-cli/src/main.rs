//! `drugwatch` — records scraped drug-lawsuit listings and reports what is new.
//!
//! # Usage
//!
//! ```
//! drugwatch run --scans scans.json
//! drugwatch run --scans scans.json --dry-run
//! drugwatch compact
//! drugwatch stats --drug Zantac --source TorHoermanLaw
//! ```

mod config;
mod scans;

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::{Parser, Subcommand};
use drugwatch_core::{
  announce::announcements,
  batch::process_batch,
  compact::compact,
  store::{HitFilter, HitStats, RecordStore, hit_stats},
};
use drugwatch_store_sqlite::SqliteStore;
use serde_json::json;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

use crate::config::RunConfig;

// ─── CLI args ─────────────────────────────────────────────────────────────────

#[derive(Parser)]
#[command(name = "drugwatch", version, about = "Track drug lawsuit listings across law firms")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "drugwatch.toml", global = true)]
  config: PathBuf,

  /// Default log level; `RUST_LOG` takes precedence.
  #[arg(long, value_name = "LEVEL", global = true)]
  log_level: Option<LevelFilter>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Record a batch of scans, compact hits, and print verdicts.
  Run {
    /// JSON scans file, or `-` for stdin.
    #[arg(short, long)]
    scans: PathBuf,

    /// Classify and report, but roll back instead of committing.
    #[arg(long)]
    dry_run: bool,
  },
  /// Prune hits down to the first and last sighting per drug and source.
  Compact,
  /// Show hit statistics for a drug.
  Stats {
    #[arg(long)]
    drug: String,

    #[arg(long)]
    source: Option<String>,
  },
}

// ─── Entry point ──────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> Result<()> {
  let cli = Cli::parse();

  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(cli.log_level.unwrap_or(LevelFilter::INFO).into())
        .from_env_lossy(),
    )
    .with_writer(std::io::stderr)
    .init();

  let cfg = RunConfig::load(&cli.config)?;
  let store_path = cfg.store_path();
  let store = SqliteStore::open(&store_path)
    .await
    .with_context(|| format!("failed to open store at {store_path:?}"))?;

  match cli.command {
    Command::Run { scans, dry_run } => run(&store, &cfg, &scans, dry_run).await,
    Command::Compact => {
      let report = compact(&store).await.context("compaction failed")?;
      store.commit().await.context("commit failed")?;
      println!("{}", serde_json::to_string_pretty(&report)?);
      Ok(())
    }
    Command::Stats { drug, source } => stats(&store, &drug, source.as_deref()).await,
  }
}

// ─── Commands ─────────────────────────────────────────────────────────────────

/// One full run: record the batch, compact, report, then commit or roll back.
async fn run(store: &SqliteStore, cfg: &RunConfig, path: &Path, dry_run: bool) -> Result<()> {
  let registry = cfg.registry();
  let scans = scans::load(path)?;

  let outcome = async {
    let verdicts = process_batch(store, &registry, &scans).await?;
    let report = compact(store).await?;
    Ok::<_, drugwatch_core::Error>((verdicts, report))
  }
  .await;

  let (verdicts, report) = match outcome {
    Ok(v) => v,
    Err(err) => {
      if err.is_consistency_fault() {
        tracing::error!(%err, "hit table is inconsistent");
      }
      store.rollback().await.context("rollback failed")?;
      return Err(err).context("run aborted; nothing was saved");
    }
  };

  let news = announcements(&verdicts);
  for a in &news {
    tracing::info!(
      kind = ?a.kind,
      drug = %a.drug,
      new_sources = a.new_sources.len(),
      total_sources = a.total_sources,
      "announcement"
    );
  }

  if dry_run {
    store.rollback().await.context("rollback failed")?;
    tracing::info!("dry run; changes discarded");
  } else {
    store.commit().await.context("commit failed")?;
  }

  let out = json!({
    "verdicts": verdicts,
    "announcements": news,
    "compaction": report,
    "committed": !dry_run,
  });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}

async fn stats(store: &SqliteStore, drug: &str, source: Option<&str>) -> Result<()> {
  let Some(drug) = store.find_drug_by_name(drug).await? else {
    println!("{}", json!({ "drug": drug, "known": false }));
    return Ok(());
  };

  let source = match source {
    Some(name) => Some(
      store
        .find_source_by_name(name)
        .await?
        .with_context(|| format!("unknown source {name:?}"))?,
    ),
    None => None,
  };

  let stats = match &source {
    Some(s) => hit_stats(store, drug.id, s.id).await?,
    None => HitStats { same_source: 0, total: store.count_hits(drug.id, None).await? },
  };

  let hits = store
    .list_hits(HitFilter { drug: Some(drug.id), source: source.as_ref().map(|s| s.id) })
    .await?;
  let sources = store.list_source_names_for_drug(drug.id).await?;
  let fmt_ts = |ts: i64| {
    chrono::DateTime::from_timestamp(ts, 0)
      .map(|dt| dt.to_rfc3339())
      .unwrap_or_else(|| ts.to_string())
  };

  let out = json!({
    "drug": drug.name,
    "known": true,
    "source": source.as_ref().map(|s| s.name()),
    "stats": stats,
    "sources": sources,
    "first_seen": hits.last().map(|h| fmt_ts(h.hit_ts)),
    "last_seen": hits.first().map(|h| fmt_ts(h.hit_ts)),
  });
  println!("{}", serde_json::to_string_pretty(&out)?);
  Ok(())
}
