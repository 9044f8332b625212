//! Reading scan results produced by the scraper.
//!
//! The file is a JSON array:
//!
//! ```json
//! [{ "source": "TorHoermanLaw", "ts": 1700000000,
//!    "drugs": [{ "name": "Zantac", "url": "https://..." }] }]
//! ```
//!
//! A missing `ts` means "now". `-` reads from stdin.

use std::{io::Read as _, path::Path};

use anyhow::Context as _;
use drugwatch_core::scan::{Scan, Sighting};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct RawScan {
  source: String,
  #[serde(default)]
  ts:     Option<i64>,
  #[serde(default)]
  drugs:  Vec<Sighting>,
}

pub fn parse(json: &str, now: i64) -> anyhow::Result<Vec<Scan>> {
  let raw: Vec<RawScan> = serde_json::from_str(json).context("malformed scans file")?;
  Ok(
    raw
      .into_iter()
      .map(|r| Scan { source: r.source, ts: r.ts.unwrap_or(now), drugs: r.drugs })
      .collect(),
  )
}

pub fn load(path: &Path) -> anyhow::Result<Vec<Scan>> {
  let json = if path == Path::new("-") {
    let mut buf = String::new();
    std::io::stdin()
      .read_to_string(&mut buf)
      .context("reading scans from stdin")?;
    buf
  } else {
    std::fs::read_to_string(path)
      .with_context(|| format!("reading scans file {}", path.display()))?
  };

  let scans = parse(&json, chrono::Utc::now().timestamp())?;
  tracing::debug!(scans = scans.len(), "loaded scans");
  Ok(scans)
}
