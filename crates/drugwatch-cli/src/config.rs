//! Run configuration: where the store lives and which sources exist.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use drugwatch_core::{model::SourceMeta, registry::SourceRegistry};
use serde::Deserialize;

/// Deserialised from the TOML config file, overlaid with `DRUGWATCH_*`
/// environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct RunConfig {
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Every monitored source. Scans naming anything else are rejected.
  #[serde(default)]
  pub sources:    Vec<SourceMeta>,
}

fn default_store_path() -> PathBuf { PathBuf::from("drugs.db") }

impl RunConfig {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("DRUGWATCH"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise RunConfig")
  }

  /// The store path with a leading `~` expanded.
  pub fn store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }

  pub fn registry(&self) -> SourceRegistry {
    let registry: SourceRegistry = self.sources.iter().cloned().collect();
    if registry.len() != self.sources.len() {
      tracing::warn!("duplicate source names in config; the last entry wins");
    }
    registry
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
