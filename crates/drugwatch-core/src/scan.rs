//! Raw scan results handed over by the scraper.

use serde::{Deserialize, Serialize};

/// A drug listed on a source page, with the URL that lists it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sighting {
  pub name: String,
  #[serde(default)]
  pub url:  String,
}

/// Everything one source listed during one scrape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scan {
  /// Registry name of the scanned source.
  pub source: String,
  /// Scan timestamp, seconds since the Unix epoch.
  pub ts:     i64,
  /// Drugs in the order the page listed them.
  pub drugs:  Vec<Sighting>,
}

impl Scan {
  pub fn new(source: impl Into<String>, ts: i64) -> Self {
    Self { source: source.into(), ts, drugs: Vec::new() }
  }

  /// Builder-style helper used by callers assembling scans by hand.
  pub fn with_drug(mut self, name: impl Into<String>, url: impl Into<String>) -> Self {
    self.drugs.push(Sighting { name: name.into(), url: url.into() });
    self
  }
}
