//! Persistent records: drugs, sources and the hits that link them.
//!
//! Records are owned by the [`RecordStore`](crate::store::RecordStore). The
//! engine only holds their ids between calls.

use std::fmt;

use serde::{Deserialize, Serialize};

// ─── Ids ─────────────────────────────────────────────────────────────────────

macro_rules! id_type {
  ($(#[$meta:meta])* $name:ident) => {
    $(#[$meta])*
    #[derive(
      Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
    )]
    #[serde(transparent)]
    pub struct $name(pub i64);

    impl fmt::Display for $name {
      fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
    }
  };
}

id_type!(
  /// Row id of a [`Drug`].
  DrugId
);
id_type!(
  /// Row id of a [`Source`].
  SourceId
);
id_type!(
  /// Row id of a [`Hit`].
  HitId
);

// ─── Records ─────────────────────────────────────────────────────────────────

/// A drug under legal action. Identity is the case-sensitive name.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Drug {
  pub id:   DrugId,
  pub name: String,
}

/// Descriptive metadata for a monitored law-firm page.
///
/// This is what the scraper knows about a source before anything is stored,
/// and what verdicts and announcements carry.
#[derive(
  Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub struct SourceMeta {
  /// Stable identifier; unique across sources.
  pub name:         String,
  pub display_name: String,
  /// Home URL of the page being monitored.
  pub url:          String,
  /// Social media handle, e.g. `@FirmName`.
  #[serde(default)]
  pub handle:       String,
}

/// A persisted source row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
  pub id:         SourceId,
  pub meta:       SourceMeta,
  /// Set once, when the source is first observed.
  pub created_ts: i64,
  /// Refreshed every time the source is scanned.
  pub updated_ts: i64,
}

impl Source {
  pub fn name(&self) -> &str { &self.meta.name }
}

/// One observation of a drug listed by a source at `hit_ts`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hit {
  pub id:        HitId,
  pub drug_id:   DrugId,
  pub source_id: SourceId,
  /// Seconds since the Unix epoch, or a logical scan timestamp.
  pub hit_ts:    i64,
}
