//! Error types for `drugwatch-core`.

use thiserror::Error;

use crate::model::{DrugId, SourceId};

#[derive(Debug, Error)]
pub enum Error {
  /// A drug the orchestrator just ensured exists could not be resolved.
  #[error("drug not found: {0:?}")]
  DrugNotFound(String),

  /// A source the orchestrator just ensured exists could not be resolved.
  #[error("source not found: {0:?}")]
  SourceNotFound(String),

  /// Hits reference a drug, but no source can be found for it.
  #[error("hits recorded for drug {0} but no sources are available")]
  OrphanedHits(DrugId),

  #[error("source {source_id} is listed for drug {drug_id} but has no hits")]
  MissingPairHits {
    drug_id:   DrugId,
    source_id: SourceId,
  },

  #[error("invalid scan: {0}")]
  InvalidScan(String),

  #[error("scan references unregistered source {0:?}")]
  UnknownSource(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  /// Wrap a backend error.
  pub fn store<E>(err: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(err))
  }

  /// Whether this error signals corrupted persisted state rather than bad
  /// input or a backend failure.
  pub fn is_consistency_fault(&self) -> bool {
    matches!(self, Self::OrphanedHits(_) | Self::MissingPairHits { .. })
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
