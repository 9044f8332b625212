//! Error type for `drugwatch-store-sqlite`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("database error: {0}")]
  Database(#[from] tokio_rusqlite::Error),

  #[error("source not found: {0}")]
  SourceNotFound(drugwatch_core::model::SourceId),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
