//! Mapping between SQLite rows and domain records.
//!
//! Ids and timestamps are stored as plain integers; everything else is text.

use drugwatch_core::{
  model::{Drug, DrugId, Hit, HitId, Source, SourceId, SourceMeta},
  store::HitFilter,
};
use rusqlite::Row;

pub const DRUG_COLUMNS: &str = "id, name";

pub const SOURCE_COLUMNS: &str =
  "id, name, display_name, url, handle, created_ts, updated_ts";

pub const HIT_COLUMNS: &str = "id, drug_id, source_id, hit_ts";

pub fn decode_drug(row: &Row<'_>) -> rusqlite::Result<Drug> {
  Ok(Drug { id: DrugId(row.get(0)?), name: row.get(1)? })
}

pub fn decode_source(row: &Row<'_>) -> rusqlite::Result<Source> {
  Ok(Source {
    id:         SourceId(row.get(0)?),
    meta:       SourceMeta {
      name:         row.get(1)?,
      display_name: row.get(2)?,
      url:          row.get(3)?,
      handle:       row.get(4)?,
    },
    created_ts: row.get(5)?,
    updated_ts: row.get(6)?,
  })
}

pub fn decode_hit(row: &Row<'_>) -> rusqlite::Result<Hit> {
  Ok(Hit {
    id:        HitId(row.get(0)?),
    drug_id:   DrugId(row.get(1)?),
    source_id: SourceId(row.get(2)?),
    hit_ts:    row.get(3)?,
  })
}

/// Bind values for the `(?1 IS NULL OR drug_id = ?1) AND (?2 IS NULL OR
/// source_id = ?2)` predicate.
pub fn encode_hit_filter(filter: HitFilter) -> (Option<i64>, Option<i64>) {
  (filter.drug.map(|d| d.0), filter.source.map(|s| s.0))
}
