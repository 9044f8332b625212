//! The `RecordStore` trait and hit statistics.
//!
//! The trait is implemented by storage backends (e.g. `drugwatch-store-sqlite`
//! and [`MemoryStore`](crate::memory::MemoryStore)). The engine depends on
//! this abstraction, not on any concrete backend.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  model::{Drug, DrugId, Hit, HitId, Source, SourceId, SourceMeta},
};

// ─── Query types ─────────────────────────────────────────────────────────────

/// Restricts [`RecordStore::list_hits`] to one drug, one source, or both.
/// The default filter matches every hit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HitFilter {
  pub drug:   Option<DrugId>,
  pub source: Option<SourceId>,
}

impl HitFilter {
  pub fn drug(drug: DrugId) -> Self { Self { drug: Some(drug), source: None } }

  pub fn source(source: SourceId) -> Self { Self { drug: None, source: Some(source) } }

  pub fn pair(drug: DrugId, source: SourceId) -> Self {
    Self { drug: Some(drug), source: Some(source) }
  }

  pub fn matches(&self, hit: &Hit) -> bool {
    self.drug.is_none_or(|d| d == hit.drug_id)
      && self.source.is_none_or(|s| s == hit.source_id)
  }
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a drugwatch record store backend.
///
/// Reads are side-effect free. Writes become durable only on
/// [`commit`](Self::commit); dropping the store or calling
/// [`rollback`](Self::rollback) discards them.
///
/// All methods return `Send` futures so the trait can be used in
/// multi-threaded async runtimes.
pub trait RecordStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Drugs ─────────────────────────────────────────────────────────────

  fn find_drug_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Drug>, Self::Error>> + Send + 'a;

  fn find_drug_by_id(
    &self,
    id: DrugId,
  ) -> impl Future<Output = Result<Option<Drug>, Self::Error>> + Send + '_;

  /// Persist a new drug. Names are unique; creating a duplicate is an error.
  fn create_drug<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Drug, Self::Error>> + Send + 'a;

  // ── Sources ───────────────────────────────────────────────────────────

  fn find_source_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> impl Future<Output = Result<Option<Source>, Self::Error>> + Send + 'a;

  fn find_source_by_id(
    &self,
    id: SourceId,
  ) -> impl Future<Output = Result<Option<Source>, Self::Error>> + Send + '_;

  /// Persist a new source with `created_ts == updated_ts == ts`.
  fn create_source<'a>(
    &'a self,
    meta: &'a SourceMeta,
    ts: i64,
  ) -> impl Future<Output = Result<Source, Self::Error>> + Send + 'a;

  fn update_source_timestamp(
    &self,
    id: SourceId,
    ts: i64,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Hits ──────────────────────────────────────────────────────────────

  /// Count hits for a drug, optionally restricted to one source. Unknown ids
  /// count as zero.
  fn count_hits(
    &self,
    drug: DrugId,
    source: Option<SourceId>,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Distinct ids of every drug referenced by at least one hit, ascending.
  fn list_drug_ids_with_hits(
    &self,
  ) -> impl Future<Output = Result<Vec<DrugId>, Self::Error>> + Send + '_;

  /// Distinct ids of the sources that have hit `drug`, ascending.
  fn list_source_ids_for_drug(
    &self,
    drug: DrugId,
  ) -> impl Future<Output = Result<Vec<SourceId>, Self::Error>> + Send + '_;

  /// Names of the sources that have hit `drug`, ordered by source id.
  fn list_source_names_for_drug(
    &self,
    drug: DrugId,
  ) -> impl Future<Output = Result<Vec<String>, Self::Error>> + Send + '_;

  /// Hits matching `filter`, newest first. Hits sharing a timestamp are
  /// ordered by insertion, most recent insertion first.
  fn list_hits(
    &self,
    filter: HitFilter,
  ) -> impl Future<Output = Result<Vec<Hit>, Self::Error>> + Send + '_;

  fn insert_hit(
    &self,
    drug: DrugId,
    source: SourceId,
    ts: i64,
  ) -> impl Future<Output = Result<Hit, Self::Error>> + Send + '_;

  /// Delete one hit. Deleting an unknown id is a no-op.
  fn delete_hit(
    &self,
    id: HitId,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  // ── Transactions ──────────────────────────────────────────────────────

  /// Make every write since the previous commit durable, all at once.
  fn commit(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  /// Discard every write since the previous commit.
  fn rollback(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}

// ─── Statistics ──────────────────────────────────────────────────────────────

/// Hit counts for one (drug, source) pair at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HitStats {
  /// Hits of this drug from this source.
  pub same_source: u64,
  /// Hits of this drug from every source.
  pub total:       u64,
}

/// Read the current [`HitStats`] for `(drug, source)`.
pub async fn hit_stats<S: RecordStore>(
  store: &S,
  drug: DrugId,
  source: SourceId,
) -> Result<HitStats> {
  let same_source = store.count_hits(drug, Some(source)).await.map_err(Error::store)?;
  let total = store.count_hits(drug, None).await.map_err(Error::store)?;
  Ok(HitStats { same_source, total })
}
