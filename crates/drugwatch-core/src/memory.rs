//! [`MemoryStore`] — an in-process [`RecordStore`] with commit/rollback.
//!
//! Keeps a working copy that all calls read and write, and a committed copy
//! that [`commit`](RecordStore::commit) publishes and
//! [`rollback`](RecordStore::rollback) restores.

use std::{
  collections::BTreeSet,
  sync::{Mutex, MutexGuard, PoisonError},
};

use thiserror::Error;

use crate::{
  model::{Drug, DrugId, Hit, HitId, Source, SourceId, SourceMeta},
  store::{HitFilter, RecordStore},
};

#[derive(Debug, Error)]
pub enum MemoryError {
  #[error("drug {0:?} already exists")]
  DuplicateDrug(String),

  #[error("source {0:?} already exists")]
  DuplicateSource(String),

  #[error("source not found: {0}")]
  SourceNotFound(SourceId),
}

#[derive(Debug, Clone, Default)]
struct State {
  drugs:       Vec<Drug>,
  sources:     Vec<Source>,
  hits:        Vec<Hit>,
  last_hit_id: i64,
}

#[derive(Debug, Default)]
struct Inner {
  working:   State,
  committed: State,
}

#[derive(Debug, Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub fn new() -> Self { Self::default() }

  fn lock(&self) -> MutexGuard<'_, Inner> {
    self.inner.lock().unwrap_or_else(PoisonError::into_inner)
  }

  /// Total number of hits in the working copy.
  pub fn hit_count(&self) -> usize { self.lock().working.hits.len() }
}

impl RecordStore for MemoryStore {
  type Error = MemoryError;

  // ── Drugs ─────────────────────────────────────────────────────────────────

  async fn find_drug_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> Result<Option<Drug>, MemoryError> {
    let inner = self.lock();
    Ok(inner.working.drugs.iter().find(|d| d.name == name).cloned())
  }

  async fn find_drug_by_id(&self, id: DrugId) -> Result<Option<Drug>, MemoryError> {
    let inner = self.lock();
    Ok(inner.working.drugs.iter().find(|d| d.id == id).cloned())
  }

  async fn create_drug<'a>(&'a self, name: &'a str) -> Result<Drug, MemoryError> {
    let mut inner = self.lock();
    let state = &mut inner.working;
    if state.drugs.iter().any(|d| d.name == name) {
      return Err(MemoryError::DuplicateDrug(name.to_owned()));
    }
    let drug = Drug {
      id:   DrugId(state.drugs.len() as i64 + 1),
      name: name.to_owned(),
    };
    state.drugs.push(drug.clone());
    Ok(drug)
  }

  // ── Sources ───────────────────────────────────────────────────────────────

  async fn find_source_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> Result<Option<Source>, MemoryError> {
    let inner = self.lock();
    Ok(inner.working.sources.iter().find(|s| s.name() == name).cloned())
  }

  async fn find_source_by_id(&self, id: SourceId) -> Result<Option<Source>, MemoryError> {
    let inner = self.lock();
    Ok(inner.working.sources.iter().find(|s| s.id == id).cloned())
  }

  async fn create_source<'a>(
    &'a self,
    meta: &'a SourceMeta,
    ts: i64,
  ) -> Result<Source, MemoryError> {
    let mut inner = self.lock();
    let state = &mut inner.working;
    if state.sources.iter().any(|s| s.name() == meta.name) {
      return Err(MemoryError::DuplicateSource(meta.name.clone()));
    }
    let source = Source {
      id:         SourceId(state.sources.len() as i64 + 1),
      meta:       meta.clone(),
      created_ts: ts,
      updated_ts: ts,
    };
    state.sources.push(source.clone());
    Ok(source)
  }

  async fn update_source_timestamp(&self, id: SourceId, ts: i64) -> Result<(), MemoryError> {
    let mut inner = self.lock();
    let source = inner
      .working
      .sources
      .iter_mut()
      .find(|s| s.id == id)
      .ok_or(MemoryError::SourceNotFound(id))?;
    source.updated_ts = ts;
    Ok(())
  }

  // ── Hits ──────────────────────────────────────────────────────────────────

  async fn count_hits(
    &self,
    drug: DrugId,
    source: Option<SourceId>,
  ) -> Result<u64, MemoryError> {
    let filter = HitFilter { drug: Some(drug), source };
    let inner = self.lock();
    Ok(inner.working.hits.iter().filter(|h| filter.matches(h)).count() as u64)
  }

  async fn list_drug_ids_with_hits(&self) -> Result<Vec<DrugId>, MemoryError> {
    let inner = self.lock();
    let ids: BTreeSet<DrugId> = inner.working.hits.iter().map(|h| h.drug_id).collect();
    Ok(ids.into_iter().collect())
  }

  async fn list_source_ids_for_drug(&self, drug: DrugId) -> Result<Vec<SourceId>, MemoryError> {
    let inner = self.lock();
    let ids: BTreeSet<SourceId> = inner
      .working
      .hits
      .iter()
      .filter(|h| h.drug_id == drug)
      .map(|h| h.source_id)
      .collect();
    Ok(ids.into_iter().collect())
  }

  async fn list_source_names_for_drug(&self, drug: DrugId) -> Result<Vec<String>, MemoryError> {
    let ids = self.list_source_ids_for_drug(drug).await?;
    let inner = self.lock();
    Ok(
      ids
        .into_iter()
        .filter_map(|id| inner.working.sources.iter().find(|s| s.id == id))
        .map(|s| s.meta.name.clone())
        .collect(),
    )
  }

  async fn list_hits(&self, filter: HitFilter) -> Result<Vec<Hit>, MemoryError> {
    let inner = self.lock();
    let mut hits: Vec<Hit> = inner
      .working
      .hits
      .iter()
      .filter(|h| filter.matches(h))
      .cloned()
      .collect();
    hits.sort_by(|a, b| b.hit_ts.cmp(&a.hit_ts).then(b.id.cmp(&a.id)));
    Ok(hits)
  }

  async fn insert_hit(
    &self,
    drug: DrugId,
    source: SourceId,
    ts: i64,
  ) -> Result<Hit, MemoryError> {
    let mut inner = self.lock();
    let state = &mut inner.working;
    state.last_hit_id += 1;
    let hit = Hit {
      id:        HitId(state.last_hit_id),
      drug_id:   drug,
      source_id: source,
      hit_ts:    ts,
    };
    state.hits.push(hit.clone());
    Ok(hit)
  }

  async fn delete_hit(&self, id: HitId) -> Result<(), MemoryError> {
    let mut inner = self.lock();
    inner.working.hits.retain(|h| h.id != id);
    Ok(())
  }

  // ── Transactions ──────────────────────────────────────────────────────────

  async fn commit(&self) -> Result<(), MemoryError> {
    let mut inner = self.lock();
    inner.committed = inner.working.clone();
    Ok(())
  }

  async fn rollback(&self) -> Result<(), MemoryError> {
    let mut inner = self.lock();
    inner.working = inner.committed.clone();
    Ok(())
  }
}
