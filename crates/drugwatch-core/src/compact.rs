//! Hit compaction.
//!
//! Only the oldest and newest hit of each (drug, source) pair matter for
//! novelty; everything in between is deleted to keep the hit table bounded.

use serde::Serialize;

use crate::{Error, Result, store::{HitFilter, RecordStore}};

/// What a compaction pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CompactionReport {
  pub pairs_examined: usize,
  pub hits_deleted:   usize,
}

/// Delete every hit that is neither the newest nor the oldest of its
/// (drug, source) pair. Pairs with two or fewer hits are untouched, and a
/// second pass deletes nothing.
///
/// A drug that has hits but no sources is reported as
/// [`Error::OrphanedHits`].
pub async fn compact<S: RecordStore>(store: &S) -> Result<CompactionReport> {
  let drug_ids = store.list_drug_ids_with_hits().await.map_err(Error::store)?;
  if drug_ids.is_empty() {
    tracing::debug!("no hits recorded; nothing to compact");
    return Ok(CompactionReport::default());
  }

  let mut report = CompactionReport::default();

  for drug_id in drug_ids {
    let source_ids = store.list_source_ids_for_drug(drug_id).await.map_err(Error::store)?;
    if source_ids.is_empty() {
      return Err(Error::OrphanedHits(drug_id));
    }

    for source_id in source_ids {
      report.pairs_examined += 1;

      let hits = store
        .list_hits(HitFilter::pair(drug_id, source_id))
        .await
        .map_err(Error::store)?;
      if hits.is_empty() {
        return Err(Error::MissingPairHits { drug_id, source_id });
      }

      // Newest first: keep index 0 and the last index.
      let last = hits.len() - 1;
      for hit in hits.iter().take(last).skip(1) {
        store.delete_hit(hit.id).await.map_err(Error::store)?;
        report.hits_deleted += 1;
      }

      if last > 1 {
        tracing::debug!(
          %drug_id,
          %source_id,
          deleted = last - 1,
          "compacted hits"
        );
      }
    }
  }

  tracing::info!(
    pairs = report.pairs_examined,
    deleted = report.hits_deleted,
    "hit compaction finished"
  );
  Ok(report)
}
