//! Engine tests against [`MemoryStore`].

use std::collections::BTreeSet;

use crate::{
  Error,
  batch::{normalize, process_batch},
  compact::compact,
  memory::MemoryStore,
  model::{DrugId, SourceId, SourceMeta},
  registry::SourceRegistry,
  scan::Scan,
  store::{HitFilter, HitStats, RecordStore, hit_stats},
};

fn meta(name: &str) -> SourceMeta {
  SourceMeta {
    name:         name.into(),
    display_name: format!("{name} Attorneys"),
    url:          format!("http://{name}.example.com"),
    handle:       format!("@{name}"),
  }
}

fn registry() -> SourceRegistry {
  ["Source1", "Source2", "Source3"].into_iter().map(meta).collect()
}

async fn seed_hits(store: &MemoryStore, hits: &[(DrugId, SourceId, i64)]) {
  for &(d, s, ts) in hits {
    store.insert_hit(d, s, ts).await.unwrap();
  }
}

/// Three sources, one drug with hits {src1: 3, src2: 2, src3: 1}.
async fn fixture() -> (MemoryStore, DrugId, [SourceId; 3]) {
  let store = MemoryStore::new();
  let drug = store.create_drug("First Drug").await.unwrap().id;
  let s1 = store.create_source(&meta("Source1"), 1).await.unwrap().id;
  let s2 = store.create_source(&meta("Source2"), 3).await.unwrap().id;
  let s3 = store.create_source(&meta("Source3"), 5).await.unwrap().id;
  seed_hits(
    &store,
    &[(drug, s1, 1), (drug, s1, 2), (drug, s1, 3), (drug, s2, 3), (drug, s2, 4), (drug, s3, 4)],
  )
  .await;
  (store, drug, [s1, s2, s3])
}

// ─── Statistics ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn stats_count_same_source_and_total() {
  let (store, drug, [s1, s2, s3]) = fixture().await;

  assert_eq!(hit_stats(&store, drug, s1).await.unwrap(), HitStats { same_source: 3, total: 6 });
  assert_eq!(hit_stats(&store, drug, s2).await.unwrap(), HitStats { same_source: 2, total: 6 });
  assert_eq!(hit_stats(&store, drug, s3).await.unwrap(), HitStats { same_source: 1, total: 6 });
  assert_eq!(
    hit_stats(&store, DrugId(999), SourceId(999)).await.unwrap(),
    HitStats::default()
  );
}

// ─── Compaction ──────────────────────────────────────────────────────────────

#[tokio::test]
async fn compaction_keeps_oldest_and_newest_per_pair() {
  let (store, drug, [s1, s2, s3]) = fixture().await;

  let report = compact(&store).await.unwrap();
  assert_eq!(report.pairs_examined, 3);
  assert_eq!(report.hits_deleted, 1);

  let ts = |hits: Vec<crate::model::Hit>| hits.into_iter().map(|h| h.hit_ts).collect::<Vec<_>>();
  assert_eq!(ts(store.list_hits(HitFilter::pair(drug, s1)).await.unwrap()), vec![3, 1]);
  assert_eq!(ts(store.list_hits(HitFilter::pair(drug, s2)).await.unwrap()), vec![4, 3]);
  assert_eq!(ts(store.list_hits(HitFilter::pair(drug, s3)).await.unwrap()), vec![4]);
}

#[tokio::test]
async fn compaction_is_idempotent() {
  let store = MemoryStore::new();
  let drug = store.create_drug("Foo").await.unwrap().id;
  let src = store.create_source(&meta("Source1"), 0).await.unwrap().id;
  seed_hits(&store, &[(drug, src, 5), (drug, src, 1), (drug, src, 9), (drug, src, 3), (drug, src, 7)])
    .await;

  compact(&store).await.unwrap();
  let once = store.list_hits(HitFilter::default()).await.unwrap();

  let again = compact(&store).await.unwrap();
  assert_eq!(again.hits_deleted, 0);
  assert_eq!(store.list_hits(HitFilter::default()).await.unwrap(), once);

  let kept: Vec<i64> = once.iter().map(|h| h.hit_ts).collect();
  assert_eq!(kept, vec![9, 1]);
}

#[tokio::test]
async fn compaction_breaks_timestamp_ties_by_insertion() {
  let store = MemoryStore::new();
  let drug = store.create_drug("Foo").await.unwrap().id;
  let src = store.create_source(&meta("Source1"), 0).await.unwrap().id;
  let first = store.insert_hit(drug, src, 10).await.unwrap();
  store.insert_hit(drug, src, 10).await.unwrap();
  let last = store.insert_hit(drug, src, 10).await.unwrap();

  compact(&store).await.unwrap();

  let ids: Vec<_> =
    store.list_hits(HitFilter::default()).await.unwrap().into_iter().map(|h| h.id).collect();
  assert_eq!(ids, vec![last.id, first.id]);
}

#[tokio::test]
async fn compaction_of_empty_store_is_a_no_op() {
  let store = MemoryStore::new();
  let report = compact(&store).await.unwrap();
  assert_eq!(report.pairs_examined, 0);
  assert_eq!(report.hits_deleted, 0);
}

// ─── Normalisation ───────────────────────────────────────────────────────────

#[test]
fn normalize_collects_distinct_drugs_in_order() {
  let registry = registry();
  let scans = vec![
    Scan::new("Source1", 10).with_drug("Foo", "u1").with_drug("Bar", "u2"),
    Scan::new("Source2", 11).with_drug("Bar", "u3").with_drug("Baz", "u4"),
  ];

  let batch = normalize(&registry, &scans).unwrap();
  assert_eq!(batch.drugs, vec!["Foo", "Bar", "Baz"]);
  assert_eq!(batch.sources.len(), 2);
  assert_eq!(batch.sources[1].1, 11);
  assert_eq!(batch.triples.len(), 4);
  assert_eq!(batch.triples[2].drug, "Bar");
  assert_eq!(batch.triples[2].source.name, "Source2");
}

#[tokio::test]
async fn unknown_source_aborts_before_writes() {
  let store = MemoryStore::new();
  let scans = vec![
    Scan::new("Source1", 10).with_drug("Foo", ""),
    Scan::new("Nowhere", 10).with_drug("Bar", ""),
  ];

  let err = process_batch(&store, &registry(), &scans).await.unwrap_err();
  assert!(matches!(err, Error::UnknownSource(ref name) if name == "Nowhere"));
  assert!(store.find_drug_by_name("Foo").await.unwrap().is_none());
  assert!(store.find_source_by_name("Source1").await.unwrap().is_none());
  assert_eq!(store.hit_count(), 0);
}

#[tokio::test]
async fn unnamed_drug_is_an_input_fault() {
  let store = MemoryStore::new();
  let scans = vec![Scan::new("Source1", 10).with_drug("  ", "")];

  let err = process_batch(&store, &registry(), &scans).await.unwrap_err();
  assert!(matches!(err, Error::InvalidScan(_)));
  assert_eq!(store.hit_count(), 0);
}

// ─── Classification through the orchestrator ────────────────────────────────

#[tokio::test]
async fn unseen_drug_is_a_first_hit() {
  let store = MemoryStore::new();
  let scans = vec![Scan::new("Source1", 100).with_drug("Foo", "http://source1/foo")];

  let verdicts = process_batch(&store, &registry(), &scans).await.unwrap();

  let v = &verdicts["Foo"];
  assert!(v.first_hit);
  assert_eq!(v.new_sources, vec![meta("Source1")]);
  assert!(v.old_sources.is_empty());
  assert_eq!(store.hit_count(), 1);
}

#[tokio::test]
async fn known_drug_from_new_source() {
  let store = MemoryStore::new();
  let registry = registry();
  process_batch(&store, &registry, &[Scan::new("Source1", 100).with_drug("Foo", "")])
    .await
    .unwrap();

  let verdicts =
    process_batch(&store, &registry, &[Scan::new("Source2", 200).with_drug("Foo", "")])
      .await
      .unwrap();

  let v = &verdicts["Foo"];
  assert!(!v.first_hit);
  assert_eq!(v.new_sources, vec![meta("Source2")]);
  assert_eq!(v.old_sources, BTreeSet::from([meta("Source1")]));
}

#[tokio::test]
async fn known_source_is_not_announced_again() {
  let store = MemoryStore::new();
  let registry = registry();
  let scans = vec![Scan::new("Source1", 100).with_drug("Foo", "")];
  process_batch(&store, &registry, &scans).await.unwrap();

  let verdicts = process_batch(&store, &registry, &scans).await.unwrap();

  let v = &verdicts["Foo"];
  assert!(!v.first_hit);
  assert!(v.new_sources.is_empty());
  assert!(!v.is_newsworthy());
  assert_eq!(store.hit_count(), 2);
}

#[tokio::test]
async fn sibling_sightings_do_not_leak_into_history() {
  let store = MemoryStore::new();
  let scans = vec![
    Scan::new("Source1", 100).with_drug("Foo", ""),
    Scan::new("Source2", 101).with_drug("Foo", ""),
  ];

  let verdicts = process_batch(&store, &registry(), &scans).await.unwrap();

  let v = &verdicts["Foo"];
  assert!(v.first_hit);
  assert_eq!(v.new_sources, vec![meta("Source1"), meta("Source2")]);
  assert!(v.old_sources.is_empty());
}

#[tokio::test]
async fn repeated_source_in_one_batch_is_counted_not_announced() {
  let store = MemoryStore::new();
  let scans = vec![
    Scan::new("Source1", 100).with_drug("Foo", "http://a"),
    Scan::new("Source1", 100).with_drug("Foo", "http://b"),
  ];

  let verdicts = process_batch(&store, &registry(), &scans).await.unwrap();

  assert_eq!(verdicts["Foo"].new_sources, vec![meta("Source1")]);
  let drug = store.find_drug_by_name("Foo").await.unwrap().unwrap();
  assert_eq!(store.count_hits(drug.id, None).await.unwrap(), 2);
}

#[tokio::test]
async fn sources_are_created_once_and_refreshed() {
  let store = MemoryStore::new();
  let registry = registry();
  process_batch(&store, &registry, &[Scan::new("Source1", 100).with_drug("Foo", "")])
    .await
    .unwrap();
  process_batch(&store, &registry, &[Scan::new("Source1", 250)]).await.unwrap();

  let source = store.find_source_by_name("Source1").await.unwrap().unwrap();
  assert_eq!(source.created_ts, 100);
  assert_eq!(source.updated_ts, 250);
  assert_eq!(source.meta, meta("Source1"));
  assert_eq!(store.find_source_by_id(source.id).await.unwrap(), Some(source));
}

#[tokio::test]
async fn retired_sources_fall_back_to_stored_metadata() {
  let store = MemoryStore::new();
  let old: SourceRegistry = [meta("Retired"), meta("Source1")].into_iter().collect();
  process_batch(&store, &old, &[Scan::new("Retired", 100).with_drug("Foo", "")])
    .await
    .unwrap();

  let verdicts =
    process_batch(&store, &registry(), &[Scan::new("Source1", 200).with_drug("Foo", "")])
      .await
      .unwrap();

  assert_eq!(verdicts["Foo"].old_sources, BTreeSet::from([meta("Retired")]));
}

#[tokio::test]
async fn rollback_discards_the_batch() {
  let store = MemoryStore::new();
  let registry = registry();
  process_batch(&store, &registry, &[Scan::new("Source1", 100).with_drug("Foo", "")])
    .await
    .unwrap();
  store.commit().await.unwrap();

  process_batch(&store, &registry, &[Scan::new("Source2", 200).with_drug("Bar", "")])
    .await
    .unwrap();
  store.rollback().await.unwrap();

  assert!(store.find_drug_by_name("Bar").await.unwrap().is_none());
  assert!(store.find_source_by_name("Source2").await.unwrap().is_none());
  assert_eq!(store.hit_count(), 1);
}

#[tokio::test]
async fn compaction_after_batches_preserves_first_and_last_seen() {
  let store = MemoryStore::new();
  let registry = registry();
  for ts in [100, 200, 300, 400] {
    process_batch(&store, &registry, &[Scan::new("Source1", ts).with_drug("Foo", "")])
      .await
      .unwrap();
  }

  compact(&store).await.unwrap();

  let drug = store.find_drug_by_name("Foo").await.unwrap().unwrap();
  let kept: Vec<i64> = store
    .list_hits(HitFilter::drug(drug.id))
    .await
    .unwrap()
    .into_iter()
    .map(|h| h.hit_ts)
    .collect();
  assert_eq!(kept, vec![400, 100]);

  let verdicts =
    process_batch(&store, &registry, &[Scan::new("Source1", 500).with_drug("Foo", "")])
      .await
      .unwrap();
  assert!(!verdicts["Foo"].first_hit);
  assert!(verdicts["Foo"].new_sources.is_empty());
}

// ─── Consistency faults ──────────────────────────────────────────────────────

/// Reports hits for every drug but never any source for them.
struct OrphaningStore(MemoryStore);

impl RecordStore for OrphaningStore {
  type Error = crate::memory::MemoryError;

  async fn find_drug_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> Result<Option<crate::model::Drug>, Self::Error> {
    self.0.find_drug_by_name(name).await
  }

  async fn find_drug_by_id(&self, id: DrugId) -> Result<Option<crate::model::Drug>, Self::Error> {
    self.0.find_drug_by_id(id).await
  }

  async fn create_drug<'a>(&'a self, name: &'a str) -> Result<crate::model::Drug, Self::Error> {
    self.0.create_drug(name).await
  }

  async fn find_source_by_name<'a>(
    &'a self,
    name: &'a str,
  ) -> Result<Option<crate::model::Source>, Self::Error> {
    self.0.find_source_by_name(name).await
  }

  async fn find_source_by_id(
    &self,
    id: SourceId,
  ) -> Result<Option<crate::model::Source>, Self::Error> {
    self.0.find_source_by_id(id).await
  }

  async fn create_source<'a>(
    &'a self,
    meta: &'a SourceMeta,
    ts: i64,
  ) -> Result<crate::model::Source, Self::Error> {
    self.0.create_source(meta, ts).await
  }

  async fn update_source_timestamp(&self, id: SourceId, ts: i64) -> Result<(), Self::Error> {
    self.0.update_source_timestamp(id, ts).await
  }

  async fn count_hits(&self, drug: DrugId, source: Option<SourceId>) -> Result<u64, Self::Error> {
    self.0.count_hits(drug, source).await
  }

  async fn list_drug_ids_with_hits(&self) -> Result<Vec<DrugId>, Self::Error> {
    self.0.list_drug_ids_with_hits().await
  }

  async fn list_source_ids_for_drug(&self, _drug: DrugId) -> Result<Vec<SourceId>, Self::Error> {
    Ok(Vec::new())
  }

  async fn list_source_names_for_drug(&self, _drug: DrugId) -> Result<Vec<String>, Self::Error> {
    Ok(Vec::new())
  }

  async fn list_hits(&self, filter: HitFilter) -> Result<Vec<crate::model::Hit>, Self::Error> {
    self.0.list_hits(filter).await
  }

  async fn insert_hit(
    &self,
    drug: DrugId,
    source: SourceId,
    ts: i64,
  ) -> Result<crate::model::Hit, Self::Error> {
    self.0.insert_hit(drug, source, ts).await
  }

  async fn delete_hit(&self, id: crate::model::HitId) -> Result<(), Self::Error> {
    self.0.delete_hit(id).await
  }

  async fn commit(&self) -> Result<(), Self::Error> { self.0.commit().await }

  async fn rollback(&self) -> Result<(), Self::Error> { self.0.rollback().await }
}

#[tokio::test]
async fn orphaned_hits_are_fatal() {
  let (inner, drug, _) = fixture().await;
  let store = OrphaningStore(inner);

  let err = compact(&store).await.unwrap_err();
  assert!(matches!(err, Error::OrphanedHits(d) if d == drug));
  assert!(err.is_consistency_fault());
  assert_eq!(store.0.hit_count(), 6);
}
