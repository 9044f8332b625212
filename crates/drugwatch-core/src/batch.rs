//! Batch orchestration: scans in, verdicts out.
//!
//! For every sighting the hit statistics are read, the sighting classified,
//! and only then its hit stored. A later sighting of the same drug therefore
//! sees the hits of earlier sightings in the batch, but the classification of
//! a drug's first sighting only ever sees history.

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::{
  Error, Result,
  classify::{Classifier, Verdict},
  model::{DrugId, SourceId, SourceMeta},
  registry::SourceRegistry,
  scan::Scan,
  store::{RecordStore, hit_stats},
};

/// Verdicts of one batch, keyed by drug name.
pub type Verdicts = BTreeMap<String, Verdict>;

// ─── Normalisation ───────────────────────────────────────────────────────────

/// One (drug, source, timestamp) sighting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Triple<'a> {
  pub drug:   &'a str,
  pub source: &'a SourceMeta,
  pub ts:     i64,
  /// URL the source lists the drug under.
  pub url:    &'a str,
}

/// Scans flattened into the shape the orchestrator works with.
#[derive(Debug, Clone, Default)]
pub struct Batch<'a> {
  /// Distinct drug names, in first-seen order.
  pub drugs:   Vec<&'a str>,
  /// One (source, scan timestamp) pair per scan.
  pub sources: Vec<(&'a SourceMeta, i64)>,
  /// Every sighting, in scan order then page order.
  pub triples: Vec<Triple<'a>>,
}

/// Flatten `scans`, resolving each scan's source through `registry`.
///
/// Fails before anything is written if a scan names no source, an
/// unregistered source, or a drug with an empty name.
pub fn normalize<'a>(registry: &'a SourceRegistry, scans: &'a [Scan]) -> Result<Batch<'a>> {
  let mut batch = Batch::default();
  let mut seen = HashSet::new();

  for scan in scans {
    if scan.source.trim().is_empty() {
      return Err(Error::InvalidScan(format!("scan at {} has no source", scan.ts)));
    }
    let source = registry
      .get(&scan.source)
      .ok_or_else(|| Error::UnknownSource(scan.source.clone()))?;
    batch.sources.push((source, scan.ts));

    for sighting in &scan.drugs {
      let drug = sighting.name.as_str();
      if drug.trim().is_empty() {
        return Err(Error::InvalidScan(format!(
          "source {:?} listed a drug without a name",
          scan.source
        )));
      }
      if seen.insert(drug) {
        batch.drugs.push(drug);
      }
      batch.triples.push(Triple { drug, source, ts: scan.ts, url: &sighting.url });
    }
  }

  Ok(batch)
}

// ─── Orchestration ───────────────────────────────────────────────────────────

/// Record one batch of scans and classify every drug it contains.
///
/// Creates missing drugs and sources, refreshes `updated_ts` on known
/// sources, and inserts one hit per sighting. Does not compact and does not
/// commit.
pub async fn process_batch<S: RecordStore>(
  store: &S,
  registry: &SourceRegistry,
  scans: &[Scan],
) -> Result<Verdicts> {
  let batch = normalize(registry, scans)?;
  tracing::info!(
    scans = scans.len(),
    drugs = batch.drugs.len(),
    sightings = batch.triples.len(),
    "processing batch"
  );

  let drug_ids = ensure_drugs(store, &batch.drugs).await?;
  let source_ids = ensure_sources(store, &batch.sources).await?;

  let mut classifier = Classifier::new();

  for triple in &batch.triples {
    let drug_id = *drug_ids
      .get(triple.drug)
      .ok_or_else(|| Error::DrugNotFound(triple.drug.to_owned()))?;
    let source_id = *source_ids
      .get(triple.source.name.as_str())
      .ok_or_else(|| Error::SourceNotFound(triple.source.name.clone()))?;

    let stats = hit_stats(store, drug_id, source_id).await?;
    let prior = if classifier.has_seen(triple.drug) {
      Vec::new()
    } else {
      prior_sources(store, registry, drug_id).await?
    };

    tracing::debug!(
      drug = triple.drug,
      source = %triple.source.name,
      same_source = stats.same_source,
      total = stats.total,
      url = triple.url,
      "classifying sighting"
    );
    classifier.classify(triple.drug, triple.source, stats, prior);

    store
      .insert_hit(drug_id, source_id, triple.ts)
      .await
      .map_err(Error::store)?;
  }

  let verdicts = classifier.into_verdicts();
  tracing::info!(
    drugs = verdicts.len(),
    newsworthy = verdicts.values().filter(|v| v.is_newsworthy()).count(),
    "batch classified"
  );
  Ok(verdicts)
}

/// Create every drug in `names` that is not stored yet, then resolve all
/// names to ids.
async fn ensure_drugs<'a, S: RecordStore>(
  store: &S,
  names: &[&'a str],
) -> Result<HashMap<&'a str, DrugId>> {
  for &name in names {
    if store.find_drug_by_name(name).await.map_err(Error::store)?.is_none() {
      let drug = store.create_drug(name).await.map_err(Error::store)?;
      tracing::debug!(drug = name, id = %drug.id, "new drug");
    }
  }

  let mut ids = HashMap::with_capacity(names.len());
  for &name in names {
    let drug = store
      .find_drug_by_name(name)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::DrugNotFound(name.to_owned()))?;
    ids.insert(name, drug.id);
  }
  Ok(ids)
}

/// Create every source that is not stored yet and refresh `updated_ts` on the
/// rest, then resolve all names to ids.
async fn ensure_sources<'a, S: RecordStore>(
  store: &S,
  sources: &[(&'a SourceMeta, i64)],
) -> Result<HashMap<&'a str, SourceId>> {
  for &(meta, ts) in sources {
    match store.find_source_by_name(&meta.name).await.map_err(Error::store)? {
      Some(existing) => {
        store
          .update_source_timestamp(existing.id, ts)
          .await
          .map_err(Error::store)?;
      }
      None => {
        let source = store.create_source(meta, ts).await.map_err(Error::store)?;
        tracing::debug!(source = %meta.name, id = %source.id, "new source");
      }
    }
  }

  let mut ids = HashMap::with_capacity(sources.len());
  for &(meta, _) in sources {
    let source = store
      .find_source_by_name(&meta.name)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SourceNotFound(meta.name.clone()))?;
    ids.insert(meta.name.as_str(), source.id);
  }
  Ok(ids)
}

/// Metadata of every source that has listed `drug` so far. Names that are no
/// longer registered fall back to the stored source row.
async fn prior_sources<S: RecordStore>(
  store: &S,
  registry: &SourceRegistry,
  drug: DrugId,
) -> Result<Vec<SourceMeta>> {
  let names = store.list_source_names_for_drug(drug).await.map_err(Error::store)?;

  let mut metas = Vec::with_capacity(names.len());
  for name in names {
    if let Some(meta) = registry.get(&name) {
      metas.push(meta.clone());
      continue;
    }
    tracing::warn!(source = %name, "source no longer registered; using stored metadata");
    let stored = store
      .find_source_by_name(&name)
      .await
      .map_err(Error::store)?
      .ok_or_else(|| Error::SourceNotFound(name.clone()))?;
    metas.push(stored.meta);
  }
  Ok(metas)
}
