//! Novelty classification of the (drug, source) sightings in one batch.
//!
//! Every sighting is classified against hit statistics read *before* that
//! sighting's own hit is stored. The [`Classifier`] itself is pure; ordering
//! the reads and writes is the job of [`batch`](crate::batch).

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::{model::SourceMeta, store::HitStats};

/// What one batch revealed about one drug.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
  /// The drug had no recorded hits before this batch.
  pub first_hit:   bool,
  /// Sources that listed the drug for the first time, in batch order.
  pub new_sources: Vec<SourceMeta>,
  /// Sources that had listed the drug before this batch.
  pub old_sources: BTreeSet<SourceMeta>,
}

impl Verdict {
  /// Whether anything in this verdict is worth announcing.
  pub fn is_newsworthy(&self) -> bool { !self.new_sources.is_empty() }

  /// Number of distinct sources now listing the drug.
  pub fn total_sources(&self) -> usize { self.new_sources.len() + self.old_sources.len() }
}

/// Accumulates one [`Verdict`] per drug across a batch.
#[derive(Debug, Clone, Default)]
pub struct Classifier {
  verdicts: BTreeMap<String, Verdict>,
}

impl Classifier {
  pub fn new() -> Self { Self::default() }

  /// Whether `drug` has already been classified earlier in this batch.
  pub fn has_seen(&self, drug: &str) -> bool { self.verdicts.contains_key(drug) }

  /// Classify one sighting of `drug` on `source`.
  ///
  /// `stats` must be read before this sighting's hit is stored.
  /// `prior_sources` is only consulted on the first sighting of `drug` in the
  /// batch and must reflect history before the batch.
  pub fn classify(
    &mut self,
    drug: &str,
    source: &SourceMeta,
    stats: HitStats,
    prior_sources: impl IntoIterator<Item = SourceMeta>,
  ) {
    let is_new_source = stats.same_source == 0;

    if let Some(verdict) = self.verdicts.get_mut(drug) {
      if is_new_source && !verdict.new_sources.contains(source) {
        verdict.new_sources.push(source.clone());
      }
      return;
    }

    let verdict = Verdict {
      first_hit:   stats.total == 0,
      new_sources: if is_new_source { vec![source.clone()] } else { Vec::new() },
      old_sources: prior_sources.into_iter().collect(),
    };
    self.verdicts.insert(drug.to_owned(), verdict);
  }

  pub fn verdicts(&self) -> &BTreeMap<String, Verdict> { &self.verdicts }

  pub fn into_verdicts(self) -> BTreeMap<String, Verdict> { self.verdicts }
}
