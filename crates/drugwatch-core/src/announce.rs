//! Picks which verdicts deserve an announcement, and what kind.
//!
//! Wording and delivery belong to the notifier; this module only decides.

use serde::Serialize;

use crate::{classify::Verdict, model::SourceMeta};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnnouncementKind {
  /// A drug never seen before, listed by one source.
  NewDrug,
  /// A drug never seen before, listed by several sources at once.
  NewDrugMultipleSources,
  /// A known drug picked up by one more source.
  KnownDrugNewSource,
  /// A known drug picked up by several more sources.
  KnownDrugNewSources,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Announcement {
  pub kind:          AnnouncementKind,
  pub drug:          String,
  pub new_sources:   Vec<SourceMeta>,
  /// Distinct sources listing the drug, old and new.
  pub total_sources: usize,
}

impl Announcement {
  /// `None` when the verdict holds no new source.
  pub fn from_verdict(drug: &str, verdict: &Verdict) -> Option<Self> {
    let kind = match (verdict.first_hit, verdict.new_sources.len()) {
      (_, 0) => return None,
      (true, 1) => AnnouncementKind::NewDrug,
      (true, _) => AnnouncementKind::NewDrugMultipleSources,
      (false, 1) => AnnouncementKind::KnownDrugNewSource,
      (false, _) => AnnouncementKind::KnownDrugNewSources,
    };
    Some(Self {
      kind,
      drug: drug.to_owned(),
      new_sources: verdict.new_sources.clone(),
      total_sources: verdict.total_sources(),
    })
  }
}

/// Announcements for every newsworthy verdict, in drug-name order.
pub fn announcements<'a, I>(verdicts: I) -> Vec<Announcement>
where
  I: IntoIterator<Item = (&'a String, &'a Verdict)>,
{
  verdicts
    .into_iter()
    .filter_map(|(drug, verdict)| Announcement::from_verdict(drug, verdict))
    .collect()
}
