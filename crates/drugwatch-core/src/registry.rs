//! The source registry: name → [`SourceMeta`].
//!
//! Populated at startup from configuration and passed explicitly into the
//! batch path, so stored source names can be turned back into metadata
//! without any global lookup.

use std::collections::BTreeMap;

use crate::model::SourceMeta;

#[derive(Debug, Clone, Default)]
pub struct SourceRegistry {
  sources: BTreeMap<String, SourceMeta>,
}

impl SourceRegistry {
  pub fn new() -> Self { Self::default() }

  /// Register `meta`, replacing any previous entry with the same name.
  pub fn register(&mut self, meta: SourceMeta) -> Option<SourceMeta> {
    self.sources.insert(meta.name.clone(), meta)
  }

  pub fn get(&self, name: &str) -> Option<&SourceMeta> { self.sources.get(name) }

  pub fn contains(&self, name: &str) -> bool { self.sources.contains_key(name) }

  pub fn len(&self) -> usize { self.sources.len() }

  pub fn is_empty(&self) -> bool { self.sources.is_empty() }

  pub fn iter(&self) -> impl Iterator<Item = &SourceMeta> { self.sources.values() }
}

impl FromIterator<SourceMeta> for SourceRegistry {
  fn from_iter<I: IntoIterator<Item = SourceMeta>>(iter: I) -> Self {
    let mut registry = Self::new();
    for meta in iter {
      registry.register(meta);
    }
    registry
  }
}
