//! Natural-key index
//!
//! Provides [`NaturalKeyIndex`] for O(1) matching of candidates against a
//! reference platform's entity set.

use crate::key::NaturalKey;
use indexmap::map::Entry;
use indexmap::IndexMap;
use mig_model::Entity;

/// Read-only map from natural key to entity
///
/// Built once per run from a full listing. When several entities share a
/// key, the first one in listing order wins and later ones are counted as
/// superseded; duplicates are not an error.
#[derive(Debug, Clone, Default)]
pub struct NaturalKeyIndex {
    entries: IndexMap<NaturalKey, Entity>,
    superseded: usize,
}

impl NaturalKeyIndex {
    /// Index entities by [`NaturalKey::for_entity`]
    #[must_use]
    pub fn build(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self::build_with(entities, NaturalKey::for_entity)
    }

    /// Index entities by a custom key function
    #[must_use]
    pub fn build_with<F>(entities: impl IntoIterator<Item = Entity>, key_fn: F) -> Self
    where
        F: Fn(&Entity) -> NaturalKey,
    {
        let mut entries = IndexMap::new();
        let mut superseded = 0;

        for entity in entities {
            match entries.entry(key_fn(&entity)) {
                Entry::Vacant(slot) => {
                    slot.insert(entity);
                }
                Entry::Occupied(slot) => {
                    tracing::debug!(
                        "Duplicate key {} ({} id {}) superseded by id {}",
                        slot.key(),
                        entity.kind,
                        entity.id,
                        slot.get().id
                    );
                    superseded += 1;
                }
            }
        }

        Self {
            entries,
            superseded,
        }
    }

    /// Look up the entity holding a key
    #[inline]
    #[must_use]
    pub fn get(&self, key: &NaturalKey) -> Option<&Entity> {
        self.entries.get(key)
    }

    /// Whether a key is present
    #[inline]
    #[must_use]
    pub fn contains(&self, key: &NaturalKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Number of distinct keys
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the index is empty
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entities dropped because an earlier entity held their key
    #[inline]
    #[must_use]
    pub fn superseded(&self) -> usize {
        self.superseded
    }

    /// Iterate in first-seen order
    pub fn iter(&self) -> impl Iterator<Item = (&NaturalKey, &Entity)> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mig_model::{EntityId, EntityKind};

    fn project(id: u64, url: &str, branch: &str) -> Entity {
        Entity::new(EntityKind::Project, EntityId(id), format!("p{id}"))
            .with_field("scm_url", url)
            .with_field("scm_branch", branch)
    }

    #[test]
    fn first_entity_wins_on_duplicate_key() {
        let index = NaturalKeyIndex::build(vec![
            project(1, "https://h/repo.git", "main"),
            project(2, "https://H/repo", "main"),
        ]);

        let key = NaturalKey::scm("https://h/repo", Some("main"));
        assert_eq!(index.get(&key).map(|e| e.id), Some(EntityId(1)));
        assert_eq!(index.len(), 1);
        assert_eq!(index.superseded(), 1);
    }

    #[test]
    fn distinct_branches_are_distinct_keys() {
        let index = NaturalKeyIndex::build(vec![
            project(1, "https://h/repo", "main"),
            project(2, "https://h/repo", "dev"),
            project(3, "https://h/repo", ""),
        ]);
        assert_eq!(index.len(), 3);
        assert!(index.contains(&NaturalKey::scm("https://h/repo", None)));
    }

    #[test]
    fn iteration_preserves_listing_order() {
        let index = NaturalKeyIndex::build(vec![
            project(5, "https://h/b", ""),
            project(4, "https://h/a", ""),
        ]);
        let ids: Vec<_> = index.iter().map(|(_, e)| e.id.0).collect();
        assert_eq!(ids, vec![5, 4]);
    }
}
