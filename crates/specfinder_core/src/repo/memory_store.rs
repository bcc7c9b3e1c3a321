//! In-memory profile arena.
//!
//! Profiles live in a map keyed by stable id; blocking keys point at ids, so
//! nothing holds a reference into another profile.

use super::{ensure_provenance_extends, profile_name_tokens, ProfileFilter, ProfileStore, StoreResult};
use crate::model::profile::{Profile, ProfileId};
use crate::model::record::NormalizedRecord;
use std::collections::{BTreeMap, BTreeSet, HashMap};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum BlockingKey {
    Email(String),
    /// Platform-qualified, so `twitter:alex` never blocks with `github:alex`.
    Handle(String),
    NameToken(String),
    Record { source_id: String, record_key: String },
}

impl BlockingKey {
    fn of_profile(profile: &Profile) -> Vec<Self> {
        let mut keys = Vec::new();
        keys.extend(profile.emails.iter().cloned().map(Self::Email));
        keys.extend(profile.handles.iter().cloned().map(Self::Handle));
        keys.extend(profile_name_tokens(profile).into_iter().map(Self::NameToken));
        keys.extend(profile.provenance.iter().map(|entry| Self::Record {
            source_id: entry.source_id.clone(),
            record_key: entry.record_key.clone(),
        }));
        keys
    }

    fn of_record(record: &NormalizedRecord) -> Vec<Self> {
        let mut keys = Vec::new();
        keys.extend(record.email.iter().cloned().map(Self::Email));
        keys.extend(record.handles.iter().cloned().map(Self::Handle));
        keys.extend(record.name_tokens.iter().cloned().map(Self::NameToken));
        keys.push(Self::Record {
            source_id: record.source_id.clone(),
            record_key: record.record_key.clone(),
        });
        keys
    }
}

/// Arena-backed store for tests and single-process batch runs.
#[derive(Debug, Default)]
pub struct InMemoryProfileStore {
    profiles: BTreeMap<ProfileId, Profile>,
    index: HashMap<BlockingKey, BTreeSet<ProfileId>>,
}

impl InMemoryProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }

    /// All stored profiles ordered by id.
    pub fn profiles(&self) -> impl Iterator<Item = &Profile> {
        self.profiles.values()
    }

    fn unindex(&mut self, profile: &Profile) {
        for key in BlockingKey::of_profile(profile) {
            if let Some(ids) = self.index.get_mut(&key) {
                ids.remove(&profile.id);
                if ids.is_empty() {
                    self.index.remove(&key);
                }
            }
        }
    }
}

impl ProfileStore for InMemoryProfileStore {
    fn get(&self, id: ProfileId) -> StoreResult<Option<Profile>> {
        Ok(self.profiles.get(&id).cloned())
    }

    fn find_candidates(&self, record: &NormalizedRecord) -> StoreResult<Vec<Profile>> {
        let ids = BlockingKey::of_record(record)
            .iter()
            .filter_map(|key| self.index.get(key))
            .flatten()
            .copied()
            .collect::<BTreeSet<_>>();
        Ok(ids
            .into_iter()
            .filter_map(|id| self.profiles.get(&id).cloned())
            .collect())
    }

    fn upsert(&mut self, profile: &Profile) -> StoreResult<()> {
        profile.validate()?;

        if let Some(stored) = self.profiles.remove(&profile.id) {
            if let Err(err) = ensure_provenance_extends(&stored, profile) {
                self.profiles.insert(stored.id, stored);
                return Err(err);
            }
            self.unindex(&stored);
        }

        for key in BlockingKey::of_profile(profile) {
            self.index.entry(key).or_default().insert(profile.id);
        }
        self.profiles.insert(profile.id, profile.clone());
        Ok(())
    }

    fn query(&self, filter: &ProfileFilter) -> StoreResult<Vec<Profile>> {
        Ok(self
            .profiles
            .values()
            .filter(|profile| filter.matches(profile))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::InMemoryProfileStore;
    use crate::merge::merge_cluster;
    use crate::model::record::RawRecord;
    use crate::normalize::normalize_record;
    use crate::repo::{ProfileStore, StoreError};

    #[test]
    fn candidates_are_found_by_shared_name_token() {
        let mut store = InMemoryProfileStore::new();
        let record = normalize_record(RawRecord::new("a", "Yoshua Bengio", 1)).expect("normalize");
        let profile = merge_cluster(None, &[record]).profile;
        store.upsert(&profile).expect("upsert");

        let probe = normalize_record(RawRecord::new("b", "Y. Bengio", 2)).expect("normalize");
        let candidates = store.find_candidates(&probe).expect("candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].id, profile.id);

        let stranger = normalize_record(RawRecord::new("b", "Fei-Fei Li", 2)).expect("normalize");
        assert!(store.find_candidates(&stranger).expect("candidates").is_empty());
    }

    #[test]
    fn upsert_rejects_provenance_regression() {
        let mut store = InMemoryProfileStore::new();
        let first = normalize_record(RawRecord::new("a", "Ada Lovelace", 1)).expect("normalize");
        let second = normalize_record(RawRecord::new("b", "Ada Lovelace", 2)).expect("normalize");
        let merged = merge_cluster(None, &[first.clone(), second]).profile;
        store.upsert(&merged).expect("upsert");

        let mut shrunk = merge_cluster(None, &[first]).profile;
        shrunk.id = merged.id;
        assert!(matches!(
            store.upsert(&shrunk),
            Err(StoreError::ProvenanceRegression(id)) if id == merged.id
        ));
        assert_eq!(store.get(merged.id).expect("get"), Some(merged));
    }

    #[test]
    fn replaced_profile_is_reindexed() {
        let mut store = InMemoryProfileStore::new();
        let record = normalize_record(RawRecord::new("a", "Ada Lovelace", 1)).expect("normalize");
        let profile = merge_cluster(None, &[record]).profile;
        store.upsert(&profile).expect("upsert");

        let mut with_email = RawRecord::new("b", "Countess Lovelace", 2);
        with_email.email = Some("ada@example.org".to_string());
        let updated = merge_cluster(
            Some(profile.clone()),
            &[normalize_record(with_email).expect("normalize")],
        )
        .profile;
        store.upsert(&updated).expect("upsert");

        let mut probe = RawRecord::new("c", "Somebody", 3);
        probe.email = Some("ada@example.org".to_string());
        let candidates = store
            .find_candidates(&normalize_record(probe).expect("normalize"))
            .expect("candidates");
        assert_eq!(candidates.len(), 1);
        assert_eq!(store.len(), 1);
    }
}
