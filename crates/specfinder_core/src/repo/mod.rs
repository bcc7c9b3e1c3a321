//! Profile store contracts and implementations.
//!
//! # Responsibility
//! - Define the store interface the ingest pipeline and query engine use.
//! - Provide an in-memory arena store and a SQLite-backed store.
//!
//! # Invariants
//! - Writes call `Profile::validate()` before persisting.
//! - Writes never shrink a stored profile's provenance.
//! - Reads reject invalid persisted state instead of masking it.
//! - `find_candidates` returns every stored profile that shares an email,
//!   handle, name token or provenance entry with the record.

use crate::db::DbError;
use crate::model::country::CountryCode;
use crate::model::profile::{Profile, ProfileId, ProfileValidationError};
use crate::model::record::NormalizedRecord;
use crate::resolve::similarity::normalized_name_tokens;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod memory_store;
pub mod profile_repo;

pub use memory_store::InMemoryProfileStore;
pub use profile_repo::SqliteProfileStore;

pub type StoreResult<T> = Result<T, StoreError>;

/// Profile store error.
#[derive(Debug)]
pub enum StoreError {
    Validation(ProfileValidationError),
    Db(DbError),
    /// Persisted state that cannot be turned back into a valid profile.
    InvalidData(String),
    /// An upsert would drop provenance entries already stored.
    ProvenanceRegression(ProfileId),
    /// Backend not reachable (non-SQLite stores).
    Unavailable(String),
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::InvalidData(message) => write!(f, "invalid persisted profile data: {message}"),
            Self::ProvenanceRegression(id) => {
                write!(f, "upsert would drop provenance of profile {id}")
            }
            Self::Unavailable(message) => write!(f, "profile store unavailable: {message}"),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::InvalidData(_) | Self::ProvenanceRegression(_) | Self::Unavailable(_) => None,
        }
    }
}

impl From<ProfileValidationError> for StoreError {
    fn from(value: ProfileValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Conjunctive profile predicates. Empty sets and `None` match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProfileFilter {
    pub countries: BTreeSet<CountryCode>,
    /// Matches profiles holding at least one of these tags.
    pub specializations: BTreeSet<String>,
    pub min_reputation: Option<f64>,
    pub min_ai_relevance: Option<f64>,
}

impl ProfileFilter {
    pub fn matches(&self, profile: &Profile) -> bool {
        if !self.countries.is_empty()
            && !profile
                .country
                .is_some_and(|country| self.countries.contains(&country))
        {
            return false;
        }
        if !self.specializations.is_empty()
            && self.specializations.is_disjoint(&profile.specializations)
        {
            return false;
        }
        if let Some(min) = self.min_reputation {
            if !profile.reputation.meets(min) {
                return false;
            }
        }
        if let Some(min) = self.min_ai_relevance {
            if !profile.ai_relevance.meets(min) {
                return false;
            }
        }
        true
    }
}

/// Storage interface for canonical profiles.
pub trait ProfileStore {
    fn get(&self, id: ProfileId) -> StoreResult<Option<Profile>>;
    /// Profiles that could match the record, ordered by id.
    fn find_candidates(&self, record: &NormalizedRecord) -> StoreResult<Vec<Profile>>;
    /// Inserts or replaces a profile after validation.
    fn upsert(&mut self, profile: &Profile) -> StoreResult<()>;
    /// Profiles satisfying the filter, ordered by id.
    fn query(&self, filter: &ProfileFilter) -> StoreResult<Vec<Profile>>;
}

/// Name tokens of every alias, used as blocking keys.
pub(crate) fn profile_name_tokens(profile: &Profile) -> BTreeSet<String> {
    profile
        .aliases
        .iter()
        .flat_map(|alias| normalized_name_tokens(alias))
        .collect()
}

/// Fails when `next` would drop any provenance entry of `stored`.
pub(crate) fn ensure_provenance_extends(stored: &Profile, next: &Profile) -> StoreResult<()> {
    let regressed = stored
        .provenance
        .iter()
        .any(|entry| !next.contains_record(&entry.source_id, &entry.record_key));
    if regressed {
        return Err(StoreError::ProvenanceRegression(next.id));
    }
    Ok(())
}
