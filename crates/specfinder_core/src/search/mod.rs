//! Ranking, filtering and corpus statistics over stored profiles.
//!
//! # Responsibility
//! - Validate profile queries and answer them deterministically.
//! - Summarize the stored corpus.
//!
//! # Invariants
//! - Invalid queries fail before touching the store; no partial results.
//! - Ordering is total: reputation desc, ai_relevance desc, id asc.

use crate::repo::StoreError;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod ranking;
pub mod stats;

pub use ranking::{rank_profiles, search_profiles, SearchQuery, DEFAULT_LIMIT};
pub use stats::{compute_statistics, AffiliationCount, CorpusStatistics};

pub type SearchResult<T> = Result<T, SearchError>;

/// Query-layer error.
#[derive(Debug)]
pub enum SearchError {
    /// Unknown filter key, unparseable value or out-of-range parameter.
    InvalidQuery { key: String, message: String },
    StoreUnavailable(StoreError),
}

impl SearchError {
    pub(crate) fn invalid(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidQuery {
            key: key.into(),
            message: message.into(),
        }
    }
}

impl Display for SearchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidQuery { key, message } => {
                write!(f, "invalid query parameter `{key}`: {message}")
            }
            Self::StoreUnavailable(err) => write!(f, "profile store unavailable: {err}"),
        }
    }
}

impl Error for SearchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::InvalidQuery { .. } => None,
            Self::StoreUnavailable(err) => Some(err),
        }
    }
}

impl From<StoreError> for SearchError {
    fn from(value: StoreError) -> Self {
        Self::StoreUnavailable(value)
    }
}
