//! Source observation records.
//!
//! # Responsibility
//! - Define the uniform shape every source produces (`RawRecord`).
//! - Define the canonicalized shape consumed by identity resolution
//!   (`NormalizedRecord`) and the provenance reference kept on profiles.
//!
//! # Invariants
//! - `RawRecord` fields other than `source_id`, `name` and `observed_at_ms`
//!   are optional; sources fill only what they have.
//! - `NormalizedRecord::name_tokens` is never empty.
//! - `(source_id, record_key)` identifies one observation across runs.

use crate::model::country::CountryCode;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Evidence counters reported by a source for one person.
///
/// Missing counters are zero. Profiles merge these field-wise by maximum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EvidenceMetrics {
    pub article_count: u64,
    pub social_followers: u64,
    pub professional_connections: u64,
    pub citation_count: u64,
    pub h_index: u64,
    pub publication_count: u64,
    pub is_verified: bool,
}

impl EvidenceMetrics {
    /// Folds another observation into this one (max per counter, OR for flags).
    pub fn absorb(&mut self, other: &EvidenceMetrics) {
        self.article_count = self.article_count.max(other.article_count);
        self.social_followers = self.social_followers.max(other.social_followers);
        self.professional_connections = self
            .professional_connections
            .max(other.professional_connections);
        self.citation_count = self.citation_count.max(other.citation_count);
        self.h_index = self.h_index.max(other.h_index);
        self.publication_count = self.publication_count.max(other.publication_count);
        self.is_verified |= other.is_verified;
    }

    /// Whether scholarly output (citations, h-index, papers) is present.
    pub fn has_academic_evidence(&self) -> bool {
        self.citation_count > 0 || self.h_index > 0 || self.publication_count > 0
    }
}

/// One observation of a person from one source, as the source produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawRecord {
    /// Producer id, e.g. `google_scholar` or `newsapi`.
    pub source_id: String,
    /// The source's own key for this observation, when it has one.
    #[serde(default)]
    pub source_record_id: Option<String>,
    /// Person name exactly as seen.
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    /// Social handles or profile URLs (`@someone`, `https://x.com/someone`).
    #[serde(default)]
    pub handles: Vec<String>,
    /// Publication or institution.
    #[serde(default)]
    pub affiliation: Option<String>,
    #[serde(default)]
    pub job_title: Option<String>,
    /// Biography or snippet text.
    #[serde(default)]
    pub bio: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    /// Country name, code or free-form location.
    #[serde(default)]
    pub country_hint: Option<String>,
    #[serde(default)]
    pub specializations: Vec<String>,
    #[serde(default)]
    pub metrics: EvidenceMetrics,
    /// Unix epoch milliseconds.
    pub observed_at_ms: i64,
}

impl RawRecord {
    /// Creates a record with only the mandatory fields set.
    pub fn new(source_id: impl Into<String>, name: impl Into<String>, observed_at_ms: i64) -> Self {
        Self {
            source_id: source_id.into(),
            source_record_id: None,
            name: name.into(),
            email: None,
            handles: Vec::new(),
            affiliation: None,
            job_title: None,
            bio: None,
            url: None,
            country_hint: None,
            specializations: Vec::new(),
            metrics: EvidenceMetrics::default(),
            observed_at_ms,
        }
    }
}

/// Country evidence carried by a normalized record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum CountryHint {
    /// Hint resolved through the alias table.
    Iso(CountryCode),
    /// Unrecognized hint, kept for later inference.
    FreeText(String),
}

/// Record with canonicalized fields, ready for identity resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedRecord {
    pub source_id: String,
    /// Source record id, or a content fingerprint when the source has none.
    pub record_key: String,
    /// Trimmed, whitespace-collapsed name as seen.
    pub original_name: String,
    /// Lowercased name tokens joined by single spaces.
    pub normalized_name: String,
    pub name_tokens: BTreeSet<String>,
    pub email: Option<String>,
    /// `platform:name` handles, e.g. `twitter:ylecun`.
    pub handles: BTreeSet<String>,
    pub affiliation: Option<String>,
    pub job_title: Option<String>,
    pub bio: Option<String>,
    pub url: Option<String>,
    pub country: Option<CountryHint>,
    pub specializations: BTreeSet<String>,
    pub metrics: EvidenceMetrics,
    pub observed_at_ms: i64,
}

impl NormalizedRecord {
    /// Provenance entry describing this record.
    pub fn reference(&self) -> RecordRef {
        RecordRef {
            source_id: self.source_id.clone(),
            record_key: self.record_key.clone(),
            normalized_name: self.normalized_name.clone(),
            original_name: self.original_name.clone(),
            observed_at_ms: self.observed_at_ms,
        }
    }
}

/// Provenance entry: one record that contributed to a profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordRef {
    pub source_id: String,
    pub record_key: String,
    pub normalized_name: String,
    pub original_name: String,
    pub observed_at_ms: i64,
}

impl RecordRef {
    /// Whether this entry refers to the given source observation.
    pub fn is_same_record(&self, source_id: &str, record_key: &str) -> bool {
        self.source_id == source_id && self.record_key == record_key
    }
}
