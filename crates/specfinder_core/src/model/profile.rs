//! Canonical profile model.
//!
//! # Responsibility
//! - Define the deduplicated, scored entity produced per real-world person.
//! - Provide validation used by every store write and read path.
//!
//! # Invariants
//! - `id` is stable and never reused for another person.
//! - `provenance` is never empty and never holds the same
//!   `(source_id, record_key)` pair twice.
//! - Scores are either `Unscored` or a value in `[0, 1]`; clamping is
//!   recorded on the score itself.
//! - Profiles are never deleted by the core.

use crate::model::country::CountryCode;
use crate::model::record::{EvidenceMetrics, RecordRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet};
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

/// Stable identifier of a canonical profile.
pub type ProfileId = Uuid;

/// Score on a `[0, 1]` axis, or the explicit absence of one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum Score {
    /// Not computed yet for the current evidence.
    #[default]
    Unscored,
    Scored {
        value: f64,
        /// Whether the raw value fell outside `[0, 1]` and was clamped.
        clamped: bool,
    },
}

impl Score {
    /// Builds a score from a raw weighted sum, clamping into `[0, 1]`.
    ///
    /// Non-finite input becomes `0.0` and is reported as clamped.
    pub fn from_raw(raw: f64) -> Self {
        if !raw.is_finite() {
            return Self::Scored {
                value: 0.0,
                clamped: true,
            };
        }
        let value = raw.clamp(0.0, 1.0);
        Self::Scored {
            value,
            clamped: value != raw,
        }
    }

    pub fn value(&self) -> Option<f64> {
        match self {
            Self::Unscored => None,
            Self::Scored { value, .. } => Some(*value),
        }
    }

    pub fn is_clamped(&self) -> bool {
        matches!(self, Self::Scored { clamped: true, .. })
    }

    /// Whether the score satisfies a minimum threshold.
    ///
    /// Unscored values never satisfy a threshold.
    pub fn meets(&self, min: f64) -> bool {
        self.value().is_some_and(|value| value >= min)
    }
}

/// Evidence that set a profile's country.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CountrySource {
    /// Alias-resolved country hint on a contributing record.
    Explicit,
    /// Free-text location hint resolved during inference.
    LocationHint,
    /// Country-code top-level domain of an email address.
    EmailDomain,
    /// Known institution or publication.
    Affiliation,
}

impl CountrySource {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Explicit => "explicit",
            Self::LocationHint => "location_hint",
            Self::EmailDomain => "email_domain",
            Self::Affiliation => "affiliation",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "explicit" => Some(Self::Explicit),
            "location_hint" => Some(Self::LocationHint),
            "email_domain" => Some(Self::EmailDomain),
            "affiliation" => Some(Self::Affiliation),
            _ => None,
        }
    }
}

/// Canonical, deduplicated record for one real-world person.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub id: ProfileId,
    pub display_name: String,
    /// Every normalized name seen for this person.
    pub aliases: BTreeSet<String>,
    /// Contributing source ids. Only grows.
    pub sources: BTreeSet<String>,
    pub emails: BTreeSet<String>,
    pub handles: BTreeSet<String>,
    pub affiliations: BTreeSet<String>,
    pub job_titles: BTreeSet<String>,
    pub biographies: BTreeSet<String>,
    pub urls: BTreeSet<String>,
    pub specializations: BTreeSet<String>,
    /// Country hints the alias table could not resolve.
    pub location_hints: BTreeSet<String>,
    pub metrics: EvidenceMetrics,
    pub reputation: Score,
    pub ai_relevance: Score,
    pub country: Option<CountryCode>,
    pub country_source: Option<CountrySource>,
    /// Earliest observation among contributing records (epoch ms).
    pub created_at_ms: i64,
    /// Latest observation among contributing records (epoch ms).
    pub updated_at_ms: i64,
    /// Contributing records in merge order. Append-only.
    pub provenance: Vec<RecordRef>,
}

impl Profile {
    /// Creates an empty profile shell with a fresh stable id.
    ///
    /// The shell is not valid until at least one record is merged into it.
    pub fn new() -> Self {
        Self::with_id(Uuid::new_v4())
    }

    /// Creates an empty profile shell with a caller-provided id.
    pub fn with_id(id: ProfileId) -> Self {
        Self {
            id,
            display_name: String::new(),
            aliases: BTreeSet::new(),
            sources: BTreeSet::new(),
            emails: BTreeSet::new(),
            handles: BTreeSet::new(),
            affiliations: BTreeSet::new(),
            job_titles: BTreeSet::new(),
            biographies: BTreeSet::new(),
            urls: BTreeSet::new(),
            specializations: BTreeSet::new(),
            location_hints: BTreeSet::new(),
            metrics: EvidenceMetrics::default(),
            reputation: Score::Unscored,
            ai_relevance: Score::Unscored,
            country: None,
            country_source: None,
            created_at_ms: 0,
            updated_at_ms: 0,
            provenance: Vec::new(),
        }
    }

    /// Whether the given source observation already contributed.
    pub fn contains_record(&self, source_id: &str, record_key: &str) -> bool {
        self.provenance
            .iter()
            .any(|entry| entry.is_same_record(source_id, record_key))
    }

    /// Checks profile invariants.
    pub fn validate(&self) -> Result<(), ProfileValidationError> {
        if self.display_name.trim().is_empty() {
            return Err(ProfileValidationError::EmptyDisplayName);
        }
        if self.provenance.is_empty() {
            return Err(ProfileValidationError::EmptyProvenance);
        }

        let mut seen = HashSet::new();
        for entry in &self.provenance {
            if !seen.insert((entry.source_id.as_str(), entry.record_key.as_str())) {
                return Err(ProfileValidationError::DuplicateProvenance {
                    source_id: entry.source_id.clone(),
                    record_key: entry.record_key.clone(),
                });
            }
            if !self.sources.contains(&entry.source_id) {
                return Err(ProfileValidationError::MissingSource(
                    entry.source_id.clone(),
                ));
            }
        }

        check_score("reputation", self.reputation)?;
        check_score("ai_relevance", self.ai_relevance)?;

        if self.updated_at_ms < self.created_at_ms {
            return Err(ProfileValidationError::InvalidTimestamps {
                created_at_ms: self.created_at_ms,
                updated_at_ms: self.updated_at_ms,
            });
        }

        Ok(())
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::new()
    }
}

fn check_score(axis: &'static str, score: Score) -> Result<(), ProfileValidationError> {
    match score {
        Score::Unscored => Ok(()),
        Score::Scored { value, .. } if (0.0..=1.0).contains(&value) => Ok(()),
        Score::Scored { value, .. } => Err(ProfileValidationError::ScoreOutOfRange { axis, value }),
    }
}

/// Profile invariant violations.
#[derive(Debug, Clone, PartialEq)]
pub enum ProfileValidationError {
    EmptyDisplayName,
    EmptyProvenance,
    DuplicateProvenance {
        source_id: String,
        record_key: String,
    },
    MissingSource(String),
    ScoreOutOfRange {
        axis: &'static str,
        value: f64,
    },
    InvalidTimestamps {
        created_at_ms: i64,
        updated_at_ms: i64,
    },
}

impl Display for ProfileValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::EmptyDisplayName => write!(f, "profile display name is empty"),
            Self::EmptyProvenance => write!(f, "profile has no contributing record"),
            Self::DuplicateProvenance {
                source_id,
                record_key,
            } => write!(
                f,
                "duplicate provenance entry for source `{source_id}` record `{record_key}`"
            ),
            Self::MissingSource(source_id) => write!(
                f,
                "provenance references source `{source_id}` missing from the source set"
            ),
            Self::ScoreOutOfRange { axis, value } => {
                write!(f, "{axis} score {value} is outside [0, 1]")
            }
            Self::InvalidTimestamps {
                created_at_ms,
                updated_at_ms,
            } => write!(
                f,
                "updated_at {updated_at_ms} is earlier than created_at {created_at_ms}"
            ),
        }
    }
}

impl Error for ProfileValidationError {}
