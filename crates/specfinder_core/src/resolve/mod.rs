//! Identity resolution: deciding which canonical profile a record belongs to.
//!
//! # Responsibility
//! - Score a normalized record against candidate profiles (and against other
//!   records) using strong and weak identity signals.
//! - Turn the scores into a merge decision favoring precision.
//!
//! # Invariants
//! - A known `(source_id, record_key)` always resolves to the profile that
//!   already holds it.
//! - An exact email or handle match is authoritative and overrides weak
//!   signals.
//! - Weak signals merge only when the combined score is strictly above the
//!   threshold and no rival candidate is within the ambiguity margin.
//! - Ambiguity never merges; it yields a new identity.
//!
//! Cluster membership is expressed as a candidate `ProfileId` per record, so
//! no profile holds references to another.

pub mod similarity;

use crate::config::ResolverConfig;
use crate::model::profile::{Profile, ProfileId};
use crate::model::record::NormalizedRecord;
use similarity::{affiliation_tokens, best_jaccard, jaccard, normalized_name_tokens};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};

/// Pairwise identity evidence between a record and a profile or record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MatchScore {
    pub email_match: bool,
    pub handle_match: bool,
    pub name_similarity: f64,
    pub affiliation_similarity: f64,
    /// Weighted sum of the weak signals.
    pub combined: f64,
}

impl MatchScore {
    pub fn has_strong_signal(&self) -> bool {
        self.email_match || self.handle_match
    }
}

/// Evidence that decided a merge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MatchSignal {
    /// The record is already part of the profile's provenance.
    Provenance,
    Email,
    Handle,
    /// Weak-signal score above the merge threshold.
    Similarity(f64),
}

impl MatchSignal {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Provenance => "provenance",
            Self::Email => "email",
            Self::Handle => "handle",
            Self::Similarity(_) => "similarity",
        }
    }
}

/// A near-threshold decision resolved as "no merge".
#[derive(Debug, Clone, PartialEq)]
pub struct AmbiguousMerge {
    /// Candidates whose score fell in the ambiguity zone, best first.
    pub candidates: Vec<ProfileId>,
    pub best_score: f64,
}

impl Display for AmbiguousMerge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "ambiguous merge with {} candidate(s), best score {:.3}",
            self.candidates.len(),
            self.best_score
        )
    }
}

/// Outcome of resolving one record.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Existing {
        profile_id: ProfileId,
        signal: MatchSignal,
    },
    NewIdentity {
        ambiguity: Option<AmbiguousMerge>,
    },
}

/// Records believed to be one person, bound for one profile.
#[derive(Debug, Clone, PartialEq)]
pub struct IdentityCluster {
    /// Existing profile to merge into; `None` for a new identity.
    pub target: Option<ProfileId>,
    pub records: Vec<NormalizedRecord>,
}

/// Similarity/merge policy over normalized records and profiles.
pub struct IdentityResolver<'cfg> {
    config: &'cfg ResolverConfig,
}

impl<'cfg> IdentityResolver<'cfg> {
    pub fn new(config: &'cfg ResolverConfig) -> Self {
        Self { config }
    }

    /// Scores a record against an existing profile.
    pub fn score_profile(&self, record: &NormalizedRecord, profile: &Profile) -> MatchScore {
        let email_match = record
            .email
            .as_ref()
            .is_some_and(|email| profile.emails.contains(email));
        let handle_match = !record.handles.is_disjoint(&profile.handles);

        let alias_tokens = profile
            .aliases
            .iter()
            .map(|alias| normalized_name_tokens(alias))
            .collect::<Vec<_>>();
        let name_similarity = best_jaccard(std::iter::once(&record.name_tokens), alias_tokens.iter());

        let profile_affiliations = profile
            .affiliations
            .iter()
            .map(|affiliation| affiliation_tokens(affiliation))
            .collect::<Vec<_>>();
        let affiliation_similarity = match record.affiliation.as_deref() {
            Some(affiliation) => {
                let own = affiliation_tokens(affiliation);
                best_jaccard(std::iter::once(&own), profile_affiliations.iter())
            }
            None => 0.0,
        };

        self.combine(email_match, handle_match, name_similarity, affiliation_similarity)
    }

    /// Scores two records against each other.
    pub fn score_records(&self, left: &NormalizedRecord, right: &NormalizedRecord) -> MatchScore {
        let email_match = matches!((&left.email, &right.email), (Some(a), Some(b)) if a == b);
        let handle_match = !left.handles.is_disjoint(&right.handles);
        let name_similarity = jaccard(&left.name_tokens, &right.name_tokens);
        let affiliation_similarity = match (&left.affiliation, &right.affiliation) {
            (Some(a), Some(b)) => jaccard(&affiliation_tokens(a), &affiliation_tokens(b)),
            _ => 0.0,
        };

        self.combine(email_match, handle_match, name_similarity, affiliation_similarity)
    }

    /// Decides which candidate profile, if any, the record belongs to.
    ///
    /// Precedence: provenance, then email, then handle, then weak signals.
    /// Among equal strong matches the oldest profile wins, then the lowest id.
    pub fn resolve(&self, record: &NormalizedRecord, candidates: &[Profile]) -> Resolution {
        if let Some(profile) = candidates
            .iter()
            .filter(|profile| profile.contains_record(&record.source_id, &record.record_key))
            .min_by_key(|profile| (profile.created_at_ms, profile.id))
        {
            return existing(profile.id, MatchSignal::Provenance);
        }

        if let Some(email) = record.email.as_ref() {
            if let Some(profile) = candidates
                .iter()
                .filter(|profile| profile.emails.contains(email))
                .min_by_key(|profile| (profile.created_at_ms, profile.id))
            {
                return existing(profile.id, MatchSignal::Email);
            }
        }

        if let Some(profile) = candidates
            .iter()
            .filter(|profile| !record.handles.is_disjoint(&profile.handles))
            .min_by_key(|profile| (profile.created_at_ms, profile.id))
        {
            return existing(profile.id, MatchSignal::Handle);
        }

        self.resolve_weak(record, candidates)
    }

    /// Resolves a record into a single-record cluster.
    pub fn cluster(&self, record: NormalizedRecord, candidates: &[Profile]) -> (IdentityCluster, Resolution) {
        let resolution = self.resolve(&record, candidates);
        let target = match &resolution {
            Resolution::Existing { profile_id, .. } => Some(*profile_id),
            Resolution::NewIdentity { .. } => None,
        };
        (
            IdentityCluster {
                target,
                records: vec![record],
            },
            resolution,
        )
    }

    fn resolve_weak(&self, record: &NormalizedRecord, candidates: &[Profile]) -> Resolution {
        let mut scored = candidates
            .iter()
            .map(|profile| (profile.id, self.score_profile(record, profile).combined))
            .collect::<Vec<_>>();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        let Some(&(best_id, best_score)) = scored.first() else {
            return Resolution::NewIdentity { ambiguity: None };
        };

        let threshold = self.config.merge_threshold;
        let margin = self.config.ambiguity_margin;

        if best_score > threshold {
            let rival = scored
                .get(1)
                .filter(|(_, score)| *score > threshold && best_score - *score < margin);
            if rival.is_none() {
                return existing(best_id, MatchSignal::Similarity(best_score));
            }
            return ambiguous(&scored, best_score, threshold);
        }

        if best_score > threshold - margin {
            return ambiguous(&scored, best_score, threshold - margin);
        }

        Resolution::NewIdentity { ambiguity: None }
    }

    fn combine(
        &self,
        email_match: bool,
        handle_match: bool,
        name_similarity: f64,
        affiliation_similarity: f64,
    ) -> MatchScore {
        MatchScore {
            email_match,
            handle_match,
            name_similarity,
            affiliation_similarity,
            combined: self.config.name_weight * name_similarity
                + self.config.affiliation_weight * affiliation_similarity,
        }
    }
}

fn existing(profile_id: ProfileId, signal: MatchSignal) -> Resolution {
    Resolution::Existing { profile_id, signal }
}

fn ambiguous(scored: &[(ProfileId, f64)], best_score: f64, floor: f64) -> Resolution {
    let candidates = scored
        .iter()
        .filter(|(_, score)| *score > floor)
        .map(|(id, _)| *id)
        .collect::<BTreeSet<_>>();
    let mut ordered = scored
        .iter()
        .filter(|(id, _)| candidates.contains(id))
        .map(|(id, _)| *id)
        .collect::<Vec<_>>();
    ordered.dedup();
    Resolution::NewIdentity {
        ambiguity: Some(AmbiguousMerge {
            candidates: ordered,
            best_score,
        }),
    }
}
