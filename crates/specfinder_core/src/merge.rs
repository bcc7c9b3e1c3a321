//! Profile merger.
//!
//! # Responsibility
//! - Fold a cluster of normalized records into a new or existing canonical
//!   profile.
//!
//! # Invariants
//! - Merging is idempotent: a record whose `(source_id, record_key)` is
//!   already in provenance is skipped.
//! - Sets only grow; provenance is append-only.
//! - An existing country is never replaced.
//! - When evidence changes, both scores are reset to `Unscored`.

use crate::model::profile::{CountrySource, Profile, Score};
use crate::model::record::{CountryHint, NormalizedRecord, RecordRef};
use std::collections::BTreeMap;

/// Result of a merge.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeOutcome {
    pub profile: Profile,
    /// Whether any record contributed new evidence.
    pub changed: bool,
}

/// Merges `records` into `existing`, or into a fresh profile when `None`.
pub fn merge_cluster(existing: Option<Profile>, records: &[NormalizedRecord]) -> MergeOutcome {
    let mut profile = existing.unwrap_or_default();
    let mut changed = false;

    for record in records {
        if profile.contains_record(&record.source_id, &record.record_key) {
            continue;
        }
        absorb_record(&mut profile, record);
        changed = true;
    }

    if changed {
        profile.display_name = choose_display_name(&profile.provenance);
        profile.reputation = Score::Unscored;
        profile.ai_relevance = Score::Unscored;
    }

    MergeOutcome { profile, changed }
}

fn absorb_record(profile: &mut Profile, record: &NormalizedRecord) {
    if profile.provenance.is_empty() {
        profile.created_at_ms = record.observed_at_ms;
        profile.updated_at_ms = record.observed_at_ms;
    } else {
        profile.created_at_ms = profile.created_at_ms.min(record.observed_at_ms);
        profile.updated_at_ms = profile.updated_at_ms.max(record.observed_at_ms);
    }

    profile.aliases.insert(record.normalized_name.clone());
    profile.sources.insert(record.source_id.clone());
    profile.emails.extend(record.email.iter().cloned());
    profile.handles.extend(record.handles.iter().cloned());
    profile.affiliations.extend(record.affiliation.iter().cloned());
    profile.job_titles.extend(record.job_title.iter().cloned());
    profile.biographies.extend(record.bio.iter().cloned());
    profile.urls.extend(record.url.iter().cloned());
    profile
        .specializations
        .extend(record.specializations.iter().cloned());

    match &record.country {
        Some(CountryHint::Iso(code)) if profile.country.is_none() => {
            profile.country = Some(*code);
            profile.country_source = Some(CountrySource::Explicit);
        }
        Some(CountryHint::FreeText(text)) => {
            profile.location_hints.insert(text.clone());
        }
        _ => {}
    }

    profile.metrics.absorb(&record.metrics);
    profile.provenance.push(record.reference());
}

/// Picks the display name from provenance.
///
/// The most frequent normalized name wins; ties go to the group with the
/// longest original spelling, then to the lexicographically smallest name.
/// The winning group is displayed with its longest original spelling.
fn choose_display_name(provenance: &[RecordRef]) -> String {
    let mut groups: BTreeMap<&str, (usize, &str)> = BTreeMap::new();
    for entry in provenance {
        let slot = groups
            .entry(entry.normalized_name.as_str())
            .or_insert((0, entry.original_name.as_str()));
        slot.0 += 1;
        if is_preferred_spelling(&entry.original_name, slot.1) {
            slot.1 = entry.original_name.as_str();
        }
    }

    // BTreeMap iteration is ascending, so strict comparisons keep the
    // lexicographically smallest name on full ties.
    let mut best: Option<(usize, &str)> = None;
    for (count, original) in groups.values().copied() {
        let better = match best {
            None => true,
            Some((best_count, best_original)) => {
                count > best_count
                    || (count == best_count
                        && original.chars().count() > best_original.chars().count())
            }
        };
        if better {
            best = Some((count, original));
        }
    }

    best.map(|(_, original)| original.to_string())
        .unwrap_or_default()
}

fn is_preferred_spelling(candidate: &str, current: &str) -> bool {
    let candidate_len = candidate.chars().count();
    let current_len = current.chars().count();
    candidate_len > current_len || (candidate_len == current_len && candidate < current)
}
