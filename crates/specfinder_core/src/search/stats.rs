//! Corpus statistics.

use crate::model::country::CountryCode;
use crate::model::profile::{Profile, Score};
use std::collections::{BTreeMap, BTreeSet};

/// Affiliation with the number of profiles that list it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AffiliationCount {
    pub affiliation: String,
    pub profiles: usize,
}

/// Aggregate view of the stored profiles.
#[derive(Debug, Clone, PartialEq)]
pub struct CorpusStatistics {
    pub total_profiles: usize,
    /// Profiles with both scores computed.
    pub scored_profiles: usize,
    pub countries_covered: BTreeSet<CountryCode>,
    pub profiles_without_country: usize,
    /// Mean over scored profiles; `None` when nothing is scored.
    pub average_reputation: Option<f64>,
    pub average_ai_relevance: Option<f64>,
    /// Most common affiliations, most frequent first, ties by name.
    pub top_affiliations: Vec<AffiliationCount>,
}

/// Summarizes `profiles`, keeping at most `top_n` affiliations.
pub fn compute_statistics(profiles: &[Profile], top_n: usize) -> CorpusStatistics {
    let mut countries_covered = BTreeSet::new();
    let mut profiles_without_country = 0;
    let mut affiliations: BTreeMap<&str, usize> = BTreeMap::new();

    for profile in profiles {
        match profile.country {
            Some(country) => {
                countries_covered.insert(country);
            }
            None => profiles_without_country += 1,
        }
        for affiliation in &profile.affiliations {
            *affiliations.entry(affiliation.as_str()).or_default() += 1;
        }
    }

    let scored = profiles
        .iter()
        .filter(|profile| {
            !matches!(profile.reputation, Score::Unscored)
                && !matches!(profile.ai_relevance, Score::Unscored)
        })
        .collect::<Vec<_>>();

    let mut top_affiliations = affiliations
        .into_iter()
        .map(|(affiliation, profiles)| AffiliationCount {
            affiliation: affiliation.to_string(),
            profiles,
        })
        .collect::<Vec<_>>();
    top_affiliations.sort_by(|a, b| {
        b.profiles
            .cmp(&a.profiles)
            .then_with(|| a.affiliation.cmp(&b.affiliation))
    });
    top_affiliations.truncate(top_n);

    CorpusStatistics {
        total_profiles: profiles.len(),
        scored_profiles: scored.len(),
        countries_covered,
        profiles_without_country,
        average_reputation: mean(scored.iter().filter_map(|profile| profile.reputation.value())),
        average_ai_relevance: mean(
            scored
                .iter()
                .filter_map(|profile| profile.ai_relevance.value()),
        ),
        top_affiliations,
    }
}

fn mean(values: impl Iterator<Item = f64>) -> Option<f64> {
    let (sum, count) = values.fold((0.0, 0usize), |(sum, count), value| (sum + value, count + 1));
    (count > 0).then(|| sum / count as f64)
}

#[cfg(test)]
mod tests {
    use super::compute_statistics;
    use crate::model::country::CountryCode;
    use crate::model::profile::{Profile, Score};

    #[test]
    fn empty_corpus_has_no_averages() {
        let stats = compute_statistics(&[], 5);
        assert_eq!(stats.total_profiles, 0);
        assert_eq!(stats.average_reputation, None);
        assert!(stats.top_affiliations.is_empty());
    }

    #[test]
    fn statistics_cover_countries_scores_and_affiliations() {
        let mut first = Profile::new();
        first.country = CountryCode::parse("FR");
        first.reputation = Score::from_raw(0.4);
        first.ai_relevance = Score::from_raw(0.2);
        first.affiliations.insert("Le Monde".to_string());

        let mut second = Profile::new();
        second.country = CountryCode::parse("FR");
        second.reputation = Score::from_raw(0.8);
        second.ai_relevance = Score::from_raw(0.6);
        second.affiliations.insert("Le Monde".to_string());
        second.affiliations.insert("Inria".to_string());

        let third = Profile::new();

        let stats = compute_statistics(&[first, second, third], 1);
        assert_eq!(stats.total_profiles, 3);
        assert_eq!(stats.scored_profiles, 2);
        assert_eq!(stats.countries_covered.len(), 1);
        assert_eq!(stats.profiles_without_country, 1);
        assert!((stats.average_reputation.expect("average") - 0.6).abs() < 1e-9);
        assert!((stats.average_ai_relevance.expect("average") - 0.4).abs() < 1e-9);
        assert_eq!(stats.top_affiliations.len(), 1);
        assert_eq!(stats.top_affiliations[0].affiliation, "Le Monde");
        assert_eq!(stats.top_affiliations[0].profiles, 2);
    }
}
