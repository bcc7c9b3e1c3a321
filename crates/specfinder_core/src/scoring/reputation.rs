//! Reputation axes and their normalizations.

use crate::config::{ReputationWeights, ScoringConfig};
use crate::model::profile::{Profile, Score};
use crate::model::record::EvidenceMetrics;
use crate::normalize::padded_tokens;
use once_cell::sync::Lazy;

const ARTICLE_SATURATION: f64 = 1_000.0;
const SOCIAL_SATURATION: f64 = 100_000.0;
const CITATION_SATURATION: f64 = 10_000.0;
const H_INDEX_SATURATION: f64 = 50.0;
const PUBLICATION_SATURATION: f64 = 500.0;

const NO_AFFILIATION_QUALITY: f64 = 0.3;
const OTHER_AFFILIATION_QUALITY: f64 = 0.4;
const ACADEMIC_AFFILIATION_QUALITY: f64 = 0.7;

const TIER_ONE: &[&str] = &[
    "new york times",
    "wall street journal",
    "washington post",
    "reuters",
    "bloomberg",
    "financial times",
    "the guardian",
    "bbc",
    "cnn",
    "techcrunch",
    "wired",
    "ars technica",
    "the verge",
    "le monde",
];
const TIER_TWO: &[&str] = &[
    "forbes",
    "fortune",
    "business insider",
    "mashable",
    "engadget",
    "zdnet",
    "venturebeat",
    "recode",
    "axios",
    "fast company",
    "mit technology review",
    "ieee spectrum",
    "les echos",
    "le figaro",
];
const TIER_THREE: &[&str] = &[
    "techradar",
    "computerworld",
    "infoworld",
    "network world",
    "security week",
    "ai news",
    "machine learning mastery",
    "usine digitale",
];
const ACADEMIC_MARKERS: &[&str] = &[
    "university",
    "université",
    "universite",
    "institute",
    "institut",
    "research",
    "recherche",
    "academic",
    "laboratory",
    "lab",
];

/// Specializations that count toward the expertise axis.
const HIGH_VALUE_SPECIALIZATIONS: &[&str] = &[
    "artificial intelligence",
    "machine learning",
    "programming",
    "data science",
    "cybersecurity",
    "robotics",
    "deep learning",
    "ai",
];
const EXPERTISE_SATURATION: f64 = 3.0;

static TIERS: Lazy<Vec<(f64, Vec<String>)>> = Lazy::new(|| {
    [(1.0, TIER_ONE), (0.8, TIER_TWO), (0.6, TIER_THREE)]
        .into_iter()
        .map(|(quality, names)| (quality, names.iter().map(|name| padded_tokens(name)).collect()))
        .collect()
});

/// The four normalized reputation inputs, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReputationAxes {
    pub article_count: f64,
    pub social_followers: f64,
    pub publication_quality: f64,
    pub expertise_relevance: f64,
}

impl ReputationAxes {
    pub fn from_profile(profile: &Profile) -> Self {
        Self {
            article_count: article_axis(&profile.metrics),
            social_followers: social_axis(&profile.metrics),
            publication_quality: best_publication_quality(
                profile.affiliations.iter().map(String::as_str),
            ),
            expertise_relevance: expertise_axis(profile.specializations.iter().map(String::as_str)),
        }
    }

    fn weighted(&self, weights: &ReputationWeights) -> f64 {
        self.article_count * weights.article_count
            + self.social_followers * weights.social_followers
            + self.publication_quality * weights.publication_quality
            + self.expertise_relevance * weights.expertise_relevance
    }
}

/// Reputation score of a profile under `config`.
pub fn reputation_score(profile: &Profile, config: &ScoringConfig) -> Score {
    let axes = ReputationAxes::from_profile(profile);
    let mut raw = axes.weighted(&config.reputation);
    if profile.metrics.is_verified {
        raw += config.verified_bonus;
    }
    Score::from_raw(raw)
}

/// Output volume: journalism articles or scholarly output, whichever is
/// stronger.
pub fn article_axis(metrics: &EvidenceMetrics) -> f64 {
    let articles = log_scaled(metrics.article_count, ARTICLE_SATURATION);
    articles.max(academic_axis(metrics))
}

/// Combined citations, h-index and paper count; `0.0` without evidence.
pub fn academic_axis(metrics: &EvidenceMetrics) -> f64 {
    if !metrics.has_academic_evidence() {
        return 0.0;
    }
    let citations = log_floor_one(metrics.citation_count, CITATION_SATURATION);
    let h_index = (metrics.h_index as f64 / H_INDEX_SATURATION).min(1.0);
    let publications = log_floor_one(metrics.publication_count, PUBLICATION_SATURATION);
    (citations * 0.5 + h_index * 0.3 + publications * 0.2).min(1.0)
}

/// Audience size; professional connections count double.
pub fn social_axis(metrics: &EvidenceMetrics) -> f64 {
    let audience = metrics
        .social_followers
        .saturating_add(metrics.professional_connections.saturating_mul(2));
    log_scaled(audience, SOCIAL_SATURATION)
}

/// Tier of one affiliation.
pub fn publication_quality(affiliation: &str) -> f64 {
    let haystack = padded_tokens(affiliation);
    for (quality, names) in TIERS.iter() {
        if names.iter().any(|name| haystack.contains(name.as_str())) {
            return *quality;
        }
    }
    if ACADEMIC_MARKERS
        .iter()
        .any(|marker| haystack.contains(&format!(" {marker} ")))
    {
        return ACADEMIC_AFFILIATION_QUALITY;
    }
    OTHER_AFFILIATION_QUALITY
}

/// Best tier over all affiliations; `0.3` when there is none.
pub fn best_publication_quality<'a>(affiliations: impl IntoIterator<Item = &'a str>) -> f64 {
    affiliations
        .into_iter()
        .map(publication_quality)
        .fold(None, |best: Option<f64>, quality| {
            Some(best.map_or(quality, |best| best.max(quality)))
        })
        .unwrap_or(NO_AFFILIATION_QUALITY)
}

pub fn expertise_axis<'a>(specializations: impl IntoIterator<Item = &'a str>) -> f64 {
    let matches = specializations
        .into_iter()
        .filter(|tag| HIGH_VALUE_SPECIALIZATIONS.contains(tag))
        .count();
    (matches as f64 / EXPERTISE_SATURATION).min(1.0)
}

/// `log10(value + 1) / log10(saturation + 1)`, capped at 1.
fn log_scaled(value: u64, saturation: f64) -> f64 {
    ((value as f64 + 1.0).log10() / (saturation + 1.0).log10()).min(1.0)
}

/// `log10(max(value, 1)) / log10(saturation)`, capped at 1.
fn log_floor_one(value: u64, saturation: f64) -> f64 {
    ((value.max(1) as f64).log10() / saturation.log10()).min(1.0)
}

#[cfg(test)]
mod tests {
    use super::{
        academic_axis, article_axis, best_publication_quality, expertise_axis,
        publication_quality, social_axis,
    };
    use crate::model::record::EvidenceMetrics;

    fn close(left: f64, right: f64) -> bool {
        (left - right).abs() < 1e-9
    }

    #[test]
    fn article_axis_saturates_at_one_thousand() {
        let mut metrics = EvidenceMetrics::default();
        assert_eq!(article_axis(&metrics), 0.0);
        metrics.article_count = 1_000;
        assert!(close(article_axis(&metrics), 1.0));
        metrics.article_count = 50_000;
        assert_eq!(article_axis(&metrics), 1.0);
    }

    #[test]
    fn academic_output_can_carry_article_axis() {
        let metrics = EvidenceMetrics {
            citation_count: 10_000,
            h_index: 50,
            publication_count: 500,
            ..EvidenceMetrics::default()
        };
        assert!(close(academic_axis(&metrics), 1.0));
        assert!(close(article_axis(&metrics), 1.0));
    }

    #[test]
    fn connections_count_double_for_social_axis() {
        let followers = EvidenceMetrics {
            social_followers: 200,
            ..EvidenceMetrics::default()
        };
        let connections = EvidenceMetrics {
            professional_connections: 100,
            ..EvidenceMetrics::default()
        };
        assert!(close(social_axis(&followers), social_axis(&connections)));
    }

    #[test]
    fn publication_tiers_match_whole_names() {
        assert_eq!(publication_quality("The New York Times"), 1.0);
        assert_eq!(publication_quality("MIT Technology Review"), 0.8);
        assert_eq!(publication_quality("TechRadar"), 0.6);
        assert_eq!(publication_quality("University of Montreal"), 0.7);
        assert_eq!(publication_quality("Local Gazette"), 0.4);
        assert_eq!(best_publication_quality(std::iter::empty::<&str>()), 0.3);
        assert_eq!(best_publication_quality(["Local Gazette", "BBC"]), 1.0);
    }

    #[test]
    fn expertise_counts_high_value_tags() {
        assert_eq!(expertise_axis(["gardening"]), 0.0);
        assert!(close(expertise_axis(["machine learning"]), 1.0 / 3.0));
        assert_eq!(
            expertise_axis(["machine learning", "robotics", "programming", "ai"]),
            1.0
        );
    }
}
