//! Profile queries: validation, filtering and ordering.

use super::{SearchError, SearchResult};
use crate::config::QualityPreset;
use crate::model::country::resolve_country;
use crate::model::profile::{Profile, Score};
use crate::normalize::normalize_tag;
use crate::repo::{ProfileFilter, ProfileStore};
use log::{info, warn};
use std::cmp::Ordering;
use std::time::Instant;

/// Limit applied when a key/value query does not set one.
pub const DEFAULT_LIMIT: i64 = 50;

/// A validated-on-use profile query.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchQuery {
    pub filter: ProfileFilter,
    /// Maximum number of results; must be positive.
    pub limit: i64,
}

impl SearchQuery {
    /// Creates an unfiltered query.
    pub fn new(limit: i64) -> Self {
        Self {
            filter: ProfileFilter::default(),
            limit,
        }
    }

    /// Builds a query from string key/value pairs, applied in order.
    ///
    /// Keys: `country` (comma-separated names or codes), `specialization`
    /// (comma-separated tags), `min_reputation`, `min_ai_relevance`,
    /// `limit`, `quality` (`strict`, `moderate`, `inclusive`, `all`).
    ///
    /// # Errors
    /// - `SearchError::InvalidQuery` for unknown keys, unparseable values or
    ///   unknown countries, and for anything `validate` rejects.
    pub fn from_pairs<K, V>(pairs: impl IntoIterator<Item = (K, V)>) -> SearchResult<Self>
    where
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut query = Self::new(DEFAULT_LIMIT);
        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref().trim();
            match key {
                "country" => {
                    for part in value.split(',').filter(|part| !part.trim().is_empty()) {
                        let code = resolve_country(part).ok_or_else(|| {
                            SearchError::invalid(key, format!("unknown country `{}`", part.trim()))
                        })?;
                        query.filter.countries.insert(code);
                    }
                }
                "specialization" => {
                    query
                        .filter
                        .specializations
                        .extend(value.split(',').filter_map(normalize_tag));
                }
                "min_reputation" => query.filter.min_reputation = Some(parse_threshold(key, value)?),
                "min_ai_relevance" => {
                    query.filter.min_ai_relevance = Some(parse_threshold(key, value)?)
                }
                "limit" => {
                    query.limit = value.parse::<i64>().map_err(|_| {
                        SearchError::invalid(key, format!("`{value}` is not an integer"))
                    })?;
                }
                "quality" => {
                    let preset = QualityPreset::parse(value).ok_or_else(|| {
                        SearchError::invalid(key, format!("unknown quality preset `{value}`"))
                    })?;
                    let (min_reputation, min_ai_relevance) = preset.thresholds();
                    query.filter.min_reputation = Some(min_reputation);
                    query.filter.min_ai_relevance = Some(min_ai_relevance);
                }
                other => return Err(SearchError::invalid(other, "unknown filter key")),
            }
        }
        query.validate()?;
        Ok(query)
    }

    pub fn validate(&self) -> SearchResult<()> {
        if self.limit <= 0 {
            return Err(SearchError::invalid(
                "limit",
                format!("limit must be positive, got {}", self.limit),
            ));
        }
        check_threshold("min_reputation", self.filter.min_reputation)?;
        check_threshold("min_ai_relevance", self.filter.min_ai_relevance)?;
        Ok(())
    }
}

/// Runs a query against a store.
pub fn search_profiles<S: ProfileStore + ?Sized>(
    store: &S,
    query: &SearchQuery,
) -> SearchResult<Vec<Profile>> {
    let started_at = Instant::now();
    if let Err(err) = query.validate() {
        warn!("event=search module=search status=rejected error={err}");
        return Err(err);
    }

    let candidates = store.query(&query.filter)?;
    let matched = candidates.len();
    let results = rank_profiles(candidates, query);
    info!(
        "event=search module=search status=ok matched={matched} returned={} duration_ms={}",
        results.len(),
        started_at.elapsed().as_millis()
    );
    Ok(results)
}

/// Filters, sorts and truncates profiles in memory.
pub fn rank_profiles(profiles: Vec<Profile>, query: &SearchQuery) -> Vec<Profile> {
    let mut ranked = profiles
        .into_iter()
        .filter(|profile| query.filter.matches(profile))
        .collect::<Vec<_>>();
    ranked.sort_by(compare_profiles);
    ranked.truncate(usize::try_from(query.limit).unwrap_or(0));
    ranked
}

/// Reputation desc, ai_relevance desc, id asc. Unscored sorts last.
fn compare_profiles(left: &Profile, right: &Profile) -> Ordering {
    compare_scores(left.reputation, right.reputation)
        .then_with(|| compare_scores(left.ai_relevance, right.ai_relevance))
        .then_with(|| left.id.cmp(&right.id))
}

fn compare_scores(left: Score, right: Score) -> Ordering {
    match (left.value(), right.value()) {
        (Some(left), Some(right)) => right.total_cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn parse_threshold(key: &str, value: &str) -> SearchResult<f64> {
    let parsed = value
        .parse::<f64>()
        .map_err(|_| SearchError::invalid(key, format!("`{value}` is not a number")))?;
    check_threshold(key, Some(parsed))?;
    Ok(parsed)
}

fn check_threshold(key: &str, value: Option<f64>) -> SearchResult<()> {
    match value {
        Some(value) if !(0.0..=1.0).contains(&value) => Err(SearchError::invalid(
            key,
            format!("threshold {value} is outside [0, 1]"),
        )),
        _ => Ok(()),
    }
}
