//! Keyword-based AI-relevance scoring.
//!
//! Keywords are matched as token sequences, so `ai` never matches inside
//! `said` and `c++` survives tokenization.

use crate::config::{ConfigError, RelevanceConfig};
use crate::model::profile::{Profile, Score};
use regex::{Regex, RegexBuilder};

#[derive(Debug, Clone)]
struct CompiledKeyword {
    tokens: Vec<String>,
    weight: f64,
}

#[derive(Debug, Clone)]
struct CompiledGroup {
    weight: f64,
    saturation: f64,
    keywords: Vec<CompiledKeyword>,
}

/// Relevance configuration with keywords tokenized and patterns compiled.
#[derive(Debug, Clone)]
pub struct RelevanceMatcher {
    groups: Vec<CompiledGroup>,
    coverage: Vec<Regex>,
    coverage_bonus: f64,
    academic_boost: f64,
}

impl RelevanceMatcher {
    /// Compiles a validated configuration.
    ///
    /// # Errors
    /// - `ConfigError::InvalidPattern` when a coverage pattern does not compile.
    pub fn compile(config: &RelevanceConfig) -> Result<Self, ConfigError> {
        let groups = config
            .groups
            .iter()
            .map(|group| CompiledGroup {
                weight: group.weight,
                saturation: group.saturation,
                keywords: group
                    .keywords
                    .iter()
                    .map(|keyword| CompiledKeyword {
                        tokens: text_tokens(&keyword.term),
                        weight: keyword.weight,
                    })
                    .filter(|keyword| !keyword.tokens.is_empty())
                    .collect(),
            })
            .collect();

        let coverage = config
            .coverage_patterns
            .iter()
            .map(|pattern| {
                RegexBuilder::new(pattern)
                    .case_insensitive(true)
                    .build()
                    .map_err(|err| ConfigError::InvalidPattern {
                        pattern: pattern.clone(),
                        message: err.to_string(),
                    })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            groups,
            coverage,
            coverage_bonus: config.coverage_bonus,
            academic_boost: config.academic_boost,
        })
    }

    /// AI-relevance of a profile's text fields and academic evidence.
    pub fn score(&self, profile: &Profile) -> Score {
        let fields = profile_fields(profile);
        let tokenized = fields
            .iter()
            .map(|field| text_tokens(field))
            .collect::<Vec<_>>();

        let mut raw = 0.0;
        for group in &self.groups {
            let sum = group
                .keywords
                .iter()
                .map(|keyword| {
                    let count = tokenized
                        .iter()
                        .map(|tokens| count_sequence(tokens, &keyword.tokens))
                        .sum::<usize>();
                    keyword.weight * (1.0 - (-(count as f64)).exp())
                })
                .sum::<f64>();
            raw += (sum / group.saturation).min(1.0) * group.weight;
        }

        if fields
            .iter()
            .any(|field| self.coverage.iter().any(|pattern| pattern.is_match(field)))
        {
            raw += self.coverage_bonus;
        }
        if profile.metrics.has_academic_evidence() {
            raw += self.academic_boost;
        }

        Score::from_raw(raw)
    }
}

/// Name, biographies, job titles, affiliations and specialization tags.
fn profile_fields(profile: &Profile) -> Vec<&str> {
    std::iter::once(profile.display_name.as_str())
        .chain(profile.biographies.iter().map(String::as_str))
        .chain(profile.job_titles.iter().map(String::as_str))
        .chain(profile.affiliations.iter().map(String::as_str))
        .chain(profile.specializations.iter().map(String::as_str))
        .collect()
}

/// Lowercased tokens; `+` and `#` are kept as word characters.
pub fn text_tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '+' || c == '#'))
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Non-overlapping occurrences of `needle` in `haystack`.
fn count_sequence(haystack: &[String], needle: &[String]) -> usize {
    if needle.is_empty() || needle.len() > haystack.len() {
        return 0;
    }
    let mut count = 0;
    let mut index = 0;
    while index + needle.len() <= haystack.len() {
        if haystack[index..index + needle.len()] == *needle {
            count += 1;
            index += needle.len();
        } else {
            index += 1;
        }
    }
    count
}
