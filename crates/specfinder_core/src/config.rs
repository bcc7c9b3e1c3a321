//! Tunable parameters for resolution, scoring and filtering.
//!
//! # Responsibility
//! - Hold resolver thresholds, reputation weights and relevance keyword sets
//!   as immutable values passed explicitly into components.
//! - Provide named scoring configurations and quality presets.
//!
//! # Invariants
//! - Reputation weights are non-negative and sum to 1.
//! - A configuration is validated before any component uses it.
//!
//! Numeric defaults are starting points; they need calibration against a
//! labeled set before production use.

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

const WEIGHT_SUM_TOLERANCE: f64 = 1e-6;

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// A numeric parameter is negative, non-finite or out of its range.
    InvalidParameter { name: String, value: f64 },
    /// Reputation weights do not sum to 1.
    WeightSum { sum: f64 },
    /// Named configuration is not known.
    UnknownConfiguration(String),
    /// A coverage pattern is not a valid regex.
    InvalidPattern { pattern: String, message: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidParameter { name, value } => {
                write!(f, "invalid value {value} for parameter `{name}`")
            }
            Self::WeightSum { sum } => write!(f, "reputation weights sum to {sum}, expected 1"),
            Self::UnknownConfiguration(name) => write!(f, "unknown scoring configuration `{name}`"),
            Self::InvalidPattern { pattern, message } => {
                write!(f, "invalid coverage pattern `{pattern}`: {message}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Identity resolver parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ResolverConfig {
    /// Weight of name token-set similarity in the combined score.
    pub name_weight: f64,
    /// Weight of affiliation similarity in the combined score.
    pub affiliation_weight: f64,
    /// A combined score strictly above this merges.
    pub merge_threshold: f64,
    /// Scores this close below the threshold are ambiguous (no merge).
    pub ambiguity_margin: f64,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            name_weight: 0.6,
            affiliation_weight: 0.4,
            merge_threshold: 0.8,
            ambiguity_margin: 0.1,
        }
    }
}

impl ResolverConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("name_weight", self.name_weight)?;
        check_unit("affiliation_weight", self.affiliation_weight)?;
        check_unit("merge_threshold", self.merge_threshold)?;
        check_unit("ambiguity_margin", self.ambiguity_margin)?;
        Ok(())
    }
}

/// Weights of the four reputation axes.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReputationWeights {
    pub article_count: f64,
    pub social_followers: f64,
    pub publication_quality: f64,
    pub expertise_relevance: f64,
}

impl Default for ReputationWeights {
    fn default() -> Self {
        Self {
            article_count: 0.3,
            social_followers: 0.25,
            publication_quality: 0.25,
            expertise_relevance: 0.2,
        }
    }
}

impl ReputationWeights {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_unit("reputation.article_count", self.article_count)?;
        check_unit("reputation.social_followers", self.social_followers)?;
        check_unit("reputation.publication_quality", self.publication_quality)?;
        check_unit("reputation.expertise_relevance", self.expertise_relevance)?;

        let sum = self.article_count
            + self.social_followers
            + self.publication_quality
            + self.expertise_relevance;
        if (sum - 1.0).abs() > WEIGHT_SUM_TOLERANCE {
            return Err(ConfigError::WeightSum { sum });
        }
        Ok(())
    }
}

/// One domain keyword and its specificity weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeightedKeyword {
    pub term: String,
    pub weight: f64,
}

/// A family of keywords scored together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct KeywordGroup {
    pub name: String,
    /// Share of this group in the relevance score.
    pub weight: f64,
    /// Summed keyword contribution that saturates the group at 1.
    pub saturation: f64,
    pub keywords: Vec<WeightedKeyword>,
}

/// AI-relevance keyword configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelevanceConfig {
    pub groups: Vec<KeywordGroup>,
    /// Case-insensitive regexes that mark explicit AI coverage.
    pub coverage_patterns: Vec<String>,
    pub coverage_bonus: f64,
    /// Added when citations, h-index or papers are present.
    pub academic_boost: f64,
}

impl Default for RelevanceConfig {
    fn default() -> Self {
        Self {
            groups: vec![
                group(
                    "core_ai",
                    0.4,
                    2.0,
                    &[
                        ("artificial intelligence", 1.0),
                        ("machine learning", 1.0),
                        ("deep learning", 0.95),
                        ("neural networks", 0.9),
                        ("neural network", 0.9),
                        ("natural language processing", 0.9),
                        ("computer vision", 0.9),
                        ("reinforcement learning", 0.85),
                        ("ai ethics", 0.85),
                        ("robotics", 0.75),
                        ("data science", 0.7),
                        ("automation", 0.7),
                        ("algorithm", 0.65),
                        ("cybersecurity", 0.7),
                        ("cloud computing", 0.65),
                        ("big data", 0.6),
                        ("chatbot", 0.6),
                        ("digital transformation", 0.6),
                        ("ai", 0.6),
                        ("technology", 0.3),
                        ("tech", 0.3),
                        ("digital", 0.25),
                        ("software", 0.4),
                    ],
                ),
                group(
                    "programming",
                    0.25,
                    3.0,
                    &[
                        ("programming", 0.8),
                        ("software engineering", 0.75),
                        ("software development", 0.75),
                        ("coding", 0.7),
                        ("devops", 0.65),
                        ("python", 0.9),
                        ("tensorflow", 0.95),
                        ("pytorch", 0.95),
                        ("scikit-learn", 0.9),
                        ("julia", 0.8),
                        ("spark", 0.8),
                        ("c++", 0.7),
                        ("scala", 0.7),
                        ("matlab", 0.7),
                        ("rust", 0.6),
                        ("javascript", 0.6),
                        ("java", 0.6),
                        ("sql", 0.5),
                    ],
                ),
                group(
                    "organizations",
                    0.2,
                    2.0,
                    &[
                        ("openai", 1.0),
                        ("deepmind", 1.0),
                        ("anthropic", 1.0),
                        ("mila", 1.0),
                        ("inria", 0.9),
                        ("nvidia", 0.9),
                        ("hugging face", 0.9),
                        ("google", 0.8),
                        ("microsoft", 0.8),
                        ("tesla", 0.8),
                        ("meta", 0.7),
                        ("amazon", 0.7),
                        ("apple", 0.7),
                        ("ibm", 0.7),
                        ("intel", 0.7),
                    ],
                ),
                group(
                    "concepts",
                    0.15,
                    5.0,
                    &[
                        ("generative ai", 0.95),
                        ("large language model", 0.95),
                        ("large language models", 0.95),
                        ("llm", 0.9),
                        ("transformer", 0.9),
                        ("gpt", 0.9),
                        ("bert", 0.85),
                        ("supervised learning", 0.9),
                        ("unsupervised learning", 0.9),
                        ("transfer learning", 0.85),
                        ("convolutional neural network", 0.9),
                        ("recurrent neural network", 0.85),
                        ("gradient descent", 0.8),
                        ("backpropagation", 0.8),
                        ("model training", 0.8),
                        ("feature engineering", 0.75),
                        ("random forest", 0.7),
                        ("decision tree", 0.6),
                    ],
                ),
            ],
            coverage_patterns: vec![
                r"\bai\s+(journalist|reporter|correspondent|editor)\b".to_string(),
                r"\bartificial\s+intelligence\s+(reporter|journalist|correspondent)\b".to_string(),
                r"\bmachine\s+learning\s+(correspondent|reporter)\b".to_string(),
                r"\bcovers?\s+(artificial\s+intelligence|ai|machine\s+learning)\b".to_string(),
                r"\bspeciali[sz]es?\s+in\s+(ai|artificial\s+intelligence)\b".to_string(),
                r"\bfocuses?\s+on\s+machine\s+learning\b".to_string(),
            ],
            coverage_bonus: 0.2,
            academic_boost: 0.1,
        }
    }
}

impl RelevanceConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        for group in &self.groups {
            check_unit(&format!("relevance.{}.weight", group.name), group.weight)?;
            if !group.saturation.is_finite() || group.saturation <= 0.0 {
                return Err(ConfigError::InvalidParameter {
                    name: format!("relevance.{}.saturation", group.name),
                    value: group.saturation,
                });
            }
            for keyword in &group.keywords {
                check_unit(
                    &format!("relevance.{}.{}", group.name, keyword.term),
                    keyword.weight,
                )?;
            }
        }
        check_unit("relevance.coverage_bonus", self.coverage_bonus)?;
        check_unit("relevance.academic_boost", self.academic_boost)?;
        Ok(())
    }
}

/// Complete scoring configuration, selected by name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringConfig {
    pub name: String,
    pub reputation: ReputationWeights,
    /// Added to the reputation sum for verified accounts.
    pub verified_bonus: f64,
    pub relevance: RelevanceConfig,
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            reputation: ReputationWeights::default(),
            verified_bonus: 0.05,
            relevance: RelevanceConfig::default(),
        }
    }
}

impl ScoringConfig {
    /// Returns a built-in configuration: `default`, `journalist` or `academic`.
    pub fn named(name: &str) -> Result<Self, ConfigError> {
        let reputation = match name.trim() {
            "default" => ReputationWeights::default(),
            "journalist" => ReputationWeights {
                article_count: 0.35,
                social_followers: 0.3,
                publication_quality: 0.25,
                expertise_relevance: 0.1,
            },
            "academic" => ReputationWeights {
                article_count: 0.45,
                social_followers: 0.1,
                publication_quality: 0.25,
                expertise_relevance: 0.2,
            },
            other => return Err(ConfigError::UnknownConfiguration(other.to_string())),
        };

        Ok(Self {
            name: name.trim().to_string(),
            reputation,
            ..Self::default()
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.reputation.validate()?;
        check_unit("verified_bonus", self.verified_bonus)?;
        self.relevance.validate()
    }
}

/// Named score threshold presets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityPreset {
    Strict,
    Moderate,
    Inclusive,
    All,
}

impl QualityPreset {
    /// `(min_reputation, min_ai_relevance)` for this preset.
    pub fn thresholds(self) -> (f64, f64) {
        match self {
            Self::Strict => (0.5, 0.5),
            Self::Moderate => (0.25, 0.15),
            Self::Inclusive => (0.15, 0.02),
            Self::All => (0.0, 0.0),
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "strict" => Some(Self::Strict),
            "moderate" => Some(Self::Moderate),
            "inclusive" => Some(Self::Inclusive),
            "all" => Some(Self::All),
            _ => None,
        }
    }
}

fn group(name: &str, weight: f64, saturation: f64, keywords: &[(&str, f64)]) -> KeywordGroup {
    KeywordGroup {
        name: name.to_string(),
        weight,
        saturation,
        keywords: keywords
            .iter()
            .map(|(term, weight)| WeightedKeyword {
                term: (*term).to_string(),
                weight: *weight,
            })
            .collect(),
    }
}

fn check_unit(name: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::InvalidParameter {
        name: name.to_string(),
        value,
    })
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, QualityPreset, ReputationWeights, ResolverConfig, ScoringConfig};

    #[test]
    fn defaults_are_valid() {
        ResolverConfig::default()
            .validate()
            .expect("default resolver config should be valid");
        ScoringConfig::default()
            .validate()
            .expect("default scoring config should be valid");
    }

    #[test]
    fn named_configurations_are_valid() {
        for name in ["default", "journalist", "academic"] {
            let config = ScoringConfig::named(name).expect("named config should exist");
            assert_eq!(config.name, name);
            config.validate().expect("named config should be valid");
        }
    }

    #[test]
    fn unknown_named_configuration_is_rejected() {
        assert_eq!(
            ScoringConfig::named("tabloid"),
            Err(ConfigError::UnknownConfiguration("tabloid".to_string()))
        );
    }

    #[test]
    fn weights_must_sum_to_one() {
        let weights = ReputationWeights {
            article_count: 0.5,
            social_followers: 0.5,
            publication_quality: 0.5,
            expertise_relevance: 0.0,
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::WeightSum { .. })
        ));
    }

    #[test]
    fn negative_weight_is_rejected() {
        let weights = ReputationWeights {
            article_count: -0.2,
            social_followers: 0.6,
            publication_quality: 0.4,
            expertise_relevance: 0.2,
        };
        assert!(matches!(
            weights.validate(),
            Err(ConfigError::InvalidParameter { .. })
        ));
    }

    #[test]
    fn quality_presets_parse_case_insensitively() {
        assert_eq!(QualityPreset::parse(" Strict "), Some(QualityPreset::Strict));
        assert_eq!(QualityPreset::parse("none"), None);
        assert_eq!(QualityPreset::Moderate.thresholds(), (0.25, 0.15));
    }
}
