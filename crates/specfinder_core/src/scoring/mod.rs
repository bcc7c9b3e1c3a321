//! Reputation and AI-relevance scoring.
//!
//! # Responsibility
//! - Compute both profile scores from merged evidence and an immutable
//!   scoring configuration.
//!
//! # Invariants
//! - Pure: the same profile evidence and configuration give the same scores.
//! - Every produced score is in `[0, 1]`; clamping is recorded on the score.
//! - The configuration is validated once, when the scorer is built.

pub mod relevance;
pub mod reputation;

use crate::config::{ConfigError, ScoringConfig};
use crate::model::profile::{Profile, Score};
use relevance::RelevanceMatcher;

/// Both scores of one profile.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileScores {
    pub reputation: Score,
    pub ai_relevance: Score,
}

/// Validated scoring configuration with compiled keyword matchers.
#[derive(Debug, Clone)]
pub struct ProfileScorer {
    config: ScoringConfig,
    relevance: RelevanceMatcher,
}

impl ProfileScorer {
    /// # Errors
    /// - `ConfigError` when weights, bonuses or coverage patterns are invalid.
    pub fn new(config: ScoringConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let relevance = RelevanceMatcher::compile(&config.relevance)?;
        Ok(Self { config, relevance })
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    pub fn evaluate(&self, profile: &Profile) -> ProfileScores {
        ProfileScores {
            reputation: reputation::reputation_score(profile, &self.config),
            ai_relevance: self.relevance.score(profile),
        }
    }

    /// Writes fresh scores onto the profile.
    pub fn apply(&self, profile: &mut Profile) -> ProfileScores {
        let scores = self.evaluate(profile);
        profile.reputation = scores.reputation;
        profile.ai_relevance = scores.ai_relevance;
        scores
    }
}
