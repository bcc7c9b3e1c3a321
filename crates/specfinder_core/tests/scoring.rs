use specfinder_core::config::{ConfigError, ScoringConfig};
use specfinder_core::model::profile::{Profile, Score};
use specfinder_core::scoring::ProfileScorer;

fn in_unit_range(score: Score) -> bool {
    score.value().is_some_and(|value| (0.0..=1.0).contains(&value))
}

fn empty_profile() -> Profile {
    let mut profile = Profile::new();
    profile.display_name = "Anonymous".to_string();
    profile
}

fn saturated_profile() -> Profile {
    let mut profile = Profile::new();
    profile.display_name = "Geoffrey Hinton".to_string();
    profile.affiliations.insert("The New York Times".to_string());
    profile.affiliations.insert("University of Toronto".to_string());
    profile.job_titles.insert("AI researcher".to_string());
    profile.biographies.insert(
        "Deep learning, neural networks, machine learning, LLM and generative AI pioneer"
            .to_string(),
    );
    profile.specializations.insert("artificial intelligence".to_string());
    profile.specializations.insert("machine learning".to_string());
    profile.specializations.insert("deep learning".to_string());
    profile.metrics.article_count = u64::MAX;
    profile.metrics.social_followers = u64::MAX;
    profile.metrics.professional_connections = u64::MAX;
    profile.metrics.citation_count = u64::MAX;
    profile.metrics.h_index = u64::MAX;
    profile.metrics.publication_count = u64::MAX;
    profile.metrics.is_verified = true;
    profile
}

#[test]
fn scores_stay_in_unit_range_for_every_named_configuration() {
    for name in ["default", "journalist", "academic"] {
        let scorer = ProfileScorer::new(ScoringConfig::named(name).unwrap()).unwrap();
        for profile in [empty_profile(), saturated_profile()] {
            let scores = scorer.evaluate(&profile);
            assert!(in_unit_range(scores.reputation), "{name}: {scores:?}");
            assert!(in_unit_range(scores.ai_relevance), "{name}: {scores:?}");
        }
    }
}

#[test]
fn scoring_is_deterministic() {
    let scorer = ProfileScorer::new(ScoringConfig::default()).unwrap();
    let profile = saturated_profile();
    assert_eq!(scorer.evaluate(&profile), scorer.evaluate(&profile));
}

#[test]
fn richer_evidence_never_scores_lower() {
    let scorer = ProfileScorer::new(ScoringConfig::default()).unwrap();
    let low = scorer.evaluate(&empty_profile());
    let high = scorer.evaluate(&saturated_profile());

    assert!(high.reputation.value().unwrap() >= low.reputation.value().unwrap());
    assert!(high.ai_relevance.value().unwrap() > low.ai_relevance.value().unwrap());
}

#[test]
fn configuration_loads_from_json() {
    let config: ScoringConfig = serde_json::from_str(
        r#"{
            "name": "newsroom",
            "reputation": {
                "article_count": 0.4,
                "social_followers": 0.4,
                "publication_quality": 0.1,
                "expertise_relevance": 0.1
            },
            "verified_bonus": 0.0
        }"#,
    )
    .unwrap();

    assert_eq!(config.name, "newsroom");
    assert_eq!(config.relevance, ScoringConfig::default().relevance);
    assert!(ProfileScorer::new(config).is_ok());
}

#[test]
fn invalid_configurations_are_rejected() {
    let config: ScoringConfig = serde_json::from_str(
        r#"{
            "reputation": {
                "article_count": 0.5,
                "social_followers": 0.5,
                "publication_quality": 0.5,
                "expertise_relevance": 0.5
            }
        }"#,
    )
    .unwrap();
    assert!(matches!(
        ProfileScorer::new(config),
        Err(ConfigError::WeightSum { .. })
    ));

    let mut config = ScoringConfig::default();
    config.relevance.coverage_patterns.push("(unclosed".to_string());
    assert!(matches!(
        ProfileScorer::new(config),
        Err(ConfigError::InvalidPattern { .. })
    ));

    assert!(matches!(
        ScoringConfig::named("tabloid"),
        Err(ConfigError::UnknownConfiguration(_))
    ));
}
