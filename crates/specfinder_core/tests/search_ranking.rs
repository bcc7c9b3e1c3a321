use specfinder_core::db::open_db_in_memory;
use specfinder_core::merge::merge_cluster;
use specfinder_core::model::profile::{Profile, Score};
use specfinder_core::model::record::RawRecord;
use specfinder_core::normalize::normalize_record;
use specfinder_core::repo::{InMemoryProfileStore, ProfileStore, SqliteProfileStore};
use specfinder_core::search::{search_profiles, SearchError, SearchQuery};

fn stored_profile(name: &str, country: &str, reputation: Option<f64>) -> Profile {
    let raw = RawRecord {
        country_hint: Some(country.to_string()),
        specializations: vec!["AI".to_string()],
        ..RawRecord::new("newsapi", name, 1)
    };
    let mut profile = merge_cluster(None, &[normalize_record(raw).unwrap()]).profile;
    profile.reputation = reputation.map_or(Score::Unscored, Score::from_raw);
    profile.ai_relevance = Score::from_raw(0.3);
    profile
}

fn seed(store: &mut dyn ProfileStore) {
    let profiles = [
        stored_profile("Claire Dupont", "France", Some(0.5)),
        stored_profile("Luc Martin", "France", Some(0.9)),
        stored_profile("Anne Leroy", "fr", Some(0.6)),
        stored_profile("Paul Moreau", "français", Some(0.8)),
        stored_profile("Julie Petit", "FRA", Some(0.7)),
        stored_profile("Marc Roux", "France", Some(0.3)),
        stored_profile("Jan Becker", "Germany", Some(0.95)),
        stored_profile("Eve Blanc", "France", None),
    ];
    for profile in &profiles {
        store.upsert(profile).unwrap();
    }
}

fn names(profiles: &[Profile]) -> Vec<&str> {
    profiles
        .iter()
        .map(|profile| profile.display_name.as_str())
        .collect()
}

fn france_query() -> SearchQuery {
    SearchQuery::from_pairs([
        ("country", "France"),
        ("min_reputation", "0.5"),
        ("limit", "2"),
    ])
    .unwrap()
}

#[test]
fn france_query_returns_top_two_by_reputation() {
    let mut conn = open_db_in_memory().unwrap();
    let mut store = SqliteProfileStore::try_new(&mut conn).unwrap();
    seed(&mut store);

    let results = search_profiles(&store, &france_query()).unwrap();
    assert_eq!(names(&results), vec!["Luc Martin", "Paul Moreau"]);
}

#[test]
fn threshold_is_inclusive_and_unscored_never_passes() {
    let mut store = InMemoryProfileStore::new();
    seed(&mut store);

    let query = SearchQuery::from_pairs([("country", "FR"), ("min_reputation", "0.5")]).unwrap();
    let results = search_profiles(&store, &query).unwrap();
    assert_eq!(results.len(), 5);
    assert_eq!(results.last().unwrap().display_name, "Claire Dupont");
}

#[test]
fn unfiltered_query_puts_unscored_last() {
    let mut store = InMemoryProfileStore::new();
    seed(&mut store);

    let results = search_profiles(&store, &SearchQuery::new(100)).unwrap();
    assert_eq!(results.len(), 8);
    assert_eq!(results[0].display_name, "Jan Becker");
    assert_eq!(results[7].display_name, "Eve Blanc");
}

#[test]
fn both_stores_answer_identically_and_repeatably() {
    let mut conn = open_db_in_memory().unwrap();
    let mut sqlite = SqliteProfileStore::try_new(&mut conn).unwrap();
    let mut memory = InMemoryProfileStore::new();

    let mut twins = Vec::new();
    for name in ["Ines Garcia", "Hugo Lambert", "Lea Simon"] {
        twins.push(stored_profile(name, "France", Some(0.7)));
    }
    for profile in &twins {
        sqlite.upsert(profile).unwrap();
        memory.upsert(profile).unwrap();
    }

    let query = SearchQuery::new(10);
    let first = search_profiles(&sqlite, &query).unwrap();
    let second = search_profiles(&sqlite, &query).unwrap();
    let in_memory = search_profiles(&memory, &query).unwrap();

    let mut expected_ids = twins.iter().map(|profile| profile.id).collect::<Vec<_>>();
    expected_ids.sort();
    let ids = |profiles: &[Profile]| profiles.iter().map(|p| p.id).collect::<Vec<_>>();

    assert_eq!(ids(&first), expected_ids);
    assert_eq!(first, second);
    assert_eq!(first, in_memory);
}

#[test]
fn invalid_queries_are_rejected_without_results() {
    let mut store = InMemoryProfileStore::new();
    seed(&mut store);

    let mut query = SearchQuery::new(0);
    assert!(matches!(
        search_profiles(&store, &query),
        Err(SearchError::InvalidQuery { .. })
    ));

    query.limit = 3;
    query.filter.min_ai_relevance = Some(-0.1);
    assert!(matches!(
        search_profiles(&store, &query),
        Err(SearchError::InvalidQuery { .. })
    ));

    assert!(matches!(
        SearchQuery::from_pairs([("country", "Narnia")]),
        Err(SearchError::InvalidQuery { key, .. }) if key == "country"
    ));
}
