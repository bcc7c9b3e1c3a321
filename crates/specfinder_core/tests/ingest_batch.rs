use specfinder_core::db::open_db_in_memory;
use specfinder_core::model::country::CountryCode;
use specfinder_core::model::profile::{CountrySource, Profile, ProfileId};
use specfinder_core::model::record::{NormalizedRecord, RawRecord};
use specfinder_core::repo::{
    InMemoryProfileStore, ProfileFilter, ProfileStore, SqliteProfileStore, StoreError,
    StoreResult,
};
use specfinder_core::search::{SearchError, SearchQuery};
use specfinder_core::service::IngestService;

const BENGIO_EMAIL: &str = "yoshua.bengio@umontreal.ca";

/// Store that stops accepting writes after `writes_left` upserts.
struct FlakyStore {
    inner: InMemoryProfileStore,
    writes_left: usize,
    reads_fail: bool,
}

impl FlakyStore {
    fn new(writes_left: usize) -> Self {
        Self {
            inner: InMemoryProfileStore::new(),
            writes_left,
            reads_fail: false,
        }
    }
}

impl ProfileStore for FlakyStore {
    fn get(&self, id: ProfileId) -> StoreResult<Option<Profile>> {
        self.inner.get(id)
    }

    fn find_candidates(&self, record: &NormalizedRecord) -> StoreResult<Vec<Profile>> {
        self.inner.find_candidates(record)
    }

    fn upsert(&mut self, profile: &Profile) -> StoreResult<()> {
        if self.writes_left == 0 {
            return Err(StoreError::Unavailable("disk full".to_string()));
        }
        self.writes_left -= 1;
        self.inner.upsert(profile)
    }

    fn query(&self, filter: &ProfileFilter) -> StoreResult<Vec<Profile>> {
        if self.reads_fail {
            return Err(StoreError::Unavailable("connection reset".to_string()));
        }
        self.inner.query(filter)
    }
}

fn all_profiles<S: ProfileStore>(service: &IngestService<S>) -> Vec<Profile> {
    service.store().query(&ProfileFilter::default()).unwrap()
}

fn scholar_bengio() -> RawRecord {
    RawRecord {
        email: Some(BENGIO_EMAIL.to_string()),
        affiliation: Some("Université de Montréal".to_string()),
        ..RawRecord::new("google_scholar", "Yoshua Bengio", 100)
    }
}

fn news_bengio() -> RawRecord {
    RawRecord {
        affiliation: Some("Mila".to_string()),
        ..RawRecord::new("newsapi", "Y. Bengio", 200)
    }
}

#[test]
fn bengio_records_without_shared_identifier_stay_apart_until_email_links() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteProfileStore::try_new(&mut conn).unwrap();
    let mut service = IngestService::with_defaults(store).unwrap();

    let summary = service
        .run_batch(vec![scholar_bengio(), news_bengio()])
        .unwrap();
    assert_eq!(summary.profiles_created, 2);
    assert_eq!(all_profiles(&service).len(), 2);

    let linkedin = RawRecord {
        email: Some("Yoshua.Bengio@UMontreal.ca".to_string()),
        job_title: Some("Professor".to_string()),
        ..RawRecord::new("linkedin", "Yoshua Bengio", 300)
    };
    let summary = service.run_batch(vec![linkedin]).unwrap();
    assert_eq!(summary.profiles_created, 0);
    assert_eq!(summary.profiles_updated, 1);

    let profiles = all_profiles(&service);
    assert_eq!(profiles.len(), 2);
    let merged = profiles
        .iter()
        .find(|profile| profile.emails.contains(BENGIO_EMAIL))
        .unwrap();
    assert_eq!(merged.provenance.len(), 2);
    assert!(merged.sources.contains("google_scholar"));
    assert!(merged.sources.contains("linkedin"));
    assert_eq!(merged.updated_at_ms, 300);
}

#[test]
fn same_record_twice_yields_the_same_profile_as_once() {
    let mut once = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();
    once.run_batch(vec![scholar_bengio()]).unwrap();

    let mut twice = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();
    let summary = twice
        .run_batch(vec![scholar_bengio(), scholar_bengio()])
        .unwrap();
    assert_eq!(summary.profiles_created, 1);
    assert_eq!(summary.unchanged, 1);

    let left = all_profiles(&once).pop().unwrap();
    let mut right = all_profiles(&twice).pop().unwrap();
    right.id = left.id;
    assert_eq!(left, right);
}

#[test]
fn empty_name_is_rejected_and_the_rest_is_processed() {
    let mut service = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();

    let summary = service
        .run_batch(vec![
            scholar_bengio(),
            RawRecord::new("newsapi", " \t ", 1),
            RawRecord::new("newsapi", "Karen Hao", 2),
        ])
        .unwrap();

    assert_eq!(summary.rejected, 1);
    assert_eq!(summary.profiles_created, 2);
}

#[test]
fn contributing_sources_only_grow() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteProfileStore::try_new(&mut conn).unwrap();
    let mut service = IngestService::with_defaults(store).unwrap();

    let mut seen = Vec::new();
    for (source_id, at) in [("google_scholar", 1), ("linkedin", 2), ("newsapi", 3)] {
        let record = RawRecord {
            email: Some(BENGIO_EMAIL.to_string()),
            ..RawRecord::new(source_id, "Yoshua Bengio", at)
        };
        service.run_batch(vec![record]).unwrap();

        let profile = all_profiles(&service).pop().unwrap();
        assert!(seen.iter().all(|source: &String| profile.sources.contains(source)));
        seen = profile.sources.iter().cloned().collect();
    }
    assert_eq!(seen.len(), 3);
}

#[test]
fn explicit_country_is_never_overwritten() {
    let mut service = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();

    let french = RawRecord {
        email: Some("claire@lemonde.fr".to_string()),
        country_hint: Some("France".to_string()),
        ..RawRecord::new("newsapi", "Claire Dupont", 1)
    };
    let german = RawRecord {
        email: Some("claire@lemonde.fr".to_string()),
        country_hint: Some("Germany".to_string()),
        affiliation: Some("Max Planck Institute".to_string()),
        ..RawRecord::new("linkedin", "Claire Dupont", 2)
    };
    service.run_batch(vec![french, german]).unwrap();

    let profile = all_profiles(&service).pop().unwrap();
    assert_eq!(profile.country, CountryCode::parse("FR"));
    assert_eq!(profile.country_source, Some(CountrySource::Explicit));
}

#[test]
fn inferred_country_comes_from_email_domain() {
    let mut service = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();

    service.run_batch(vec![scholar_bengio()]).unwrap();

    let profile = all_profiles(&service).pop().unwrap();
    assert_eq!(profile.country, CountryCode::parse("CA"));
    assert_eq!(profile.country_source, Some(CountrySource::EmailDomain));
}

#[test]
fn hyphenated_place_name_does_not_infer_a_country() {
    let mut service = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();

    let record = RawRecord {
        country_hint: Some("Saint-Jean-de-Luz".to_string()),
        ..RawRecord::new("serper_fr", "Claire Dupont", 1)
    };
    service.run_batch(vec![record]).unwrap();

    let profile = all_profiles(&service).pop().unwrap();
    assert_ne!(profile.country, CountryCode::parse("DE"));
    assert_eq!(profile.country, None);
    assert!(profile.location_hints.contains("Saint-Jean-de-Luz"));
}

#[test]
fn handle_only_record_merges_into_existing_profile() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteProfileStore::try_new(&mut conn).unwrap();
    let mut service = IngestService::with_defaults(store).unwrap();

    let article = RawRecord {
        handles: vec!["@_KarenHao".to_string()],
        affiliation: Some("The Atlantic".to_string()),
        ..RawRecord::new("newsapi", "Karen Hao", 1)
    };
    service.run_batch(vec![article]).unwrap();

    let tweet = RawRecord {
        handles: vec!["https://x.com/_karenhao".to_string()],
        ..RawRecord::new("twitter", "KH", 2)
    };
    let summary = service.run_batch(vec![tweet]).unwrap();
    assert_eq!(summary.profiles_created, 0);
    assert_eq!(summary.profiles_updated, 1);

    let profiles = all_profiles(&service);
    assert_eq!(profiles.len(), 1);
    assert!(profiles[0].sources.contains("twitter"));
    assert!(profiles[0].handles.contains("twitter:_karenhao"));
}

#[test]
fn same_handle_on_different_platforms_stays_apart() {
    let mut conn = open_db_in_memory().unwrap();
    let store = SqliteProfileStore::try_new(&mut conn).unwrap();
    let mut service = IngestService::with_defaults(store).unwrap();

    let summary = service
        .run_batch(vec![
            RawRecord {
                handles: vec!["https://twitter.com/alex".to_string()],
                ..RawRecord::new("twitter", "Alex Martin", 1)
            },
            RawRecord {
                handles: vec!["https://github.com/alex".to_string()],
                ..RawRecord::new("github", "Alex Kowalski", 2)
            },
        ])
        .unwrap();

    assert_eq!(summary.profiles_created, 2);
    assert_eq!(summary.profiles_updated, 0);
    assert_eq!(all_profiles(&service).len(), 2);
}

#[test]
fn same_time_observations_differing_in_title_are_both_kept() {
    let mut service = IngestService::with_defaults(InMemoryProfileStore::new()).unwrap();

    let observation = |title: &str| RawRecord {
        email: Some(BENGIO_EMAIL.to_string()),
        job_title: Some(title.to_string()),
        ..RawRecord::new("linkedin", "Yoshua Bengio", 500)
    };
    let summary = service
        .run_batch(vec![observation("Professor"), observation("Scientific Director")])
        .unwrap();

    assert_eq!(summary.profiles_created, 1);
    assert_eq!(summary.profiles_updated, 1);
    assert_eq!(summary.unchanged, 0);

    let profile = all_profiles(&service).pop().unwrap();
    assert_eq!(profile.provenance.len(), 2);
    assert_eq!(profile.job_titles.len(), 2);
}

#[test]
fn store_failure_aborts_batch_and_keeps_committed_records() {
    let mut service = IngestService::with_defaults(FlakyStore::new(1)).unwrap();

    let err = service
        .run_batch(vec![
            scholar_bengio(),
            RawRecord::new("newsapi", "Karen Hao", 2),
            RawRecord::new("newsapi", "Kate Crawford", 3),
        ])
        .unwrap_err();

    assert_eq!(err.summary.profiles_created, 1);
    assert!(matches!(err.source, StoreError::Unavailable(_)));
    assert_eq!(service.store().inner.len(), 1);
}

#[test]
fn search_surfaces_unavailable_store() {
    let mut store = FlakyStore::new(0);
    store.reads_fail = true;
    let service = IngestService::with_defaults(store).unwrap();

    let err = service.search(&SearchQuery::new(5)).unwrap_err();
    assert!(matches!(
        err,
        SearchError::StoreUnavailable(StoreError::Unavailable(_))
    ));
    assert!(service.statistics(3).is_err());
}
