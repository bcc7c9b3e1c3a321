//! Batch ingestion use-case.
//!
//! # Responsibility
//! - Drive raw records through normalize, resolve, merge, geolocate, score
//!   and persist.
//! - Expose search and statistics over the same store.
//!
//! # Invariants
//! - Records are committed one at a time; a later record in a batch sees
//!   profiles created by earlier ones.
//! - A store failure aborts the batch; records committed before it stay.
//! - Cancellation is honored between records, never inside one.
//! - Logs carry ids and counts only, never names, emails or text.

use crate::config::{ConfigError, ResolverConfig, ScoringConfig};
use crate::geo::apply_geolocation;
use crate::merge::merge_cluster;
use crate::model::profile::{Profile, ProfileId};
use crate::model::record::{NormalizedRecord, RawRecord};
use crate::normalize::normalize_record;
use crate::repo::{ProfileFilter, ProfileStore, StoreError};
use crate::resolve::{IdentityResolver, Resolution};
use crate::scoring::ProfileScorer;
use crate::search::{compute_statistics, search_profiles, CorpusStatistics, SearchQuery, SearchResult};
use crate::source::{SourceError, SourceRegistry};
use log::{debug, error, info};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

/// Counters of one batch run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub profiles_created: usize,
    pub profiles_updated: usize,
    /// Records already part of a profile's provenance.
    pub unchanged: usize,
    /// Malformed records dropped before resolution.
    pub rejected: usize,
    /// Near-threshold decisions resolved as new identities.
    pub ambiguous: usize,
    /// Whether the run stopped early on request.
    pub cancelled: bool,
}

/// The store became unavailable mid-batch.
#[derive(Debug)]
pub struct BatchError {
    /// Work committed before the failure.
    pub summary: BatchSummary,
    pub source: StoreError,
}

impl Display for BatchError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "batch aborted after {} created and {} updated profiles: {}",
            self.summary.profiles_created, self.summary.profiles_updated, self.source
        )
    }
}

impl Error for BatchError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&self.source)
    }
}

/// Result of ingesting all registered sources.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceRunReport {
    pub summary: BatchSummary,
    /// Sources that produced zero records because they failed.
    pub failed_sources: Vec<SourceError>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RecordOutcome {
    Created(ProfileId),
    Updated(ProfileId),
    Unchanged(ProfileId),
}

/// Ingestion pipeline bound to one profile store.
pub struct IngestService<S: ProfileStore> {
    store: S,
    resolver_config: ResolverConfig,
    scorer: ProfileScorer,
}

impl<S: ProfileStore> IngestService<S> {
    /// # Errors
    /// - `ConfigError` when either configuration is invalid.
    pub fn new(
        store: S,
        resolver_config: ResolverConfig,
        scoring_config: ScoringConfig,
    ) -> Result<Self, ConfigError> {
        resolver_config.validate()?;
        let scorer = ProfileScorer::new(scoring_config)?;
        Ok(Self {
            store,
            resolver_config,
            scorer,
        })
    }

    /// Service with default resolver and scoring configuration.
    pub fn with_defaults(store: S) -> Result<Self, ConfigError> {
        Self::new(store, ResolverConfig::default(), ScoringConfig::default())
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn into_store(self) -> S {
        self.store
    }

    /// Ingests raw records in order.
    ///
    /// # Errors
    /// - `BatchError` when the store fails; its summary counts what was
    ///   committed before the failure.
    pub fn run_batch(&mut self, records: Vec<RawRecord>) -> Result<BatchSummary, BatchError> {
        self.run_batch_with_cancel(records, &AtomicBool::new(false))
    }

    /// Like [`Self::run_batch`], stopping before the next record once
    /// `cancel` is set.
    pub fn run_batch_with_cancel(
        &mut self,
        records: Vec<RawRecord>,
        cancel: &AtomicBool,
    ) -> Result<BatchSummary, BatchError> {
        let started_at = Instant::now();
        let total = records.len();
        info!("event=batch_run module=service status=start records={total}");

        let mut summary = BatchSummary::default();
        let normalized = records.into_iter().filter_map(|raw| match normalize_record(raw) {
            Ok(record) => Some(record),
            Err(err) => {
                debug!(
                    "event=record_rejected module=service reason={}",
                    err.reason.as_str()
                );
                summary.rejected += 1;
                None
            }
        });
        let result = ingest_all(
            &mut self.store,
            &self.resolver_config,
            &self.scorer,
            normalized,
            cancel,
        );

        finish_batch(summary, result, started_at)
    }

    /// Collects every registered source concurrently, then ingests the
    /// normalized records in source id order on this thread.
    pub fn run_sources(
        &mut self,
        registry: &SourceRegistry,
        cancel: Option<&AtomicBool>,
    ) -> Result<SourceRunReport, BatchError> {
        let started_at = Instant::now();
        let outputs = registry.collect();
        info!(
            "event=batch_run module=service status=start sources={} records={}",
            outputs.len(),
            outputs.iter().map(|output| output.records.len()).sum::<usize>()
        );

        let mut summary = BatchSummary::default();
        let mut failed_sources = Vec::new();
        let mut records = Vec::new();
        for output in outputs {
            summary.rejected += output.rejected;
            if let Some(failure) = output.failure {
                failed_sources.push(failure);
            }
            records.extend(output.records);
        }

        let never = AtomicBool::new(false);
        let result = ingest_all(
            &mut self.store,
            &self.resolver_config,
            &self.scorer,
            records,
            cancel.unwrap_or(&never),
        );

        let summary = finish_batch(summary, result, started_at)?;
        Ok(SourceRunReport {
            summary,
            failed_sources,
        })
    }

    /// Ranked profiles matching the query.
    pub fn search(&self, query: &SearchQuery) -> SearchResult<Vec<Profile>> {
        search_profiles(&self.store, query)
    }

    /// Statistics over every stored profile.
    pub fn statistics(&self, top_affiliations: usize) -> Result<CorpusStatistics, StoreError> {
        let profiles = self.store.query(&ProfileFilter::default())?;
        Ok(compute_statistics(&profiles, top_affiliations))
    }
}

/// Partial counters plus the store error that stopped the run, if any.
type IngestResult = (BatchSummary, Option<StoreError>);

fn ingest_all<S: ProfileStore>(
    store: &mut S,
    resolver_config: &ResolverConfig,
    scorer: &ProfileScorer,
    records: impl IntoIterator<Item = NormalizedRecord>,
    cancel: &AtomicBool,
) -> IngestResult {
    let resolver = IdentityResolver::new(resolver_config);
    let mut summary = BatchSummary::default();

    for record in records {
        if cancel.load(Ordering::SeqCst) {
            summary.cancelled = true;
            break;
        }
        match ingest_record(store, &resolver, scorer, record, &mut summary) {
            Ok(RecordOutcome::Created(_)) => summary.profiles_created += 1,
            Ok(RecordOutcome::Updated(_)) => summary.profiles_updated += 1,
            Ok(RecordOutcome::Unchanged(_)) => summary.unchanged += 1,
            Err(err) => return (summary, Some(err)),
        }
    }

    (summary, None)
}

fn ingest_record<S: ProfileStore>(
    store: &mut S,
    resolver: &IdentityResolver<'_>,
    scorer: &ProfileScorer,
    record: NormalizedRecord,
    summary: &mut BatchSummary,
) -> Result<RecordOutcome, StoreError> {
    let candidates = store.find_candidates(&record)?;
    let (cluster, resolution) = resolver.cluster(record, &candidates);

    match &resolution {
        Resolution::Existing { profile_id, signal } => {
            debug!(
                "event=resolve module=resolve status=merged profile_id={profile_id} signal={}",
                signal.as_str()
            );
        }
        Resolution::NewIdentity {
            ambiguity: Some(ambiguity),
        } => {
            summary.ambiguous += 1;
            info!(
                "event=ambiguous_merge module=resolve status=new_identity candidates={} best_score={:.3}",
                ambiguity.candidates.len(),
                ambiguity.best_score
            );
        }
        Resolution::NewIdentity { ambiguity: None } => {}
    }

    let existing = cluster
        .target
        .and_then(|id| candidates.into_iter().find(|profile| profile.id == id));
    let is_new = existing.is_none();

    let outcome = merge_cluster(existing, &cluster.records);
    let mut profile = outcome.profile;
    if !outcome.changed {
        return Ok(RecordOutcome::Unchanged(profile.id));
    }

    apply_geolocation(&mut profile);
    scorer.apply(&mut profile);
    store.upsert(&profile)?;

    Ok(if is_new {
        RecordOutcome::Created(profile.id)
    } else {
        RecordOutcome::Updated(profile.id)
    })
}

fn finish_batch(
    mut summary: BatchSummary,
    (ingested, failure): IngestResult,
    started_at: Instant,
) -> Result<BatchSummary, BatchError> {
    summary.profiles_created = ingested.profiles_created;
    summary.profiles_updated = ingested.profiles_updated;
    summary.unchanged = ingested.unchanged;
    summary.ambiguous = ingested.ambiguous;
    summary.cancelled = ingested.cancelled;

    match failure {
        None => {
            info!(
                "event=batch_run module=service status=ok created={} updated={} unchanged={} rejected={} ambiguous={} cancelled={} duration_ms={}",
                summary.profiles_created,
                summary.profiles_updated,
                summary.unchanged,
                summary.rejected,
                summary.ambiguous,
                summary.cancelled,
                started_at.elapsed().as_millis()
            );
            Ok(summary)
        }
        Some(source) => {
            error!(
                "event=batch_run module=service status=error created={} updated={} duration_ms={} error_code=store_unavailable error={source}",
                summary.profiles_created,
                summary.profiles_updated,
                started_at.elapsed().as_millis()
            );
            Err(BatchError { summary, source })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::IngestService;
    use crate::config::{ConfigError, ResolverConfig, ScoringConfig};
    use crate::model::country::CountryCode;
    use crate::model::record::RawRecord;
    use crate::repo::InMemoryProfileStore;
    use crate::source::{RecordSource, SourceError, SourceRegistry, StaticSource};
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn service() -> IngestService<InMemoryProfileStore> {
        IngestService::with_defaults(InMemoryProfileStore::new()).expect("default config")
    }

    fn bengio(source_id: &str, name: &str, observed_at_ms: i64) -> RawRecord {
        let mut record = RawRecord::new(source_id, name, observed_at_ms);
        record.email = Some("Yoshua.Bengio@UMontreal.ca".to_string());
        record
    }

    struct DownSource;

    impl RecordSource for DownSource {
        fn source_id(&self) -> &str {
            "linkedin"
        }

        fn produce(&self) -> Result<Vec<RawRecord>, SourceError> {
            Err(SourceError::new("linkedin", "unauthorized", "token expired", false))
        }
    }

    #[test]
    fn records_sharing_email_merge_into_one_scored_profile() {
        let mut service = service();
        let summary = service
            .run_batch(vec![
                bengio("scholar", "Yoshua Bengio", 10),
                bengio("newsapi", "Y. Bengio", 20),
            ])
            .expect("batch");

        assert_eq!(summary.profiles_created, 1);
        assert_eq!(summary.profiles_updated, 1);
        assert_eq!(summary.rejected, 0);

        let profiles = service.store().profiles().collect::<Vec<_>>();
        assert_eq!(profiles.len(), 1);
        let profile = profiles[0];
        assert_eq!(profile.provenance.len(), 2);
        assert!(profile.sources.contains("scholar"));
        assert!(profile.sources.contains("newsapi"));
        assert_eq!(profile.country, CountryCode::parse("CA"));
        assert!(profile.reputation.value().is_some());
        assert!(profile.ai_relevance.value().is_some());
        assert_eq!(profile.created_at_ms, 10);
        assert_eq!(profile.updated_at_ms, 20);
    }

    #[test]
    fn rerunning_a_batch_changes_nothing() {
        let mut service = service();
        let records = vec![
            bengio("scholar", "Yoshua Bengio", 10),
            RawRecord::new("newsapi", "Karen Hao", 11),
        ];
        service.run_batch(records.clone()).expect("first run");
        let before = service.store().profiles().cloned().collect::<Vec<_>>();

        let summary = service.run_batch(records).expect("second run");
        assert_eq!(summary.profiles_created, 0);
        assert_eq!(summary.profiles_updated, 0);
        assert_eq!(summary.unchanged, 2);
        assert_eq!(service.store().profiles().cloned().collect::<Vec<_>>(), before);
    }

    #[test]
    fn malformed_records_are_counted_and_skipped() {
        let mut service = service();
        let summary = service
            .run_batch(vec![
                RawRecord::new("newsapi", "   ", 1),
                RawRecord::new("", "Karen Hao", 1),
                RawRecord::new("newsapi", "Karen Hao", 1),
            ])
            .expect("batch");

        assert_eq!(summary.rejected, 2);
        assert_eq!(summary.profiles_created, 1);
        assert_eq!(service.store().len(), 1);
    }

    #[test]
    fn cancelled_batch_stops_before_next_record() {
        let mut service = service();
        let cancel = AtomicBool::new(true);
        let summary = service
            .run_batch_with_cancel(vec![RawRecord::new("newsapi", "Karen Hao", 1)], &cancel)
            .expect("batch");

        assert!(summary.cancelled);
        assert_eq!(summary.profiles_created, 0);
        assert!(service.store().is_empty());
    }

    #[test]
    fn run_sources_reports_failures_and_ingests_the_rest() {
        let mut registry = SourceRegistry::new();
        registry.register(Arc::new(DownSource)).expect("register");
        registry
            .register(Arc::new(StaticSource::new(
                "newsapi",
                vec![
                    RawRecord::new("newsapi", "Karen Hao", 1),
                    RawRecord::new("newsapi", "", 2),
                ],
            )))
            .expect("register");

        let mut service = service();
        let report = service.run_sources(&registry, None).expect("run");

        assert_eq!(report.summary.profiles_created, 1);
        assert_eq!(report.summary.rejected, 1);
        assert_eq!(report.failed_sources.len(), 1);
        assert_eq!(report.failed_sources[0].code, "unauthorized");
    }

    #[test]
    fn invalid_configuration_is_rejected() {
        let resolver = ResolverConfig {
            merge_threshold: 1.5,
            ..ResolverConfig::default()
        };
        let result = IngestService::new(
            InMemoryProfileStore::new(),
            resolver,
            ScoringConfig::default(),
        );
        assert!(matches!(
            result.err(),
            Some(ConfigError::InvalidParameter { .. })
        ));
    }
}
