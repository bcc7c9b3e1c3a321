//! Entity resolution and scoring engine for journalist and researcher
//! profiles.
//!
//! Raw records from heterogeneous sources are normalized, resolved into
//! canonical profiles, geolocated, scored and stored for ranked queries.
//! This crate is the single source of truth for those invariants.

pub mod config;
pub mod db;
pub mod geo;
pub mod logging;
pub mod merge;
pub mod model;
pub mod normalize;
pub mod repo;
pub mod resolve;
pub mod scoring;
pub mod search;
pub mod service;
pub mod source;

pub use config::{ConfigError, QualityPreset, ResolverConfig, ScoringConfig};
pub use db::{open_db, open_db_in_memory, DbError, DbResult};
pub use logging::{default_log_level, init_logging, logging_status, LoggingError};
pub use model::country::CountryCode;
pub use model::profile::{CountrySource, Profile, ProfileId, Score};
pub use model::record::{EvidenceMetrics, NormalizedRecord, RawRecord, RecordRef};
pub use normalize::{normalize_record, MalformedRecord};
pub use repo::{
    InMemoryProfileStore, ProfileFilter, ProfileStore, SqliteProfileStore, StoreError,
    StoreResult,
};
pub use resolve::{IdentityResolver, Resolution};
pub use search::{CorpusStatistics, SearchError, SearchQuery, SearchResult};
pub use service::{BatchError, BatchSummary, IngestService, SourceRunReport};
pub use source::{RecordSource, SourceError, SourceRegistry, StaticSource};

/// Returns the engine crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
