//! Record source contract.
//!
//! # Responsibility
//! - Define the interface collaborators implement to hand raw records to the
//!   core (scrapers, API clients, fixture files).
//! - Keep network and parsing concerns outside the core.
//!
//! # Invariants
//! - A failing source yields zero records; it never aborts other sources.
//! - Records are attributed to the id the source was registered under.

use crate::model::record::RawRecord;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod registry;

pub use registry::{SourceOutput, SourceRegistry, SourceRegistryError};

/// Failure reported by a record source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceError {
    pub source_id: String,
    /// Stable machine-readable code, e.g. `rate_limited`.
    pub code: String,
    pub message: String,
    /// Whether retrying later may succeed.
    pub transient: bool,
}

impl SourceError {
    pub fn new(
        source_id: impl Into<String>,
        code: impl Into<String>,
        message: impl Into<String>,
        transient: bool,
    ) -> Self {
        Self {
            source_id: source_id.into(),
            code: code.into(),
            message: message.into(),
            transient,
        }
    }
}

impl Display for SourceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "source `{}` failed with {}: {}",
            self.source_id, self.code, self.message
        )
    }
}

impl Error for SourceError {}

/// Producer of raw records.
///
/// Implementations own their I/O; `produce` is called once per run, possibly
/// on a worker thread.
pub trait RecordSource: Send + Sync {
    /// Stable lowercase id (`[a-z0-9_-]+`).
    fn source_id(&self) -> &str;

    fn produce(&self) -> Result<Vec<RawRecord>, SourceError>;
}

/// Source serving a fixed list of records.
#[derive(Debug, Clone)]
pub struct StaticSource {
    source_id: String,
    records: Vec<RawRecord>,
}

impl StaticSource {
    pub fn new(source_id: impl Into<String>, records: Vec<RawRecord>) -> Self {
        Self {
            source_id: source_id.into(),
            records,
        }
    }
}

impl RecordSource for StaticSource {
    fn source_id(&self) -> &str {
        &self.source_id
    }

    fn produce(&self) -> Result<Vec<RawRecord>, SourceError> {
        Ok(self.records.clone())
    }
}
