//! In-process source registry and concurrent collection.

use super::{RecordSource, SourceError};
use crate::model::record::NormalizedRecord;
use crate::normalize::normalize_record;
use log::{info, warn};
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Instant;

/// Source registration errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRegistryError {
    InvalidSourceId(String),
    DuplicateSourceId(String),
    SourceNotFound(String),
}

impl Display for SourceRegistryError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSourceId(value) => write!(f, "source id is invalid: {value}"),
            Self::DuplicateSourceId(value) => write!(f, "source id already registered: {value}"),
            Self::SourceNotFound(value) => write!(f, "source not found: {value}"),
        }
    }
}

impl Error for SourceRegistryError {}

/// Normalized output of one source run.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceOutput {
    pub source_id: String,
    pub records: Vec<NormalizedRecord>,
    /// Records dropped as malformed.
    pub rejected: usize,
    /// Set when the source failed; `records` is then empty.
    pub failure: Option<SourceError>,
}

impl SourceOutput {
    fn failed(source_id: &str, failure: SourceError) -> Self {
        Self {
            source_id: source_id.to_string(),
            records: Vec::new(),
            rejected: 0,
            failure: Some(failure),
        }
    }
}

/// Registered record sources, keyed by id.
#[derive(Default)]
pub struct SourceRegistry {
    sources: BTreeMap<String, Arc<dyn RecordSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one source under its trimmed id.
    pub fn register(&mut self, source: Arc<dyn RecordSource>) -> Result<(), SourceRegistryError> {
        let source_id = source.source_id().trim().to_string();
        if !is_valid_source_id(&source_id) {
            return Err(SourceRegistryError::InvalidSourceId(source_id));
        }
        if self.sources.contains_key(source_id.as_str()) {
            return Err(SourceRegistryError::DuplicateSourceId(source_id));
        }

        self.sources.insert(source_id, source);
        Ok(())
    }

    pub fn unregister(&mut self, source_id: &str) -> Result<(), SourceRegistryError> {
        let normalized = source_id.trim();
        self.sources
            .remove(normalized)
            .map(|_| ())
            .ok_or_else(|| SourceRegistryError::SourceNotFound(normalized.to_string()))
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Sorted source ids.
    pub fn source_ids(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    pub fn get(&self, source_id: &str) -> Option<Arc<dyn RecordSource>> {
        self.sources.get(source_id.trim()).cloned()
    }

    /// Produces and normalizes every source on its own scoped thread.
    ///
    /// Output order follows source id order. A source that errors or panics
    /// contributes zero records and reports its failure.
    pub fn collect(&self) -> Vec<SourceOutput> {
        std::thread::scope(|scope| {
            let handles = self
                .sources
                .iter()
                .map(|(source_id, source)| {
                    let handle = scope.spawn(move || run_source(source_id, source.as_ref()));
                    (source_id, handle)
                })
                .collect::<Vec<_>>();

            handles
                .into_iter()
                .map(|(source_id, handle)| {
                    handle.join().unwrap_or_else(|_| {
                        warn!(
                            "event=source_collect module=source status=error source_id={source_id} error_code=source_panicked"
                        );
                        SourceOutput::failed(
                            source_id,
                            SourceError::new(
                                source_id.as_str(),
                                "source_panicked",
                                "source panicked while producing records",
                                false,
                            ),
                        )
                    })
                })
                .collect()
        })
    }

    /// Produces and normalizes one registered source on the calling thread.
    pub fn collect_one(&self, source_id: &str) -> Result<SourceOutput, SourceRegistryError> {
        let normalized = source_id.trim();
        let source = self
            .sources
            .get(normalized)
            .ok_or_else(|| SourceRegistryError::SourceNotFound(normalized.to_string()))?;
        Ok(run_source(normalized, source.as_ref()))
    }
}

fn run_source(source_id: &str, source: &dyn RecordSource) -> SourceOutput {
    let started_at = Instant::now();
    let raw_records = match source.produce() {
        Ok(records) => records,
        Err(err) => {
            warn!(
                "event=source_collect module=source status=error source_id={source_id} duration_ms={} error_code={} transient={}",
                started_at.elapsed().as_millis(),
                err.code,
                err.transient
            );
            return SourceOutput::failed(source_id, err);
        }
    };

    let produced = raw_records.len();
    let mut records = Vec::with_capacity(produced);
    let mut rejected = 0;
    for mut raw in raw_records {
        raw.source_id = source_id.to_string();
        match normalize_record(raw) {
            Ok(record) => records.push(record),
            Err(_) => rejected += 1,
        }
    }

    info!(
        "event=source_collect module=source status=ok source_id={source_id} produced={produced} rejected={rejected} duration_ms={}",
        started_at.elapsed().as_millis()
    );
    SourceOutput {
        source_id: source_id.to_string(),
        records,
        rejected,
        failure: None,
    }
}

fn is_valid_source_id(value: &str) -> bool {
    if value.is_empty() {
        return false;
    }
    value
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
}
