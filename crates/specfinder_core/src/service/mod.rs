//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate normalization, resolution, scoring and storage into
//!   batch-level APIs.
//! - Keep CLI and source adapters decoupled from storage details.

pub mod ingest_service;

pub use ingest_service::{BatchError, BatchSummary, IngestService, SourceRunReport};
