//! Domain model for person records and canonical profiles.
//!
//! # Responsibility
//! - Define the raw, normalized and canonical shapes that flow through the
//!   resolution pipeline.
//! - Keep a single profile-centric shape for search and export consumers.
//!
//! # Invariants
//! - Every canonical profile is identified by a stable `ProfileId`.
//! - Profiles are append-only in provenance and never deleted by the core.

pub mod country;
pub mod profile;
pub mod record;
