//! SQLite-backed profile store.
//!
//! # Responsibility
//! - Persist profiles across the `profiles`, `profile_attributes` and
//!   `profile_provenance` tables.
//! - Answer blocking and filter lookups with indexed queries.
//!
//! # Invariants
//! - One upsert is one `IMMEDIATE` transaction; a failed upsert leaves the
//!   stored profile untouched.
//! - Set-valued fields are rewritten wholesale; provenance keeps its order
//!   through `seq`.
//! - Counters are stored as non-negative `INTEGER`s; values that do not fit
//!   are rejected as invalid data.

use super::{
    ensure_provenance_extends, profile_name_tokens, ProfileFilter, ProfileStore, StoreError,
    StoreResult,
};
use crate::db::migrations::ensure_latest;
use crate::model::country::CountryCode;
use crate::model::profile::{CountrySource, Profile, ProfileId, Score};
use crate::model::record::{EvidenceMetrics, NormalizedRecord, RecordRef};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row, Transaction, TransactionBehavior};
use std::collections::{BTreeSet, HashMap};
use uuid::Uuid;

const PROFILE_SELECT_SQL: &str = "SELECT
    id,
    display_name,
    reputation,
    reputation_clamped,
    ai_relevance,
    ai_relevance_clamped,
    country,
    country_source,
    article_count,
    social_followers,
    professional_connections,
    citation_count,
    h_index,
    publication_count,
    is_verified,
    created_at,
    updated_at
FROM profiles";

/// Attribute kinds persisted in `profile_attributes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum AttributeKind {
    Alias,
    NameToken,
    Source,
    Email,
    Handle,
    Affiliation,
    JobTitle,
    Bio,
    Url,
    Specialization,
    LocationHint,
}

impl AttributeKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Alias => "alias",
            Self::NameToken => "name_token",
            Self::Source => "source",
            Self::Email => "email",
            Self::Handle => "handle",
            Self::Affiliation => "affiliation",
            Self::JobTitle => "job_title",
            Self::Bio => "bio",
            Self::Url => "url",
            Self::Specialization => "specialization",
            Self::LocationHint => "location_hint",
        }
    }

    fn parse(value: &str) -> Option<Self> {
        match value {
            "alias" => Some(Self::Alias),
            "name_token" => Some(Self::NameToken),
            "source" => Some(Self::Source),
            "email" => Some(Self::Email),
            "handle" => Some(Self::Handle),
            "affiliation" => Some(Self::Affiliation),
            "job_title" => Some(Self::JobTitle),
            "bio" => Some(Self::Bio),
            "url" => Some(Self::Url),
            "specialization" => Some(Self::Specialization),
            "location_hint" => Some(Self::LocationHint),
            _ => None,
        }
    }
}

/// SQLite-backed profile store.
pub struct SqliteProfileStore<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteProfileStore<'conn> {
    /// Wraps a connection opened through `open_db`/`open_db_in_memory`.
    ///
    /// # Errors
    /// - `StoreError::Db(DbError::SchemaNotMigrated)` when the schema is not
    ///   at the latest version.
    pub fn try_new(conn: &'conn mut Connection) -> StoreResult<Self> {
        ensure_latest(conn)?;
        Ok(Self { conn })
    }

    /// Number of stored profiles.
    pub fn count(&self) -> StoreResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM profiles;", [], |row| row.get(0))?;
        from_db_count(count, "profiles.count")
    }

    fn load_profiles(&self, ids: impl IntoIterator<Item = String>) -> StoreResult<Vec<Profile>> {
        let mut profiles = Vec::new();
        for id in ids {
            if let Some(profile) = load_profile(self.conn, &id)? {
                profiles.push(profile);
            }
        }
        Ok(profiles)
    }
}

impl ProfileStore for SqliteProfileStore<'_> {
    fn get(&self, id: ProfileId) -> StoreResult<Option<Profile>> {
        load_profile(self.conn, &id.to_string())
    }

    fn find_candidates(&self, record: &NormalizedRecord) -> StoreResult<Vec<Profile>> {
        let mut keys: Vec<(AttributeKind, &str)> = Vec::new();
        keys.extend(record.email.iter().map(|email| (AttributeKind::Email, email.as_str())));
        keys.extend(record.handles.iter().map(|handle| (AttributeKind::Handle, handle.as_str())));
        keys.extend(
            record
                .name_tokens
                .iter()
                .map(|token| (AttributeKind::NameToken, token.as_str())),
        );

        let mut ids = BTreeSet::new();
        let mut stmt = self.conn.prepare_cached(
            "SELECT profile_id
             FROM profile_attributes
             WHERE kind = ?1 AND value = ?2;",
        )?;
        for (kind, value) in keys {
            let mut rows = stmt.query(params![kind.as_str(), value])?;
            while let Some(row) = rows.next()? {
                ids.insert(row.get::<_, String>(0)?);
            }
        }

        let mut stmt = self.conn.prepare_cached(
            "SELECT profile_id
             FROM profile_provenance
             WHERE source_id = ?1 AND record_key = ?2;",
        )?;
        let mut rows = stmt.query(params![record.source_id.as_str(), record.record_key.as_str()])?;
        while let Some(row) = rows.next()? {
            ids.insert(row.get::<_, String>(0)?);
        }

        let mut profiles = self.load_profiles(ids)?;
        profiles.sort_by_key(|profile| profile.id);
        Ok(profiles)
    }

    fn upsert(&mut self, profile: &Profile) -> StoreResult<()> {
        profile.validate()?;

        let id_text = profile.id.to_string();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        if let Some(stored) = load_profile(&tx, &id_text)? {
            ensure_provenance_extends(&stored, profile)?;
        }

        write_profile_row(&tx, profile, &id_text)?;

        tx.execute(
            "DELETE FROM profile_attributes WHERE profile_id = ?1;",
            [id_text.as_str()],
        )?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO profile_attributes (profile_id, kind, value) VALUES (?1, ?2, ?3);",
            )?;
            for (kind, value) in attribute_rows(profile) {
                insert.execute(params![id_text.as_str(), kind.as_str(), value])?;
            }
        }

        tx.execute(
            "DELETE FROM profile_provenance WHERE profile_id = ?1;",
            [id_text.as_str()],
        )?;
        {
            let mut insert = tx.prepare_cached(
                "INSERT INTO profile_provenance (
                    profile_id,
                    seq,
                    source_id,
                    record_key,
                    normalized_name,
                    original_name,
                    observed_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7);",
            )?;
            for (seq, entry) in profile.provenance.iter().enumerate() {
                insert.execute(params![
                    id_text.as_str(),
                    to_db_count(seq as u64, "profile_provenance.seq")?,
                    entry.source_id.as_str(),
                    entry.record_key.as_str(),
                    entry.normalized_name.as_str(),
                    entry.original_name.as_str(),
                    entry.observed_at_ms,
                ])?;
            }
        }

        tx.commit()?;
        Ok(())
    }

    fn query(&self, filter: &ProfileFilter) -> StoreResult<Vec<Profile>> {
        let mut sql = String::from("SELECT id FROM profiles WHERE 1 = 1");
        let mut bind_values: Vec<Value> = Vec::new();

        if !filter.countries.is_empty() {
            let placeholders = vec!["?"; filter.countries.len()].join(", ");
            sql.push_str(&format!(" AND country IN ({placeholders})"));
            bind_values.extend(
                filter
                    .countries
                    .iter()
                    .map(|country| Value::Text(country.as_str().to_string())),
            );
        }

        if !filter.specializations.is_empty() {
            let placeholders = vec!["?"; filter.specializations.len()].join(", ");
            sql.push_str(&format!(
                " AND EXISTS (
                    SELECT 1 FROM profile_attributes pa
                    WHERE pa.profile_id = profiles.id
                      AND pa.kind = 'specialization'
                      AND pa.value IN ({placeholders})
                )"
            ));
            bind_values.extend(filter.specializations.iter().cloned().map(Value::Text));
        }

        if let Some(min) = filter.min_reputation {
            sql.push_str(" AND reputation IS NOT NULL AND reputation >= ?");
            bind_values.push(Value::Real(min));
        }
        if let Some(min) = filter.min_ai_relevance {
            sql.push_str(" AND ai_relevance IS NOT NULL AND ai_relevance >= ?");
            bind_values.push(Value::Real(min));
        }

        sql.push_str(" ORDER BY id ASC;");

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut ids = Vec::new();
        while let Some(row) = rows.next()? {
            ids.push(row.get::<_, String>(0)?);
        }
        drop(rows);

        let profiles = self.load_profiles(ids)?;
        Ok(profiles
            .into_iter()
            .filter(|profile| filter.matches(profile))
            .collect())
    }
}

fn write_profile_row(tx: &Transaction<'_>, profile: &Profile, id_text: &str) -> StoreResult<()> {
    let (reputation, reputation_clamped) = score_to_db(profile.reputation);
    let (ai_relevance, ai_relevance_clamped) = score_to_db(profile.ai_relevance);
    let metrics = &profile.metrics;

    tx.execute(
        "INSERT INTO profiles (
            id,
            display_name,
            reputation,
            reputation_clamped,
            ai_relevance,
            ai_relevance_clamped,
            country,
            country_source,
            article_count,
            social_followers,
            professional_connections,
            citation_count,
            h_index,
            publication_count,
            is_verified,
            created_at,
            updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)
        ON CONFLICT(id) DO UPDATE SET
            display_name = excluded.display_name,
            reputation = excluded.reputation,
            reputation_clamped = excluded.reputation_clamped,
            ai_relevance = excluded.ai_relevance,
            ai_relevance_clamped = excluded.ai_relevance_clamped,
            country = excluded.country,
            country_source = excluded.country_source,
            article_count = excluded.article_count,
            social_followers = excluded.social_followers,
            professional_connections = excluded.professional_connections,
            citation_count = excluded.citation_count,
            h_index = excluded.h_index,
            publication_count = excluded.publication_count,
            is_verified = excluded.is_verified,
            created_at = excluded.created_at,
            updated_at = excluded.updated_at;",
        params![
            id_text,
            profile.display_name.as_str(),
            reputation,
            reputation_clamped,
            ai_relevance,
            ai_relevance_clamped,
            profile.country.map(|country| country.as_str().to_string()),
            profile.country_source.map(CountrySource::as_str),
            to_db_count(metrics.article_count, "profiles.article_count")?,
            to_db_count(metrics.social_followers, "profiles.social_followers")?,
            to_db_count(
                metrics.professional_connections,
                "profiles.professional_connections"
            )?,
            to_db_count(metrics.citation_count, "profiles.citation_count")?,
            to_db_count(metrics.h_index, "profiles.h_index")?,
            to_db_count(metrics.publication_count, "profiles.publication_count")?,
            bool_to_int(metrics.is_verified),
            profile.created_at_ms,
            profile.updated_at_ms,
        ],
    )?;
    Ok(())
}

fn attribute_rows(profile: &Profile) -> Vec<(AttributeKind, String)> {
    let sets = [
        (AttributeKind::Alias, &profile.aliases),
        (AttributeKind::Source, &profile.sources),
        (AttributeKind::Email, &profile.emails),
        (AttributeKind::Handle, &profile.handles),
        (AttributeKind::Affiliation, &profile.affiliations),
        (AttributeKind::JobTitle, &profile.job_titles),
        (AttributeKind::Bio, &profile.biographies),
        (AttributeKind::Url, &profile.urls),
        (AttributeKind::Specialization, &profile.specializations),
        (AttributeKind::LocationHint, &profile.location_hints),
    ];

    let mut rows = Vec::new();
    for (kind, values) in sets {
        rows.extend(values.iter().map(|value| (kind, value.clone())));
    }
    rows.extend(
        profile_name_tokens(profile)
            .into_iter()
            .map(|token| (AttributeKind::NameToken, token)),
    );
    rows
}

fn load_profile(conn: &Connection, id_text: &str) -> StoreResult<Option<Profile>> {
    let mut stmt = conn.prepare_cached(&format!("{PROFILE_SELECT_SQL} WHERE id = ?1;"))?;
    let mut rows = stmt.query([id_text])?;
    let Some(row) = rows.next()? else {
        return Ok(None);
    };
    let mut profile = parse_profile_row(row)?;
    drop(rows);

    load_attributes(conn, id_text, &mut profile)?;
    profile.provenance = load_provenance(conn, id_text)?;
    profile.validate()?;
    Ok(Some(profile))
}

fn load_attributes(conn: &Connection, id_text: &str, profile: &mut Profile) -> StoreResult<()> {
    let mut stmt = conn.prepare_cached(
        "SELECT kind, value
         FROM profile_attributes
         WHERE profile_id = ?1
         ORDER BY kind ASC, value ASC;",
    )?;
    let mut rows = stmt.query([id_text])?;
    let mut grouped: HashMap<AttributeKind, BTreeSet<String>> = HashMap::new();
    while let Some(row) = rows.next()? {
        let kind_text: String = row.get("kind")?;
        let kind = AttributeKind::parse(&kind_text).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid attribute kind `{kind_text}` in profile_attributes.kind"
            ))
        })?;
        grouped.entry(kind).or_default().insert(row.get("value")?);
    }

    let mut take = |kind: AttributeKind| grouped.remove(&kind).unwrap_or_default();
    profile.aliases = take(AttributeKind::Alias);
    profile.sources = take(AttributeKind::Source);
    profile.emails = take(AttributeKind::Email);
    profile.handles = take(AttributeKind::Handle);
    profile.affiliations = take(AttributeKind::Affiliation);
    profile.job_titles = take(AttributeKind::JobTitle);
    profile.biographies = take(AttributeKind::Bio);
    profile.urls = take(AttributeKind::Url);
    profile.specializations = take(AttributeKind::Specialization);
    profile.location_hints = take(AttributeKind::LocationHint);
    Ok(())
}

fn load_provenance(conn: &Connection, id_text: &str) -> StoreResult<Vec<RecordRef>> {
    let mut stmt = conn.prepare_cached(
        "SELECT source_id, record_key, normalized_name, original_name, observed_at
         FROM profile_provenance
         WHERE profile_id = ?1
         ORDER BY seq ASC;",
    )?;
    let mut rows = stmt.query([id_text])?;
    let mut provenance = Vec::new();
    while let Some(row) = rows.next()? {
        provenance.push(RecordRef {
            source_id: row.get("source_id")?,
            record_key: row.get("record_key")?,
            normalized_name: row.get("normalized_name")?,
            original_name: row.get("original_name")?,
            observed_at_ms: row.get("observed_at")?,
        });
    }
    Ok(provenance)
}

fn parse_profile_row(row: &Row<'_>) -> StoreResult<Profile> {
    let id_text: String = row.get("id")?;
    let id = Uuid::parse_str(&id_text).map_err(|_| {
        StoreError::InvalidData(format!("invalid uuid value `{id_text}` in profiles.id"))
    })?;

    let country = match row.get::<_, Option<String>>("country")? {
        Some(value) => Some(CountryCode::parse(&value).ok_or_else(|| {
            StoreError::InvalidData(format!("invalid country `{value}` in profiles.country"))
        })?),
        None => None,
    };
    let country_source = match row.get::<_, Option<String>>("country_source")? {
        Some(value) => Some(CountrySource::parse(&value).ok_or_else(|| {
            StoreError::InvalidData(format!(
                "invalid country source `{value}` in profiles.country_source"
            ))
        })?),
        None => None,
    };

    let mut profile = Profile::with_id(id);
    profile.display_name = row.get("display_name")?;
    profile.reputation = score_from_db(
        row.get("reputation")?,
        row.get("reputation_clamped")?,
        "profiles.reputation",
    )?;
    profile.ai_relevance = score_from_db(
        row.get("ai_relevance")?,
        row.get("ai_relevance_clamped")?,
        "profiles.ai_relevance",
    )?;
    profile.country = country;
    profile.country_source = country_source;
    profile.metrics = EvidenceMetrics {
        article_count: from_db_count(row.get("article_count")?, "profiles.article_count")?,
        social_followers: from_db_count(row.get("social_followers")?, "profiles.social_followers")?,
        professional_connections: from_db_count(
            row.get("professional_connections")?,
            "profiles.professional_connections",
        )?,
        citation_count: from_db_count(row.get("citation_count")?, "profiles.citation_count")?,
        h_index: from_db_count(row.get("h_index")?, "profiles.h_index")?,
        publication_count: from_db_count(
            row.get("publication_count")?,
            "profiles.publication_count",
        )?,
        is_verified: int_to_bool(row.get("is_verified")?, "profiles.is_verified")?,
    };
    profile.created_at_ms = row.get("created_at")?;
    profile.updated_at_ms = row.get("updated_at")?;
    Ok(profile)
}

fn score_to_db(score: Score) -> (Option<f64>, i64) {
    match score {
        Score::Unscored => (None, 0),
        Score::Scored { value, clamped } => (Some(value), bool_to_int(clamped)),
    }
}

fn score_from_db(value: Option<f64>, clamped: i64, column: &str) -> StoreResult<Score> {
    let clamped = int_to_bool(clamped, column)?;
    match value {
        Some(value) => Ok(Score::Scored { value, clamped }),
        None if !clamped => Ok(Score::Unscored),
        None => Err(StoreError::InvalidData(format!(
            "unscored value marked as clamped in {column}"
        ))),
    }
}

fn to_db_count(value: u64, column: &str) -> StoreResult<i64> {
    i64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("value {value} too large for {column}")))
}

fn from_db_count(value: i64, column: &str) -> StoreResult<u64> {
    u64::try_from(value)
        .map_err(|_| StoreError::InvalidData(format!("negative value {value} in {column}")))
}

fn int_to_bool(value: i64, column: &str) -> StoreResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(StoreError::InvalidData(format!(
            "invalid flag value `{other}` in {column}"
        ))),
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}
