//! Raw record normalization.
//!
//! # Responsibility
//! - Canonicalize names, emails, handles, country hints and tags from any
//!   source into one `NormalizedRecord` shape.
//! - Be the single place that tolerates absent or malformed optional fields.
//!
//! # Invariants
//! - Pure transform: no I/O, no logging of record content.
//! - Only an empty source id or an empty name token set fails a record.
//! - Invalid emails and handles are dropped, never fatal.
//! - Unknown country hints are kept as free text.

use crate::model::country::resolve_country;
use crate::model::record::{CountryHint, NormalizedRecord, RawRecord};
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use std::error::Error;
use std::fmt::{Display, Formatter};
use uuid::Uuid;

static EMAIL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9._%+\-]+@[a-z0-9\-]+(\.[a-z0-9\-]+)*\.[a-z]{2,}$")
        .expect("valid email regex")
});
static HANDLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-z0-9_.\-]{1,64}$").expect("valid handle regex"));

const HONORIFICS: &[&str] = &["dr", "prof", "professor", "mr", "mrs", "ms", "mme", "pr"];
/// Profile URL prefix and the platform its handles live on.
const PROFILE_URL_PREFIXES: &[(&str, &str)] = &[
    ("twitter.com/", "twitter"),
    ("x.com/", "twitter"),
    ("linkedin.com/in/", "linkedin"),
    ("github.com/", "github"),
    ("mastodon.social/", "mastodon"),
];
/// Platform assumed for bare `@name` handles.
const DEFAULT_HANDLE_PLATFORM: &str = "twitter";

/// Fixed namespace for content fingerprints of records without a source id.
const RECORD_KEY_NAMESPACE: Uuid = Uuid::from_u128(0x6f1c_2a8e_41d3_4b7a_9e55_0c3d_7b21_f0a4);

/// Why a record could not be normalized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MalformedReason {
    EmptySourceId,
    EmptyName,
}

impl MalformedReason {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::EmptySourceId => "empty_source_id",
            Self::EmptyName => "empty_name",
        }
    }
}

/// Normalization failure; the record is dropped and counted as rejected.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MalformedRecord {
    pub source_id: String,
    pub reason: MalformedReason,
}

impl Display for MalformedRecord {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "malformed record from source `{}`: {}",
            self.source_id,
            self.reason.as_str()
        )
    }
}

impl Error for MalformedRecord {}

/// Normalizes one raw record.
///
/// # Errors
/// - `MalformedRecord` when the source id is blank or the name has no
///   usable token after trimming and honorific removal.
pub fn normalize_record(raw: RawRecord) -> Result<NormalizedRecord, MalformedRecord> {
    let source_id = raw.source_id.trim().to_string();
    if source_id.is_empty() {
        return Err(MalformedRecord {
            source_id,
            reason: MalformedReason::EmptySourceId,
        });
    }

    let original_name = collapse_whitespace(&raw.name);
    let ordered_tokens = name_tokens(&original_name);
    if ordered_tokens.is_empty() {
        return Err(MalformedRecord {
            source_id,
            reason: MalformedReason::EmptyName,
        });
    }
    let normalized_name = ordered_tokens.join(" ");
    let name_tokens = ordered_tokens.into_iter().collect::<BTreeSet<_>>();

    let email = raw.email.as_deref().and_then(normalize_email);
    let handles = raw
        .handles
        .iter()
        .filter_map(|handle| normalize_handle(handle))
        .collect::<BTreeSet<_>>();
    let specializations = raw
        .specializations
        .iter()
        .filter_map(|tag| normalize_tag(tag))
        .collect::<BTreeSet<_>>();
    let country = raw.country_hint.as_deref().and_then(normalize_country_hint);

    let affiliation = clean_text(raw.affiliation.as_deref());
    let job_title = clean_text(raw.job_title.as_deref());
    let bio = clean_text(raw.bio.as_deref());
    let url = clean_text(raw.url.as_deref());

    let record_key = match clean_text(raw.source_record_id.as_deref()) {
        Some(id) => id,
        None => {
            let metrics = &raw.metrics;
            let country_text = match &country {
                Some(CountryHint::Iso(code)) => code.as_str().to_string(),
                Some(CountryHint::FreeText(text)) => text.clone(),
                None => String::new(),
            };
            fingerprint(&[
                source_id.as_str(),
                normalized_name.as_str(),
                email.as_deref().unwrap_or_default(),
                &join_set(&handles),
                affiliation.as_deref().unwrap_or_default(),
                job_title.as_deref().unwrap_or_default(),
                bio.as_deref().unwrap_or_default(),
                url.as_deref().unwrap_or_default(),
                &country_text,
                &join_set(&specializations),
                &format!(
                    "{}/{}/{}/{}/{}/{}/{}",
                    metrics.article_count,
                    metrics.social_followers,
                    metrics.professional_connections,
                    metrics.citation_count,
                    metrics.h_index,
                    metrics.publication_count,
                    metrics.is_verified
                ),
                &raw.observed_at_ms.to_string(),
            ])
        }
    };

    Ok(NormalizedRecord {
        source_id,
        record_key,
        original_name,
        normalized_name,
        name_tokens,
        email,
        handles,
        affiliation,
        job_title,
        bio,
        url,
        country,
        specializations,
        metrics: raw.metrics,
        observed_at_ms: raw.observed_at_ms,
    })
}

/// Splits a person name into lowercased tokens, dropping honorifics.
///
/// Apostrophes are folded into the token ("O'Neil" -> "oneil"); every other
/// non-alphanumeric character separates tokens ("Y." -> "y").
pub fn name_tokens(name: &str) -> Vec<String> {
    name.split(|c: char| !(c.is_alphanumeric() || c == '\'' || c == '\u{2019}'))
        .map(|token| {
            token
                .chars()
                .filter(|c| c.is_alphanumeric())
                .flat_map(char::to_lowercase)
                .collect::<String>()
        })
        .filter(|token| !token.is_empty() && !HONORIFICS.contains(&token.as_str()))
        .collect()
}

/// Lowercases and validates an email; `None` when it has no valid shape.
pub fn normalize_email(value: &str) -> Option<String> {
    let email = value.trim().to_lowercase();
    let email = email.strip_prefix("mailto:").unwrap_or(&email);
    EMAIL_RE.is_match(email).then(|| email.to_string())
}

/// Canonicalizes a social handle to `platform:name`.
///
/// Profile URLs name their platform (`x.com` counts as `twitter`); bare
/// `@name` handles fall back to `twitter`. Already qualified values pass
/// through, so the same account on two platforms never collapses.
pub fn normalize_handle(value: &str) -> Option<String> {
    let mut handle = value.trim().to_lowercase();
    for scheme in ["https://", "http://"] {
        if let Some(rest) = handle.strip_prefix(scheme) {
            handle = rest.to_string();
        }
    }
    if let Some(rest) = handle.strip_prefix("www.") {
        handle = rest.to_string();
    }

    let qualified = PROFILE_URL_PREFIXES
        .iter()
        .find_map(|(prefix, platform)| Some((*platform, handle.strip_prefix(*prefix)?)))
        .or_else(|| {
            let (name, rest) = handle.split_once(':')?;
            PROFILE_URL_PREFIXES
                .iter()
                .find(|(_, platform)| *platform == name)
                .map(|(_, platform)| (*platform, rest))
        });
    let (platform, name) = qualified.unwrap_or((DEFAULT_HANDLE_PLATFORM, handle.as_str()));

    let name = name.trim_end_matches('/').trim_start_matches('@');
    HANDLE_RE
        .is_match(name)
        .then(|| format!("{platform}:{name}"))
}

/// Lowercases and whitespace-collapses a specialization tag.
pub fn normalize_tag(value: &str) -> Option<String> {
    let tag = collapse_whitespace(&value.to_lowercase());
    (!tag.is_empty()).then_some(tag)
}

/// Lowercased alphanumeric tokens joined by spaces and padded with one
/// space on each side, so `contains(" phrase ")` matches whole tokens only.
pub fn padded_tokens(value: &str) -> String {
    let tokens = value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|token| !token.is_empty())
        .map(str::to_lowercase)
        .collect::<Vec<_>>();
    format!(" {} ", tokens.join(" "))
}

fn normalize_country_hint(value: &str) -> Option<CountryHint> {
    let hint = collapse_whitespace(value);
    if hint.is_empty() {
        return None;
    }
    Some(match resolve_country(&hint) {
        Some(code) => CountryHint::Iso(code),
        None => CountryHint::FreeText(hint),
    })
}

fn clean_text(value: Option<&str>) -> Option<String> {
    value
        .map(collapse_whitespace)
        .filter(|value| !value.is_empty())
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn join_set(values: &BTreeSet<String>) -> String {
    values.iter().map(String::as_str).collect::<Vec<_>>().join(",")
}

fn fingerprint(parts: &[&str]) -> String {
    let joined = parts.join("\u{1f}");
    Uuid::new_v5(&RECORD_KEY_NAMESPACE, joined.as_bytes()).to_string()
}
