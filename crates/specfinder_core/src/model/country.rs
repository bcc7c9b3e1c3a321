//! ISO 3166-1 alpha-2 country codes and hint alias resolution.
//!
//! # Responsibility
//! - Represent a resolved country as a validated two-letter code.
//! - Map country names, adjectives and ISO codes from heterogeneous sources
//!   onto one code ("France", "FR", "fra", "français" -> `FR`).
//!
//! # Invariants
//! - A `CountryCode` always holds two uppercase ASCII letters.
//! - Alias lookup is case-insensitive and whitespace-tolerant.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt::{Display, Formatter};

/// Two-letter ISO 3166-1 country code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CountryCode([u8; 2]);

impl CountryCode {
    /// Parses a literal two-letter code, case-insensitive.
    ///
    /// This does not consult the alias table; use [`resolve_country`] for
    /// free-form hints.
    pub fn parse(value: &str) -> Option<Self> {
        let bytes = value.trim().as_bytes();
        match bytes {
            [a, b] if a.is_ascii_alphabetic() && b.is_ascii_alphabetic() => {
                Some(Self([a.to_ascii_uppercase(), b.to_ascii_uppercase()]))
            }
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        // Both bytes are ASCII letters by construction.
        std::str::from_utf8(&self.0).unwrap_or("??")
    }
}

impl Display for CountryCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for CountryCode {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or_else(|| format!("invalid country code `{value}`"))
    }
}

impl From<CountryCode> for String {
    fn from(value: CountryCode) -> Self {
        value.as_str().to_string()
    }
}

const COUNTRY_ALIASES: &[(&str, &[&str])] = &[
    (
        "FR",
        &["fr", "fra", "france", "french", "français", "francais", "française", "francaise"],
    ),
    (
        "US",
        &[
            "us",
            "usa",
            "u.s.",
            "u.s.a.",
            "united states",
            "united states of america",
            "america",
            "american",
            "états-unis",
            "etats-unis",
        ],
    ),
    (
        "GB",
        &[
            "gb",
            "gbr",
            "uk",
            "u.k.",
            "united kingdom",
            "great britain",
            "britain",
            "british",
            "england",
            "scotland",
            "wales",
            "royaume-uni",
        ],
    ),
    ("CA", &["ca", "can", "canada", "canadian", "canadien", "canadienne"]),
    (
        "DE",
        &["de", "deu", "germany", "german", "deutschland", "allemagne", "allemand"],
    ),
    ("JP", &["jp", "jpn", "japan", "japanese", "japon", "nippon"]),
    (
        "KR",
        &["kr", "kor", "south korea", "korea", "republic of korea", "corée du sud"],
    ),
    ("SG", &["sg", "sgp", "singapore", "singapour"]),
    ("AU", &["au", "aus", "australia", "australian", "australie"]),
    (
        "NL",
        &["nl", "nld", "netherlands", "the netherlands", "holland", "dutch", "pays-bas"],
    ),
    ("BE", &["be", "bel", "belgium", "belgique", "belgië", "belgian", "belge"]),
    (
        "CH",
        &["ch", "che", "switzerland", "suisse", "schweiz", "svizzera", "swiss"],
    ),
    ("ES", &["es", "esp", "spain", "españa", "espana", "espagne", "spanish"]),
    ("IT", &["it", "ita", "italy", "italia", "italie", "italian"]),
    ("IN", &["in", "ind", "india", "inde", "indian"]),
    ("CN", &["cn", "chn", "china", "chine", "chinese"]),
    ("IE", &["ie", "irl", "ireland", "irlande", "irish"]),
    ("SE", &["se", "swe", "sweden", "suède", "swedish"]),
    ("IL", &["il", "isr", "israel", "israël"]),
    ("BR", &["br", "bra", "brazil", "brasil", "brésil"]),
    ("PT", &["pt", "prt", "portugal"]),
    ("AT", &["at", "aut", "austria", "österreich", "autriche"]),
    ("DK", &["dk", "dnk", "denmark", "danemark"]),
    ("FI", &["fi", "fin", "finland", "finlande"]),
    ("NO", &["no", "nor", "norway", "norvège"]),
    ("PL", &["pl", "pol", "poland", "pologne"]),
    ("LU", &["lu", "lux", "luxembourg"]),
];

static ALIAS_TABLE: Lazy<HashMap<String, CountryCode>> = Lazy::new(|| {
    let mut table = HashMap::new();
    for (code, aliases) in COUNTRY_ALIASES {
        let Some(code) = CountryCode::parse(code) else {
            continue;
        };
        for alias in *aliases {
            table.insert((*alias).to_string(), code);
        }
    }
    table
});

/// Resolves a country hint through the fixed alias table.
///
/// Returns `None` for unknown hints; callers keep those as free text.
pub fn resolve_country(hint: &str) -> Option<CountryCode> {
    let key = collapse_whitespace(&hint.trim().to_lowercase());
    if key.is_empty() {
        return None;
    }
    ALIAS_TABLE.get(key.as_str()).copied()
}

fn collapse_whitespace(value: &str) -> String {
    value.split_whitespace().collect::<Vec<_>>().join(" ")
}
