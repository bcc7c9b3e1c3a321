//! Geolocation inference for profiles without an explicit country.
//!
//! # Responsibility
//! - Derive a country from free-text location hints, email domains and
//!   known institutions.
//!
//! # Invariants
//! - Runs only when `Profile::country` is `None`; never overwrites.
//! - Evidence order: location hint > email ccTLD > affiliation.
//! - Deterministic: set fields are scanned in sorted order.

use crate::model::country::{resolve_country, CountryCode};
use crate::model::profile::{CountrySource, Profile};
use crate::normalize::padded_tokens;
use once_cell::sync::Lazy;
use std::collections::HashMap;

const CITIES: &[(&str, &str)] = &[
    ("paris", "FR"),
    ("lyon", "FR"),
    ("marseille", "FR"),
    ("toulouse", "FR"),
    ("grenoble", "FR"),
    ("saclay", "FR"),
    ("île-de-france", "FR"),
    ("ile-de-france", "FR"),
    ("new york", "US"),
    ("nyc", "US"),
    ("san francisco", "US"),
    ("sf", "US"),
    ("boston", "US"),
    ("seattle", "US"),
    ("washington", "US"),
    ("los angeles", "US"),
    ("palo alto", "US"),
    ("london", "GB"),
    ("oxford", "GB"),
    ("cambridge", "GB"),
    ("edinburgh", "GB"),
    ("manchester", "GB"),
    ("montreal", "CA"),
    ("montréal", "CA"),
    ("toronto", "CA"),
    ("vancouver", "CA"),
    ("quebec", "CA"),
    ("québec", "CA"),
    ("berlin", "DE"),
    ("munich", "DE"),
    ("münchen", "DE"),
    ("hamburg", "DE"),
    ("tokyo", "JP"),
    ("seoul", "KR"),
    ("sydney", "AU"),
    ("melbourne", "AU"),
    ("amsterdam", "NL"),
    ("brussels", "BE"),
    ("bruxelles", "BE"),
    ("zurich", "CH"),
    ("zürich", "CH"),
    ("geneva", "CH"),
    ("genève", "CH"),
    ("lausanne", "CH"),
    ("madrid", "ES"),
    ("barcelona", "ES"),
    ("rome", "IT"),
    ("milan", "IT"),
    ("bangalore", "IN"),
    ("bengaluru", "IN"),
    ("beijing", "CN"),
    ("shanghai", "CN"),
    ("dublin", "IE"),
    ("stockholm", "SE"),
    ("tel aviv", "IL"),
    ("lisbon", "PT"),
    ("vienna", "AT"),
    ("copenhagen", "DK"),
    ("helsinki", "FI"),
    ("oslo", "NO"),
    ("warsaw", "PL"),
];

const EMAIL_TLDS: &[(&str, &str)] = &[
    ("fr", "FR"),
    ("de", "DE"),
    ("uk", "GB"),
    ("ca", "CA"),
    ("quebec", "CA"),
    ("jp", "JP"),
    ("kr", "KR"),
    ("sg", "SG"),
    ("au", "AU"),
    ("nl", "NL"),
    ("be", "BE"),
    ("ch", "CH"),
    ("es", "ES"),
    ("it", "IT"),
    ("in", "IN"),
    ("cn", "CN"),
    ("ie", "IE"),
    ("se", "SE"),
    ("il", "IL"),
    ("br", "BR"),
    ("pt", "PT"),
    ("at", "AT"),
    ("dk", "DK"),
    ("fi", "FI"),
    ("no", "NO"),
    ("pl", "PL"),
    ("lu", "LU"),
];

/// Known institutions and publications, matched as whole-token phrases.
const INSTITUTIONS: &[(&str, &str)] = &[
    ("mila", "CA"),
    ("vector institute", "CA"),
    ("university of toronto", "CA"),
    ("universite de montreal", "CA"),
    ("université de montréal", "CA"),
    ("mcgill", "CA"),
    ("inria", "FR"),
    ("cnrs", "FR"),
    ("sorbonne", "FR"),
    ("le monde", "FR"),
    ("le figaro", "FR"),
    ("les echos", "FR"),
    ("liberation", "FR"),
    ("libération", "FR"),
    ("usine digitale", "FR"),
    ("bbc", "GB"),
    ("guardian", "GB"),
    ("financial times", "GB"),
    ("the economist", "GB"),
    ("deepmind", "GB"),
    ("university of oxford", "GB"),
    ("university of cambridge", "GB"),
    ("new york times", "US"),
    ("nyt", "US"),
    ("wall street journal", "US"),
    ("wsj", "US"),
    ("washington post", "US"),
    ("techcrunch", "US"),
    ("wired", "US"),
    ("the verge", "US"),
    ("mit", "US"),
    ("stanford", "US"),
    ("carnegie mellon", "US"),
    ("openai", "US"),
    ("anthropic", "US"),
    ("epfl", "CH"),
    ("eth zurich", "CH"),
    ("eth zürich", "CH"),
    ("rtbf", "BE"),
    ("le vif", "BE"),
    ("le soir", "BE"),
    ("heise", "DE"),
    ("der spiegel", "DE"),
    ("max planck", "DE"),
    ("nikkei", "JP"),
    ("riken", "JP"),
    ("kaist", "KR"),
    ("nus", "SG"),
    ("straits times", "SG"),
    ("tsinghua", "CN"),
    ("irish times", "IE"),
    ("technion", "IL"),
];

static CITY_TABLE: Lazy<HashMap<&'static str, CountryCode>> = Lazy::new(|| build_table(CITIES));
static TLD_TABLE: Lazy<HashMap<&'static str, CountryCode>> = Lazy::new(|| build_table(EMAIL_TLDS));
static INSTITUTION_TABLE: Lazy<Vec<(String, CountryCode)>> = Lazy::new(|| {
    INSTITUTIONS
        .iter()
        .filter_map(|(phrase, code)| {
            CountryCode::parse(code).map(|code| (padded_tokens(phrase), code))
        })
        .collect()
});

/// Sets the profile country from indirect evidence when it is still unset.
///
/// Returns the evidence that was used, or `None` when nothing changed.
pub fn apply_geolocation(profile: &mut Profile) -> Option<CountrySource> {
    if profile.country.is_some() {
        return None;
    }
    let (code, source) = infer_country(profile)?;
    profile.country = Some(code);
    profile.country_source = Some(source);
    Some(source)
}

/// Infers a country without mutating the profile.
pub fn infer_country(profile: &Profile) -> Option<(CountryCode, CountrySource)> {
    if let Some(code) = profile.location_hints.iter().find_map(|hint| country_from_location(hint)) {
        return Some((code, CountrySource::LocationHint));
    }
    if let Some(code) = profile.emails.iter().find_map(|email| country_from_email(email)) {
        return Some((code, CountrySource::EmailDomain));
    }
    if let Some(code) = profile
        .affiliations
        .iter()
        .find_map(|affiliation| country_from_affiliation(affiliation))
    {
        return Some((code, CountrySource::Affiliation));
    }
    None
}

/// Resolves a free-text location ("Paris, France", "Montréal (QC)").
///
/// The whole hint is tried first, then each segment from last to first,
/// since locations usually end with the broadest part. Segments are only
/// looked up whole: "Saint-Jean-de-Luz" is one place, not a `de` alias.
pub fn country_from_location(hint: &str) -> Option<CountryCode> {
    let lookup = |value: &str| {
        let key = value.trim().to_lowercase();
        if key.is_empty() {
            return None;
        }
        resolve_country(&key).or_else(|| CITY_TABLE.get(key.as_str()).copied())
    };

    if let Some(code) = lookup(hint) {
        return Some(code);
    }
    hint.split([',', '/', '(', ')', '|', ';'])
        .rev()
        .find_map(lookup)
}

/// Country of an email's country-code top-level domain.
pub fn country_from_email(email: &str) -> Option<CountryCode> {
    let (_, domain) = email.rsplit_once('@')?;
    let tld = domain.rsplit('.').next()?.to_lowercase();
    TLD_TABLE.get(tld.as_str()).copied()
}

/// Country of the first known institution named in an affiliation.
pub fn country_from_affiliation(affiliation: &str) -> Option<CountryCode> {
    let haystack = padded_tokens(affiliation);
    INSTITUTION_TABLE
        .iter()
        .find(|(phrase, _)| haystack.contains(phrase.as_str()))
        .map(|(_, code)| *code)
}

fn build_table(entries: &[(&'static str, &str)]) -> HashMap<&'static str, CountryCode> {
    entries
        .iter()
        .filter_map(|(key, code)| CountryCode::parse(code).map(|code| (*key, code)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{
        apply_geolocation, country_from_affiliation, country_from_email, country_from_location,
    };
    use crate::model::country::CountryCode;
    use crate::model::profile::{CountrySource, Profile};

    fn code(value: &str) -> Option<CountryCode> {
        CountryCode::parse(value)
    }

    #[test]
    fn location_segments_resolve_from_broadest_part() {
        assert_eq!(country_from_location("Paris, France"), code("FR"));
        assert_eq!(country_from_location("Montréal (QC)"), code("CA"));
        assert_eq!(country_from_location("Somewhere unknown"), None);
    }

    #[test]
    fn hyphenated_place_names_are_not_split_into_aliases() {
        assert_eq!(country_from_location("Saint-Jean-de-Luz"), None);
        assert_eq!(country_from_location("Saint-Paul-de-Vence"), None);
        assert_eq!(country_from_location("Saint-Jean-de-Luz, France"), code("FR"));
        assert_eq!(country_from_location("Paris, Île-de-France"), code("FR"));
    }

    #[test]
    fn email_tld_maps_to_country() {
        assert_eq!(country_from_email("yb@mila.quebec"), code("CA"));
        assert_eq!(country_from_email("someone@lemonde.fr"), code("FR"));
        assert_eq!(country_from_email("someone@example.com"), None);
    }

    #[test]
    fn affiliation_phrases_match_whole_tokens() {
        assert_eq!(country_from_affiliation("Le Monde"), code("FR"));
        assert_eq!(country_from_affiliation("MIT Technology Review"), code("US"));
        assert_eq!(country_from_affiliation("Summit Media"), None);
    }

    #[test]
    fn evidence_order_prefers_location_over_email_and_affiliation() {
        let mut profile = Profile::new();
        profile.location_hints.insert("Berlin".to_string());
        profile.emails.insert("a@lemonde.fr".to_string());
        profile.affiliations.insert("BBC".to_string());

        assert_eq!(apply_geolocation(&mut profile), Some(CountrySource::LocationHint));
        assert_eq!(profile.country, code("DE"));

        let mut profile = Profile::new();
        profile.emails.insert("a@lemonde.fr".to_string());
        profile.affiliations.insert("BBC".to_string());
        assert_eq!(apply_geolocation(&mut profile), Some(CountrySource::EmailDomain));
        assert_eq!(profile.country, code("FR"));
    }

    #[test]
    fn existing_country_is_never_overwritten() {
        let mut profile = Profile::new();
        profile.country = code("US");
        profile.country_source = Some(CountrySource::Explicit);
        profile.emails.insert("a@lemonde.fr".to_string());

        assert_eq!(apply_geolocation(&mut profile), None);
        assert_eq!(profile.country, code("US"));
        assert_eq!(profile.country_source, Some(CountrySource::Explicit));
    }
}
