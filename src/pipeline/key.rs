//! Stable key derivation for residence records.
//!
//! A stable key identifies a residence across runs so that a listing is
//! only reported as "new" once. Cosmetic differences between scrapes
//! (whitespace, accents, case, renamed columns) must not change the key.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::models::ResidenceRecord;

/// Accepted column names for the canonical listing URL.
const URL_ALIASES: &[&str] = &["url", "lien", "link"];

/// Accepted column names for the residence display name.
const NAME_ALIASES: &[&str] = &["residence", "résidence", "titre", "title", "nom", "name"];

/// Accepted column names for the city.
const CITY_ALIASES: &[&str] = &["ville", "city", "commune"];

/// A derived key plus how it was obtained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DerivedKey {
    pub key: String,
    pub source: KeySource,
}

/// Which rule of the fallback chain produced a key.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// Canonical URL field (most reliable)
    Url,
    /// Normalized name and city
    NameCity,
    /// Normalized name only
    Name,
    /// Positional index within the batch; not stable across runs
    Positional,
}

impl DerivedKey {
    /// True when the key came from the positional fallback and cannot be
    /// trusted to match across runs.
    pub fn is_degraded(&self) -> bool {
        self.source == KeySource::Positional
    }
}

/// Normalize a field value for identity comparison.
///
/// Trims, lowercases, strips accents (NFD decomposition followed by
/// dropping combining marks) and collapses whitespace runs, so
/// "Résidence  Étoile" and "residence etoile" compare equal.
pub fn normalize(s: &str) -> String {
    let folded: String = s
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();

    folded.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Derive the stable key for one record.
///
/// Rules in strict priority order, first applicable wins:
/// 1. URL field under any accepted alias: the trimmed URL value.
/// 2. Name and city both present: `normalize(name) + "::" + normalize(city)`.
/// 3. Name only: `normalize(name)`.
/// 4. Nothing identifying: the record's position in the batch. This key is
///    not stable across runs; callers should surface it as a warning.
pub fn derive_key(record: &ResidenceRecord, index: usize) -> DerivedKey {
    if let Some(url) = record.field(URL_ALIASES) {
        let trimmed = url.trim();
        if !trimmed.is_empty() {
            return DerivedKey {
                key: trimmed.to_string(),
                source: KeySource::Url,
            };
        }
    }

    let name = record
        .field(NAME_ALIASES)
        .map(normalize)
        .filter(|n| !n.is_empty());
    let city = record
        .field(CITY_ALIASES)
        .map(normalize)
        .filter(|c| !c.is_empty());

    match (name, city) {
        (Some(name), Some(city)) => DerivedKey {
            key: format!("{name}::{city}"),
            source: KeySource::NameCity,
        },
        (Some(name), None) => DerivedKey {
            key: name,
            source: KeySource::Name,
        },
        _ => DerivedKey {
            key: format!("#{index}"),
            source: KeySource::Positional,
        },
    }
}

/// Derive keys for a whole batch, logging each positional fallback.
///
/// Returns the keys in batch order (duplicates included; they collapse
/// later under set semantics) and the number of degraded keys.
pub fn derive_batch(records: &[ResidenceRecord]) -> (Vec<DerivedKey>, usize) {
    let mut degraded = 0;
    let keys: Vec<DerivedKey> = records
        .iter()
        .enumerate()
        .map(|(index, record)| {
            let derived = derive_key(record, index);
            if derived.is_degraded() {
                degraded += 1;
                log::warn!(
                    "Record {} has no URL, name or city field; falling back to positional key '{}'",
                    index,
                    derived.key
                );
            }
            derived
        })
        .collect();

    (keys, degraded)
}
