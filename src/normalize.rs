//! Postal-code locality normalization: drop unusable rows, strip numeric name
//! suffixes, keep one locality per (country, code, name).

use crate::error::Rejection;
use crate::models::{Locality, PostalRow};
use crate::stats::NormalizeStats;
use once_cell::sync::Lazy;
use regex::Regex;
use rustc_hash::FxHashMap;
use tracing::trace;

static NAME_SUFFIX_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*\d+$").unwrap());

/// Removes a trailing district number: `"Paris 10"` -> `"Paris"`.
/// A name made only of digits is returned unchanged (trimmed).
pub fn strip_name_suffix(name: &str) -> &str {
    let name = name.trim();
    let stripped = NAME_SUFFIX_REGEX.replace(name, "");
    if stripped.is_empty() {
        return name;
    }
    // replace() only ever removes a suffix, so the result is a prefix of `name`
    &name[..stripped.len()]
}

/// The trimmed postal code, or why the row cannot be used.
pub fn usable_code(row: &PostalRow) -> Result<&str, Rejection> {
    if row.country_code.trim().is_empty() {
        return Err(Rejection::MissingCountry);
    }
    // Qualified codes such as "75001 CEDEX" are not clean codes
    let code = row.postal_code.trim();
    if code.is_empty() || code.contains(char::is_whitespace) {
        return Err(Rejection::UnusableZipCode);
    }
    Ok(code)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Inserted,
    /// Same key seen before; the earlier entry was overwritten in place
    Replaced,
    Rejected(Rejection),
}

type DedupKey = (String, String, String);

/// Accumulates postal rows in file order. Owns its dedup state, so separate
/// runs never share it.
#[derive(Debug, Default)]
pub struct Normalizer {
    localities: Vec<Locality>,
    positions: FxHashMap<DedupKey, usize>,
    stats: NormalizeStats,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, row: PostalRow) -> Outcome {
        self.stats.inc_rows();

        let code = match usable_code(&row) {
            Ok(code) => code.to_string(),
            Err(reason) => {
                trace!(code = %row.postal_code, name = %row.place_name, ?reason, "Dropping postal row");
                self.stats.record_rejection(reason);
                return Outcome::Rejected(reason);
            }
        };
        let name = strip_name_suffix(&row.place_name).to_string();
        let locality = Locality::from_postal(&row, name, code);
        let key = (
            locality.country_code.clone(),
            locality.code.clone(),
            locality.name.clone(),
        );

        match self.positions.get(&key) {
            Some(&pos) => {
                self.stats.inc_duplicates();
                self.localities[pos] = locality;
                Outcome::Replaced
            }
            None => {
                self.positions.insert(key, self.localities.len());
                self.localities.push(locality);
                Outcome::Inserted
            }
        }
    }

    pub fn stats(&self) -> &NormalizeStats {
        &self.stats
    }

    pub fn len(&self) -> usize {
        self.localities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.localities.is_empty()
    }

    /// Localities in first-seen order, each holding its last-seen content.
    pub fn finish(self) -> Vec<Locality> {
        self.localities
    }
}

pub fn normalize<I>(rows: I) -> Vec<Locality>
where
    I: IntoIterator<Item = PostalRow>,
{
    let mut normalizer = Normalizer::new();
    for row in rows {
        normalizer.push(row);
    }
    normalizer.finish()
}
