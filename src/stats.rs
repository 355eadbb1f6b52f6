use crate::error::Rejection;
use crate::models::CountryLocalityMap;
use std::fmt;

/// Line counters for one pass over a source file
#[derive(Debug, Default, Clone)]
pub struct ReadStats {
    lines: u64,
    parsed: u64,
    malformed: u64,
}

impl ReadStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_lines(&mut self) {
        self.lines += 1;
    }

    pub fn inc_parsed(&mut self) {
        self.parsed += 1;
    }

    pub fn inc_malformed(&mut self) {
        self.malformed += 1;
    }

    pub fn lines(&self) -> u64 {
        self.lines
    }

    pub fn parsed(&self) -> u64 {
        self.parsed
    }

    pub fn malformed(&self) -> u64 {
        self.malformed
    }
}

/// What the postal normalizer kept and dropped
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct NormalizeStats {
    rows: u64,
    missing_country: u64,
    unusable_code: u64,
    duplicates: u64,
}

impl NormalizeStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn inc_rows(&mut self) {
        self.rows += 1;
    }

    pub fn record_rejection(&mut self, reason: Rejection) {
        match reason {
            Rejection::MissingCountry => self.missing_country += 1,
            Rejection::UnusableZipCode => self.unusable_code += 1,
        }
    }

    pub fn inc_duplicates(&mut self) {
        self.duplicates += 1;
    }

    pub fn rows(&self) -> u64 {
        self.rows
    }

    pub fn missing_country(&self) -> u64 {
        self.missing_country
    }

    pub fn unusable_code(&self) -> u64 {
        self.unusable_code
    }

    pub fn duplicates(&self) -> u64 {
        self.duplicates
    }

    /// Rows that ended up as distinct localities.
    pub fn kept(&self) -> u64 {
        self.rows - self.missing_country - self.unusable_code - self.duplicates
    }
}

/// Per-country locality counts; empty countries are only counted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountrySummary {
    pub counts: Vec<(String, usize)>,
    pub empty: usize,
}

impl CountrySummary {
    pub fn from_map(map: &CountryLocalityMap) -> Self {
        let mut counts = Vec::new();
        let mut empty = 0;
        for (country, localities) in map {
            if localities.is_empty() {
                empty += 1;
            } else {
                counts.push((country.clone(), localities.len()));
            }
        }
        Self { counts, empty }
    }

    pub fn total(&self) -> usize {
        self.counts.iter().map(|(_, n)| n).sum()
    }
}

impl fmt::Display for CountrySummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (country, count) in &self.counts {
            writeln!(f, "{}: {}", country, count)?;
        }
        write!(f, "Empty: {}", self.empty)
    }
}
