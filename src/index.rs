use crate::config::GAZETTEER_DOWNLOAD_URL;
use crate::models::{FeatureLevel, GeoRecord};
use crate::parser::{for_each_record, MalformedPolicy};
use crate::stats::ReadStats;
use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::info;

/// The part of a gazetteer dump the resolver needs: every country code seen,
/// and the ADM1..ADM4 division records.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AdminIndex {
    countries: BTreeSet<String>,
    records: Vec<GeoRecord>,
}

impl AdminIndex {
    pub fn build(path: &Path, policy: MalformedPolicy) -> Result<(Self, ReadStats)> {
        let mut index = Self::default();
        let mut stats = ReadStats::new();

        info!("Building admin index from: {}", path.display());

        for_each_record(path, GAZETTEER_DOWNLOAD_URL, policy, &mut stats, |record: GeoRecord| {
            index.push(record)
        })
        .with_context(|| format!("Failed to index gazetteer at: {}", path.display()))?;

        info!(
            lines = stats.lines(),
            malformed = stats.malformed(),
            countries = index.countries.len(),
            divisions = index.records.len(),
            "Admin index built successfully"
        );

        Ok((index, stats))
    }

    pub fn from_parts(countries: BTreeSet<String>, records: Vec<GeoRecord>) -> Self {
        Self { countries, records }
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = GeoRecord>,
    {
        let mut index = Self::default();
        for record in records {
            index.push(record);
        }
        index
    }

    fn push(&mut self, record: GeoRecord) {
        if !record.country_code.is_empty() && !self.countries.contains(&record.country_code) {
            self.countries.insert(record.country_code.clone());
        }
        if record.level().is_some() {
            self.records.push(record);
        }
    }

    pub fn countries(&self) -> &BTreeSet<String> {
        &self.countries
    }

    pub fn records(&self) -> &[GeoRecord] {
        &self.records
    }

    pub fn count_at(&self, level: FeatureLevel) -> usize {
        self.records
            .iter()
            .filter(|r| r.level() == Some(level))
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FromFields;
    use std::io::Write;
    use tempfile::TempDir;

    fn line(id: u64, class: &str, code: &str, country: &str) -> String {
        format!(
            "{id}\tName {id}\tName {id}\t\t1.0\t2.0\t{class}\t{code}\t{country}\t\t01\t02\t03\t04\t\t\t\tEurope/Paris\t2020-01-01"
        )
    }

    #[test]
    fn keeps_only_admin_divisions() {
        let index = AdminIndex::from_records(
            [
                line(1, "A", "ADM4", "FR"),
                line(2, "P", "PPL", "FR"),
                line(3, "A", "ADM1", "DE"),
                line(4, "A", "PCLI", "IT"),
                line(5, "A", "ADMD", "CH"),
            ]
            .iter()
            .map(|l| GeoRecord::parse(l).unwrap()),
        );
        let ids: Vec<u64> = index.records().iter().map(|r| r.geonameid).collect();
        assert_eq!(ids, vec![1, 3]);
        assert_eq!(index.count_at(FeatureLevel::Adm4), 1);
        assert_eq!(index.count_at(FeatureLevel::Adm2), 0);
    }

    #[test]
    fn collects_every_country_seen() {
        let index = AdminIndex::from_records(
            [
                line(1, "P", "PPL", "FR"),
                line(2, "P", "PPL", "IT"),
                line(3, "H", "STM", ""),
                line(4, "P", "PPL", "FR"),
            ]
            .iter()
            .map(|l| GeoRecord::parse(l).unwrap()),
        );
        let countries: Vec<&str> = index.countries().iter().map(String::as_str).collect();
        assert_eq!(countries, vec!["FR", "IT"]);
        assert!(index.records().is_empty());
    }

    #[test]
    fn build_skips_malformed_lines() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allCountries.txt");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "{}", line(1, "A", "ADM4", "FR")).unwrap();
        writeln!(file, "garbage\tline").unwrap();
        writeln!(file, "{}", line(2, "A", "ADM3", "CH")).unwrap();
        drop(file);

        let (index, stats) = AdminIndex::build(&path, MalformedPolicy::Skip).unwrap();
        assert_eq!(stats.lines(), 3);
        assert_eq!(stats.malformed(), 1);
        assert_eq!(index.records().len(), 2);
        assert_eq!(index.countries().len(), 2);
    }

    #[test]
    fn malformed_line_contributes_no_country() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allCountries.txt");
        let broken = line(2, "A", "ADM4", "IT").replacen("\t1.0\t", "\tnorth\t", 1);
        std::fs::write(&path, format!("{}\n{}\n", line(1, "A", "ADM4", "FR"), broken)).unwrap();

        let (index, stats) = AdminIndex::build(&path, MalformedPolicy::Skip).unwrap();
        assert_eq!(stats.malformed(), 1);
        let countries: Vec<&str> = index.countries().iter().map(String::as_str).collect();
        assert_eq!(countries, vec!["FR"]);
    }

    #[test]
    fn build_aborts_on_malformed_when_asked() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("allCountries.txt");
        std::fs::write(&path, format!("{}\nabc\n", line(1, "A", "ADM4", "FR"))).unwrap();

        let err = AdminIndex::build(&path, MalformedPolicy::Abort).unwrap_err();
        assert!(format!("{:#}", err).contains("line 2"));
    }

    #[test]
    fn build_fails_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let err = AdminIndex::build(&dir.path().join("nope.txt"), MalformedPolicy::Skip).unwrap_err();
        assert!(format!("{:#}", err).contains(GAZETTEER_DOWNLOAD_URL));
    }
}
