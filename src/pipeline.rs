use crate::cache::{self, Lookup};
use crate::config::POSTAL_DOWNLOAD_URL;
use crate::divisions::DivisionTable;
use crate::group::group_by_country;
use crate::index::AdminIndex;
use crate::models::{FeatureLevel, PostalRow};
use crate::normalize::{Normalizer, Outcome};
use crate::output::write_json;
use crate::parser::{for_each_record, MalformedPolicy};
use crate::resolve::{escalate, EscalationConfig, PassReport};
use crate::stats::{CountrySummary, NormalizeStats, ReadStats};
use anyhow::{bail, Result};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info, trace, warn};

/// Parses `"fr, DE,,ch"` into `{"CH", "DE", "FR"}`.
pub fn parse_country_list(list: &str) -> BTreeSet<String> {
    list.split(',')
        .map(|cc| cc.trim().to_ascii_uppercase())
        .filter(|cc| !cc.is_empty())
        .collect()
}

pub struct TownsConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    /// `None` resolves every country present in the gazetteer
    pub countries: Option<BTreeSet<String>>,
    pub escalation: EscalationConfig,
    pub use_cache: bool,
    pub policy: MalformedPolicy,
}

pub struct TownsReport {
    /// `None` when the admin index came from the cache
    pub read: Option<ReadStats>,
    pub passes: Vec<PassReport>,
    pub summary: CountrySummary,
}

pub struct ZipCodesConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub countries: Option<BTreeSet<String>>,
    pub policy: MalformedPolicy,
}

pub struct ZipCodesReport {
    pub read: ReadStats,
    pub normalize: NormalizeStats,
    pub summary: CountrySummary,
}

pub struct DivisionsConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub country: String,
    pub policy: MalformedPolicy,
}

fn cache_dir(output: &Path) -> &Path {
    match output.parent() {
        Some(p) if !p.as_os_str().is_empty() => p,
        _ => Path::new("."),
    }
}

fn load_admin_index(
    input: &Path,
    output: &Path,
    use_cache: bool,
    policy: MalformedPolicy,
) -> Result<(AdminIndex, Option<ReadStats>)> {
    let dir = cache_dir(output);

    if !use_cache {
        info!("Cache disabled, building fresh admin index");
        let (index, stats) = AdminIndex::build(input, policy)?;
        return Ok((index, Some(stats)));
    }

    match cache::lookup(&cache::cache_path(dir), input, policy) {
        Lookup::Hit(index) => return Ok((index, None)),
        Lookup::Miss(reason) => info!(%reason, "Building admin index"),
    }

    let (index, stats) = AdminIndex::build(input, policy)?;
    if let Err(e) = cache::save_index(&index, &stats, input, dir) {
        warn!(error = %e, "Failed to save admin index cache");
    }
    Ok((index, Some(stats)))
}

/// Gazetteer -> per-country localities at the finest level with enough entries.
pub fn run_towns(config: &TownsConfig) -> Result<TownsReport> {
    let (index, read) = load_admin_index(&config.input, &config.output, config.use_cache, config.policy)?;

    let countries = match &config.countries {
        Some(requested) => requested.clone(),
        None => index.countries().clone(),
    };
    debug!(
        adm1 = index.count_at(FeatureLevel::Adm1),
        adm2 = index.count_at(FeatureLevel::Adm2),
        adm3 = index.count_at(FeatureLevel::Adm3),
        adm4 = index.count_at(FeatureLevel::Adm4),
        "Admin divisions available"
    );
    info!(countries = countries.len(), "Resolving localities");

    let escalation = escalate(index.records(), &countries, &config.escalation);
    for pass in &escalation.passes {
        debug!(level = %pass.level, "Pass results:\n{}", pass.summary);
    }

    let summary = CountrySummary::from_map(&escalation.localities);
    debug!("Final results:\n{}", summary);

    write_json(&config.output, &escalation.localities)?;

    Ok(TownsReport {
        read,
        passes: escalation.passes,
        summary,
    })
}

/// Postal-code dump -> deduplicated localities grouped by country.
pub fn run_zip_codes(config: &ZipCodesConfig) -> Result<ZipCodesReport> {
    let mut read = ReadStats::new();
    let mut normalizer = Normalizer::new();

    info!("Normalizing postal codes from: {}", config.input.display());
    for_each_record(
        &config.input,
        POSTAL_DOWNLOAD_URL,
        config.policy,
        &mut read,
        |row: PostalRow| {
            if normalizer.push(row) == Outcome::Replaced {
                trace!(kept = normalizer.len(), "Earlier postal locality replaced by a later row");
            }
        },
    )?;

    let normalize = normalizer.stats().clone();
    let distinct = normalizer.len();
    let mut grouped = group_by_country(normalizer.finish());
    if let Some(countries) = &config.countries {
        grouped.retain(|cc, _| countries.contains(cc));
    }

    let summary = CountrySummary::from_map(&grouped);
    info!(
        rows = normalize.rows(),
        kept = distinct,
        duplicates = normalize.duplicates(),
        unusable = normalize.unusable_code(),
        countries = summary.counts.len(),
        "Postal codes normalized"
    );

    write_json(&config.output, &grouped)?;

    Ok(ZipCodesReport {
        read,
        normalize,
        summary,
    })
}

/// One country's region / department lookup tables.
pub fn run_divisions(config: &DivisionsConfig) -> Result<DivisionTable> {
    let country = config.country.trim().to_ascii_uppercase();
    if country.is_empty() {
        bail!("A country code is required");
    }

    let (index, _) = AdminIndex::build(&config.input, config.policy)?;
    let table = DivisionTable::build(index.records(), &country);
    if table.is_empty() {
        warn!(country = %country, "No ADM1/ADM2 records found");
    }
    for department in table.departments.keys() {
        match table.region_of(department) {
            Some(region) if table.regions.contains_key(region) => {}
            region => warn!(department = %department, ?region, "Department has no known region"),
        }
    }

    info!(
        country = %country,
        regions = table.regions.len(),
        departments = table.departments.len(),
        "Division table built"
    );

    write_json(&config.output, &table)?;
    Ok(table)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn country_list_is_normalized() {
        let set = parse_country_list("fr, DE,,ch ");
        assert_eq!(
            set.into_iter().collect::<Vec<_>>(),
            vec!["CH".to_string(), "DE".to_string(), "FR".to_string()]
        );
    }

    #[test]
    fn empty_country_list_is_empty() {
        assert!(parse_country_list(" , ").is_empty());
    }

    #[test]
    fn cache_lives_next_to_output() {
        assert_eq!(cache_dir(Path::new("data/all_towns.json")), Path::new("data"));
        assert_eq!(cache_dir(Path::new("all_towns.json")), Path::new("."));
    }
}
