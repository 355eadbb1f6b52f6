//! Administrative-level resolution: pick, per country, the finest admin level
//! that yields enough localities.

use crate::config::MIN_LOCALITIES_PER_COUNTRY;
use crate::models::{CountryLocalityMap, FeatureLevel, GeoRecord, Locality, ESCALATION_LEVELS};
use crate::stats::CountrySummary;
use rustc_hash::FxHashMap;
use std::collections::BTreeSet;
use tracing::{debug, info};

/// The record's code at `level`, falling back one level up when blank.
/// Returns `None` when both are blank.
pub fn resolved_code(record: &GeoRecord, level: FeatureLevel) -> Option<&str> {
    let own = level.admin_code(record).trim();
    if !own.is_empty() {
        return Some(own);
    }
    let fallback = level.coarser()?.admin_code(record).trim();
    (!fallback.is_empty()).then_some(fallback)
}

/// One pass: every record of `level` in a requested country becomes a locality.
///
/// Every requested country is a key of the result, with an empty sequence when
/// nothing matched. Localities keep input order and are not deduplicated.
pub fn resolve_level<'a, I>(
    records: I,
    countries: &BTreeSet<String>,
    level: FeatureLevel,
) -> CountryLocalityMap
where
    I: IntoIterator<Item = &'a GeoRecord>,
{
    let mut result: CountryLocalityMap = countries
        .iter()
        .map(|cc| (cc.clone(), Vec::new()))
        .collect();

    for record in records {
        if record.feature_code != level.as_code() {
            continue;
        }
        let Some(localities) = result.get_mut(&record.country_code) else {
            continue;
        };
        match resolved_code(record, level) {
            Some(code) => localities.push(Locality::from_record(record, code.to_string())),
            None => debug!(
                geonameid = record.geonameid,
                name = %record.name,
                level = %level,
                "Record has no usable admin code"
            ),
        }
    }

    result
}

#[derive(Debug, Clone)]
pub struct EscalationConfig {
    /// Finest first
    pub levels: Vec<FeatureLevel>,
    /// Countries below this after a pass move on to the next level
    pub min_localities: usize,
}

impl Default for EscalationConfig {
    fn default() -> Self {
        Self {
            levels: ESCALATION_LEVELS.to_vec(),
            min_localities: MIN_LOCALITIES_PER_COUNTRY,
        }
    }
}

/// Diagnostics for one executed pass
#[derive(Debug, Clone)]
pub struct PassReport {
    pub level: FeatureLevel,
    pub requested: usize,
    pub summary: CountrySummary,
}

#[derive(Debug, Clone)]
pub struct Escalation {
    pub localities: CountryLocalityMap,
    pub passes: Vec<PassReport>,
}

/// Runs `resolve_level` from the finest configured level upwards.
///
/// After each pass, countries with fewer than `min_localities` localities are
/// resolved again at the next level and their entry is replaced by that
/// result, even when it is smaller. Countries can end below the threshold.
pub fn escalate(
    records: &[GeoRecord],
    countries: &BTreeSet<String>,
    config: &EscalationConfig,
) -> Escalation {
    let by_level = bucket_by_level(records);
    let mut localities = CountryLocalityMap::new();
    let mut passes = Vec::with_capacity(config.levels.len());
    let mut pending = countries.clone();

    for (i, level) in config.levels.iter().copied().enumerate() {
        if i > 0 {
            pending = localities
                .iter()
                .filter(|(_, v)| v.len() < config.min_localities)
                .map(|(cc, _)| cc.clone())
                .collect();
        }
        if pending.is_empty() {
            debug!(level = %level, "No country below threshold, stopping escalation");
            break;
        }

        let bucket = by_level.get(&level).map(Vec::as_slice).unwrap_or(&[]);
        let pass = resolve_level(bucket.iter().copied(), &pending, level);
        let summary = CountrySummary::from_map(&pass);
        info!(
            level = %level,
            requested = pending.len(),
            localities = summary.total(),
            empty = summary.empty,
            "Resolution pass complete"
        );
        passes.push(PassReport {
            level,
            requested: pending.len(),
            summary,
        });

        // Replace, never union
        localities.extend(pass);
    }

    Escalation { localities, passes }
}

fn bucket_by_level(records: &[GeoRecord]) -> FxHashMap<FeatureLevel, Vec<&GeoRecord>> {
    let mut buckets: FxHashMap<FeatureLevel, Vec<&GeoRecord>> = FxHashMap::default();
    for record in records {
        if let Some(level) = record.level() {
            buckets.entry(level).or_default().push(record);
        }
    }
    buckets
}
