//! On-disk snapshot of the admin index, kept next to the towns output.
//!
//! A snapshot is reused only when it was taken from the same gazetteer file
//! (path, mtime and size) and when it can honor the current malformed-line
//! policy: a snapshot built while skipping bad lines cannot serve a
//! `--fail-fast` run, which must see those lines and abort.

use crate::config::{CACHE_FILE_NAME, CACHE_VERSION};
use crate::index::AdminIndex;
use crate::models::GeoRecord;
use crate::parser::MalformedPolicy;
use crate::stats::ReadStats;
use anyhow::{Context, Result};
use bincode::Options;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::info;

/// Identity of the gazetteer file a snapshot was built from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStamp {
    pub path: String,
    pub mtime: u64,
    pub size: u64,
}

impl SourceStamp {
    pub fn of(input: &Path) -> Result<Self> {
        let metadata = fs::metadata(input)
            .with_context(|| format!("Failed to get metadata for: {}", input.display()))?;
        let mtime = metadata
            .modified()
            .context("Failed to get modification time")?
            .duration_since(SystemTime::UNIX_EPOCH)
            .context("Invalid modification time")?
            .as_secs();
        Ok(Self {
            path: input.to_string_lossy().into_owned(),
            mtime,
            size: metadata.len(),
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub version: u32,
    pub source: SourceStamp,
    /// Lines skipped while the index was built
    pub malformed_lines: u64,
    pub country_count: usize,
    pub division_count: usize,
}

impl SnapshotHeader {
    /// Why this snapshot cannot stand in for a fresh read of `source` under `policy`.
    fn miss_reason(&self, source: &SourceStamp, policy: MalformedPolicy) -> Option<Miss> {
        if self.version != CACHE_VERSION {
            return Some(Miss::Version(self.version));
        }
        if self.source.path != source.path {
            return Some(Miss::OtherSource);
        }
        if self.source != *source {
            return Some(Miss::SourceChanged);
        }
        if policy == MalformedPolicy::Abort && self.malformed_lines > 0 {
            return Some(Miss::SkippedLines(self.malformed_lines));
        }
        None
    }
}

#[derive(Deserialize)]
struct SnapshotDe {
    header: SnapshotHeader,
    countries: BTreeSet<String>,
    records: Vec<GeoRecord>,
}

#[derive(Serialize)]
struct SnapshotSer<'a> {
    header: SnapshotHeader,
    countries: &'a BTreeSet<String>,
    records: &'a [GeoRecord],
}

/// Why the index has to be rebuilt from the gazetteer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Miss {
    Absent,
    Unreadable(String),
    Version(u32),
    OtherSource,
    SourceChanged,
    SkippedLines(u64),
}

impl fmt::Display for Miss {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Miss::Absent => f.write_str("no snapshot"),
            Miss::Unreadable(e) => write!(f, "snapshot unreadable: {}", e),
            Miss::Version(v) => write!(f, "snapshot version {} (current {})", v, CACHE_VERSION),
            Miss::OtherSource => f.write_str("snapshot built from another gazetteer"),
            Miss::SourceChanged => f.write_str("gazetteer changed since snapshot"),
            Miss::SkippedLines(n) => write!(f, "snapshot skipped {} malformed lines", n),
        }
    }
}

#[derive(Debug)]
pub enum Lookup {
    Hit(AdminIndex),
    Miss(Miss),
}

pub fn cache_path(cache_dir: &Path) -> PathBuf {
    cache_dir.join(CACHE_FILE_NAME)
}

fn read_snapshot(path: &Path) -> Result<SnapshotDe, bincode::Error> {
    let file_size = fs::metadata(path).map(|m| m.len()).unwrap_or(0);
    let reader = BufReader::with_capacity(256 * 1024, File::open(path)?);
    bincode::options()
        .with_limit(file_size.saturating_add(1024))
        .deserialize_from(reader)
}

/// Loads the snapshot at `path` if it matches `input` and `policy`.
///
/// Never fails: an unreadable snapshot or an unreadable input is a miss, and
/// the rebuild that follows reports the real problem.
pub fn lookup(path: &Path, input: &Path, policy: MalformedPolicy) -> Lookup {
    if !path.exists() {
        return Lookup::Miss(Miss::Absent);
    }
    let Ok(source) = SourceStamp::of(input) else {
        return Lookup::Miss(Miss::SourceChanged);
    };
    let snapshot = match read_snapshot(path) {
        Ok(s) => s,
        Err(e) => return Lookup::Miss(Miss::Unreadable(e.to_string())),
    };
    if let Some(reason) = snapshot.header.miss_reason(&source, policy) {
        return Lookup::Miss(reason);
    }

    info!(
        countries = snapshot.header.country_count,
        divisions = snapshot.header.division_count,
        "Admin index loaded from cache"
    );
    Lookup::Hit(AdminIndex::from_parts(snapshot.countries, snapshot.records))
}

/// Writes `index` with the counters of the read that built it, atomically via rename.
pub fn save_index(index: &AdminIndex, read: &ReadStats, input: &Path, cache_dir: &Path) -> Result<()> {
    let path = cache_path(cache_dir);
    fs::create_dir_all(cache_dir)
        .with_context(|| format!("Failed to create directory: {:?}", cache_dir))?;

    let snapshot = SnapshotSer {
        header: SnapshotHeader {
            version: CACHE_VERSION,
            source: SourceStamp::of(input)?,
            malformed_lines: read.malformed(),
            country_count: index.countries().len(),
            division_count: index.records().len(),
        },
        countries: index.countries(),
        records: index.records(),
    };

    let tmp_path = path.with_extension("cache.tmp");
    let file = File::create(&tmp_path)
        .with_context(|| format!("Failed to create temp cache file: {:?}", tmp_path))?;
    bincode::options()
        .serialize_into(BufWriter::new(file), &snapshot)
        .context("Failed to serialize admin index cache")?;
    fs::rename(&tmp_path, &path)
        .with_context(|| format!("Failed to rename temp cache file to: {:?}", path))?;

    info!(
        divisions = snapshot.header.division_count,
        malformed = snapshot.header.malformed_lines,
        path = ?path,
        "Admin index cache saved"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::FromFields;
    use std::io::Write;
    use tempfile::TempDir;

    fn create_test_input(dir: &TempDir) -> PathBuf {
        let path = dir.path().join("allCountries.txt");
        fs::write(&path, "test content\n").unwrap();
        path
    }

    fn create_test_index() -> AdminIndex {
        AdminIndex::from_records([
            GeoRecord::parse("6455259\tParis\tParis\t75056,Paris\t48.86\t2.34444\tA\tADM4\tFR\t\t11\t75\t751\t75056\t2190327\t\t54\tEurope/Paris\t2019-03-23").unwrap(),
            GeoRecord::parse("2661552\tBern\tBern\t\t46.94809\t7.44744\tP\tPPLC\tCH\t\tBE\t246\t351\t\t121631\t\t542\tEurope/Zurich\t2019-09-05").unwrap(),
        ])
    }

    fn read_with_malformed(n: u64) -> ReadStats {
        let mut stats = ReadStats::new();
        for _ in 0..n {
            stats.inc_lines();
            stats.inc_malformed();
        }
        stats
    }

    fn miss(lookup: Lookup) -> Miss {
        match lookup {
            Lookup::Miss(reason) => reason,
            Lookup::Hit(_) => panic!("expected a cache miss"),
        }
    }

    #[test]
    fn cache_path_returns_correct_path() {
        let path = cache_path(Path::new("/output/dir"));
        assert_eq!(path, PathBuf::from("/output/dir/admin_index.cache"));
    }

    #[test]
    fn missing_snapshot_is_absent() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        let reason = miss(lookup(&cache_path(dir.path()), &input, MalformedPolicy::Skip));
        assert_eq!(reason, Miss::Absent);
    }

    #[test]
    fn saved_snapshot_is_returned_for_same_input() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        let original = create_test_index();

        save_index(&original, &ReadStats::new(), &input, dir.path()).unwrap();

        match lookup(&cache_path(dir.path()), &input, MalformedPolicy::Skip) {
            Lookup::Hit(loaded) => {
                assert_eq!(loaded, original);
                assert_eq!(loaded.records()[0].name, "Paris");
                assert_eq!(loaded.countries().len(), 2);
            }
            Lookup::Miss(reason) => panic!("unexpected miss: {}", reason),
        }
    }

    #[test]
    fn modified_input_invalidates_snapshot() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        save_index(&create_test_index(), &ReadStats::new(), &input, dir.path()).unwrap();

        let mut file = File::create(&input).unwrap();
        writeln!(file, "modified content that is longer").unwrap();

        let reason = miss(lookup(&cache_path(dir.path()), &input, MalformedPolicy::Skip));
        assert_eq!(reason, Miss::SourceChanged);
    }

    #[test]
    fn snapshot_of_another_gazetteer_is_not_reused() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        save_index(&create_test_index(), &ReadStats::new(), &input, dir.path()).unwrap();

        let other = dir.path().join("FR.txt");
        fs::copy(&input, &other).unwrap();

        let reason = miss(lookup(&cache_path(dir.path()), &other, MalformedPolicy::Skip));
        assert_eq!(reason, Miss::OtherSource);
    }

    #[test]
    fn fail_fast_rejects_snapshot_that_skipped_lines() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        save_index(&create_test_index(), &read_with_malformed(2), &input, dir.path()).unwrap();

        let path = cache_path(dir.path());
        assert!(matches!(lookup(&path, &input, MalformedPolicy::Skip), Lookup::Hit(_)));
        assert_eq!(
            miss(lookup(&path, &input, MalformedPolicy::Abort)),
            Miss::SkippedLines(2)
        );
    }

    #[test]
    fn fail_fast_reuses_clean_snapshot() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        save_index(&create_test_index(), &ReadStats::new(), &input, dir.path()).unwrap();

        let hit = lookup(&cache_path(dir.path()), &input, MalformedPolicy::Abort);
        assert!(matches!(hit, Lookup::Hit(_)));
    }

    #[test]
    fn corrupt_snapshot_is_unreadable() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        let path = cache_path(dir.path());
        fs::write(&path, b"not valid bincode data").unwrap();

        assert!(matches!(
            miss(lookup(&path, &input, MalformedPolicy::Skip)),
            Miss::Unreadable(_)
        ));
    }

    #[test]
    fn save_index_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let input = create_test_input(&dir);
        let nested = dir.path().join("nested").join("deep");

        save_index(&create_test_index(), &ReadStats::new(), &input, &nested).unwrap();

        assert!(cache_path(&nested).exists());
    }
}
