use crate::config::{GAZETTEER_COLUMNS, POSTAL_MIN_COLUMNS, PROGRESS_INTERVAL};
use crate::error::{ReadError, RecordError, SourceError};
use crate::models::{GeoRecord, PostalRow};
use crate::stats::ReadStats;
use anyhow::{Context, Result};
use csv::{ReaderBuilder, StringRecordsIntoIter};
use indicatif::ProgressBar;
use std::fs::File;
use std::io::{BufReader, Read};
use std::marker::PhantomData;
use std::path::Path;
use std::str::FromStr;
use tracing::debug;

/// What to do with a line that does not fit the schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MalformedPolicy {
    /// Count it and keep going
    #[default]
    Skip,
    /// Stop on the first one
    Abort,
}

/// Schema-to-struct mapping for one tab-separated row.
pub trait FromFields: Sized {
    /// Fewer fields than this is a malformed record. Extra fields are ignored.
    const MIN_FIELDS: usize;

    fn from_fields(fields: &[&str]) -> Result<Self, RecordError>;

    /// Parses a raw line. Only the line terminator is stripped, fields are kept as-is.
    fn parse(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.trim_end_matches(['\r', '\n']).split('\t').collect();
        Self::from_fields(&fields)
    }
}

fn check_width(fields: &[&str], expected: usize) -> Result<(), RecordError> {
    if fields.len() < expected {
        return Err(RecordError::FieldCount {
            expected,
            found: fields.len(),
        });
    }
    Ok(())
}

fn numeric<T: FromStr>(field: &'static str, value: &str) -> Result<T, RecordError> {
    value.parse().map_err(|_| RecordError::NotNumeric {
        field,
        value: value.to_string(),
    })
}

/// Empty input means zero; anything else must parse.
fn numeric_or_zero<T: FromStr + Default>(field: &'static str, value: &str) -> Result<T, RecordError> {
    if value.is_empty() {
        Ok(T::default())
    } else {
        numeric(field, value)
    }
}

fn numeric_opt<T: FromStr>(field: &'static str, value: Option<&&str>) -> Result<Option<T>, RecordError> {
    match value {
        None => Ok(None),
        Some(v) if v.is_empty() => Ok(None),
        Some(v) => numeric(field, v).map(Some),
    }
}

impl FromFields for GeoRecord {
    const MIN_FIELDS: usize = GAZETTEER_COLUMNS;

    fn from_fields(f: &[&str]) -> Result<Self, RecordError> {
        check_width(f, Self::MIN_FIELDS)?;
        Ok(GeoRecord {
            geonameid: numeric("geonameid", f[0])?,
            name: f[1].to_string(),
            asciiname: f[2].to_string(),
            alternatenames: f[3].to_string(),
            latitude: numeric("latitude", f[4])?,
            longitude: numeric("longitude", f[5])?,
            feature_class: f[6].to_string(),
            feature_code: f[7].to_string(),
            country_code: f[8].to_string(),
            cc2: f[9].to_string(),
            admin1_code: f[10].to_string(),
            admin2_code: f[11].to_string(),
            admin3_code: f[12].to_string(),
            admin4_code: f[13].to_string(),
            population: numeric_or_zero("population", f[14])?,
            elevation: numeric_or_zero("elevation", f[15])?,
            dem: f[16].to_string(),
            timezone: f[17].to_string(),
            modification_date: f[18].to_string(),
        })
    }
}

impl FromFields for PostalRow {
    const MIN_FIELDS: usize = POSTAL_MIN_COLUMNS;

    fn from_fields(f: &[&str]) -> Result<Self, RecordError> {
        check_width(f, Self::MIN_FIELDS)?;
        Ok(PostalRow {
            country_code: f[0].to_string(),
            postal_code: f[1].to_string(),
            place_name: f[2].to_string(),
            admin_name1: f[3].to_string(),
            admin_code1: f[4].to_string(),
            admin_name2: f[5].to_string(),
            admin_code2: f[6].to_string(),
            admin_name3: f[7].to_string(),
            admin_code3: f[8].to_string(),
            latitude: numeric_opt("latitude", f.get(9))?,
            longitude: numeric_opt("longitude", f.get(10))?,
            accuracy: numeric_opt("accuracy", f.get(11))?,
        })
    }
}

/// Tab-separated reader over a GeoNames dump: no header, no quoting, ragged rows allowed.
pub struct TsvReader<R: Read> {
    inner: csv::Reader<R>,
}

impl TsvReader<BufReader<File>> {
    pub fn open(path: &Path, download_url: &'static str) -> Result<Self> {
        if !path.is_file() {
            return Err(SourceError::Missing {
                path: path.to_path_buf(),
                url: download_url,
            }
            .into());
        }
        let file = File::open(path)
            .with_context(|| format!("Failed to open source file: {}", path.display()))?;
        Ok(Self::from_reader(BufReader::with_capacity(256 * 1024, file)))
    }
}

impl<R: Read> TsvReader<R> {
    pub fn from_reader(reader: R) -> Self {
        let inner = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .flexible(true)
            .quoting(false)
            .from_reader(reader);
        Self { inner }
    }

    pub fn records<T: FromFields>(self) -> Records<R, T> {
        Records {
            inner: self.inner.into_records(),
            _marker: PhantomData,
        }
    }
}

pub struct Records<R: Read, T> {
    inner: StringRecordsIntoIter<R>,
    _marker: PhantomData<T>,
}

impl<R: Read, T: FromFields> Iterator for Records<R, T> {
    type Item = Result<T, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        let record = match self.inner.next()? {
            Ok(r) => r,
            Err(e) => return Some(Err(e.into())),
        };
        let line = record.position().map(|p| p.line()).unwrap_or(0);
        let fields: Vec<&str> = record.iter().collect();
        Some(T::from_fields(&fields).map_err(|source| ReadError::Record { line, source }))
    }
}

/// Streams every well-formed record of `path` into `visit`, applying `policy`
/// to malformed lines. I/O and decoding errors are always fatal.
pub fn for_each_record<T, F>(
    path: &Path,
    download_url: &'static str,
    policy: MalformedPolicy,
    stats: &mut ReadStats,
    mut visit: F,
) -> Result<()>
where
    T: FromFields,
    F: FnMut(T),
{
    let reader = TsvReader::open(path, download_url)?;
    let pb = ProgressBar::new_spinner();

    for result in reader.records::<T>() {
        stats.inc_lines();
        if stats.lines() % PROGRESS_INTERVAL == 0 {
            pb.set_message(format!("{} lines", stats.lines()));
            pb.tick();
        }
        match result {
            Ok(record) => {
                stats.inc_parsed();
                visit(record);
            }
            Err(ReadError::Record { line, source }) if policy == MalformedPolicy::Skip => {
                stats.inc_malformed();
                debug!(line, error = %source, "Skipping malformed record");
            }
            Err(err) => {
                pb.finish_and_clear();
                return Err(err).with_context(|| format!("Failed to read {}", path.display()));
            }
        }
    }

    pb.finish_and_clear();
    Ok(())
}
