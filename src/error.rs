use std::path::PathBuf;
use thiserror::Error;

/// A line that does not fit the expected schema.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecordError {
    #[error("malformed record: expected at least {expected} fields, found {found}")]
    FieldCount { expected: usize, found: usize },

    #[error("malformed record: field `{field}` is not numeric: {value:?}")]
    NotNumeric { field: &'static str, value: String },
}

/// Errors surfaced while streaming a delimited source file.
#[derive(Debug, Error)]
pub enum ReadError {
    #[error("line {line}: {source}")]
    Record {
        line: u64,
        #[source]
        source: RecordError,
    },

    #[error(transparent)]
    Csv(#[from] csv::Error),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{} file not found. Probably need to change the path or download {url}", path.display())]
    Missing { path: PathBuf, url: &'static str },
}

/// Why the normalizer dropped a postal row. Counted, never propagated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    MissingCountry,
    UnusableZipCode,
}
