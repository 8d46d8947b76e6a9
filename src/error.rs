use std::path::PathBuf;

use thiserror::Error;

/// Failures while turning one input file (or pattern) into samples.
///
/// None of these abort a report: callers log them and skip the file.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("reading {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("parsing CSV {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("parsing JSON {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("reading parquet {}: {message}", path.display())]
    Parquet { path: PathBuf, message: String },

    #[error("{} is missing required column '{column}'", path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("{}, row {row}: timestamp '{raw}' is not a number", path.display())]
    BadTimestamp {
        path: PathBuf,
        row: usize,
        raw: String,
    },

    #[error("unsupported file extension: .{0}")]
    UnsupportedExtension(String),

    #[error("invalid file pattern '{pattern}': {source}")]
    Pattern {
        pattern: String,
        #[source]
        source: glob::PatternError,
    },
}

/// Failures that stop a report before anything is written.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("no data files match '{0}'; cannot determine the start time")]
    MissingStartFile(String),

    #[error("start file {} could not be read: {source}", path.display())]
    UnreadableStartFile {
        path: PathBuf,
        #[source]
        source: LoadError,
    },

    #[error("start file {} contains no samples", .0.display())]
    EmptyStartFile(PathBuf),
}
