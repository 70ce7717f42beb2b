use std::path::PathBuf;
use thiserror::Error;

/// Fatal problems with the bookings file. Any of these stops the dashboard
/// from rendering.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cannot open data file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed CSV: {0}")]
    Csv(#[from] csv::Error),
    #[error("required column '{column}' is missing from the data file")]
    MissingColumn { column: &'static str },
    #[error("line {line}: cannot parse booking date '{value}'")]
    InvalidDate { line: u64, value: String },
}
