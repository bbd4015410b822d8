use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnalyticsError {
    #[error("failed to read input {path}: {source}")]
    InputRead {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("missing required column: {0}")]
    MissingColumn(String),

    #[error("line {line}: column '{column}' has invalid value '{value}'")]
    DataFormat {
        line: usize,
        column: &'static str,
        value: String,
    },

    #[error("computation error: {0}")]
    Computation(String),

    #[error("failed to build workbook: {0}")]
    ReportWrite(#[from] rust_xlsxwriter::XlsxError),

    #[error("failed to save report to {path}: {source}")]
    ReportSave {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, AnalyticsError>;
