use shared::models::SourceKind;
use thiserror::Error;

/// Source-level failures. Per-row problems never reach this type: they are
/// absorbed by the assembler and show up as counts in the report.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {source}")]
    IoError {
        #[from]
        source: std::io::Error,
    },

    #[error("CSV system error: {source}")]
    CsvSystemError {
        #[from]
        source: csv::Error,
    },

    #[error("Spreadsheet error: {source}")]
    SpreadsheetError {
        #[from]
        source: calamine::Error,
    },

    #[error("JSON error: {source}")]
    JsonError {
        #[from]
        source: serde_json::Error,
    },

    #[error("Unsupported file type '{0}'")]
    UnsupportedFormat(String),

    #[error("Required field '{field}' has no matching column in {kind} source")]
    RequiredFieldUnmapped { kind: SourceKind, field: String },

    #[error("No usable column mapping for {kind} source")]
    NoUsableMapping { kind: SourceKind },

    #[error("Sink error: {0}")]
    SinkError(String),
}
