use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading, aggregating or exporting fleet data.
///
/// None of these end an interactive session; the menu loop prints them and
/// waits for the next choice.
#[derive(Error, Debug)]
pub enum ReportError {
    /// A file exists but could not be opened or read.
    #[error("Failed to read file {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A file or directory could not be created or written.
    #[error("Failed to write file {path}: {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A CSV document could not be parsed or written.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// A workbook could not be opened or its first sheet decoded.
    #[error("Failed to read workbook {path}: {source}")]
    Workbook {
        path: PathBuf,
        #[source]
        source: calamine::Error,
    },

    /// The monthly workbook could not be written.
    #[error("Failed to export {path}: {source}")]
    Export {
        path: PathBuf,
        #[source]
        source: rust_xlsxwriter::XlsxError,
    },

    /// The file extension is not one of the supported table formats.
    #[error("Unsupported file format: {0}")]
    UnsupportedFormat(PathBuf),

    /// A column needed for the monthly analysis is absent.
    #[error("Missing required column: {0}")]
    MissingColumn(String),

    #[error("Invalid period {month}/{year}: month must be between 1 and 12")]
    InvalidPeriod { month: u32, year: i32 },
}

pub type Result<T> = std::result::Result<T, ReportError>;
