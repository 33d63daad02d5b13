//! Spreadsheet ingestion and export.
//!
//! Reads the first sheet of an `.xlsx` workbook or a `.csv` file into a
//! header-addressable [`Sheet`], imports patients and payments from it,
//! and writes collections back out as an `.xlsx` backup or `.csv` tables.

pub mod export;
pub mod import;
pub mod reader;

pub use export::{backup_workbook, collection_csv, Collection};
pub use import::{import_patients, import_payments, ImportSummary};
pub use reader::{read_sheet, Sheet};

use thiserror::Error;

use crate::db::DatabaseError;

#[derive(Error, Debug)]
pub enum SpreadsheetError {
    #[error("Unsupported file type: {0} (expected .xlsx or .csv)")]
    UnsupportedFormat(String),

    #[error("Could not read workbook: {0}")]
    Workbook(String),

    #[error("Could not read CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("No data rows found. Ensure the file has a header row and data.")]
    EmptySheet,

    #[error("Unknown collection: {0}")]
    UnknownCollection(String),

    #[error("Export failed: {0}")]
    Export(String),

    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<rust_xlsxwriter::XlsxError> for SpreadsheetError {
    fn from(err: rust_xlsxwriter::XlsxError) -> Self {
        SpreadsheetError::Export(err.to_string())
    }
}
