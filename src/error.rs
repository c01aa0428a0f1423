use crate::schema::Period;
use rust_decimal::Decimal;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum HoldingsError {
    #[error("Failed to read workbook {path}: {details}")]
    WorkbookError { path: String, details: String },

    #[error("Workbook {0} has no worksheets")]
    EmptyWorkbook(String),

    #[error("Duplicate exchange-rate periods found: {}", format_periods(.0))]
    DuplicatePeriods(Vec<Period>),

    #[error("Invalid exchange rate {rate} for {period}: must be greater than zero")]
    InvalidRate { period: Period, rate: Decimal },

    #[error("Exchange rates outside expected range: {min} to {max}")]
    RateOutOfRange { min: Decimal, max: Decimal },

    #[error("Validation error in {context}: {details}")]
    ValidationError { context: String, details: String },

    #[error("Required input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("Exchange-rate fetch failed: {0}")]
    FetchFailed(String),

    #[cfg(feature = "banxico")]
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

fn format_periods(periods: &[Period]) -> String {
    periods
        .iter()
        .map(|p| p.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

pub type Result<T> = std::result::Result<T, HoldingsError>;
