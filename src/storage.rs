use crate::error::{HoldingsError, Result};
use crate::orchestrator::ReportSummary;
use log::info;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Reads a JSON document, failing with `MissingInput` if the file is absent.
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.exists() {
        return Err(HoldingsError::MissingInput(path.to_path_buf()));
    }
    let raw = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

/// Writes indented JSON, creating parent directories as needed.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let json = serde_json::to_string_pretty(value)?;
    fs::write(path, json)?;
    info!("Saved {}", path.display());
    Ok(())
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryRow {
    #[serde(rename = "Report_Number")]
    pub report_id: String,
    #[serde(rename = "Siefore")]
    pub category: String,
    #[serde(rename = "Status")]
    pub status: String,
    #[serde(rename = "Records_Extracted")]
    pub records_extracted: usize,
}

impl From<&ReportSummary> for SummaryRow {
    fn from(summary: &ReportSummary) -> Self {
        Self {
            report_id: summary.report_id.clone(),
            category: summary.category.clone(),
            status: summary.status.label().to_string(),
            records_extracted: summary.records_extracted,
        }
    }
}

pub fn write_summary_csv(path: &Path, summaries: &[ReportSummary]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut writer = csv::Writer::from_path(path)?;
    for summary in summaries {
        writer.serialize(SummaryRow::from(summary))?;
    }
    writer.flush()?;
    info!("Saved extraction summary to {}", path.display());
    Ok(())
}

pub fn read_summary_csv(path: &Path) -> Result<Vec<SummaryRow>> {
    if !path.exists() {
        return Err(HoldingsError::MissingInput(path.to_path_buf()));
    }
    let mut reader = csv::Reader::from_path(path)?;
    let rows = reader
        .deserialize()
        .collect::<std::result::Result<Vec<SummaryRow>, csv::Error>>()?;
    Ok(rows)
}
