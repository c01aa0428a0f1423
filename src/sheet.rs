//! Tabular access to report workbooks.
//!
//! A [`Sheet`] is a dense grid in absolute worksheet coordinates: row 0 is the
//! first row of the worksheet even when the stored range starts further down,
//! so the fixed offsets of a [`crate::config::SheetLayout`] can be applied
//! directly.

use crate::error::{HoldingsError, Result};
use calamine::{open_workbook_auto, Data, Range, Reader};
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Empty,
    Text(String),
    Number(f64),
    Int(i64),
    Bool(bool),
    Date(NaiveDateTime),
    Error(String),
}

static EMPTY_CELL: Cell = Cell::Empty;

impl Cell {
    pub fn is_empty(&self) -> bool {
        match self {
            Cell::Empty => true,
            Cell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }

    /// Human-readable rendering of the cell, with whole floats printed
    /// without a trailing `.0`.
    pub fn display_text(&self) -> String {
        match self {
            Cell::Empty => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(f) => {
                if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                    format!("{}", *f as i64)
                } else {
                    format!("{}", f)
                }
            }
            Cell::Int(i) => i.to_string(),
            Cell::Bool(b) => b.to_string(),
            Cell::Date(dt) => dt.format("%Y-%m-%d %H:%M:%S").to_string(),
            Cell::Error(e) => format!("#ERR:{}", e),
        }
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value.and_time(chrono::NaiveTime::MIN))
    }
}

impl From<&Data> for Cell {
    fn from(data: &Data) -> Self {
        match data {
            Data::Empty => Cell::Empty,
            Data::String(s) => Cell::Text(s.clone()),
            Data::Float(f) => Cell::Number(*f),
            Data::Int(i) => Cell::Int(*i),
            Data::Bool(b) => Cell::Bool(*b),
            Data::DateTime(dt) => match dt.as_datetime() {
                Some(value) => Cell::Date(value),
                None => Cell::Number(dt.as_f64()),
            },
            Data::DateTimeIso(s) => NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S")
                .map(Cell::Date)
                .unwrap_or_else(|_| Cell::Text(s.clone())),
            Data::DurationIso(s) => Cell::Text(s.clone()),
            Data::Error(e) => Cell::Error(format!("{:?}", e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Sheet {
    pub name: String,
    rows: Vec<Vec<Cell>>,
}

impl Sheet {
    pub fn new(name: impl Into<String>, rows: Vec<Vec<Cell>>) -> Self {
        Self {
            name: name.into(),
            rows,
        }
    }

    pub fn from_range(name: impl Into<String>, range: &Range<Data>) -> Self {
        let (first_row, first_col) = range
            .start()
            .map(|(r, c)| (r as usize, c as usize))
            .unwrap_or((0, 0));

        let mut rows: Vec<Vec<Cell>> = vec![Vec::new(); first_row];
        for row in range.rows() {
            let mut cells = vec![Cell::Empty; first_col];
            cells.extend(row.iter().map(Cell::from));
            rows.push(cells);
        }

        Self::new(name, rows)
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Width of the widest row.
    pub fn column_count(&self) -> usize {
        self.rows.iter().map(Vec::len).max().unwrap_or(0)
    }

    /// Out-of-bounds lookups return an empty cell.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY_CELL)
    }
}

/// Source of report sheets keyed by report identifier.
///
/// Implementations return [`HoldingsError::MissingInput`] when the report does
/// not exist; any other error is treated as an unreadable report.
pub trait ReportLoader {
    fn load(&self, report_id: &str) -> Result<Sheet>;
}

/// Reads the first worksheet of `<dir>/<pattern>` where `{id}` in the pattern
/// is replaced by the report identifier.
#[derive(Debug, Clone)]
pub struct XlsxDirectory {
    pub dir: PathBuf,
    pub file_pattern: String,
}

impl XlsxDirectory {
    pub const DEFAULT_PATTERN: &'static str = "Reporte-{id}.xlsx";

    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            file_pattern: Self::DEFAULT_PATTERN.to_string(),
        }
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.file_pattern = pattern.into();
        self
    }

    pub fn path_for(&self, report_id: &str) -> PathBuf {
        self.dir.join(self.file_pattern.replace("{id}", report_id))
    }
}

impl ReportLoader for XlsxDirectory {
    fn load(&self, report_id: &str) -> Result<Sheet> {
        let path = self.path_for(report_id);
        if !path.exists() {
            return Err(HoldingsError::MissingInput(path));
        }
        read_first_sheet(&path)
    }
}

pub fn read_first_sheet(path: &Path) -> Result<Sheet> {
    let workbook_error = |e: calamine::Error| HoldingsError::WorkbookError {
        path: path.display().to_string(),
        details: e.to_string(),
    };

    let mut workbook = open_workbook_auto(path).map_err(workbook_error)?;
    let name = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| HoldingsError::EmptyWorkbook(path.display().to_string()))?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| HoldingsError::EmptyWorkbook(path.display().to_string()))?
        .map_err(workbook_error)?;

    let sheet = Sheet::from_range(name, &range);
    debug!(
        "Read sheet '{}' from {}: {} rows x {} columns",
        sheet.name,
        path.display(),
        sheet.row_count(),
        sheet.column_count()
    );
    Ok(sheet)
}

/// Loader over sheets held in memory. Reports may also be registered as
/// unreadable to exercise read-error handling.
#[derive(Debug, Clone, Default)]
pub struct InMemoryReports {
    reports: BTreeMap<String, std::result::Result<Sheet, String>>,
}

impl InMemoryReports {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, report_id: impl Into<String>, sheet: Sheet) -> &mut Self {
        self.reports.insert(report_id.into(), Ok(sheet));
        self
    }

    pub fn insert_unreadable(
        &mut self,
        report_id: impl Into<String>,
        reason: impl Into<String>,
    ) -> &mut Self {
        self.reports.insert(report_id.into(), Err(reason.into()));
        self
    }
}

impl ReportLoader for InMemoryReports {
    fn load(&self, report_id: &str) -> Result<Sheet> {
        match self.reports.get(report_id) {
            Some(Ok(sheet)) => Ok(sheet.clone()),
            Some(Err(reason)) => Err(HoldingsError::WorkbookError {
                path: report_id.to_string(),
                details: reason.clone(),
            }),
            None => Err(HoldingsError::MissingInput(PathBuf::from(report_id))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_out_of_bounds_cells_are_empty() {
        let sheet = Sheet::new("S", vec![vec![Cell::from("a")], vec![]]);
        assert_eq!(sheet.cell(0, 0), &Cell::Text("a".to_string()));
        assert_eq!(sheet.cell(0, 5), &Cell::Empty);
        assert_eq!(sheet.cell(9, 0), &Cell::Empty);
        assert_eq!(sheet.column_count(), 1);
    }

    #[test]
    fn test_from_range_keeps_absolute_coordinates() {
        let mut range: Range<Data> = Range::new((2, 1), (3, 2));
        range.set_value((2, 1), Data::String("Total de Activo".to_string()));
        range.set_value((3, 2), Data::Float(12.5));

        let sheet = Sheet::from_range("Hoja1", &range);
        assert_eq!(sheet.row_count(), 4);
        assert_eq!(sheet.cell(2, 1), &Cell::Text("Total de Activo".to_string()));
        assert_eq!(sheet.cell(3, 2), &Cell::Number(12.5));
        assert!(sheet.cell(0, 0).is_empty());
    }

    #[test]
    fn test_display_text() {
        assert_eq!(Cell::Number(1500.0).display_text(), "1500");
        assert_eq!(Cell::Number(12.25).display_text(), "12.25");
        assert_eq!(Cell::Empty.display_text(), "");
        let date = NaiveDate::from_ymd_opt(2025, 8, 1).unwrap();
        assert_eq!(Cell::from(date).display_text(), "2025-08-01 00:00:00");
    }

    #[test]
    fn test_xlsx_directory_reports_missing_file() {
        let loader = XlsxDirectory::new(std::env::temp_dir().join("consar-no-such-dir"));
        assert_eq!(
            loader.path_for("16").file_name().and_then(|n| n.to_str()),
            Some("Reporte-16.xlsx")
        );
        assert!(matches!(
            loader.load("16"),
            Err(HoldingsError::MissingInput(_))
        ));
    }

    #[test]
    fn test_in_memory_loader() {
        let mut loader = InMemoryReports::new();
        loader
            .insert("16", Sheet::new("a", vec![]))
            .insert_unreadable("17", "corrupt zip");

        assert!(loader.load("16").is_ok());
        assert!(matches!(
            loader.load("17"),
            Err(HoldingsError::WorkbookError { .. })
        ));
        assert!(matches!(
            loader.load("18"),
            Err(HoldingsError::MissingInput(_))
        ));
    }
}
