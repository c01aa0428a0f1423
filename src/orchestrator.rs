//! Report-level extraction.
//!
//! Each configured report is processed independently into a [`ReportOutcome`];
//! outcomes are then folded into one [`ExtractionRun`]. A missing report or an
//! unreadable workbook only affects its own summary row, and a concept that
//! cannot be found only affects its own block.

use crate::config::{ConceptSpec, PipelineConfig, ReportEntry, SheetLayout};
use crate::error::HoldingsError;
use crate::extractor::{extract_block, BlockExtraction};
use crate::locator::locate_concept;
use crate::schema::HoldingRecord;
use crate::sheet::{ReportLoader, Sheet};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ReportStatus {
    Success,
    FileNotFound,
    ReadError,
}

impl ReportStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ReportStatus::Success => "Success",
            ReportStatus::FileNotFound => "File Not Found",
            ReportStatus::ReadError => "Read Error",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ConceptOutcome {
    Extracted {
        concept: String,
        row: usize,
        extraction: BlockExtraction,
    },
    Skipped {
        concept: String,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ReportOutcome {
    Extracted {
        records: Vec<HoldingRecord>,
        skipped_concepts: Vec<String>,
        fallback_cells: usize,
    },
    NotFound,
    ReadError(String),
}

impl ReportOutcome {
    pub fn status(&self) -> ReportStatus {
        match self {
            ReportOutcome::Extracted { .. } => ReportStatus::Success,
            ReportOutcome::NotFound => ReportStatus::FileNotFound,
            ReportOutcome::ReadError(_) => ReportStatus::ReadError,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub report_id: String,
    pub category: String,
    pub status: ReportStatus,
    pub records_extracted: usize,
    pub skipped_concepts: Vec<String>,
    pub fallback_cells: usize,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExtractionRun {
    pub records: Vec<HoldingRecord>,
    pub summaries: Vec<ReportSummary>,
}

impl ExtractionRun {
    fn absorb(mut self, entry: &ReportEntry, outcome: ReportOutcome) -> Self {
        let status = outcome.status();
        let mut summary = ReportSummary {
            report_id: entry.id.clone(),
            category: entry.category.clone(),
            status,
            records_extracted: 0,
            skipped_concepts: Vec::new(),
            fallback_cells: 0,
            error: None,
        };

        match outcome {
            ReportOutcome::Extracted {
                records,
                skipped_concepts,
                fallback_cells,
            } => {
                summary.records_extracted = records.len();
                summary.skipped_concepts = skipped_concepts;
                summary.fallback_cells = fallback_cells;
                self.records.extend(records);
            }
            ReportOutcome::NotFound => {}
            ReportOutcome::ReadError(reason) => summary.error = Some(reason),
        }

        self.summaries.push(summary);
        self
    }

    pub fn successful_reports(&self) -> usize {
        self.summaries
            .iter()
            .filter(|s| s.status == ReportStatus::Success)
            .count()
    }

    pub fn fallback_cells(&self) -> usize {
        self.summaries.iter().map(|s| s.fallback_cells).sum()
    }
}

pub struct ReportExtractor<'a> {
    layout: &'a SheetLayout,
    concepts: &'a [ConceptSpec],
}

impl<'a> ReportExtractor<'a> {
    pub fn new(layout: &'a SheetLayout, concepts: &'a [ConceptSpec]) -> Self {
        Self { layout, concepts }
    }

    pub fn from_config(config: &'a PipelineConfig) -> Self {
        Self::new(&config.layout, &config.concepts)
    }

    pub fn extract_concept(&self, sheet: &Sheet, concept: &ConceptSpec, category: &str) -> ConceptOutcome {
        match locate_concept(sheet, self.layout, concept) {
            Some(row) => {
                let extraction = extract_block(sheet, self.layout, row, &concept.label, category);
                debug!(
                    "Concept '{}' found at row {} in {}: {} records",
                    concept.label,
                    row,
                    category,
                    extraction.records.len()
                );
                ConceptOutcome::Extracted {
                    concept: concept.label.clone(),
                    row,
                    extraction,
                }
            }
            None => {
                warn!("Concept '{}' not found in {}. Skipping...", concept.label, category);
                ConceptOutcome::Skipped {
                    concept: concept.label.clone(),
                }
            }
        }
    }

    pub fn extract_sheet(&self, sheet: &Sheet, category: &str) -> ReportOutcome {
        let mut records = Vec::new();
        let mut skipped_concepts = Vec::new();
        let mut fallback_cells = 0;

        for concept in self.concepts {
            match self.extract_concept(sheet, concept, category) {
                ConceptOutcome::Extracted { extraction, .. } => {
                    fallback_cells += extraction.fallback_cells;
                    records.extend(extraction.records);
                }
                ConceptOutcome::Skipped { concept } => skipped_concepts.push(concept),
            }
        }

        ReportOutcome::Extracted {
            records,
            skipped_concepts,
            fallback_cells,
        }
    }

    pub fn process_report(&self, loader: &dyn ReportLoader, entry: &ReportEntry) -> ReportOutcome {
        let sheet = match loader.load(&entry.id) {
            Ok(sheet) => sheet,
            Err(HoldingsError::MissingInput(path)) => {
                warn!("Report {} not found: {}", entry.id, path.display());
                return ReportOutcome::NotFound;
            }
            Err(e) => {
                warn!("Error reading report {}: {}", entry.id, e);
                return ReportOutcome::ReadError(e.to_string());
            }
        };

        info!("Processing {:12} from report {}...", entry.category, entry.id);
        let outcome = self.extract_sheet(&sheet, &entry.category);
        if let ReportOutcome::Extracted {
            records,
            fallback_cells,
            ..
        } = &outcome
        {
            info!("   -> {} records extracted.", records.len());
            if *fallback_cells > 0 {
                warn!(
                    "   -> {} cells in report {} could not be parsed and were recorded as 0",
                    fallback_cells, entry.id
                );
            }
        }
        outcome
    }

    pub fn run(&self, loader: &dyn ReportLoader, reports: &[ReportEntry]) -> ExtractionRun {
        reports
            .iter()
            .map(|entry| (entry, self.process_report(loader, entry)))
            .fold(ExtractionRun::default(), |run, (entry, outcome)| {
                run.absorb(entry, outcome)
            })
    }
}

/// Runs every configured report through the extractor.
pub fn extract_reports(config: &PipelineConfig, loader: &dyn ReportLoader) -> ExtractionRun {
    ReportExtractor::from_config(config).run(loader, &config.reports)
}
