//! # CONSAR Holdings
//!
//! Extracts Afore holdings from CONSAR Siefore spreadsheet reports into a flat
//! record set and enriches it with end-of-month USD/MXN exchange rates.
//!
//! ## Core Concepts
//!
//! - **Report**: one workbook per Siefore (category), e.g. `Reporte-16.xlsx` → Pensiones
//! - **Concept block**: a labelled row (e.g. "Total de Activo") followed by a fixed-size
//!   block of entity (Afore) rows, one value per period column
//! - **Period**: a calendar month, resolved from the header row; the join key with FX data
//! - **Enrichment**: a left join of holdings onto exchange rates; unmatched periods keep
//!   their record with no rate and no converted amount
//!
//! Amounts are reported in thousands of MXN and stored in base units (×1000).
//!
//! ## Example
//!
//! ```rust,ignore
//! use consar_holdings::*;
//!
//! let config = PipelineConfig::default();
//! let loader = XlsxDirectory::new("reports/2025_10");
//! let rates: Vec<ExchangeRate> = load_json(Path::new("fx_data.json"))?;
//!
//! let processed = process_holdings(&config, &loader, &rates)?;
//! save_json(Path::new("consar_siefores_with_usd.json"), &processed.enrichment.records)?;
//! ```

pub mod config;
pub mod dates;
pub mod error;
pub mod extractor;
pub mod fx;
pub mod locator;
pub mod merger;
pub mod normalize;
pub mod orchestrator;
pub mod pipeline;
pub mod schema;
pub mod sheet;
pub mod stats;
pub mod storage;
pub mod utils;

pub use config::{ConceptSpec, FxValidation, PipelineConfig, ReportEntry, SheetLayout};
pub use dates::resolve_period;
pub use error::{HoldingsError, Result};
pub use extractor::{extract_block, BlockExtraction};
#[cfg(feature = "banxico")]
pub use fx::BanxicoClient;
pub use fx::{end_of_month_rates, fetch_monthly_rates, Observation, RateFetcher};
pub use locator::locate_concept;
pub use merger::{enrich, Enrichment, EnrichmentMerger};
pub use normalize::normalize_amount;
pub use orchestrator::{
    extract_reports, ExtractionRun, ReportExtractor, ReportOutcome, ReportStatus, ReportSummary,
};
pub use pipeline::{
    Pipeline, PipelineOptions, PipelinePaths, PipelineReport, Stage, StageOutcome, StageStatus,
};
pub use schema::*;
pub use sheet::{Cell, InMemoryReports, ReportLoader, Sheet, XlsxDirectory};
pub use stats::{DatasetStats, EnrichmentStats};
pub use storage::{load_json, save_json, write_summary_csv};

use log::{debug, info};

#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedHoldings {
    pub run: ExtractionRun,
    pub enrichment: Enrichment,
}

pub struct HoldingsProcessor;

impl HoldingsProcessor {
    /// Extracts every configured report and joins the result onto `rates`.
    pub fn process(
        config: &PipelineConfig,
        loader: &dyn ReportLoader,
        rates: &[ExchangeRate],
    ) -> Result<ProcessedHoldings> {
        config.validate()?;

        info!(
            "Processing {} reports for {} concepts",
            config.reports.len(),
            config.concepts.len()
        );
        debug!("Sheet layout: {:?}", config.layout);

        let merger = EnrichmentMerger::new(rates)?;
        let run = extract_reports(config, loader);
        let enrichment = merger.merge(&run.records);

        Ok(ProcessedHoldings { run, enrichment })
    }

    /// Like [`HoldingsProcessor::process`], but also applies the configured
    /// plausibility bounds to the rate series.
    pub fn process_with_validation(
        config: &PipelineConfig,
        loader: &dyn ReportLoader,
        rates: &[ExchangeRate],
    ) -> Result<ProcessedHoldings> {
        fx::validate_rate_series(rates, &config.fx_validation)?;
        Self::process(config, loader, rates)
    }
}

pub fn process_holdings(
    config: &PipelineConfig,
    loader: &dyn ReportLoader,
    rates: &[ExchangeRate],
) -> Result<ProcessedHoldings> {
    HoldingsProcessor::process(config, loader, rates)
}
