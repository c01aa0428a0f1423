//! Three-stage pipeline: rebuild the holdings dataset from the workbooks,
//! obtain the monthly FX series, and write the enriched dataset.
//!
//! Stages run in order and the first failure stops the run. Each stage
//! exchanges data with the next through JSON files under one base directory,
//! so a later stage can be re-run on its own from the cached outputs.

use crate::config::PipelineConfig;
use crate::error::{HoldingsError, Result};
use crate::fx::{fetch_monthly_rates, should_refresh, validate_rate_series, RateFetcher};
use crate::merger::enrich;
use crate::orchestrator::extract_reports;
use crate::schema::{EnrichedRecord, ExchangeRate, HoldingRecord};
use crate::sheet::ReportLoader;
use crate::stats::{DatasetStats, EnrichmentStats};
use crate::storage::{load_json, save_json, write_summary_csv};
use log::{error, info, warn};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Instant;

pub const HOLDINGS_FILE: &str = "consar_siefores_full.json";
pub const RATES_FILE: &str = "fx_data.json";
pub const ENRICHED_FILE: &str = "consar_siefores_with_usd.json";
pub const SUMMARY_FILE: &str = "extraction_summary.csv";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelinePaths {
    pub holdings: PathBuf,
    pub rates: PathBuf,
    pub enriched: PathBuf,
    pub summary: PathBuf,
}

impl PipelinePaths {
    pub fn under(base: &Path) -> Self {
        Self {
            holdings: base.join(HOLDINGS_FILE),
            rates: base.join(RATES_FILE),
            enriched: base.join(ENRICHED_FILE),
            summary: base.join(SUMMARY_FILE),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOptions {
    /// Reuse an existing holdings file instead of re-reading the workbooks.
    pub skip_rebuild: bool,
    /// Reuse an existing rates file regardless of its age, unless `force_fx` is set.
    pub skip_fx: bool,
    /// Fetch rates even when the cached file is fresh.
    pub force_fx: bool,
    pub cache_hours: f64,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            skip_rebuild: false,
            skip_fx: false,
            force_fx: false,
            cache_hours: 24.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Stage {
    Rebuild,
    FetchFx,
    Enrich,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Rebuild, Stage::FetchFx, Stage::Enrich];

    pub fn title(&self) -> &'static str {
        match self {
            Stage::Rebuild => "Rebuild Afore Database",
            Stage::FetchFx => "Fetch Banxico FX Data",
            Stage::Enrich => "Enrich with USD Values",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum StageStatus {
    Completed { records: usize },
    /// An existing output was kept because the caller asked to skip the stage.
    Skipped,
    /// The FX cache was fresh enough to reuse.
    Cached { records: usize },
    Failed(String),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageOutcome {
    pub stage: Stage,
    pub status: StageStatus,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct OutputCheck {
    pub name: &'static str,
    pub path: PathBuf,
    /// `None` when the file does not exist.
    pub size_bytes: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub stages: Vec<StageOutcome>,
    pub outputs: Vec<OutputCheck>,
    pub duration_secs: f64,
}

impl PipelineReport {
    pub fn failed_stage(&self) -> Option<&StageOutcome> {
        self.stages
            .iter()
            .find(|s| matches!(s.status, StageStatus::Failed(_)))
    }

    /// Every stage ran without failing and every output file exists.
    pub fn succeeded(&self) -> bool {
        self.failed_stage().is_none()
            && self.stages.len() == Stage::ALL.len()
            && self.all_outputs_present()
    }

    pub fn all_outputs_present(&self) -> bool {
        self.outputs.iter().all(|o| o.size_bytes.is_some())
    }
}

pub struct Pipeline<'a> {
    config: &'a PipelineConfig,
    loader: &'a dyn ReportLoader,
    fetcher: &'a dyn RateFetcher,
    paths: PipelinePaths,
    options: PipelineOptions,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        config: &'a PipelineConfig,
        loader: &'a dyn ReportLoader,
        fetcher: &'a dyn RateFetcher,
        paths: PipelinePaths,
        options: PipelineOptions,
    ) -> Self {
        Self {
            config,
            loader,
            fetcher,
            paths,
            options,
        }
    }

    pub fn paths(&self) -> &PipelinePaths {
        &self.paths
    }

    pub fn run(&self) -> PipelineReport {
        let started = Instant::now();
        let mut stages = Vec::new();

        for (index, stage) in Stage::ALL.iter().enumerate() {
            info!("STEP {}/{} - {}", index + 1, Stage::ALL.len(), stage.title());

            let status = match self.run_stage(*stage) {
                Ok(status) => status,
                Err(e) => {
                    error!("Pipeline failed at step {}: {}: {}", index + 1, stage.title(), e);
                    StageStatus::Failed(e.to_string())
                }
            };
            let failed = matches!(status, StageStatus::Failed(_));
            stages.push(StageOutcome {
                stage: *stage,
                status,
            });
            if failed {
                break;
            }
        }

        let outputs = self.verify_outputs();
        let report = PipelineReport {
            stages,
            outputs,
            duration_secs: started.elapsed().as_secs_f64(),
        };

        if report.failed_stage().is_none() && !report.all_outputs_present() {
            warn!("Some output files are missing");
        }
        if report.succeeded() {
            info!(
                "Pipeline completed in {:.1} seconds. Final output: {}",
                report.duration_secs,
                self.paths.enriched.display()
            );
        }

        report
    }

    pub fn run_stage(&self, stage: Stage) -> Result<StageStatus> {
        match stage {
            Stage::Rebuild => self.rebuild(),
            Stage::FetchFx => self.fetch_fx(),
            Stage::Enrich => self.enrich(),
        }
    }

    fn rebuild(&self) -> Result<StageStatus> {
        if self.options.skip_rebuild && self.paths.holdings.exists() {
            info!("Skipping database rebuild (file exists): {}", self.paths.holdings.display());
            return Ok(StageStatus::Skipped);
        }

        let run = extract_reports(self.config, self.loader);
        write_summary_csv(&self.paths.summary, &run.summaries)?;
        if run.records.is_empty() {
            return Err(HoldingsError::ValidationError {
                context: "rebuild".to_string(),
                details: "no data extracted; check file paths or sheet structure".to_string(),
            });
        }

        save_json(&self.paths.holdings, &run.records)?;
        DatasetStats::from_records(&run.records).log();

        Ok(StageStatus::Completed {
            records: run.records.len(),
        })
    }

    fn fetch_fx(&self) -> Result<StageStatus> {
        let cached = &self.paths.rates;

        if self.options.skip_fx && !self.options.force_fx && cached.exists() {
            info!("Skipping FX data fetch (file exists): {}", cached.display());
            return Ok(StageStatus::Skipped);
        }

        if !self.options.force_fx && !should_refresh(cached, self.options.cache_hours) {
            info!(
                "Using cached FX data (less than {} hours old): {}",
                self.options.cache_hours,
                cached.display()
            );
            let rates: Vec<ExchangeRate> = load_json(cached)?;
            validate_rate_series(&rates, &self.config.fx_validation)?;
            return Ok(StageStatus::Cached {
                records: rates.len(),
            });
        }

        let rates = fetch_monthly_rates(self.fetcher, &self.config.fx_validation)?;
        save_json(cached, &rates)?;
        Ok(StageStatus::Completed {
            records: rates.len(),
        })
    }

    fn enrich(&self) -> Result<StageStatus> {
        let holdings: Vec<HoldingRecord> = load_json(&self.paths.holdings)?;
        info!("Loaded {} Afore records", holdings.len());
        let rates: Vec<ExchangeRate> = load_json(&self.paths.rates)?;
        info!("Loaded {} FX rates", rates.len());

        let enrichment = enrich(&holdings, &rates)?;
        let records: &[EnrichedRecord] = &enrichment.records;
        save_json(&self.paths.enriched, records)?;
        EnrichmentStats::from_records(records).log();

        Ok(StageStatus::Completed {
            records: records.len(),
        })
    }

    pub fn verify_outputs(&self) -> Vec<OutputCheck> {
        [
            ("Base Database", &self.paths.holdings),
            ("FX Data", &self.paths.rates),
            ("Enriched Database", &self.paths.enriched),
        ]
        .into_iter()
        .map(|(name, path)| {
            let size_bytes = std::fs::metadata(path).ok().map(|m| m.len());
            match size_bytes {
                Some(size) => info!("OK  {:20} : {:.2} MB", name, size as f64 / (1024.0 * 1024.0)),
                None => warn!("MISSING {:20} : {}", name, path.display()),
            }
            OutputCheck {
                name,
                path: path.clone(),
                size_bytes,
            }
        })
        .collect()
    }
}
