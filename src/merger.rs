use crate::error::{HoldingsError, Result};
use crate::schema::{EnrichedRecord, ExchangeRate, HoldingRecord, Period};
use log::{info, warn};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, BTreeSet};

/// How many missing periods are spelled out in the log before summarizing.
const MISSING_PERIODS_LOGGED: usize = 10;

#[derive(Debug, Clone, PartialEq)]
pub struct Enrichment {
    /// One entry per input holding, in input order.
    pub records: Vec<EnrichedRecord>,
    /// Distinct periods with holdings but no rate, ascending.
    pub missing_periods: Vec<Period>,
    pub unmatched_records: usize,
}

impl Enrichment {
    pub fn matched_records(&self) -> usize {
        self.records.len() - self.unmatched_records
    }
}

/// Left-joins holdings with a validated rate series.
pub struct EnrichmentMerger {
    rates: BTreeMap<Period, Decimal>,
}

impl EnrichmentMerger {
    /// Fails if any period appears twice or any rate is not positive.
    pub fn new(rates: &[ExchangeRate]) -> Result<Self> {
        Ok(Self {
            rates: validate_rates(rates)?,
        })
    }

    pub fn rate_for(&self, period: &Period) -> Option<Decimal> {
        self.rates.get(period).copied()
    }

    pub fn merge(&self, holdings: &[HoldingRecord]) -> Enrichment {
        let mut missing: BTreeSet<Period> = BTreeSet::new();
        let mut unmatched_records = 0;

        let records: Vec<EnrichedRecord> = holdings
            .iter()
            .map(|holding| {
                let rate = self.rate_for(&holding.period);
                if rate.is_none() {
                    missing.insert(holding.period);
                    unmatched_records += 1;
                }
                EnrichedRecord {
                    holding: holding.clone(),
                    rate,
                    amount_converted: rate.and_then(|r| holding.amount_base.checked_div(r)),
                }
            })
            .collect();

        let enrichment = Enrichment {
            records,
            missing_periods: missing.into_iter().collect(),
            unmatched_records,
        };

        log_missing_periods(&enrichment);
        info!(
            "Merged {} of {} records with FX data",
            enrichment.matched_records(),
            enrichment.records.len()
        );

        enrichment
    }
}

pub fn validate_rates(rates: &[ExchangeRate]) -> Result<BTreeMap<Period, Decimal>> {
    let mut by_period = BTreeMap::new();
    let mut duplicates = BTreeSet::new();

    for rate in rates {
        if rate.rate <= Decimal::ZERO {
            return Err(HoldingsError::InvalidRate {
                period: rate.period,
                rate: rate.rate,
            });
        }
        if by_period.insert(rate.period, rate.rate).is_some() {
            duplicates.insert(rate.period);
        }
    }

    if !duplicates.is_empty() {
        return Err(HoldingsError::DuplicatePeriods(duplicates.into_iter().collect()));
    }

    Ok(by_period)
}

/// Validates `rates` and left-joins `holdings` onto them.
pub fn enrich(holdings: &[HoldingRecord], rates: &[ExchangeRate]) -> Result<Enrichment> {
    Ok(EnrichmentMerger::new(rates)?.merge(holdings))
}

fn log_missing_periods(enrichment: &Enrichment) {
    if enrichment.missing_periods.is_empty() {
        return;
    }

    warn!(
        "Warning: {} records missing FX data across {} periods",
        enrichment.unmatched_records,
        enrichment.missing_periods.len()
    );
    for period in enrichment.missing_periods.iter().take(MISSING_PERIODS_LOGGED) {
        warn!("  - {}", period);
    }
    if enrichment.missing_periods.len() > MISSING_PERIODS_LOGGED {
        warn!(
            "  ... and {} more",
            enrichment.missing_periods.len() - MISSING_PERIODS_LOGGED
        );
    }
}
