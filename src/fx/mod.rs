//! USD/MXN exchange-rate series.
//!
//! Banxico publishes daily FIX observations; the enrichment join needs one
//! end-of-month rate per period. This module turns the raw observations into
//! that series, validates it, and decides when a cached copy is stale.

#[cfg(feature = "banxico")]
pub mod banxico;

#[cfg(feature = "banxico")]
pub use banxico::BanxicoClient;

use crate::config::FxValidation;
use crate::error::{HoldingsError, Result};
use crate::merger::validate_rates;
use crate::schema::{ExchangeRate, Period};
use chrono::NaiveDate;
use log::{debug, info};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;
use std::time::SystemTime;

/// Banxico SIE series id for the USD/MXN FIX rate.
pub const USD_MXN_SERIES: &str = "SF43718";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieResponse {
    pub bmx: SieBody,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieBody {
    pub series: Vec<SieSeries>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SieSeries {
    #[serde(rename = "idSerie", default)]
    pub id: String,
    #[serde(default)]
    pub datos: Vec<Observation>,
}

/// One daily observation as published: `fecha` is `dd/mm/YYYY`, `dato` is
/// the rate as text (or a marker such as `N/E` when not published).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub fecha: String,
    pub dato: String,
}

impl Observation {
    pub fn new(fecha: impl Into<String>, dato: impl Into<String>) -> Self {
        Self {
            fecha: fecha.into(),
            dato: dato.into(),
        }
    }

    fn parse(&self) -> Option<(NaiveDate, Decimal)> {
        let date = NaiveDate::parse_from_str(self.fecha.trim(), "%d/%m/%Y").ok()?;
        let value = Decimal::from_str(self.dato.replace(',', "").trim()).ok()?;
        Some((date, value))
    }
}

/// Source of raw rate observations.
pub trait RateFetcher {
    fn fetch_observations(&self) -> Result<Vec<Observation>>;
}

pub fn parse_sie_payload(raw: &str) -> Result<Vec<Observation>> {
    let response: SieResponse = serde_json::from_str(raw).map_err(|e| {
        HoldingsError::FetchFailed(format!("Invalid response format from Banxico API: {}", e))
    })?;

    let series = response.bmx.series.into_iter().next().ok_or_else(|| {
        HoldingsError::FetchFailed("Invalid response format from Banxico API: no series".to_string())
    })?;

    if series.datos.is_empty() {
        return Err(HoldingsError::FetchFailed(
            "No data returned from Banxico API".to_string(),
        ));
    }

    debug!("Received {} data points for series {}", series.datos.len(), series.id);
    Ok(series.datos)
}

#[derive(Debug, Clone, PartialEq)]
pub struct MonthlyRates {
    /// Ascending by period.
    pub rates: Vec<ExchangeRate>,
    /// Observations with an unparseable date or value.
    pub dropped: usize,
}

/// Keeps the last valid observation of each month.
pub fn end_of_month_rates(observations: &[Observation]) -> MonthlyRates {
    let mut latest: BTreeMap<Period, (NaiveDate, Decimal)> = BTreeMap::new();
    let mut dropped = 0;

    for observation in observations {
        let Some((date, value)) = observation.parse() else {
            dropped += 1;
            continue;
        };

        let entry = latest.entry(Period::from_date(date)).or_insert((date, value));
        if date >= entry.0 {
            *entry = (date, value);
        }
    }

    if dropped > 0 {
        info!("Dropped {} invalid FX observations", dropped);
    }

    MonthlyRates {
        rates: latest
            .into_iter()
            .map(|(period, (_, rate))| ExchangeRate { period, rate })
            .collect(),
        dropped,
    }
}

/// Rejects empty series, duplicate periods, non-positive rates, and rates
/// outside the configured plausibility bounds.
pub fn validate_rate_series(rates: &[ExchangeRate], bounds: &FxValidation) -> Result<()> {
    if rates.is_empty() {
        return Err(HoldingsError::ValidationError {
            context: "FX series".to_string(),
            details: "no exchange rates".to_string(),
        });
    }

    validate_rates(rates)?;

    let min = rates.iter().map(|r| r.rate).min().unwrap_or_default();
    let max = rates.iter().map(|r| r.rate).max().unwrap_or_default();
    if min < bounds.min_rate || max > bounds.max_rate {
        return Err(HoldingsError::RateOutOfRange { min, max });
    }

    info!(
        "Validation passed (FX range: {:.2} to {:.2} MXN/USD)",
        min, max
    );
    Ok(())
}

/// Hours since `path` was last modified, or `None` if it cannot be stat'ed.
pub fn cache_age_hours(path: &Path) -> Option<f64> {
    let modified = std::fs::metadata(path).and_then(|m| m.modified()).ok()?;
    let age = SystemTime::now().duration_since(modified).unwrap_or_default();
    Some(age.as_secs_f64() / 3600.0)
}

/// True when no cached file exists or it is older than `cache_hours`.
pub fn should_refresh(path: &Path, cache_hours: f64) -> bool {
    match cache_age_hours(path) {
        Some(age) => age > cache_hours,
        None => true,
    }
}

/// Fetches, reduces to end-of-month, and validates.
pub fn fetch_monthly_rates(fetcher: &dyn RateFetcher, bounds: &FxValidation) -> Result<Vec<ExchangeRate>> {
    let observations = fetcher.fetch_observations()?;
    let monthly = end_of_month_rates(&observations);
    info!("Extracted {} monthly FX rates", monthly.rates.len());
    if let (Some(first), Some(last)) = (monthly.rates.first(), monthly.rates.last()) {
        info!("Date range: {} to {}", first.period, last.period);
    }
    validate_rate_series(&monthly.rates, bounds)?;
    Ok(monthly.rates)
}
