//! Summary statistics logged at the end of the rebuild and enrichment stages.

use crate::schema::{EnrichedRecord, HoldingRecord, Period};
use log::info;
use rust_decimal::Decimal;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetStats {
    pub total_records: usize,
    pub unique_entities: usize,
    pub unique_categories: usize,
    pub unique_concepts: usize,
    pub first_period: Option<Period>,
    pub last_period: Option<Period>,
    pub records_by_category: BTreeMap<String, usize>,
    pub records_by_concept: BTreeMap<String, usize>,
}

impl DatasetStats {
    pub fn from_records(records: &[HoldingRecord]) -> Self {
        let mut entities = BTreeSet::new();
        let mut records_by_category = BTreeMap::new();
        let mut records_by_concept = BTreeMap::new();

        for record in records {
            entities.insert(record.entity.as_str());
            *records_by_category.entry(record.category.clone()).or_insert(0) += 1;
            *records_by_concept.entry(record.concept.clone()).or_insert(0) += 1;
        }

        Self {
            total_records: records.len(),
            unique_entities: entities.len(),
            unique_categories: records_by_category.len(),
            unique_concepts: records_by_concept.len(),
            first_period: records.iter().map(|r| r.period).min(),
            last_period: records.iter().map(|r| r.period).max(),
            records_by_category,
            records_by_concept,
        }
    }

    pub fn log(&self) {
        info!("Total Records:        {}", self.total_records);
        info!("Unique Afores:        {}", self.unique_entities);
        info!("Unique Siefores:      {}", self.unique_categories);
        info!("Unique Concepts:      {}", self.unique_concepts);
        if let (Some(first), Some(last)) = (self.first_period, self.last_period) {
            info!("Date Range:           {} to {}", first, last);
        }
        info!("Siefores included:");
        for (category, count) in &self.records_by_category {
            info!("  - {:12} : {} records", category, count);
        }
        info!("Concepts included:");
        for (concept, count) in &self.records_by_concept {
            info!("  - {:40} : {} records", concept, count);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct RateSummary {
    pub min: Decimal,
    pub max: Decimal,
    pub mean: Decimal,
    pub median: Decimal,
}

impl RateSummary {
    /// `None` for an empty slice.
    pub fn from_rates(rates: &[Decimal]) -> Option<Self> {
        if rates.is_empty() {
            return None;
        }

        let mut sorted = rates.to_vec();
        sorted.sort();

        let count = Decimal::from(sorted.len());
        let total: Decimal = sorted.iter().sum();
        let mid = sorted.len() / 2;
        let median = if sorted.len() % 2 == 0 {
            (sorted[mid - 1] + sorted[mid]) / Decimal::TWO
        } else {
            sorted[mid]
        };

        Some(Self {
            min: sorted[0],
            max: sorted[sorted.len() - 1],
            mean: total / count,
            median,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EnrichmentStats {
    pub dataset: DatasetStats,
    pub records_with_rate: usize,
    pub records_with_converted: usize,
    /// Sums over records that have a converted amount.
    pub total_base: Decimal,
    pub total_converted: Decimal,
    pub rates: Option<RateSummary>,
}

impl EnrichmentStats {
    pub fn from_records(records: &[EnrichedRecord]) -> Self {
        let holdings: Vec<HoldingRecord> = records.iter().map(|r| r.holding.clone()).collect();
        let rates: Vec<Decimal> = records.iter().filter_map(|r| r.rate).collect();
        let converted: Vec<&EnrichedRecord> = records
            .iter()
            .filter(|r| r.amount_converted.is_some())
            .collect();

        Self {
            dataset: DatasetStats::from_records(&holdings),
            records_with_rate: rates.len(),
            records_with_converted: converted.len(),
            total_base: converted.iter().map(|r| r.holding.amount_base).sum(),
            total_converted: converted.iter().filter_map(|r| r.amount_converted).sum(),
            rates: RateSummary::from_rates(&rates),
        }
    }

    pub fn log(&self) {
        info!("Total Records: {}", self.dataset.total_records);
        info!("Records with FX data: {}", self.records_with_rate);
        info!("Records with USD values: {}", self.records_with_converted);
        if let (Some(first), Some(last)) = (self.dataset.first_period, self.dataset.last_period) {
            info!("Date Range: {} to {}", first, last);
        }
        info!("Records by Siefore:");
        for (category, count) in &self.dataset.records_by_category {
            info!("  - {:12} : {} records", category, count);
        }
        if self.records_with_converted > 0 {
            info!("Total valueMXN: {:.0}", self.total_base);
            info!("Total valueUSD: {:.0}", self.total_converted);
        }
        if let Some(rates) = &self.rates {
            info!("FX Rate Statistics:");
            info!("  Min: {:.4} MXN/USD", rates.min);
            info!("  Max: {:.4} MXN/USD", rates.max);
            info!("  Mean: {:.4} MXN/USD", rates.mean);
            info!("  Median: {:.4} MXN/USD", rates.median);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn holding(entity: &str, category: &str, concept: &str, month: u32, amount: i64) -> HoldingRecord {
        HoldingRecord {
            entity: entity.to_string(),
            category: category.to_string(),
            concept: concept.to_string(),
            period: Period::new(2024, month).unwrap(),
            amount_base: Decimal::from(amount),
        }
    }

    #[test]
    fn test_dataset_stats() {
        let records = vec![
            holding("Azteca", "Pensiones", "Total de Activo", 3, 10),
            holding("Coppel", "Pensiones", "Total de Activo", 1, 20),
            holding("Azteca", "Inicial", "Inversiones Tercerizadas", 2, 30),
        ];

        let stats = DatasetStats::from_records(&records);
        assert_eq!(stats.total_records, 3);
        assert_eq!(stats.unique_entities, 2);
        assert_eq!(stats.unique_categories, 2);
        assert_eq!(stats.unique_concepts, 2);
        assert_eq!(stats.first_period, Period::new(2024, 1));
        assert_eq!(stats.last_period, Period::new(2024, 3));
        assert_eq!(stats.records_by_category["Pensiones"], 2);
    }

    #[test]
    fn test_rate_summary() {
        assert!(RateSummary::from_rates(&[]).is_none());

        let rates = [Decimal::from(20), Decimal::from(16), Decimal::from(18), Decimal::from(17)];
        let summary = RateSummary::from_rates(&rates).unwrap();
        assert_eq!(summary.min, Decimal::from(16));
        assert_eq!(summary.max, Decimal::from(20));
        assert_eq!(summary.mean, Decimal::new(1775, 2));
        assert_eq!(summary.median, Decimal::new(175, 1));
    }

    #[test]
    fn test_enrichment_totals_skip_unmatched() {
        let records = vec![
            EnrichedRecord {
                holding: holding("A", "Pensiones", "Total de Activo", 1, 2000),
                rate: Some(Decimal::from(20)),
                amount_converted: Some(Decimal::from(100)),
            },
            EnrichedRecord {
                holding: holding("A", "Pensiones", "Total de Activo", 2, 5000),
                rate: None,
                amount_converted: None,
            },
        ];

        let stats = EnrichmentStats::from_records(&records);
        assert_eq!(stats.records_with_rate, 1);
        assert_eq!(stats.records_with_converted, 1);
        assert_eq!(stats.total_base, Decimal::from(2000));
        assert_eq!(stats.total_converted, Decimal::from(100));
        assert_eq!(stats.rates.unwrap().median, Decimal::from(20));
        assert_eq!(stats.dataset.total_records, 2);
    }
}
