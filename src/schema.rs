use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A reporting month. This is the join key between holdings and exchange rates,
/// so it deliberately carries no day or timezone component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "PeriodFields", try_from = "PeriodFields")]
pub struct Period {
    pub year: i32,
    pub month: u32,
}

impl Period {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        if (1..=12).contains(&month) {
            Some(Self { year, month })
        } else {
            None
        }
    }

    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    /// Zero-padded month, e.g. `"08"`.
    pub fn month_label(&self) -> String {
        format!("{:02}", self.month)
    }

    pub fn year_label(&self) -> String {
        self.year.to_string()
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

/// Parses `"YYYY-MM"`.
impl FromStr for Period {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let (year, month) = s
            .trim()
            .split_once('-')
            .ok_or_else(|| format!("Invalid period '{}'. Expected YYYY-MM", s))?;
        PeriodFields {
            year: year.to_string(),
            month: month.to_string(),
        }
        .try_into()
    }
}

/// Wire shape of a period: two string columns, month zero-padded so that
/// lexicographic and chronological order agree.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct PeriodFields {
    #[serde(rename = "PeriodYear")]
    year: String,
    #[serde(rename = "PeriodMonth")]
    month: String,
}

impl From<Period> for PeriodFields {
    fn from(period: Period) -> Self {
        Self {
            year: period.year_label(),
            month: period.month_label(),
        }
    }
}

impl TryFrom<PeriodFields> for Period {
    type Error = String;

    fn try_from(fields: PeriodFields) -> std::result::Result<Self, Self::Error> {
        let year: i32 = fields
            .year
            .trim()
            .parse()
            .map_err(|_| format!("Invalid PeriodYear '{}'", fields.year))?;
        let month: u32 = fields
            .month
            .trim()
            .parse()
            .map_err(|_| format!("Invalid PeriodMonth '{}'", fields.month))?;
        Period::new(year, month).ok_or_else(|| format!("PeriodMonth {} is not in 1..=12", month))
    }
}

/// One extracted value: an entity's amount for a concept in a given month,
/// already scaled to full currency units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldingRecord {
    #[serde(rename = "Afore")]
    pub entity: String,
    #[serde(rename = "Siefore")]
    pub category: String,
    #[serde(rename = "Concept")]
    pub concept: String,
    #[serde(flatten)]
    pub period: Period,
    #[serde(rename = "valueMXN")]
    pub amount_base: Decimal,
}

/// End-of-month conversion rate (base currency units per one converted unit).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExchangeRate {
    #[serde(flatten)]
    pub period: Period,
    #[serde(rename = "FX_EOM")]
    pub rate: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedRecord {
    #[serde(flatten)]
    pub holding: HoldingRecord,
    #[serde(rename = "FX_EOM")]
    pub rate: Option<Decimal>,
    #[serde(rename = "valueUSD")]
    pub amount_converted: Option<Decimal>,
}

impl EnrichedRecord {
    pub fn period(&self) -> Period {
        self.holding.period
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_period_validation_and_display() {
        assert!(Period::new(2024, 0).is_none());
        assert!(Period::new(2024, 13).is_none());
        let period = Period::new(2025, 8).unwrap();
        assert_eq!(period.to_string(), "2025-08");
        assert_eq!(period.month_label(), "08");
        assert_eq!("2025-08".parse::<Period>().unwrap(), period);
        assert!("2025".parse::<Period>().is_err());
        assert!("2025-14".parse::<Period>().is_err());
    }

    #[test]
    fn test_period_ordering_is_chronological() {
        let mut periods = vec![
            Period::new(2025, 1).unwrap(),
            Period::new(2024, 12).unwrap(),
            Period::new(2024, 2).unwrap(),
        ];
        periods.sort();
        assert_eq!(periods[0], Period::new(2024, 2).unwrap());
        assert_eq!(periods[2], Period::new(2025, 1).unwrap());
    }

    #[test]
    fn test_holding_record_wire_format() {
        let record = HoldingRecord {
            entity: "Azteca".to_string(),
            category: "Pensiones".to_string(),
            concept: "Total de Activo".to_string(),
            period: Period::new(2025, 8).unwrap(),
            amount_base: Decimal::from(1_234_500),
        };

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["Afore"], "Azteca");
        assert_eq!(json["Siefore"], "Pensiones");
        assert_eq!(json["PeriodYear"], "2025");
        assert_eq!(json["PeriodMonth"], "08");
        assert_eq!(json["valueMXN"].as_f64(), Some(1234500.0));

        let back: HoldingRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_enriched_record_serializes_absent_rate_as_null() {
        let record = EnrichedRecord {
            holding: HoldingRecord {
                entity: "Coppel".to_string(),
                category: "Inicial".to_string(),
                concept: "Total de Activo".to_string(),
                period: Period::new(2019, 1).unwrap(),
                amount_base: Decimal::from(5000),
            },
            rate: None,
            amount_converted: None,
        };

        let json = serde_json::to_value(&record).unwrap();
        assert!(json["FX_EOM"].is_null());
        assert!(json["valueUSD"].is_null());
        assert_eq!(json["PeriodMonth"], "01");
    }

    #[test]
    fn test_exchange_rate_rejects_bad_month() {
        let raw = r#"{"PeriodYear": "2024", "PeriodMonth": "13", "FX_EOM": 17.1}"#;
        assert!(serde_json::from_str::<ExchangeRate>(raw).is_err());

        let raw = r#"{"PeriodYear": "2024", "PeriodMonth": "03", "FX_EOM": 17.1}"#;
        let rate: ExchangeRate = serde_json::from_str(raw).unwrap();
        assert_eq!(rate.period, Period::new(2024, 3).unwrap());
    }
}
