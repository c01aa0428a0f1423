use crate::error::{HoldingsError, Result};
use rust_decimal::Decimal;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct SheetLayout {
    #[schemars(description = "0-based row holding the period headers (dates) of the value columns.")]
    pub header_row: usize,

    #[schemars(description = "0-based column holding concept labels and, beneath them, entity names.")]
    pub label_column: usize,

    #[schemars(description = "0-based column where the period-valued columns begin.")]
    pub first_value_column: usize,

    #[schemars(description = "Number of consecutive entity rows beneath each concept row.")]
    pub block_size: usize,
}

impl Default for SheetLayout {
    fn default() -> Self {
        Self {
            header_row: 8,
            label_column: 1,
            first_value_column: 4,
            block_size: 10,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ReportEntry {
    #[schemars(description = "Report identifier, substituted into the report file name pattern (e.g. '16' for Reporte-16.xlsx).")]
    pub id: String,

    #[schemars(description = "Category label stamped on every record extracted from this report (the Siefore).")]
    pub category: String,
}

impl ReportEntry {
    pub fn new(id: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            category: category.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ConceptSpec {
    #[schemars(description = "Canonical concept label written to the output records.")]
    pub label: String,

    #[serde(default)]
    #[schemars(description = "Optional text to search for instead of the label. Accents and case are ignored either way.")]
    pub search_term: Option<String>,
}

impl ConceptSpec {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            search_term: None,
        }
    }

    pub fn search_text(&self) -> &str {
        self.search_term.as_deref().unwrap_or(&self.label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FxValidation {
    #[schemars(description = "Lowest plausible rate (MXN per USD).", with = "f64")]
    pub min_rate: Decimal,

    #[schemars(description = "Highest plausible rate (MXN per USD).", with = "f64")]
    pub max_rate: Decimal,
}

impl Default for FxValidation {
    fn default() -> Self {
        Self {
            min_rate: Decimal::from(1),
            max_rate: Decimal::from(30),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PipelineConfig {
    #[serde(default)]
    pub layout: SheetLayout,

    #[schemars(description = "Reports to process, in order, each mapped to its category label.")]
    pub reports: Vec<ReportEntry>,

    #[schemars(description = "Concept blocks to extract from every report.")]
    pub concepts: Vec<ConceptSpec>,

    #[serde(default)]
    pub fx_validation: FxValidation,
}

impl Default for PipelineConfig {
    /// CONSAR Siefore reports 16–26 and the four tracked concepts.
    fn default() -> Self {
        let categories = [
            "Pensiones", "Inicial", "55-59", "60-64", "65-69", "70-74", "75-79", "80-84",
            "85-89", "90-94", "95-99",
        ];

        Self {
            layout: SheetLayout::default(),
            reports: categories
                .iter()
                .enumerate()
                .map(|(offset, category)| ReportEntry::new((16 + offset).to_string(), *category))
                .collect(),
            concepts: vec![
                ConceptSpec::new("Total de Activo"),
                ConceptSpec::new("Inversiones Tercerizadas"),
                ConceptSpec::new("Inversion en Titulos Fiduciarios"),
                ConceptSpec::new("Inversion en Fondos Mutuos"),
            ],
            fx_validation: FxValidation::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_json_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(HoldingsError::MissingInput(path.to_path_buf()));
        }
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |details: String| HoldingsError::ValidationError {
            context: "pipeline config".to_string(),
            details,
        };

        if self.layout.block_size == 0 {
            return Err(invalid("block_size must be at least 1".to_string()));
        }
        if self.layout.first_value_column <= self.layout.label_column {
            return Err(invalid(format!(
                "first_value_column {} must be to the right of label_column {}",
                self.layout.first_value_column, self.layout.label_column
            )));
        }

        let mut seen = HashSet::new();
        for report in &self.reports {
            if !seen.insert(report.id.as_str()) {
                return Err(invalid(format!("report id '{}' listed twice", report.id)));
            }
            if report.category.trim().is_empty() {
                return Err(invalid(format!("report '{}' has an empty category", report.id)));
            }
        }

        for concept in &self.concepts {
            if concept.search_text().trim().is_empty() {
                return Err(invalid(format!(
                    "concept '{}' has an empty search text",
                    concept.label
                )));
            }
        }

        if self.fx_validation.min_rate <= Decimal::ZERO
            || self.fx_validation.min_rate > self.fx_validation.max_rate
        {
            return Err(invalid(format!(
                "fx_validation bounds {}..{} are not a positive range",
                self.fx_validation.min_rate, self.fx_validation.max_rate
            )));
        }

        Ok(())
    }

    pub fn generate_json_schema() -> schemars::schema::RootSchema {
        schemars::schema_for!(PipelineConfig)
    }

    pub fn schema_as_json() -> std::result::Result<String, serde_json::Error> {
        let schema = Self::generate_json_schema();
        serde_json::to_string_pretty(&schema)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_report_table() {
        let config = PipelineConfig::default();
        assert_eq!(config.reports.len(), 11);
        assert_eq!(config.reports[0], ReportEntry::new("16", "Pensiones"));
        assert_eq!(config.reports[1], ReportEntry::new("17", "Inicial"));
        assert_eq!(config.reports[10], ReportEntry::new("26", "95-99"));
        assert_eq!(config.concepts.len(), 4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_schema_generation() {
        let schema_json = PipelineConfig::schema_as_json().unwrap();
        assert!(schema_json.contains("header_row"));
        assert!(schema_json.contains("reports"));
        assert!(schema_json.contains("search_term"));
    }

    #[test]
    fn test_config_round_trip_with_defaults() {
        let raw = r#"{
            "reports": [{"id": "30", "category": "Nueva"}],
            "concepts": [{"label": "Total de Activo"}]
        }"#;
        let config: PipelineConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(config.layout, SheetLayout::default());
        assert_eq!(config.fx_validation, FxValidation::default());
        assert_eq!(config.concepts[0].search_text(), "Total de Activo");
    }

    #[test]
    fn test_validation_rejects_duplicate_reports() {
        let mut config = PipelineConfig::default();
        config.reports.push(ReportEntry::new("16", "Otra"));
        assert!(matches!(
            config.validate(),
            Err(HoldingsError::ValidationError { .. })
        ));
    }

    #[test]
    fn test_validation_rejects_bad_layout() {
        let mut config = PipelineConfig::default();
        config.layout.block_size = 0;
        assert!(config.validate().is_err());

        let mut config = PipelineConfig::default();
        config.layout.first_value_column = 1;
        assert!(config.validate().is_err());
    }
}
