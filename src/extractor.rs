use crate::config::SheetLayout;
use crate::dates::resolve_period;
use crate::normalize::normalize_cell;
use crate::schema::{HoldingRecord, Period};
use crate::sheet::Sheet;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BlockExtraction {
    /// Entity-major, column-minor discovery order.
    pub records: Vec<HoldingRecord>,
    /// Cells that failed to parse and were recorded as zero.
    pub fallback_cells: usize,
}

/// Entity labels that mark an empty row once trimmed.
pub const NULL_MARKERS: [&str; 2] = ["", "nan"];

pub fn is_null_marker(label: &str) -> bool {
    let label = label.trim().to_lowercase();
    NULL_MARKERS.contains(&label.as_str())
}

/// Value columns whose header resolves to a period. Unresolvable headers are
/// dropped here, so their columns never produce records.
pub fn period_columns(sheet: &Sheet, layout: &SheetLayout) -> Vec<(usize, Period)> {
    (layout.first_value_column..sheet.column_count())
        .filter_map(|col| resolve_period(sheet.cell(layout.header_row, col)).map(|p| (col, p)))
        .collect()
}

/// Reads the entity block beneath `concept_row`.
pub fn extract_block(
    sheet: &Sheet,
    layout: &SheetLayout,
    concept_row: usize,
    concept: &str,
    category: &str,
) -> BlockExtraction {
    let columns = period_columns(sheet, layout);
    let first = concept_row + 1;
    let last = concept_row
        .saturating_add(layout.block_size)
        .min(sheet.row_count().saturating_sub(1));

    let mut extraction = BlockExtraction::default();

    for row in first..=last {
        let entity = sheet.cell(row, layout.label_column).display_text();
        let entity = entity.trim();
        if is_null_marker(entity) {
            continue;
        }

        for &(col, period) in &columns {
            let normalized = normalize_cell(sheet.cell(row, col));
            if normalized.is_fallback() {
                extraction.fallback_cells += 1;
            }

            extraction.records.push(HoldingRecord {
                entity: entity.to_string(),
                category: category.to_string(),
                concept: concept.to_string(),
                period,
                amount_base: normalized.amount(),
            });
        }
    }

    extraction
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sheet::Cell;
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn layout(block_size: usize) -> SheetLayout {
        SheetLayout {
            header_row: 0,
            label_column: 0,
            first_value_column: 1,
            block_size,
        }
    }

    #[test]
    fn test_three_entities_one_valid_column() {
        let sheet = Sheet::new(
            "s",
            vec![
                vec![Cell::from("Concepto"), Cell::from("Ago-2025"), Cell::from("Notas")],
                vec![Cell::from("Total de Activo")],
                vec![Cell::from("  Azteca  "), Cell::from("1,000"), Cell::from("x")],
                vec![Cell::from("Coppel\t"), Cell::from("2,000.5"), Cell::from("y")],
                vec![Cell::from(" Invercap"), Cell::from("N/A"), Cell::from("z")],
            ],
        );

        let extraction = extract_block(&sheet, &layout(3), 1, "Total de Activo", "Pensiones");
        let records = extraction.records;
        assert_eq!(records.len(), 3);

        let entities: Vec<&str> = records.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(entities, vec!["Azteca", "Coppel", "Invercap"]);

        let period = Period::new(2025, 8).unwrap();
        assert!(records.iter().all(|r| r.period == period));
        assert!(records.iter().all(|r| r.category == "Pensiones"));
        assert_eq!(records[0].amount_base, Decimal::from(1_000_000));
        assert_eq!(records[1].amount_base, Decimal::from(2_000_500));
        assert_eq!(records[2].amount_base, Decimal::ZERO);
        assert_eq!(extraction.fallback_cells, 0);
    }

    #[test]
    fn test_blank_entity_rows_are_skipped() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 31).unwrap();
        let sheet = Sheet::new(
            "s",
            vec![
                vec![Cell::Empty, Cell::from(date)],
                vec![Cell::from("Concept")],
                vec![Cell::from("   "), Cell::from("5")],
                vec![Cell::from("nan"), Cell::from("5")],
                vec![Cell::from("Real"), Cell::from("5")],
            ],
        );

        let extraction = extract_block(&sheet, &layout(3), 1, "Concept", "Inicial");
        assert_eq!(extraction.records.len(), 1);
        assert_eq!(extraction.records[0].entity, "Real");
    }

    #[test]
    fn test_only_null_markers_skip_entity_rows() {
        let sheet = Sheet::new(
            "s",
            vec![
                vec![Cell::Empty, Cell::from("Ene-2024")],
                vec![Cell::from("Concept")],
                vec![Cell::from("NaN"), Cell::from("5")],
                vec![Cell::from("-"), Cell::from("6")],
                vec![Cell::from("none"), Cell::from("7")],
            ],
        );

        let extraction = extract_block(&sheet, &layout(3), 1, "Concept", "Inicial");
        let entities: Vec<&str> = extraction.records.iter().map(|r| r.entity.as_str()).collect();
        assert_eq!(entities, vec!["-", "none"]);
        assert!(is_null_marker("  "));
        assert!(!is_null_marker("null"));
    }

    #[test]
    fn test_huge_block_size_does_not_overflow() {
        let sheet = Sheet::new(
            "s",
            vec![
                vec![Cell::Empty, Cell::from("Ene-2024")],
                vec![Cell::from("Concept")],
                vec![Cell::from("Solo"), Cell::from("1")],
            ],
        );

        let extraction = extract_block(&sheet, &layout(usize::MAX), 1, "Concept", "60-64");
        assert_eq!(extraction.records.len(), 1);
    }

    #[test]
    fn test_block_is_clamped_to_sheet_end() {
        let sheet = Sheet::new(
            "s",
            vec![
                vec![Cell::Empty, Cell::from("Ene-2024"), Cell::from("Feb-2024")],
                vec![Cell::from("Concept")],
                vec![Cell::from("Solo"), Cell::from("1"), Cell::from("bad")],
            ],
        );

        let extraction = extract_block(&sheet, &layout(10), 1, "Concept", "60-64");
        assert_eq!(extraction.records.len(), 2);
        assert_eq!(extraction.fallback_cells, 1);
        assert_eq!(extraction.records[1].period, Period::new(2024, 2).unwrap());
        assert_eq!(extraction.records[1].amount_base, Decimal::ZERO);
    }

    #[test]
    fn test_concept_on_last_row_yields_nothing() {
        let sheet = Sheet::new(
            "s",
            vec![
                vec![Cell::Empty, Cell::from("Ene-2024")],
                vec![Cell::from("Concept")],
            ],
        );
        let extraction = extract_block(&sheet, &layout(10), 1, "Concept", "60-64");
        assert!(extraction.records.is_empty());
    }
}
