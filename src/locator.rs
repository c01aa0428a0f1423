use crate::config::{ConceptSpec, SheetLayout};
use crate::sheet::Sheet;
use crate::utils::{contains_folded, fold_label};

/// Finds the row where a concept's block begins.
///
/// Scans the label column top-to-bottom from the row after the header and
/// returns the first row whose folded label contains the concept's folded
/// search text. Later matches are ignored.
pub fn locate_concept(sheet: &Sheet, layout: &SheetLayout, concept: &ConceptSpec) -> Option<usize> {
    let term = fold_label(concept.search_text());
    if term.is_empty() {
        return None;
    }

    (layout.header_row + 1..sheet.row_count()).find(|&row| {
        let cell = sheet.cell(row, layout.label_column);
        !cell.is_empty() && contains_folded(&fold_label(&cell.display_text()), &term)
    })
}
