//! Cell value normalization.
//!
//! Report values are expressed in thousands of pesos. Every cell is turned into
//! a full-unit amount; placeholders become zero, and so does anything that
//! cannot be parsed, so a single malformed cell never aborts a report. The
//! latter case is reported as [`Normalized::Fallback`] so callers can count it.

use crate::sheet::Cell;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use std::str::FromStr;

/// Multiplier from reported units (thousands) to full currency units.
pub const BASE_UNIT_SCALE: i64 = 1000;

/// Compared case-insensitively after trimming and removing `,`.
pub const PLACEHOLDER_TOKENS: [&str; 6] = ["n/a", "-", "", "nan", "none", "null"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalized {
    Value(Decimal),
    Placeholder,
    Fallback,
}

impl Normalized {
    pub fn amount(&self) -> Decimal {
        match self {
            Normalized::Value(v) => *v,
            Normalized::Placeholder | Normalized::Fallback => Decimal::ZERO,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Normalized::Fallback)
    }
}

pub fn is_placeholder(text: &str) -> bool {
    let token = text.trim().to_lowercase();
    PLACEHOLDER_TOKENS.contains(&token.as_str())
}

pub fn normalize_cell(cell: &Cell) -> Normalized {
    match cell {
        Cell::Empty => Normalized::Placeholder,
        // Excel errors such as #N/A are missing data, not malformed data.
        Cell::Error(_) => Normalized::Placeholder,
        Cell::Text(text) => normalize_text(text),
        Cell::Int(i) => scale(Decimal::from(*i)),
        Cell::Number(f) if f.is_finite() => match Decimal::from_f64(*f) {
            Some(value) => scale(value),
            None => Normalized::Fallback,
        },
        Cell::Number(_) | Cell::Bool(_) | Cell::Date(_) => Normalized::Fallback,
    }
}

pub fn normalize_text(raw: &str) -> Normalized {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();

    if is_placeholder(cleaned) {
        return Normalized::Placeholder;
    }

    match Decimal::from_str(cleaned).or_else(|_| Decimal::from_scientific(cleaned)) {
        Ok(value) => scale(value),
        Err(_) => Normalized::Fallback,
    }
}

/// Amount for a cell, zero for placeholders and unparseable content.
pub fn normalize_amount(cell: &Cell) -> Decimal {
    normalize_cell(cell).amount()
}

fn scale(value: Decimal) -> Normalized {
    value
        .checked_mul(Decimal::from(BASE_UNIT_SCALE))
        .map(|v| Normalized::Value(v.normalize()))
        .unwrap_or(Normalized::Fallback)
}
