//! Resolution of column-header values into reporting periods.
//!
//! Header cells arrive as typed dates, as Spanish month abbreviations
//! (`"Ago-2025"`), or as free-form date strings. Resolution never fails: a
//! header that is not a date yields `None` and the column is skipped.
//!
//! Ambiguous numeric dates are read day-first, so `"03/04/2024"` is April 2024.
//! Only when the day-first reading is impossible (`"04/13/2024"`) is the
//! month-first reading tried. This cannot be disambiguated from the data alone.

use crate::schema::Period;
use crate::sheet::Cell;
use chrono::{Datelike, NaiveDate, NaiveDateTime};

pub const SPANISH_MONTHS: [&str; 12] = [
    "Ene", "Feb", "Mar", "Abr", "May", "Jun", "Jul", "Ago", "Sep", "Oct", "Nov", "Dic",
];

const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S%.f",
    "%d/%m/%Y %H:%M:%S",
];

// Two-digit year formats come first; `%Y` would otherwise accept "24" as year 24.
const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%y",
    "%d/%m/%Y",
    "%d-%m-%y",
    "%d-%m-%Y",
    "%d.%m.%Y",
    "%Y-%m-%d",
    "%Y/%m/%d",
    "%d %B %Y",
    "%d %b %Y",
    "%B %d, %Y",
    "%b %d, %Y",
];

const MONTH_FIRST_FORMATS: &[&str] = &["%m/%d/%y", "%m/%d/%Y", "%m-%d-%Y"];

// Month-and-year shapes; parsed with a synthetic leading day.
const MONTH_YEAR_FORMATS: &[&str] = &[
    "%d %b-%Y",
    "%d %B-%Y",
    "%d %b %Y",
    "%d %B %Y",
    "%d %Y-%m",
    "%d %m/%Y",
];

pub fn resolve_period(cell: &Cell) -> Option<Period> {
    match cell {
        Cell::Date(dt) => Some(Period::from_date(dt.date())),
        Cell::Text(text) => resolve_text(text),
        _ => None,
    }
}

pub fn resolve_text(raw: &str) -> Option<Period> {
    let text = raw.trim();
    if text.is_empty() {
        return None;
    }

    spanish_abbreviation(text).or_else(|| parse_generic(text))
}

/// `<Abbrev>-<YYYY>`, exactly two parts, abbreviation from [`SPANISH_MONTHS`]
/// and a four-digit year. Whitespace around the hyphen is not accepted.
pub fn spanish_abbreviation(text: &str) -> Option<Period> {
    let parts: Vec<&str> = text.split('-').collect();
    if parts.len() != 2 {
        return None;
    }

    let (month_name, year) = (parts[0], parts[1]);

    let month_idx = SPANISH_MONTHS
        .iter()
        .position(|m| m.eq_ignore_ascii_case(month_name))?;

    if year.len() != 4 || !year.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Period::new(year.parse().ok()?, month_idx as u32 + 1)
}

pub fn parse_generic(text: &str) -> Option<Period> {
    if let Some(dt) = DATETIME_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDateTime::parse_from_str(text, fmt).ok())
        .find(|dt| plausible_year(dt.date()))
    {
        return Some(Period::from_date(dt.date()));
    }

    let parse_with = |formats: &[&str]| {
        formats
            .iter()
            .filter_map(|fmt| NaiveDate::parse_from_str(text, fmt).ok())
            .find(|date| plausible_year(*date))
    };

    if let Some(date) = parse_with(DAY_FIRST_FORMATS).or_else(|| parse_with(MONTH_FIRST_FORMATS)) {
        return Some(Period::from_date(date));
    }

    let with_day = format!("1 {}", text);
    MONTH_YEAR_FORMATS
        .iter()
        .filter_map(|fmt| NaiveDate::parse_from_str(&with_day, fmt).ok())
        .find(|date| plausible_year(*date))
        .map(Period::from_date)
}

// `%Y` accepts any digit count, so "03/04/24" would otherwise also read as year 3.
fn plausible_year(date: NaiveDate) -> bool {
    (1000..=9999).contains(&date.year())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn period(year: i32, month: u32) -> Option<Period> {
        Period::new(year, month)
    }

    #[test]
    fn test_every_spanish_abbreviation_resolves() {
        for (idx, name) in SPANISH_MONTHS.iter().enumerate() {
            for year in [1998, 2019, 2025] {
                let header = format!("{}-{}", name, year);
                assert_eq!(
                    resolve_text(&header),
                    period(year, idx as u32 + 1),
                    "header {}",
                    header
                );
            }
        }
    }

    #[test]
    fn test_spanish_abbreviation_tolerates_case_and_padding() {
        assert_eq!(resolve_text("  ago-2025 "), period(2025, 8));
        assert_eq!(resolve_text("DIC-2020"), period(2020, 12));
    }

    #[test]
    fn test_spanish_abbreviation_parts_must_be_exact() {
        assert_eq!(spanish_abbreviation("Ago - 2025"), None);
        assert_eq!(spanish_abbreviation("Ago- 2025"), None);
        assert_eq!(resolve_text("Ago - 2025"), None);
    }

    #[test]
    fn test_non_table_two_part_strings_fall_through() {
        // English abbreviations are not in the table but the generic parser knows them.
        assert_eq!(spanish_abbreviation("Aug-2025"), None);
        assert_eq!(resolve_text("Aug-2025"), period(2025, 8));
        assert_eq!(spanish_abbreviation("Jan-2024"), None);
        assert_eq!(resolve_text("Jan-2024"), period(2024, 1));

        // Year must be exactly four digits.
        assert_eq!(spanish_abbreviation("Ago-25"), None);
        assert_eq!(resolve_text("Ago-25"), None);

        // "2025-08" splits into two parts, neither in the table.
        assert_eq!(resolve_text("2025-08"), period(2025, 8));
    }

    #[test]
    fn test_typed_dates() {
        let date = NaiveDate::from_ymd_opt(2024, 2, 29).unwrap();
        assert_eq!(resolve_period(&Cell::from(date)), period(2024, 2));
    }

    #[test]
    fn test_generic_strings() {
        assert_eq!(resolve_text("2025-08-01 00:00:00"), period(2025, 8));
        assert_eq!(resolve_text("2025-08-31"), period(2025, 8));
        assert_eq!(resolve_text("2025/07/31"), period(2025, 7));
        assert_eq!(resolve_text("31.12.2023"), period(2023, 12));
        assert_eq!(resolve_text("August 2025"), period(2025, 8));
        assert_eq!(resolve_text("08/2025"), period(2025, 8));
    }

    #[test]
    fn test_ambiguous_numeric_dates_are_day_first() {
        assert_eq!(resolve_text("03/04/2024"), period(2024, 4));
        assert_eq!(resolve_text("03-04-2024"), period(2024, 4));
        assert_eq!(resolve_text("03/04/24"), period(2024, 4));
        // Day-first impossible, month-first used.
        assert_eq!(resolve_text("04/13/2024"), period(2024, 4));
    }

    #[test]
    fn test_non_dates_resolve_to_none() {
        assert_eq!(resolve_text(""), None);
        assert_eq!(resolve_text("Concepto"), None);
        assert_eq!(resolve_text("Unnamed: 7"), None);
        assert_eq!(resolve_text("Foo-Bar-2024"), None);
        assert_eq!(resolve_period(&Cell::Number(45000.0)), None);
        assert_eq!(resolve_period(&Cell::Empty), None);
    }
}
