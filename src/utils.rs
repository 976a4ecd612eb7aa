use crate::schema::RawCell;
use chrono::{Duration, NaiveDate};

/// Which side of an ambiguous numeric date wins.
///
/// Plan cells are authored month-first; daily-production sheet names are
/// day-first.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DateOrder {
    MonthFirst,
    DayFirst,
}

// The two-digit-year format of each pair must come first: `%Y` accepts a
// bare "25" as year 25, so trying it before `%y` would turn every
// DD/Mon/YY date into an implausible first-century one.
const MONTH_FIRST_FORMATS: &[&str] = &[
    "%m/%d/%y", "%m/%d/%Y", "%m-%d-%y", "%m-%d-%Y",
    "%d/%b/%y", "%d/%b/%Y", "%d-%b-%y", "%d-%b-%Y",
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y",
    "%Y-%m-%d", "%Y/%m/%d",
    "%b %d, %Y", "%d %b %Y", "%d %B %Y",
];

const DAY_FIRST_FORMATS: &[&str] = &[
    "%d/%m/%y", "%d/%m/%Y", "%d-%m-%y", "%d-%m-%Y",
    "%d/%b/%y", "%d/%b/%Y", "%d-%b-%y", "%d-%b-%Y",
    "%m/%d/%y", "%m/%d/%Y",
    "%Y-%m-%d", "%Y/%m/%d",
    "%b %d, %Y", "%d %b %Y", "%d %B %Y",
];

/// Parse loosely formatted date text against a permissive format list.
pub fn parse_date_text(text: &str, order: DateOrder) -> Option<NaiveDate> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let formats = match order {
        DateOrder::MonthFirst => MONTH_FIRST_FORMATS,
        DateOrder::DayFirst => DAY_FIRST_FORMATS,
    };

    for format in formats {
        if let Ok(date) = NaiveDate::parse_from_str(trimmed, format) {
            return Some(date);
        }
    }
    None
}

/// Convert an Excel serial day number to a calendar date.
///
/// Serial 1 is 1900-01-01. Excel counts a phantom 1900-02-29, so serials
/// past it sit one day ahead of the real calendar: serial 60 maps to no
/// date at all, and everything above it uses an epoch shifted back a day.
pub fn date_from_excel_serial(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 1.0 || serial > 300_000.0 {
        return None;
    }
    let days = serial.trunc() as i64;
    if days == 60 {
        return None;
    }
    let epoch = if days < 60 {
        NaiveDate::from_ymd_opt(1899, 12, 31)?
    } else {
        NaiveDate::from_ymd_opt(1899, 12, 30)?
    };
    epoch.checked_add_signed(Duration::days(days))
}

/// Resolve a raw cell to a date: native dates pass through, numbers are
/// treated as Excel serials, text is parsed permissively.
pub fn parse_date_cell(cell: &RawCell, order: DateOrder) -> Option<NaiveDate> {
    match cell {
        RawCell::Date(d) => Some(*d),
        RawCell::Number(n) => date_from_excel_serial(*n),
        RawCell::Text(s) => parse_date_text(s, order),
        RawCell::Empty => None,
    }
}

/// Day-of-week name for presentation, e.g. "Monday".
pub fn day_of_week_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Collapse internal whitespace runs to single spaces and trim the ends.
pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    #[test]
    fn test_parse_month_name_formats() {
        assert_eq!(
            parse_date_text("16/Sep/2025", DateOrder::MonthFirst),
            Some(d(2025, 9, 16))
        );
        assert_eq!(
            parse_date_text("16-Sep-25", DateOrder::DayFirst),
            Some(d(2025, 9, 16))
        );
        assert_eq!(
            parse_date_text("01/Jan/25", DateOrder::MonthFirst),
            Some(d(2025, 1, 1))
        );
    }

    #[test]
    fn test_numeric_ambiguity_follows_order() {
        assert_eq!(
            parse_date_text("03/04/2025", DateOrder::MonthFirst),
            Some(d(2025, 3, 4))
        );
        assert_eq!(
            parse_date_text("03/04/2025", DateOrder::DayFirst),
            Some(d(2025, 4, 3))
        );
    }

    #[test]
    fn test_corrupted_year_still_parses() {
        // Repairing the year is the normalizer's job; parsing must not
        // reject it.
        assert_eq!(
            parse_date_text("16/Sep/0202", DateOrder::MonthFirst),
            Some(d(202, 9, 16))
        );
    }

    #[test]
    fn test_two_digit_years_resolve_to_2000s() {
        // A bare "25" must never be taken as the literal year 25; that
        // would send every DD/Mon/YY row into year repair.
        assert_eq!(
            parse_date_text("16/Sep/25", DateOrder::MonthFirst),
            Some(d(2025, 9, 16))
        );
        assert_eq!(
            parse_date_text("04/05/25", DateOrder::DayFirst),
            Some(d(2025, 5, 4))
        );
        assert_eq!(
            parse_date_text("24-Sep-25", DateOrder::DayFirst),
            Some(d(2025, 9, 24))
        );
    }

    #[test]
    fn test_unparseable_returns_none() {
        assert_eq!(parse_date_text("not a date", DateOrder::DayFirst), None);
        assert_eq!(parse_date_text("", DateOrder::DayFirst), None);
    }

    #[test]
    fn test_excel_serial_conversion() {
        assert_eq!(date_from_excel_serial(1.0), Some(d(1900, 1, 1)));
        assert_eq!(date_from_excel_serial(45_931.0), Some(d(2025, 10, 1)));
        assert_eq!(date_from_excel_serial(-5.0), None);
        assert_eq!(date_from_excel_serial(f64::NAN), None);
    }

    #[test]
    fn test_excel_serial_phantom_leap_day() {
        assert_eq!(date_from_excel_serial(59.0), Some(d(1900, 2, 28)));
        assert_eq!(date_from_excel_serial(60.0), None);
        assert_eq!(date_from_excel_serial(61.0), Some(d(1900, 3, 1)));
    }

    #[test]
    fn test_parse_date_cell_variants() {
        assert_eq!(
            parse_date_cell(&RawCell::Date(d(2025, 9, 16)), DateOrder::DayFirst),
            Some(d(2025, 9, 16))
        );
        assert_eq!(
            parse_date_cell(
                &RawCell::Text("16/Sep/25".to_string()),
                DateOrder::DayFirst
            ),
            Some(d(2025, 9, 16))
        );
        assert_eq!(parse_date_cell(&RawCell::Empty, DateOrder::DayFirst), None);
    }

    #[test]
    fn test_day_of_week_name() {
        assert_eq!(day_of_week_name(d(2025, 1, 1)), "Wednesday");
        assert_eq!(day_of_week_name(d(2025, 9, 16)), "Tuesday");
    }

    #[test]
    fn test_collapse_whitespace() {
        assert_eq!(collapse_whitespace("  Dark   Blue "), "Dark Blue");
        assert_eq!(collapse_whitespace("red"), "red");
    }
}
