use crate::diagnostics::{DiagnosticLog, Severity};
use crate::schema::{
    CanonicalRow, Provenance, RawActualRow, RawCell, RawPlanRow, ReportConfig, Stage,
    StageQuantities,
};
use crate::utils::{collapse_whitespace, parse_date_cell, DateOrder};
use chrono::{Datelike, NaiveDate};
use log::debug;

/// Field labels for quantity diagnostics, in stage order.
const PLANNED_LABELS: [&str; 5] = [
    "Planned Cutting",
    "Planned Sewing",
    "Planned Washing",
    "Planned Finishing",
    "Planned Packing",
];

const ACTUAL_LABELS: [&str; 5] = [
    "Actual Cutting",
    "Actual Sewing",
    "Actual Washing",
    "Actual Finishing",
    "Actual Packing",
];

/// Normalize one style's raw plan rows into canonical rows.
///
/// Rows without a resolvable date are dropped with an error diagnostic;
/// every other irregularity is repaired in place and reported. The year
/// heuristic and the chronology check both need neighbor context, so the
/// pass runs over the indexed slice rather than a consuming iterator.
pub fn normalize_plan_rows(
    style_token: &str,
    raw: &[RawPlanRow],
    config: &ReportConfig,
    log: &mut DiagnosticLog,
) -> Vec<CanonicalRow> {
    let mut rows = Vec::new();
    // (slice index, date) of the most recently accepted row.
    let mut last_accepted: Option<(usize, NaiveDate)> = None;
    let last_keyed = last_keyed_plan_index(raw);

    for (idx, r) in raw.iter().enumerate() {
        let here = Provenance {
            sheet: style_token.to_string(),
            row: r.row,
        };

        if plan_keys_blank(r) {
            match last_keyed {
                // Mid-table blank rows are author errors; trailing ones
                // just mark end-of-data.
                Some(last) if idx <= last => {
                    log.push_at(
                        Severity::Warning,
                        "Entire row is blank in the middle of the data",
                        here,
                    );
                }
                _ => {}
            }
            continue;
        }

        let style_no = match cell_to_trimmed_string(&r.style) {
            Some(s) => s,
            None => {
                log.push_at(
                    Severity::Warning,
                    format!("Style # is blank; using sheet name '{}'", style_token),
                    here.clone(),
                );
                style_token.to_string()
            }
        };

        let po = match cell_to_trimmed_string(&r.po) {
            Some(s) => s,
            None => {
                log.push_at(Severity::Warning, "PO# is blank", here.clone());
                String::new()
            }
        };

        let colour = match normalize_colour(&r.colour) {
            Some(s) => s,
            None => {
                log.push_at(Severity::Warning, "Colour is blank", here.clone());
                String::new()
            }
        };

        let date = match resolve_plan_date(r, raw, idx, last_accepted, config, log, &here) {
            Some(d) => d,
            None => continue,
        };

        if let Some((_, previous)) = last_accepted {
            check_chronology(style_token, previous, date, config, log, &here);
        }

        let mut quantities = StageQuantities::zero();
        for stage in Stage::ALL {
            quantities[stage] = normalize_quantity(
                &r.quantities[stage as usize],
                PLANNED_LABELS[stage as usize],
                BlankPolicy::Report,
                log,
                &here,
            );
        }

        rows.push(CanonicalRow {
            style_no,
            po,
            colour,
            date,
            order_quantity: 0,
            quantities,
            provenance: here,
        });
        last_accepted = Some((idx, date));
    }

    debug!(
        "plan sheet '{}': {} of {} raw rows accepted",
        style_token,
        rows.len(),
        raw.len()
    );
    rows
}

/// Normalize one daily-production sheet's raw rows.
///
/// The sheet's own name supplies the date for every row, so no row-level
/// date repair applies here; blank quantities are silently zero.
pub fn normalize_actual_rows(
    sheet_name: &str,
    sheet_date: NaiveDate,
    raw: &[RawActualRow],
    log: &mut DiagnosticLog,
) -> Vec<CanonicalRow> {
    let mut rows = Vec::new();
    let last_keyed = last_keyed_actual_index(raw);

    for (idx, r) in raw.iter().enumerate() {
        let here = Provenance {
            sheet: sheet_name.to_string(),
            row: r.row,
        };

        if actual_keys_blank(r) {
            match last_keyed {
                Some(last) if idx <= last => {
                    log.push_at(
                        Severity::Warning,
                        "Entire row is blank in the middle of the data",
                        here,
                    );
                }
                _ => {}
            }
            continue;
        }

        let po = match cell_to_trimmed_string(&r.po) {
            Some(s) => s,
            None => {
                log.push_at(Severity::Warning, "PO# is blank", here.clone());
                String::new()
            }
        };

        let style_no = match cell_to_trimmed_string(&r.style) {
            Some(s) => s,
            None => {
                log.push_at(Severity::Warning, "Style number is blank", here.clone());
                String::new()
            }
        };

        let colour = match normalize_colour(&r.colour) {
            Some(s) => s,
            None => {
                log.push_at(Severity::Warning, "Colour is blank", here.clone());
                String::new()
            }
        };

        let order_quantity = normalize_quantity(
            &r.order_quantity,
            "Order Quantity",
            BlankPolicy::Silent,
            log,
            &here,
        );

        let mut quantities = StageQuantities::zero();
        for stage in Stage::ALL {
            quantities[stage] = normalize_quantity(
                &r.quantities[stage as usize],
                ACTUAL_LABELS[stage as usize],
                BlankPolicy::Silent,
                log,
                &here,
            );
        }

        rows.push(CanonicalRow {
            style_no,
            po,
            colour,
            date: sheet_date,
            order_quantity,
            quantities,
            provenance: here,
        });
    }

    debug!(
        "daily sheet '{}': {} of {} raw rows accepted",
        sheet_name,
        rows.len(),
        raw.len()
    );
    rows
}

fn plan_keys_blank(r: &RawPlanRow) -> bool {
    r.style.is_empty() && r.po.is_empty() && r.colour.is_empty() && r.date.is_empty()
}

fn actual_keys_blank(r: &RawActualRow) -> bool {
    r.po.is_empty() && r.style.is_empty() && r.colour.is_empty()
}

/// Index of the last row with any key field populated. Blank rows past
/// this point are trailing and end the table.
fn last_keyed_plan_index(raw: &[RawPlanRow]) -> Option<usize> {
    raw.iter().rposition(|r| !plan_keys_blank(r))
}

fn last_keyed_actual_index(raw: &[RawActualRow]) -> Option<usize> {
    raw.iter().rposition(|r| !actual_keys_blank(r))
}

fn cell_to_trimmed_string(cell: &RawCell) -> Option<String> {
    match cell {
        RawCell::Empty => None,
        RawCell::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                None
            } else {
                Some(t.to_string())
            }
        }
        // Numeric identifiers (PO numbers, numeric style codes) render
        // without a trailing ".0".
        RawCell::Number(n) => {
            if n.fract() == 0.0 && n.abs() < 1e15 {
                Some(format!("{}", *n as i64))
            } else {
                Some(format!("{}", n))
            }
        }
        RawCell::Date(d) => Some(d.format("%d/%b/%Y").to_string()),
    }
}

fn normalize_colour(cell: &RawCell) -> Option<String> {
    cell_to_trimmed_string(cell).map(|s| collapse_whitespace(&s).to_lowercase())
}

#[derive(Clone, Copy, PartialEq)]
enum BlankPolicy {
    /// Blank quantity cells are author errors (plan side).
    Report,
    /// Blank quantity cells are ordinary "nothing happened" (actuals).
    Silent,
}

/// Coerce one quantity cell to a non-negative integer, reporting every
/// repair it takes to get there.
fn normalize_quantity(
    cell: &RawCell,
    label: &str,
    blanks: BlankPolicy,
    log: &mut DiagnosticLog,
    here: &Provenance,
) -> u32 {
    let value = match cell {
        RawCell::Empty => {
            if blanks == BlankPolicy::Report {
                log.push_at(
                    Severity::Warning,
                    format!("{} is blank; using 0", label),
                    here.clone(),
                );
            }
            return 0;
        }
        RawCell::Number(n) => *n,
        RawCell::Text(s) => {
            let t = s.trim();
            if t.is_empty() {
                if blanks == BlankPolicy::Report {
                    log.push_at(
                        Severity::Warning,
                        format!("{} is blank; using 0", label),
                        here.clone(),
                    );
                }
                return 0;
            }
            match t.parse::<f64>() {
                Ok(n) => n,
                Err(_) => {
                    log.push_at(
                        Severity::Warning,
                        format!("{} '{}' is not a valid number; using 0", label, t),
                        here.clone(),
                    );
                    return 0;
                }
            }
        }
        RawCell::Date(_) => {
            log.push_at(
                Severity::Warning,
                format!("{} holds a date, not a number; using 0", label),
                here.clone(),
            );
            return 0;
        }
    };

    if !value.is_finite() {
        log.push_at(
            Severity::Warning,
            format!("{} '{}' is not a valid number; using 0", label, value),
            here.clone(),
        );
        return 0;
    }

    if value < 0.0 {
        log.push_at(
            Severity::Warning,
            format!("{} '{}' is negative; using 0", label, value),
            here.clone(),
        );
        return 0;
    }

    if value.fract() != 0.0 {
        let rounded = value.round();
        log.push_at(
            Severity::Warning,
            format!("{} '{}' rounded to {}", label, value, rounded),
            here.clone(),
        );
        return rounded as u32;
    }

    value as u32
}

/// Parse and, when the year is implausible, repair one plan row's date.
///
/// Repair consults the most recently accepted row's year and the next
/// row's year (a bounded forward peek, without consuming it): agreement
/// or a single available neighbor decides; otherwise the row is
/// unrepairable and dropped.
fn resolve_plan_date(
    r: &RawPlanRow,
    raw: &[RawPlanRow],
    idx: usize,
    last_accepted: Option<(usize, NaiveDate)>,
    config: &ReportConfig,
    log: &mut DiagnosticLog,
    here: &Provenance,
) -> Option<NaiveDate> {
    if r.date.is_empty() {
        log.push_at(
            Severity::Error,
            "Date is blank; skipping this row",
            here.clone(),
        );
        return None;
    }

    let parsed = match parse_date_cell(&r.date, DateOrder::MonthFirst) {
        Some(d) => d,
        None => {
            log.push_at(
                Severity::Error,
                format!("Unable to parse date '{}'; skipping this row", r.date),
                here.clone(),
            );
            return None;
        }
    };

    if config.year_is_plausible(parsed.year()) {
        return Some(parsed);
    }

    log.push_at(
        Severity::Warning,
        format!(
            "Suspicious year in date '{}' (parsed as {})",
            r.date,
            parsed.format("%d/%b/%Y")
        ),
        here.clone(),
    );

    let year_above = last_accepted.map(|(_, d)| d.year());
    let year_below = raw.get(idx + 1).and_then(|next| {
        parse_date_cell(&next.date, DateOrder::MonthFirst)
            .map(|d| d.year())
            .filter(|&y| config.year_is_plausible(y))
    });

    let adopted = match (year_above, year_below) {
        (Some(a), Some(b)) if a == b => Some((a, "adjacent rows")),
        (Some(a), None) => Some((a, "the row above")),
        (None, Some(b)) => Some((b, "the row below")),
        _ => None,
    };

    match adopted.and_then(|(y, source)| parsed.with_year(y).map(|d| (d, source))) {
        Some((repaired, source)) => {
            log.push_at(
                Severity::Warning,
                format!(
                    "Auto-corrected date to {} using the year from {}; please verify",
                    repaired.format("%d/%b/%Y"),
                    source
                ),
                here.clone(),
            );
            Some(repaired)
        }
        None => {
            log.push_at(
                Severity::Error,
                format!(
                    "Cannot determine the correct year for '{}'; skipping this row",
                    r.date
                ),
                here.clone(),
            );
            None
        }
    }
}

/// Plan dates should run forward within a sheet. A year increase is only
/// unremarkable as an early-January rollover; everything else draws a
/// caution, but the row is kept.
fn check_chronology(
    style_token: &str,
    previous: NaiveDate,
    current: NaiveDate,
    config: &ReportConfig,
    log: &mut DiagnosticLog,
    here: &Provenance,
) {
    if current.year() > previous.year() {
        let rollover = current.month() == 1 && current.day() <= config.january_rollover_days;
        if !rollover {
            log.push_at(
                Severity::Warning,
                format!(
                    "For style {}, year increased from {} to {} but the date is not in early January; please verify",
                    style_token,
                    previous.year(),
                    current.year()
                ),
                here.clone(),
            );
        }
    } else if current.year() < previous.year() {
        log.push_at(
            Severity::Warning,
            format!(
                "For style {}, year decreased from {} to {}; dates should be chronological",
                style_token,
                previous.year(),
                current.year()
            ),
            here.clone(),
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::TrackingKey;

    fn text(s: &str) -> RawCell {
        RawCell::Text(s.to_string())
    }

    fn plan_row(row: u32, date: &str, cutting: f64) -> RawPlanRow {
        RawPlanRow {
            style: text("A1"),
            po: text("100"),
            colour: text("Red"),
            date: text(date),
            quantities: [
                RawCell::Number(cutting),
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
            ],
            row,
        }
    }

    fn actual_row(row: u32, po: &str, style: &str, colour: &str, cutting: f64) -> RawActualRow {
        RawActualRow {
            po: text(po),
            style: text(style),
            colour: text(colour),
            order_quantity: RawCell::Number(500.0),
            quantities: [
                RawCell::Number(cutting),
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
            ],
            row,
        }
    }

    #[test]
    fn test_accepted_rows_are_canonical() {
        let mut log = DiagnosticLog::new();
        let raw = vec![RawPlanRow {
            style: text(" A1 "),
            po: RawCell::Number(4201959.0),
            colour: text("  Dark   Blue "),
            date: text("16/Sep/25"),
            quantities: [
                RawCell::Number(50.0),
                RawCell::Number(0.0),
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
            ],
            row: 2,
        }];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.style_no, "A1");
        assert_eq!(row.po, "4201959");
        assert_eq!(row.colour, "dark blue");
        assert_eq!(row.date, NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
        assert_eq!(row.quantities[Stage::Cutting], 50);
        assert_eq!(
            row.key(),
            TrackingKey::new("A1", "4201959", "dark blue")
        );
    }

    #[test]
    fn test_blank_date_drops_row() {
        let mut log = DiagnosticLog::new();
        let raw = vec![
            RawPlanRow {
                date: RawCell::Empty,
                ..plan_row(2, "", 10.0)
            },
            plan_row(3, "17/Sep/25", 20.0),
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].provenance.row, 3);
        assert_eq!(log.count_of(Severity::Error), 1);
    }

    #[test]
    fn test_year_repaired_from_following_row() {
        // No preceding row exists, so the forward peek decides.
        let mut log = DiagnosticLog::new();
        let raw = vec![
            plan_row(2, "16/Sep/0202", 10.0),
            plan_row(3, "17/Sep/2025", 20.0),
            plan_row(4, "18/Sep/2025", 30.0),
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].date, NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
        assert!(log
            .entries()
            .iter()
            .any(|d| d.message.contains("Auto-corrected")));
    }

    #[test]
    fn test_year_repaired_from_agreeing_neighbors() {
        let mut log = DiagnosticLog::new();
        let raw = vec![
            plan_row(2, "15/Sep/2025", 10.0),
            plan_row(3, "16/Sep/0202", 20.0),
            plan_row(4, "17/Sep/2025", 30.0),
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].date, NaiveDate::from_ymd_opt(2025, 9, 16).unwrap());
    }

    #[test]
    fn test_unrepairable_year_drops_row() {
        // Neighbors disagree, so there is no defensible repair.
        let mut log = DiagnosticLog::new();
        let raw = vec![
            plan_row(2, "15/Sep/2024", 10.0),
            plan_row(3, "16/Sep/0202", 20.0),
            plan_row(4, "17/Sep/2025", 30.0),
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 2);
        assert!(log
            .entries()
            .iter()
            .any(|d| d.message.contains("Cannot determine the correct year")));
    }

    #[test]
    fn test_lone_implausible_year_drops_row() {
        let mut log = DiagnosticLog::new();
        let raw = vec![plan_row(2, "16/Sep/0202", 10.0)];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert!(rows.is_empty());
        assert_eq!(log.count_of(Severity::Error), 1);
    }

    #[test]
    fn test_january_rollover_is_quiet() {
        let mut log = DiagnosticLog::new();
        let raw = vec![
            plan_row(2, "30/Dec/2025", 10.0),
            plan_row(3, "05/Jan/2026", 20.0),
        ];

        normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert!(!log
            .entries()
            .iter()
            .any(|d| d.message.contains("year increased")));
    }

    #[test]
    fn test_mid_year_increase_draws_caution() {
        let mut log = DiagnosticLog::new();
        let raw = vec![
            plan_row(2, "30/Dec/2025", 10.0),
            plan_row(3, "05/Mar/2026", 20.0),
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 2);
        assert!(log
            .entries()
            .iter()
            .any(|d| d.message.contains("year increased")));
    }

    #[test]
    fn test_year_decrease_draws_caution() {
        let mut log = DiagnosticLog::new();
        let raw = vec![
            plan_row(2, "05/Mar/2026", 10.0),
            plan_row(3, "30/Dec/2025", 20.0),
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 2);
        assert!(log
            .entries()
            .iter()
            .any(|d| d.message.contains("year decreased")));
    }

    #[test]
    fn test_fractional_quantity_rounds_with_report() {
        let mut log = DiagnosticLog::new();
        let raw = vec![plan_row(2, "16/Sep/25", 100.5)];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows[0].quantities[Stage::Cutting], 101);
        let diag = log
            .entries()
            .iter()
            .find(|d| d.message.contains("rounded"))
            .unwrap();
        assert!(diag.message.contains("100.5"));
        assert!(diag.message.contains("101"));
    }

    #[test]
    fn test_trailing_blank_rows_are_silent() {
        let mut log = DiagnosticLog::new();
        let blank = RawPlanRow {
            style: RawCell::Empty,
            po: RawCell::Empty,
            colour: RawCell::Empty,
            date: RawCell::Empty,
            quantities: [
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
            ],
            row: 0,
        };
        let raw = vec![
            plan_row(2, "16/Sep/25", 10.0),
            RawPlanRow { row: 3, ..blank.clone() },
            plan_row(4, "17/Sep/25", 20.0),
            RawPlanRow { row: 5, ..blank.clone() },
            RawPlanRow { row: 6, ..blank },
        ];

        let rows = normalize_plan_rows("A1", &raw, &ReportConfig::default(), &mut log);
        assert_eq!(rows.len(), 2);
        // The mid-table blank at row 3 is reported; rows 5 and 6 are not.
        let blanks: Vec<_> = log
            .entries()
            .iter()
            .filter(|d| d.message.contains("Entire row is blank"))
            .collect();
        assert_eq!(blanks.len(), 1);
        assert_eq!(blanks[0].provenance.as_ref().unwrap().row, 3);
    }

    #[test]
    fn test_actual_rows_take_sheet_date_and_silent_blanks() {
        let mut log = DiagnosticLog::new();
        let date = NaiveDate::from_ymd_opt(2025, 9, 24).unwrap();
        let raw = vec![actual_row(2, "100", "A1", "Red", 30.0)];

        let rows = normalize_actual_rows("24-Sep-25", date, &raw, &mut log);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].date, date);
        assert_eq!(rows[0].order_quantity, 500);
        assert_eq!(rows[0].colour, "red");
        // Four stage cells were blank; actuals report nothing for that.
        assert!(log.is_empty());
    }

    #[test]
    fn test_negative_actual_clamps_to_zero() {
        let mut log = DiagnosticLog::new();
        let date = NaiveDate::from_ymd_opt(2025, 9, 24).unwrap();
        let raw = vec![actual_row(2, "100", "A1", "Red", -5.0)];

        let rows = normalize_actual_rows("24-Sep-25", date, &raw, &mut log);
        assert_eq!(rows[0].quantities[Stage::Cutting], 0);
        assert!(log
            .entries()
            .iter()
            .any(|d| d.message.contains("negative")));
    }

    #[test]
    fn test_non_numeric_quantity_uses_zero() {
        let mut log = DiagnosticLog::new();
        let date = NaiveDate::from_ymd_opt(2025, 9, 24).unwrap();
        let mut raw = actual_row(2, "100", "A1", "Red", 0.0);
        raw.quantities[0] = text("n/a");

        let rows = normalize_actual_rows("24-Sep-25", date, &[raw], &mut log);
        assert_eq!(rows[0].quantities[Stage::Cutting], 0);
        assert!(log
            .entries()
            .iter()
            .any(|d| d.message.contains("not a valid number")));
    }
}
