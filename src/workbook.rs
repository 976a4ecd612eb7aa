use crate::diagnostics::DiagnosticLog;
use crate::engine::{ActualSheet, PlanSheet};
use crate::error::{ReportError, Result};
use crate::schema::{AggregatedRow, RawActualRow, RawCell, RawPlanRow, Stage};
use crate::utils::{date_from_excel_serial, parse_date_text, DateOrder};
use calamine::{open_workbook, Data, Reader, Xlsx};
use log::{debug, info};
use rust_xlsxwriter::{Format, Workbook, XlsxError};
use std::collections::BTreeMap;
use std::path::Path;

/// Expected first four header cells of every plan sheet.
const PLAN_HEADER: [&str; 4] = ["Style #", "PO#", "Colour", "Date"];

/// Plan quantity columns E, G, I, K, M in stage order.
const PLAN_QUANTITY_COLUMNS: [usize; 5] = [4, 6, 8, 10, 12];

/// Daily-production quantity columns H..L in stage order. The source file
/// stores finishing in J and washing in K, the reverse of the pipeline
/// order, so the washing/finishing indices swap here and nowhere else.
const DAILY_QUANTITY_COLUMNS: [usize; 5] = [7, 8, 10, 9, 11];

/// Excel's sheet-name length limit.
const MAX_SHEET_NAME_LEN: usize = 31;

fn cell_from_data(data: &Data) -> RawCell {
    match data {
        Data::Empty => RawCell::Empty,
        Data::String(s) => RawCell::Text(s.clone()),
        Data::Float(f) => RawCell::Number(*f),
        Data::Int(i) => RawCell::Number(*i as f64),
        Data::Bool(b) => RawCell::Text(b.to_string()),
        Data::DateTime(dt) => match date_from_excel_serial(dt.as_f64()) {
            Some(date) => RawCell::Date(date),
            None => RawCell::Number(dt.as_f64()),
        },
        Data::DateTimeIso(s) | Data::DurationIso(s) => RawCell::Text(s.clone()),
        Data::Error(_) => RawCell::Empty,
    }
}

fn cell_at(row: &[Data], index: usize) -> RawCell {
    row.get(index).map(cell_from_data).unwrap_or(RawCell::Empty)
}

/// Read the plan workbook: one sheet per style, columns A..M.
///
/// Sheet-fatal problems (unreadable range, header mismatch) skip the
/// sheet with an error diagnostic and keep going; only a file that cannot
/// be opened at all fails the call.
pub fn read_plan<P: AsRef<Path>>(path: P, log: &mut DiagnosticLog) -> Result<Vec<PlanSheet>> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ReportError::WorkbookOpen {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                log.error(format!(
                    "Could not read plan sheet '{}': {}; sheet skipped",
                    sheet_name, e
                ));
                continue;
            }
        };

        let mut rows_iter = range.rows();
        let header = match rows_iter.next() {
            Some(header) => header,
            None => {
                log.error(format!("Plan sheet '{}' is empty; sheet skipped", sheet_name));
                continue;
            }
        };

        let header_ok = PLAN_HEADER.iter().enumerate().all(|(i, expected)| {
            matches!(header.get(i), Some(Data::String(s)) if s.trim() == *expected)
        });
        if !header_ok {
            log.error(format!(
                "Plan sheet '{}' does not start with the expected {} columns; sheet skipped",
                sheet_name,
                PLAN_HEADER.join("/")
            ));
            continue;
        }

        let mut rows = Vec::new();
        for (index, row) in rows_iter.enumerate() {
            let excel_row = index as u32 + 2;
            let style = cell_at(row, 0);

            if let RawCell::Text(token) = &style {
                let token = token.trim();
                if !token.is_empty() && token != sheet_name {
                    log.warning(format!(
                        "In sheet '{}', cell A{} has '{}' but the sheet is named '{}'; \
                         using it anyway, please fix",
                        sheet_name, excel_row, token, sheet_name
                    ));
                }
            }

            let mut quantities = [
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
            ];
            for (stage, &column) in Stage::ALL.iter().zip(PLAN_QUANTITY_COLUMNS.iter()) {
                quantities[*stage as usize] = cell_at(row, column);
            }

            rows.push(RawPlanRow {
                style,
                po: cell_at(row, 1),
                colour: cell_at(row, 2),
                date: cell_at(row, 3),
                quantities,
                row: excel_row,
            });
        }

        debug!("plan sheet '{}': {} data row(s)", sheet_name, rows.len());
        sheets.push(PlanSheet {
            style: sheet_name,
            rows,
        });
    }

    info!("plan workbook: {} style sheet(s) read", sheets.len());
    Ok(sheets)
}

/// Strip the `PID-`/`PID` prefix off a daily-production style token.
fn strip_style_prefix(token: &str, sheet: &str, excel_row: u32, log: &mut DiagnosticLog) -> String {
    if let Some((_, rest)) = token.split_once("PID-") {
        rest.trim().to_string()
    } else if let Some((_, rest)) = token.split_once("PID") {
        rest.trim().to_string()
    } else {
        log.warning(format!(
            "Sheet '{}', cell E{}: style '{}' has no PID prefix; using it as-is",
            sheet, excel_row, token
        ));
        token.to_string()
    }
}

/// Read the daily-production workbook: one sheet per day, the sheet name
/// being the date in day-first order.
pub fn read_daily_production<P: AsRef<Path>>(
    path: P,
    log: &mut DiagnosticLog,
) -> Result<Vec<ActualSheet>> {
    let path = path.as_ref();
    let mut workbook: Xlsx<_> =
        open_workbook(path).map_err(|e: calamine::XlsxError| ReportError::WorkbookOpen {
            path: path.display().to_string(),
            details: e.to_string(),
        })?;

    let mut sheets = Vec::new();
    for sheet_name in workbook.sheet_names() {
        let date = match parse_date_text(&sheet_name, DateOrder::DayFirst) {
            Some(date) => date,
            None => {
                log.error(format!(
                    "Cannot parse sheet name '{}' as a date; sheet skipped",
                    sheet_name
                ));
                continue;
            }
        };

        let range = match workbook.worksheet_range(&sheet_name) {
            Ok(range) => range,
            Err(e) => {
                log.error(format!(
                    "Could not read daily sheet '{}': {}; sheet skipped",
                    sheet_name, e
                ));
                continue;
            }
        };

        if range.get_size().1 < 12 {
            log.error(format!(
                "Daily sheet '{}' does not have the expected columns A..L; sheet skipped",
                sheet_name
            ));
            continue;
        }

        let mut rows = Vec::new();
        for (index, row) in range.rows().skip(1).enumerate() {
            let excel_row = index as u32 + 2;

            let style = match cell_at(row, 4) {
                RawCell::Text(token) if !token.trim().is_empty() => RawCell::Text(
                    strip_style_prefix(token.trim(), &sheet_name, excel_row, log),
                ),
                other => other,
            };

            let mut quantities = [
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
                RawCell::Empty,
            ];
            for (stage, &column) in Stage::ALL.iter().zip(DAILY_QUANTITY_COLUMNS.iter()) {
                quantities[*stage as usize] = cell_at(row, column);
            }

            rows.push(RawActualRow {
                po: cell_at(row, 0),
                style,
                colour: cell_at(row, 5),
                order_quantity: cell_at(row, 6),
                quantities,
                row: excel_row,
            });
        }

        debug!(
            "daily sheet '{}' ({}): {} data row(s)",
            sheet_name,
            date.format("%d/%b/%y"),
            rows.len()
        );
        sheets.push(ActualSheet {
            name: sheet_name,
            date,
            rows,
        });
    }

    info!("daily workbook: {} day sheet(s) read", sheets.len());
    Ok(sheets)
}

fn report_header() -> Vec<String> {
    let mut header: Vec<String> = ["Style No", "PO", "Colour", "Order Quantity", "Date", "Day"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    for stage in Stage::ALL {
        header.push(format!("Planned {}", stage));
        header.push(format!("Actual {}", stage));
        header.push(format!("Day Actual - Day Planned {}", stage));
        header.push(format!("Cumulative Planned {}", stage));
        header.push(format!("Cumulative Actual {}", stage));
        header.push(format!("Cumulative Actual - Cumulative Planned {}", stage));
    }
    header
}

/// Write the final report: one sheet per style, rows in the order the
/// engine produced them, 36 fixed columns.
pub fn write_report<P: AsRef<Path>>(
    path: P,
    sheets: &BTreeMap<String, Vec<AggregatedRow>>,
) -> Result<()> {
    let path = path.as_ref();
    let wrap = |e: XlsxError| ReportError::WorkbookWrite {
        path: path.display().to_string(),
        details: e.to_string(),
    };

    let mut workbook = Workbook::new();
    let bold = Format::new().set_bold();
    let header = report_header();

    for (style, rows) in sheets {
        let name: String = style.chars().take(MAX_SHEET_NAME_LEN).collect();
        let sheet = workbook.add_worksheet();
        sheet.set_name(&name).map_err(wrap)?;

        for (col, label) in header.iter().enumerate() {
            sheet
                .write_string_with_format(0, col as u16, label, &bold)
                .map_err(wrap)?;
        }

        for (index, row) in rows.iter().enumerate() {
            let r = index as u32 + 1;
            sheet.write_string(r, 0, &row.style_no).map_err(wrap)?;
            sheet.write_string(r, 1, &row.po).map_err(wrap)?;
            sheet.write_string(r, 2, &row.colour).map_err(wrap)?;
            sheet
                .write_number(r, 3, f64::from(row.order_quantity))
                .map_err(wrap)?;
            sheet
                .write_string(r, 4, &row.date.format("%d/%b/%y").to_string())
                .map_err(wrap)?;
            sheet.write_string(r, 5, &row.day).map_err(wrap)?;

            let mut col = 6u16;
            for stage in Stage::ALL {
                sheet
                    .write_number(r, col, f64::from(row.planned[stage]))
                    .map_err(wrap)?;
                sheet
                    .write_number(r, col + 1, f64::from(row.actual[stage]))
                    .map_err(wrap)?;
                sheet
                    .write_number(r, col + 2, row.day_variance[stage] as f64)
                    .map_err(wrap)?;
                sheet
                    .write_number(r, col + 3, f64::from(row.cumulative_planned[stage]))
                    .map_err(wrap)?;
                sheet
                    .write_number(r, col + 4, f64::from(row.cumulative_actual[stage]))
                    .map_err(wrap)?;
                sheet
                    .write_number(r, col + 5, row.cumulative_variance[stage] as f64)
                    .map_err(wrap)?;
                col += 6;
            }
        }

        sheet.autofit();
    }

    workbook.save(path).map_err(wrap)?;
    info!(
        "report written to {} ({} sheet(s))",
        path.display(),
        sheets.len()
    );
    Ok(())
}
