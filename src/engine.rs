use crate::aggregation::add_cumulative_columns;
use crate::daywise::convert_cumulative_to_daywise;
use crate::diagnostics::DiagnosticLog;
use crate::error::{ReportError, Result};
use crate::ingestion::{normalize_actual_rows, normalize_plan_rows};
use crate::matching::match_plan_with_actual;
use crate::pruning::prune_empty_rows;
use crate::schema::{AggregatedRow, RawActualRow, RawPlanRow, ReportConfig, TrackingKey};
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::BTreeMap;

/// One plan sheet: a style and its positionally extracted rows.
#[derive(Debug, Clone)]
pub struct PlanSheet {
    pub style: String,
    pub rows: Vec<RawPlanRow>,
}

/// One daily-production sheet; the sheet name resolved to its date.
#[derive(Debug, Clone)]
pub struct ActualSheet {
    pub name: String,
    pub date: NaiveDate,
    pub rows: Vec<RawActualRow>,
}

/// Everything one report run consumes, already lifted out of the
/// spreadsheet files by the workbook boundary.
#[derive(Debug, Clone, Default)]
pub struct ReportInput {
    pub plan_sheets: Vec<PlanSheet>,
    pub actual_sheets: Vec<ActualSheet>,
}

/// Run the whole reconciliation pipeline over structured input.
///
/// Returns the per-style aggregated sheets in style order. Style-fatal
/// conditions (no plan rows, nothing surviving the match and prune) drop
/// that style with a warning; run-fatal conditions return an error and
/// produce no output at all. The caller owns the diagnostic log, so the
/// full trail survives either way.
pub fn process_report(
    input: &ReportInput,
    config: &ReportConfig,
    log: &mut DiagnosticLog,
) -> Result<BTreeMap<String, Vec<AggregatedRow>>> {
    if input.plan_sheets.is_empty() {
        return Err(ReportError::NoPlanStyles);
    }

    let mut cumulative_actuals = Vec::new();
    for sheet in &input.actual_sheets {
        cumulative_actuals.extend(normalize_actual_rows(
            &sheet.name,
            sheet.date,
            &sheet.rows,
            log,
        ));
    }
    if cumulative_actuals.is_empty() {
        return Err(ReportError::NoActualData);
    }

    // Order quantity is fixed per lot, so it is captured from the raw
    // cumulative rows before daywise conversion; first occurrence wins.
    let mut order_quantities: BTreeMap<TrackingKey, u32> = BTreeMap::new();
    for row in &cumulative_actuals {
        order_quantities.entry(row.key()).or_insert(row.order_quantity);
    }

    let daywise_actuals = convert_cumulative_to_daywise(cumulative_actuals, log);

    let mut sheets = BTreeMap::new();
    for plan_sheet in &input.plan_sheets {
        let style = plan_sheet.style.trim().to_uppercase();
        info!("processing style {}", style);

        let plan_rows = normalize_plan_rows(&plan_sheet.style, &plan_sheet.rows, config, log);
        if plan_rows.is_empty() {
            warn!("style {}: no plan rows extracted; omitted from report", style);
            log.warning(format!(
                "No plan rows extracted for style {}; style omitted from the report",
                style
            ));
            continue;
        }

        let matched = match_plan_with_actual(&plan_rows, &daywise_actuals, &style, log);
        let pruned = prune_empty_rows(matched, log);
        if pruned.is_empty() {
            warn!("style {}: no rows survived matching; omitted from report", style);
            log.warning(format!(
                "No plan/actual rows with quantities for style {}; style omitted from the report",
                style
            ));
            continue;
        }

        let mut aggregated = add_cumulative_columns(pruned);
        for row in &mut aggregated {
            let key = TrackingKey::new(&row.style_no, &row.po, &row.colour);
            row.order_quantity = order_quantities.get(&key).copied().unwrap_or(0);
        }

        sheets.insert(style, aggregated);
    }

    if sheets.is_empty() {
        return Err(ReportError::NoMatchedData);
    }

    info!("report ready: {} style sheet(s)", sheets.len());
    Ok(sheets)
}
