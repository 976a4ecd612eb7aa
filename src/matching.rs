use crate::diagnostics::{DiagnosticLog, Severity};
use crate::schema::{CanonicalRow, MatchedRow, StageQuantities};
use chrono::NaiveDate;
use log::debug;
use std::collections::{BTreeMap, BTreeSet};

type DateIndex<'a> = BTreeMap<NaiveDate, &'a CanonicalRow>;
type ComboKey = (String, String);

/// Outer-join one style's plan rows against its day-wise actual rows.
///
/// Output carries one row per (po, colour, date) in the union of plan and
/// actual dates, but only for (po, colour) combos the plan knows; actual
/// rows for unplanned combos are excluded with a diagnostic that pins
/// down exactly what was unplanned.
pub fn match_plan_with_actual(
    plan: &[CanonicalRow],
    actual: &[CanonicalRow],
    style_number: &str,
    log: &mut DiagnosticLog,
) -> Vec<MatchedRow> {
    let style_key = style_number.trim().to_uppercase();

    let plan_by_combo = index_by_combo(plan, &style_key);
    let actual_by_combo = index_by_combo(actual, &style_key);

    // Which POs, and which colours per PO, the plan knows for this style.
    let mut plan_pos: BTreeSet<&str> = BTreeSet::new();
    let mut plan_colours_by_po: BTreeMap<&str, BTreeSet<&str>> = BTreeMap::new();
    for (po, colour) in plan_by_combo.keys() {
        plan_pos.insert(po.as_str());
        plan_colours_by_po
            .entry(po.as_str())
            .or_default()
            .insert(colour.as_str());
    }

    report_unplanned_production(
        &plan_by_combo,
        &actual_by_combo,
        &plan_pos,
        &plan_colours_by_po,
        &style_key,
        log,
    );

    let mut matched = Vec::new();
    for ((po, colour), plan_dates) in &plan_by_combo {
        let actual_dates = actual_by_combo.get(&(po.clone(), colour.clone()));

        let mut all_dates: BTreeSet<NaiveDate> = plan_dates.keys().copied().collect();
        if let Some(actual_dates) = actual_dates {
            all_dates.extend(actual_dates.keys().copied());
        }

        for date in all_dates {
            // A missing plan entry means production ran past the planned
            // schedule; a missing actual entry means the date is upcoming
            // or unreported. Either side zero-fills.
            let planned = plan_dates
                .get(&date)
                .map(|r| r.quantities)
                .unwrap_or_else(StageQuantities::zero);
            let actual = actual_dates
                .and_then(|dates| dates.get(&date))
                .map(|r| r.quantities)
                .unwrap_or_else(StageQuantities::zero);

            matched.push(MatchedRow {
                style_no: style_key.clone(),
                po: po.clone(),
                colour: colour.clone(),
                date,
                planned,
                actual,
            });
        }
    }

    debug!(
        "style {}: {} matched rows from {} planned combos",
        style_key,
        matched.len(),
        plan_by_combo.len()
    );
    matched
}

/// Group one side's rows for the style by (po, colour), then by date.
/// BTreeMaps keep combo and date iteration deterministic.
fn index_by_combo<'a>(rows: &'a [CanonicalRow], style_key: &str) -> BTreeMap<ComboKey, DateIndex<'a>> {
    let mut by_combo: BTreeMap<ComboKey, DateIndex<'a>> = BTreeMap::new();
    for row in rows {
        if row.style_no.trim().to_uppercase() != style_key {
            continue;
        }
        let combo = (
            row.po.trim().to_string(),
            row.colour.trim().to_lowercase(),
        );
        by_combo.entry(combo).or_default().insert(row.date, row);
    }
    by_combo
}

fn report_unplanned_production(
    plan_by_combo: &BTreeMap<ComboKey, DateIndex<'_>>,
    actual_by_combo: &BTreeMap<ComboKey, DateIndex<'_>>,
    plan_pos: &BTreeSet<&str>,
    plan_colours_by_po: &BTreeMap<&str, BTreeSet<&str>>,
    style_key: &str,
    log: &mut DiagnosticLog,
) {
    for ((po, colour), dates) in actual_by_combo {
        if plan_by_combo.contains_key(&(po.clone(), colour.clone())) {
            continue;
        }

        let detail = if !plan_pos.contains(po.as_str()) {
            format!(
                "PO '{}' does not exist in the plan for style {}",
                po, style_key
            )
        } else {
            let available = plan_colours_by_po
                .get(po.as_str())
                .map(|colours| colours.iter().copied().collect::<Vec<_>>().join(", "))
                .unwrap_or_default();
            format!(
                "Colour '{}' does not exist for PO '{}' in the plan (available colours: {})",
                colour, po, available
            )
        };

        for (date, row) in dates {
            log.push_at(
                Severity::Warning,
                format!(
                    "Unplanned production ignored: {} (date {}, PO {}, colour {})",
                    detail,
                    date.format("%d/%b/%y"),
                    po,
                    colour
                ),
                row.provenance.clone(),
            );
        }
    }
}
