use crate::diagnostics::{DiagnosticLog, Severity};
use crate::schema::{CanonicalRow, Stage, StageQuantities, TrackingKey};
use chrono::NaiveDate;
use log::debug;
use std::collections::BTreeMap;

/// Convert cumulative actual-production counters into day-wise deltas.
///
/// Rows are walked in ascending date order (stable for equal dates); each
/// tracking key keeps the cumulative snapshot of its previous occurrence.
/// A first occurrence passes through unchanged. Negative deltas are
/// clamped to zero and reported, but the stored snapshot always takes the
/// un-clamped cumulative values, so one glitched report does not corrupt
/// every later delta.
pub fn convert_cumulative_to_daywise(
    rows: Vec<CanonicalRow>,
    log: &mut DiagnosticLog,
) -> Vec<CanonicalRow> {
    let mut sorted = rows;
    sorted.sort_by_key(|r| r.date);

    let mut snapshots: BTreeMap<TrackingKey, (NaiveDate, StageQuantities)> = BTreeMap::new();
    let mut out = Vec::with_capacity(sorted.len());

    for mut row in sorted {
        let key = row.key();
        let cumulative = row.quantities;

        if let Some((previous_date, previous)) = snapshots.get(&key) {
            let mut daywise = StageQuantities::zero();
            let mut clamped = false;

            for stage in Stage::ALL {
                if cumulative[stage] >= previous[stage] {
                    daywise[stage] = cumulative[stage] - previous[stage];
                } else {
                    daywise[stage] = 0;
                    clamped = true;
                }
            }

            if clamped {
                log.push(
                    Severity::Warning,
                    format!(
                        "Negative day-wise quantity for {} between {} and {}; using 0 (cumulative totals should never decrease)",
                        key,
                        previous_date.format("%d/%b/%y"),
                        row.date.format("%d/%b/%y")
                    ),
                );
            }

            row.quantities = daywise;
        }

        snapshots.insert(key, (row.date, cumulative));
        out.push(row);
    }

    debug!(
        "daywise conversion: {} rows across {} tracking keys",
        out.len(),
        snapshots.len()
    );
    out
}
