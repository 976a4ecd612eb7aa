use crate::schema::{AggregatedRow, MatchedRow, Stage, StageDeltas, StageQuantities, TrackingKey};
use crate::utils::day_of_week_name;
use log::debug;
use std::collections::BTreeMap;

/// Enrich pruned matched rows with day-of-week, day-wise variance, and
/// running cumulative planned/actual/variance per tracking key.
///
/// Rows are grouped by key and walked in date order over an indexed
/// vector; when the date changes, the previous date's totals fold into
/// the running accumulators, and the block of same-date rows is summed by
/// bounded lookahead so all of them carry the same cumulative snapshot.
/// Output is sorted by (style, po, colour, date).
pub fn add_cumulative_columns(rows: Vec<MatchedRow>) -> Vec<AggregatedRow> {
    let mut groups: BTreeMap<TrackingKey, Vec<MatchedRow>> = BTreeMap::new();
    for row in rows {
        groups.entry(row.key()).or_default().push(row);
    }

    let mut out = Vec::new();
    for group in groups.into_values() {
        aggregate_group(group, &mut out);
    }

    out.sort_by(|a, b| {
        (&a.style_no, &a.po, &a.colour, a.date).cmp(&(&b.style_no, &b.po, &b.colour, b.date))
    });
    debug!("aggregation: {} rows", out.len());
    out
}

fn aggregate_group(mut group: Vec<MatchedRow>, out: &mut Vec<AggregatedRow>) {
    group.sort_by_key(|r| r.date);

    // Totals folded in for every date strictly before the current one.
    let mut folded_planned = StageQuantities::zero();
    let mut folded_actual = StageQuantities::zero();

    let mut idx = 0;
    while idx < group.len() {
        let date = group[idx].date;
        let end = group[idx..]
            .iter()
            .position(|r| r.date != date)
            .map(|offset| idx + offset)
            .unwrap_or(group.len());

        // Sum the same-date block so every row in it shares one snapshot.
        let mut date_planned = StageQuantities::zero();
        let mut date_actual = StageQuantities::zero();
        for row in &group[idx..end] {
            for stage in Stage::ALL {
                date_planned[stage] += row.planned[stage];
                date_actual[stage] += row.actual[stage];
            }
        }

        let mut cumulative_planned = folded_planned;
        let mut cumulative_actual = folded_actual;
        for stage in Stage::ALL {
            cumulative_planned[stage] += date_planned[stage];
            cumulative_actual[stage] += date_actual[stage];
        }

        for row in &group[idx..end] {
            out.push(AggregatedRow {
                style_no: row.style_no.clone(),
                po: row.po.clone(),
                colour: row.colour.clone(),
                order_quantity: 0,
                date: row.date,
                day: day_of_week_name(row.date),
                planned: row.planned,
                actual: row.actual,
                day_variance: StageDeltas::variance(&row.actual, &row.planned),
                cumulative_planned,
                cumulative_actual,
                cumulative_variance: StageDeltas::variance(
                    &cumulative_actual,
                    &cumulative_planned,
                ),
            });
        }

        folded_planned = cumulative_planned;
        folded_actual = cumulative_actual;
        idx = end;
    }
}
