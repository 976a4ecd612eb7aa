use crate::diagnostics::DiagnosticLog;
use crate::schema::MatchedRow;
use log::debug;

/// Drop matched rows whose ten quantity fields are all zero.
///
/// Order-preserving pure filter; only the removal count is reported,
/// never per-row detail.
pub fn prune_empty_rows(rows: Vec<MatchedRow>, log: &mut DiagnosticLog) -> Vec<MatchedRow> {
    let before = rows.len();
    let kept: Vec<MatchedRow> = rows.into_iter().filter(|r| !r.is_empty()).collect();
    let removed = before - kept.len();

    if removed > 0 {
        log.info(format!(
            "Removed {} row(s) with no planned or actual quantities",
            removed
        ));
    }
    debug!("pruning: kept {} of {} matched rows", kept.len(), before);
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::{Stage, StageQuantities};
    use chrono::NaiveDate;

    fn row(po: &str, colour: &str, planned_cutting: u32, actual_packing: u32) -> MatchedRow {
        let mut planned = StageQuantities::zero();
        planned[Stage::Cutting] = planned_cutting;
        let mut actual = StageQuantities::zero();
        actual[Stage::Packing] = actual_packing;
        MatchedRow {
            style_no: "A1".to_string(),
            po: po.to_string(),
            colour: colour.to_string(),
            date: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            planned,
            actual,
        }
    }

    #[test]
    fn test_all_zero_rows_removed() {
        let mut log = DiagnosticLog::new();
        let rows = vec![
            row("100", "red", 50, 0),
            row("999", "blue", 0, 0),
            row("100", "red", 0, 1),
        ];

        let kept = prune_empty_rows(rows, &mut log);
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|r| !r.is_empty()));
        assert!(log.entries()[0].message.contains("1 row(s)"));
    }

    #[test]
    fn test_order_preserved() {
        let mut log = DiagnosticLog::new();
        let rows = vec![
            row("300", "red", 1, 0),
            row("100", "red", 2, 0),
            row("200", "red", 3, 0),
        ];

        let kept = prune_empty_rows(rows, &mut log);
        let pos: Vec<&str> = kept.iter().map(|r| r.po.as_str()).collect();
        assert_eq!(pos, vec!["300", "100", "200"]);
    }

    #[test]
    fn test_idempotent() {
        let mut log = DiagnosticLog::new();
        let rows = vec![row("100", "red", 50, 0), row("999", "blue", 0, 0)];

        let once = prune_empty_rows(rows, &mut log);
        let twice = prune_empty_rows(once.clone(), &mut log);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_removal_no_diagnostic() {
        let mut log = DiagnosticLog::new();
        let kept = prune_empty_rows(vec![row("100", "red", 50, 0)], &mut log);
        assert_eq!(kept.len(), 1);
        assert!(log.is_empty());
    }
}
