//! # Production Report Builder
//!
//! A library for reconciling garment production plans against cumulative
//! daily production reports, producing one variance ledger per style.
//!
//! ## Core Concepts
//!
//! - **Plan workbook**: one sheet per style, listing planned quantities per
//!   (PO, colour, date) for the five production stages
//! - **Daily production workbook**: one sheet per day, listing cumulative
//!   quantities achieved so far per (PO, style, colour)
//! - **Tracking key**: the (style, PO, colour) identity of a production lot;
//!   plan and actuals are reconciled at this granularity
//! - **Day-wise conversion**: cumulative actuals become per-day deltas before
//!   matching, so both sides speak the same units
//! - **Diagnostics**: every repaired, dropped, or suspicious row is recorded
//!   in an ordered log surfaced alongside the result
//!
//! ## Example
//!
//! ```rust,ignore
//! use production_report_builder::*;
//!
//! let mut log = DiagnosticLog::new();
//! generate_report("plan.xlsx", "daily.xlsx", "report.xlsx", &mut log)?;
//! for diagnostic in &log {
//!     println!("{}", diagnostic);
//! }
//! ```

pub mod aggregation;
pub mod daywise;
pub mod diagnostics;
pub mod engine;
pub mod error;
pub mod ingestion;
pub mod matching;
pub mod pruning;
pub mod schema;
pub mod utils;
pub mod workbook;

pub use aggregation::add_cumulative_columns;
pub use daywise::convert_cumulative_to_daywise;
pub use diagnostics::{Diagnostic, DiagnosticLog, Severity};
pub use engine::{process_report, ActualSheet, PlanSheet, ReportInput};
pub use error::{ReportError, Result};
pub use ingestion::{normalize_actual_rows, normalize_plan_rows};
pub use matching::match_plan_with_actual;
pub use pruning::prune_empty_rows;
pub use schema::*;
pub use utils::*;
pub use workbook::{read_daily_production, read_plan, write_report};

use log::info;
use std::path::Path;

/// Run the full pipeline from files to file: read the plan and daily
/// production workbooks, reconcile them, and write the per-style report.
///
/// The caller owns the diagnostic log so the trail is available whether
/// the run succeeds or aborts.
pub fn generate_report<P: AsRef<Path>>(
    plan_path: P,
    daily_path: P,
    output_path: P,
    log: &mut DiagnosticLog,
) -> Result<()> {
    let config = ReportConfig::default();
    generate_report_with_config(plan_path, daily_path, output_path, &config, log)
}

/// Same as [`generate_report`] but with explicit date-repair thresholds.
pub fn generate_report_with_config<P: AsRef<Path>>(
    plan_path: P,
    daily_path: P,
    output_path: P,
    config: &ReportConfig,
    log: &mut DiagnosticLog,
) -> Result<()> {
    info!(
        "generating report: plan={}, daily={}",
        plan_path.as_ref().display(),
        daily_path.as_ref().display()
    );

    let plan_sheets = read_plan(plan_path, log)?;
    let actual_sheets = read_daily_production(daily_path, log)?;

    let input = ReportInput {
        plan_sheets,
        actual_sheets,
    };
    let sheets = process_report(&input, config, log)?;

    write_report(output_path, &sheets)
}
