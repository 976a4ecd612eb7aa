use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Index, IndexMut};

/// The five sequential production stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum Stage {
    Cutting,
    Sewing,
    Washing,
    Finishing,
    Packing,
}

impl Stage {
    pub const ALL: [Stage; 5] = [
        Stage::Cutting,
        Stage::Sewing,
        Stage::Washing,
        Stage::Finishing,
        Stage::Packing,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Stage::Cutting => "Cutting",
            Stage::Sewing => "Sewing",
            Stage::Washing => "Washing",
            Stage::Finishing => "Finishing",
            Stage::Packing => "Packing",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// One non-negative quantity per stage, indexed by [`Stage`].
///
/// Collapses the five parallel "Planned X" / "Actual X" columns of the
/// source spreadsheets into a single fixed array.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageQuantities(pub [u32; 5]);

impl StageQuantities {
    pub fn zero() -> Self {
        Self::default()
    }

    pub fn is_zero(&self) -> bool {
        self.0.iter().all(|&q| q == 0)
    }

    pub fn total(&self) -> u64 {
        self.0.iter().map(|&q| u64::from(q)).sum()
    }
}

impl Index<Stage> for StageQuantities {
    type Output = u32;

    fn index(&self, stage: Stage) -> &u32 {
        &self.0[stage as usize]
    }
}

impl IndexMut<Stage> for StageQuantities {
    fn index_mut(&mut self, stage: Stage) -> &mut u32 {
        &mut self.0[stage as usize]
    }
}

/// One signed per-stage value; variances can go negative.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDeltas(pub [i64; 5]);

impl StageDeltas {
    /// Per-stage `actual - planned`.
    pub fn variance(actual: &StageQuantities, planned: &StageQuantities) -> Self {
        let mut out = [0i64; 5];
        for stage in Stage::ALL {
            out[stage as usize] =
                i64::from(actual[stage]) - i64::from(planned[stage]);
        }
        Self(out)
    }
}

impl Index<Stage> for StageDeltas {
    type Output = i64;

    fn index(&self, stage: Stage) -> &i64 {
        &self.0[stage as usize]
    }
}

/// Where a row came from: sheet name and 1-based spreadsheet row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Provenance {
    pub sheet: String,
    pub row: u32,
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sheet '{}', row {}", self.sheet, self.row)
    }
}

/// A fully normalized plan or actual-production row.
///
/// Invariant: a `CanonicalRow` always carries a resolved calendar date;
/// rows whose date cannot be parsed or repaired are dropped during
/// ingestion and never reach this type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalRow {
    pub style_no: String,
    pub po: String,
    /// Trimmed, internal whitespace collapsed, lower-cased.
    pub colour: String,
    pub date: NaiveDate,
    /// Order size for the lot. Populated on daily-production rows; plan
    /// rows hold 0.
    pub order_quantity: u32,
    pub quantities: StageQuantities,
    pub provenance: Provenance,
}

impl CanonicalRow {
    pub fn key(&self) -> TrackingKey {
        TrackingKey::new(&self.style_no, &self.po, &self.colour)
    }
}

/// The (style, purchase order, colour) identity of one production lot.
///
/// This is the finest granularity at which plan and actual rows are
/// reconciled; two rows with an equal key describe the same lot across
/// time. `Ord` so keyed maps iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TrackingKey {
    pub style: String,
    pub po: String,
    pub colour: String,
}

impl TrackingKey {
    pub fn new(style: &str, po: &str, colour: &str) -> Self {
        Self {
            style: style.trim().to_uppercase(),
            po: po.trim().to_string(),
            colour: colour.trim().to_lowercase(),
        }
    }
}

impl fmt::Display for TrackingKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "style {}, PO {}, colour {}",
            self.style, self.po, self.colour
        )
    }
}

/// One (lot, date) pairing of planned against actual quantities.
///
/// Emitted only for lots present in the plan; the side with no entry for
/// the date is zero-filled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchedRow {
    pub style_no: String,
    pub po: String,
    pub colour: String,
    pub date: NaiveDate,
    pub planned: StageQuantities,
    pub actual: StageQuantities,
}

impl MatchedRow {
    pub fn key(&self) -> TrackingKey {
        TrackingKey::new(&self.style_no, &self.po, &self.colour)
    }

    /// True when all ten quantity fields are zero.
    pub fn is_empty(&self) -> bool {
        self.planned.is_zero() && self.actual.is_zero()
    }
}

/// A matched row enriched with day-of-week, day-wise variance, and the
/// running cumulative planned/actual/variance as of its date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedRow {
    pub style_no: String,
    pub po: String,
    pub colour: String,
    pub order_quantity: u32,
    pub date: NaiveDate,
    /// Day-of-week name, e.g. "Monday".
    pub day: String,
    pub planned: StageQuantities,
    pub actual: StageQuantities,
    /// `actual - planned` for this date only.
    pub day_variance: StageDeltas,
    pub cumulative_planned: StageQuantities,
    pub cumulative_actual: StageQuantities,
    /// `cumulative_actual - cumulative_planned`.
    pub cumulative_variance: StageDeltas,
}

/// A spreadsheet cell as handed over by the reader, decoupled from any
/// particular spreadsheet crate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RawCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

impl RawCell {
    pub fn is_empty(&self) -> bool {
        match self {
            RawCell::Empty => true,
            RawCell::Text(s) => s.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for RawCell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawCell::Empty => Ok(()),
            RawCell::Text(s) => f.write_str(s),
            RawCell::Number(n) => write!(f, "{}", n),
            RawCell::Date(d) => write!(f, "{}", d.format("%d/%b/%Y")),
        }
    }
}

/// One positionally extracted plan row, pre-normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct RawPlanRow {
    pub style: RawCell,
    pub po: RawCell,
    pub colour: RawCell,
    pub date: RawCell,
    /// Planned quantities in stage order.
    pub quantities: [RawCell; 5],
    /// 1-based spreadsheet row.
    pub row: u32,
}

/// One positionally extracted daily-production row, pre-normalization.
/// The row's date comes from its sheet name, not from a cell.
#[derive(Debug, Clone, PartialEq)]
pub struct RawActualRow {
    pub po: RawCell,
    pub style: RawCell,
    pub colour: RawCell,
    pub order_quantity: RawCell,
    /// Cumulative quantities in stage order.
    pub quantities: [RawCell; 5],
    /// 1-based spreadsheet row.
    pub row: u32,
}

/// Tunable thresholds for date repair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Years outside this window (inclusive) trigger the neighbor-based
    /// year repair.
    pub plausible_year_min: i32,
    pub plausible_year_max: i32,
    /// A year increase within the first N days of January counts as a
    /// legitimate rollover and draws no caution.
    pub january_rollover_days: u32,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            plausible_year_min: 2020,
            plausible_year_max: 2050,
            january_rollover_days: 14,
        }
    }
}

impl ReportConfig {
    pub fn year_is_plausible(&self, year: i32) -> bool {
        (self.plausible_year_min..=self.plausible_year_max).contains(&year)
    }
}
