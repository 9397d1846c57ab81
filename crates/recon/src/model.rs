use std::collections::HashMap;
use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;

use crate::diagnostics::DiagnosticLog;

/// Offset between the local (ROC) calendar year and the Gregorian year.
pub const LOCAL_YEAR_OFFSET: i32 = 1911;

// ---------------------------------------------------------------------------
// Periods
// ---------------------------------------------------------------------------

/// A date in the 3-digit-year local calendar, e.g. 113/09/07.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct LocalDate {
    pub year: u16,
    pub month: u8,
    pub day: u8,
}

impl LocalDate {
    /// Returns None for dates that do not exist (month 13, Feb 30, ...).
    pub fn new(year: u16, month: u8, day: u8) -> Option<Self> {
        let date = Self { year, month, day };
        date.to_gregorian().map(|_| date)
    }

    pub fn to_gregorian(&self) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(
            self.year as i32 + LOCAL_YEAR_OFFSET,
            self.month as u32,
            self.day as u32,
        )
    }
}

impl fmt::Display for LocalDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}/{:02}/{:02}", self.year, self.month, self.day)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PeriodKind {
    Weekly,
    Cumulative,
}

impl fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "WEEKLY"),
            Self::Cumulative => write!(f, "CUMULATIVE"),
        }
    }
}

/// Period detected from a file's embedded date range.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PeriodLabel {
    pub kind: PeriodKind,
    pub year: u16,
    pub start: LocalDate,
    pub end: LocalDate,
    /// Text the range was found in.
    pub raw_text: String,
}

impl PeriodLabel {
    /// "(113/09/01~113/09/07)"
    pub fn range_text(&self) -> String {
        format!("({}~{})", self.start, self.end)
    }
}

/// Column group a file's data lands in. Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSlot {
    Weekly,
    Current,
    Prior,
}

impl PeriodSlot {
    pub const ALL: [PeriodSlot; 3] = [PeriodSlot::Weekly, PeriodSlot::Current, PeriodSlot::Prior];
}

impl fmt::Display for PeriodSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Weekly => write!(f, "weekly"),
            Self::Current => write!(f, "current"),
            Self::Prior => write!(f, "prior"),
        }
    }
}

// ---------------------------------------------------------------------------
// Tidy per-file tables
// ---------------------------------------------------------------------------

/// One row per unit, one value per category, no missing cells.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TidyTable {
    pub categories: Vec<String>,
    pub rows: Vec<TidyRow>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TidyRow {
    pub unit: String,
    pub values: Vec<f64>,
}

impl TidyTable {
    pub fn new(categories: Vec<String>) -> Self {
        Self { categories, rows: Vec::new() }
    }

    /// Add values for a unit, summing into an existing row for the same unit.
    pub fn add(&mut self, unit: &str, values: &[f64]) {
        if let Some(row) = self.rows.iter_mut().find(|r| r.unit == unit) {
            for (acc, v) in row.values.iter_mut().zip(values) {
                *acc += v;
            }
        } else {
            let mut padded = values.to_vec();
            padded.resize(self.categories.len(), 0.0);
            self.rows.push(TidyRow { unit: unit.to_string(), values: padded });
        }
    }

    /// Value for (unit, category); 0 when either is absent.
    pub fn value(&self, unit: &str, category: &str) -> f64 {
        let Some(col) = self.categories.iter().position(|c| c == category) else {
            return 0.0;
        };
        self.rows
            .iter()
            .find(|r| r.unit == unit)
            .and_then(|r| r.values.get(col).copied())
            .unwrap_or(0.0)
    }

    pub fn units(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|r| r.unit.as_str())
    }

    /// Combine two tables that cover the same period (e.g. a general and a
    /// pedestrian report). Categories are unioned, units summed.
    pub fn merge(mut self, other: &TidyTable) -> TidyTable {
        for cat in &other.categories {
            if !self.categories.contains(cat) {
                self.categories.push(cat.clone());
                for row in &mut self.rows {
                    row.values.push(0.0);
                }
            }
        }
        let index: HashMap<&str, usize> = self
            .categories
            .iter()
            .enumerate()
            .map(|(i, c)| (c.as_str(), i))
            .collect();
        let width = self.categories.len();

        let mut incoming: Vec<(String, Vec<f64>)> = Vec::with_capacity(other.rows.len());
        for row in &other.rows {
            let mut values = vec![0.0; width];
            for (cat, v) in other.categories.iter().zip(&row.values) {
                if let Some(&i) = index.get(cat.as_str()) {
                    values[i] += v;
                }
            }
            incoming.push((row.unit.clone(), values));
        }
        for (unit, values) in incoming {
            self.add(&unit, &values);
        }
        self
    }
}

/// The per-period tables handed to the reconciler.
#[derive(Debug, Clone, Default)]
pub struct PeriodTables {
    pub weekly: Option<TidyTable>,
    pub current: Option<TidyTable>,
    pub prior: Option<TidyTable>,
}

impl PeriodTables {
    pub fn get(&self, slot: PeriodSlot) -> Option<&TidyTable> {
        match slot {
            PeriodSlot::Weekly => self.weekly.as_ref(),
            PeriodSlot::Current => self.current.as_ref(),
            PeriodSlot::Prior => self.prior.as_ref(),
        }
    }

    pub fn set(&mut self, slot: PeriodSlot, table: TidyTable) {
        match slot {
            PeriodSlot::Weekly => self.weekly = Some(table),
            PeriodSlot::Current => self.current = Some(table),
            PeriodSlot::Prior => self.prior = Some(table),
        }
    }
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "slot")]
pub enum ColumnGroup {
    Period(PeriodSlot),
    /// current − prior
    Delta,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ColumnKey {
    pub group: ColumnGroup,
    pub category: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonRow {
    pub unit: String,
    pub is_total: bool,
    pub values: Vec<f64>,
}

/// Wide table keyed by canonical unit. The total row comes first.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ComparisonTable {
    pub categories: Vec<String>,
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<ComparisonRow>,
}

impl ComparisonTable {
    pub fn column_index(&self, group: ColumnGroup, category: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.group == group && c.category == category)
    }

    pub fn row(&self, unit: &str) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.unit == unit)
    }

    pub fn value(&self, unit: &str, group: ColumnGroup, category: &str) -> Option<f64> {
        let col = self.column_index(group, category)?;
        self.row(unit).and_then(|r| r.values.get(col).copied())
    }

    pub fn total_row(&self) -> Option<&ComparisonRow> {
        self.rows.iter().find(|r| r.is_total)
    }

    pub fn unit_rows(&self) -> impl Iterator<Item = &ComparisonRow> {
        self.rows.iter().filter(|r| !r.is_total)
    }

    pub fn has_group(&self, group: ColumnGroup) -> bool {
        self.columns.iter().any(|c| c.group == group)
    }
}

// ---------------------------------------------------------------------------
// Output
// ---------------------------------------------------------------------------

/// Which files fed a period slot and the range label shown for it.
#[derive(Debug, Clone, Serialize)]
pub struct SlotSource {
    pub slot: PeriodSlot,
    /// "(113/09/01~113/09/07)" or "(0901~0907)"; empty when unknown.
    pub range: String,
    pub files: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportMeta {
    pub config_name: String,
    pub title: String,
    pub mode: String,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportOutcome {
    pub meta: ReportMeta,
    pub slots: Vec<SlotSource>,
    pub comparison: ComparisonTable,
    /// Raw unit names with no canonical mapping, dropped from the comparison.
    pub dropped_units: Vec<String>,
    pub diagnostics: DiagnosticLog,
}

impl ReportOutcome {
    pub fn slot(&self, slot: PeriodSlot) -> Option<&SlotSource> {
        self.slots.iter().find(|s| s.slot == slot)
    }

    /// Sorted input file names; the identity of this batch.
    pub fn batch_key(&self) -> Vec<String> {
        let mut names: Vec<String> = self
            .slots
            .iter()
            .flat_map(|s| s.files.iter().cloned())
            .collect();
        names.sort();
        names.dedup();
        names
    }
}
