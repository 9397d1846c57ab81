//! Canonical unit mapping and the three-period merge.

use std::collections::HashMap;

use tracing::warn;

use crate::config::{ReportConfig, UnitConfig};
use crate::model::{ColumnGroup, ColumnKey, ComparisonRow, ComparisonTable, PeriodSlot, PeriodTables};

/// Map a raw unit label to its canonical code.
///
/// An exact code match wins; otherwise the first unit (in configured order)
/// with a pattern contained in the label.
pub fn canonical_unit<'a>(label: &str, units: &'a [UnitConfig]) -> Option<&'a str> {
    if let Some(u) = units.iter().find(|u| u.code == label) {
        return Some(&u.code);
    }
    units
        .iter()
        .find(|u| u.patterns.iter().any(|p| label.contains(p.as_str())))
        .map(|u| u.code.as_str())
}

/// Result of reconciliation: the comparison plus raw labels that mapped to nothing.
#[derive(Debug, Clone)]
pub struct Reconciled {
    pub table: ComparisonTable,
    pub dropped_units: Vec<String>,
}

/// Merge per-period tables onto the canonical unit spine.
///
/// Columns: each present period × category, then delta × category when both
/// cumulative periods are present. Rows: the synthetic total first, then every
/// canonical unit that matched at least one source row, in configured order.
pub fn reconcile(tables: &PeriodTables, config: &ReportConfig) -> Reconciled {
    let categories = config.category_names();
    let present: Vec<PeriodSlot> = PeriodSlot::ALL
        .into_iter()
        .filter(|s| tables.get(*s).is_some())
        .collect();
    let with_delta = tables.current.is_some() && tables.prior.is_some();

    let mut columns: Vec<ColumnKey> = Vec::new();
    for slot in &present {
        for cat in &categories {
            columns.push(ColumnKey { group: ColumnGroup::Period(*slot), category: cat.clone() });
        }
    }
    if with_delta {
        for cat in &categories {
            columns.push(ColumnKey { group: ColumnGroup::Delta, category: cat.clone() });
        }
    }

    // canonical code -> column values
    let mut sums: HashMap<&str, Vec<f64>> = HashMap::new();
    let mut dropped: Vec<String> = Vec::new();

    for (slot_idx, slot) in present.iter().enumerate() {
        let Some(table) = tables.get(*slot) else { continue };
        let offset = slot_idx * categories.len();
        for row in &table.rows {
            let Some(code) = canonical_unit(&row.unit, &config.units) else {
                if !dropped.contains(&row.unit) {
                    dropped.push(row.unit.clone());
                }
                continue;
            };
            let values = sums.entry(code).or_insert_with(|| vec![0.0; columns.len()]);
            for (i, cat) in categories.iter().enumerate() {
                values[offset + i] += table.value(&row.unit, cat);
            }
        }
    }

    if with_delta {
        let current = present.iter().position(|s| *s == PeriodSlot::Current).unwrap_or(0) * categories.len();
        let prior = present.iter().position(|s| *s == PeriodSlot::Prior).unwrap_or(0) * categories.len();
        let delta = present.len() * categories.len();
        for values in sums.values_mut() {
            for i in 0..categories.len() {
                values[delta + i] = values[current + i] - values[prior + i];
            }
        }
    }

    let mut unit_rows: Vec<ComparisonRow> = Vec::new();
    for unit in &config.units {
        if let Some(values) = sums.remove(unit.code.as_str()) {
            unit_rows.push(ComparisonRow { unit: unit.code.clone(), is_total: false, values });
        }
    }

    let mut total = vec![0.0; columns.len()];
    for row in &unit_rows {
        for (acc, v) in total.iter_mut().zip(&row.values) {
            *acc += v;
        }
    }

    for unit in &dropped {
        warn!(unit = %unit, "unit has no canonical mapping; dropped");
    }

    let mut rows = Vec::with_capacity(unit_rows.len() + 1);
    rows.push(ComparisonRow { unit: config.labels.total.clone(), is_total: true, values: total });
    rows.extend(unit_rows);

    Reconciled {
        table: ComparisonTable { categories, columns, rows },
        dropped_units: dropped,
    }
}
