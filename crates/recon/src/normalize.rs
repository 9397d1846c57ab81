//! Column cleanup, total numeric coercion and keyword-based category sums.

use ticketboard_core::RawGrid;
use tracing::debug;

use crate::config::{CategoryConfig, HeaderConfig, NormalizeConfig};
use crate::model::TidyTable;

/// Drop every whitespace character, including the newlines of wrapped header cells.
pub fn clean_label(label: &str) -> String {
    label.chars().filter(|c| !c.is_whitespace()).collect()
}

/// Parse a cell as a number. Never fails: anything unusable is 0.
///
/// Thousands separators (`,` and `，`) are ignored; empty, `-`, `nan` and
/// non-finite values read as 0.
pub fn coerce_number(cell: &str) -> f64 {
    let cleaned: String = cell
        .chars()
        .filter(|c| !c.is_whitespace() && *c != ',' && *c != '，')
        .collect();
    if cleaned.is_empty() || cleaned == "-" || cleaned.eq_ignore_ascii_case("nan") {
        return 0.0;
    }
    match cleaned.parse::<f64>() {
        Ok(n) if n.is_finite() => n,
        _ => 0.0,
    }
}

/// True for unit cells that label a pre-aggregated row in the source.
pub fn is_aggregate_marker(unit: &str, markers: &[String]) -> bool {
    markers.iter().any(|m| {
        if m.eq_ignore_ascii_case("nan") {
            unit.eq_ignore_ascii_case("nan")
        } else {
            unit == m
        }
    })
}

/// Columns (by index) whose cleaned label matches a category's keywords.
///
/// A label matches when it starts with a prefix keyword or contains a
/// contains-keyword. `skip` excludes the unit column. Result is sorted and
/// deduplicated so a column matching several keywords is summed once.
pub fn match_columns(labels: &[String], category: &CategoryConfig, skip: Option<usize>) -> Vec<usize> {
    let mut cols: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(i, _)| Some(*i) != skip)
        .filter(|(_, label)| {
            !label.is_empty()
                && (category.prefixes.iter().any(|p| label.starts_with(p.as_str()))
                    || category.contains.iter().any(|k| label.contains(k.as_str())))
        })
        .map(|(i, _)| i)
        .collect();
    cols.sort_unstable();
    cols.dedup();
    cols
}

/// Build a one-row-per-unit table from a raw grid whose header row is known.
///
/// The unit column is the first header cell containing the anchor token
/// (column 0 if none). Rows with an empty unit or an aggregate marker are
/// skipped; duplicate units are summed.
pub fn build_tidy_table(
    grid: &RawGrid,
    header_row: usize,
    categories: &[&CategoryConfig],
    header: &HeaderConfig,
    normalize: &NormalizeConfig,
) -> TidyTable {
    let names: Vec<String> = categories.iter().map(|c| c.name.clone()).collect();
    let mut table = TidyTable::new(names);

    let labels: Vec<String> = grid
        .row(header_row)
        .map(|r| r.iter().map(|l| clean_label(l)).collect())
        .unwrap_or_default();

    let unit_col = labels
        .iter()
        .position(|l| l.contains(&header.anchor))
        .unwrap_or(0);

    let column_sets: Vec<Vec<usize>> = categories
        .iter()
        .map(|c| match_columns(&labels, c, Some(unit_col)))
        .collect();

    for (cat, cols) in categories.iter().zip(&column_sets) {
        let matched: Vec<&str> = cols.iter().map(|&i| labels[i].as_str()).collect();
        debug!(category = %cat.name, columns = ?matched, "category columns");
    }

    for row in grid.rows().iter().skip(header_row + 1) {
        let unit = clean_label(row.get(unit_col).map(|s| s.as_str()).unwrap_or(""));
        if unit.is_empty() || is_aggregate_marker(&unit, &normalize.aggregate_markers) {
            continue;
        }
        let values: Vec<f64> = column_sets
            .iter()
            .map(|cols| {
                cols.iter()
                    .map(|&c| coerce_number(row.get(c).map(|s| s.as_str()).unwrap_or("")))
                    .sum()
            })
            .collect();
        table.add(&unit, &values);
    }

    table
}
