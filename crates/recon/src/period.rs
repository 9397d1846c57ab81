//! Report period detection.
//!
//! Date-span mode reads a `YYY/MM/DD` (or `YYY.MM.DD`) range from the top-left
//! of the sheet and decides weekly vs cumulative from its length. Filename-marker
//! mode takes the slot from the file name and only reads an MMDD label.

use std::sync::OnceLock;

use regex::Regex;
use ticketboard_core::RawGrid;

use crate::config::PeriodConfig;
use crate::model::{LocalDate, PeriodKind, PeriodLabel, PeriodSlot};

fn date_token_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"([0-9]+)[/.]([0-9]{1,2})[/.]([0-9]{1,2})").expect("static regex")
    })
}

fn digit_run_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"[0-9]+").expect("static regex"))
}

// ---------------------------------------------------------------------------
// Date-span mode
// ---------------------------------------------------------------------------

/// All local-calendar dates in `text`, in order of appearance.
///
/// The year must be exactly three digits and the token must not run into
/// further digits; tokens that are not real calendar dates are skipped.
pub fn find_date_tokens(text: &str) -> Vec<LocalDate> {
    let mut out = Vec::new();
    for caps in date_token_re().captures_iter(text) {
        let whole = caps.get(0).map(|m| m.end()).unwrap_or(0);
        if text[whole..].starts_with(|c: char| c.is_ascii_digit()) {
            continue;
        }
        let year = &caps[1];
        if year.len() != 3 {
            continue;
        }
        let (Ok(y), Ok(m), Ok(d)) = (year.parse::<u16>(), caps[2].parse::<u8>(), caps[3].parse::<u8>())
        else {
            continue;
        };
        if let Some(date) = LocalDate::new(y, m, d) {
            out.push(date);
        }
    }
    out
}

/// Text windows scanned for a date range, in scan order: each cell alone,
/// then the row's scanned cells joined.
fn scan_windows(grid: &RawGrid, config: &PeriodConfig) -> Vec<String> {
    let cols: Vec<usize> = match config.scan_column {
        Some(c) => vec![c],
        None => (0..config.scan_cols).collect(),
    };

    let mut windows = Vec::new();
    for row in 0..config.scan_rows.min(grid.height()) {
        let cells: Vec<&str> = cols.iter().map(|&c| grid.cell(row, c)).collect();
        for cell in &cells {
            if !cell.trim().is_empty() {
                windows.push(cell.to_string());
            }
        }
        if cells.len() > 1 {
            let joined = cells.join(" ");
            if !joined.trim().is_empty() {
                windows.push(joined);
            }
        }
    }
    windows
}

/// Classify one file by its embedded date range.
///
/// Err carries a human-readable reason for the diagnostic log.
pub fn classify_span(grid: &RawGrid, config: &PeriodConfig) -> Result<PeriodLabel, String> {
    for text in scan_windows(grid, config) {
        let tokens = find_date_tokens(&text);
        if tokens.len() < 2 {
            continue;
        }
        let (start, end) = (tokens[0], tokens[1]);
        let kind = span_kind(start, end, config.weekly_max_days);
        return Ok(PeriodLabel {
            kind,
            year: end.year,
            start,
            end,
            raw_text: text.trim().to_string(),
        });
    }

    let window = match config.scan_column {
        Some(c) => format!("first {} rows of column {}", config.scan_rows, c),
        None => format!("first {} rows x {} columns", config.scan_rows, config.scan_cols),
    };
    Err(format!("no date range (two YYY/MM/DD dates) found in {window}"))
}

/// Same month and a span under the threshold is weekly; anything else is cumulative.
pub fn span_kind(start: LocalDate, end: LocalDate, weekly_max_days: u32) -> PeriodKind {
    let same_month = start.year == end.year && start.month == end.month;
    let days = match (start.to_gregorian(), end.to_gregorian()) {
        (Some(s), Some(e)) => (e - s).num_days().unsigned_abs(),
        _ => u64::MAX,
    };
    if same_month && days < weekly_max_days as u64 {
        PeriodKind::Weekly
    } else {
        PeriodKind::Cumulative
    }
}

/// Indices (into the classified list) of the files chosen for each slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotAssignment {
    pub weekly: usize,
    pub current: usize,
    pub prior: usize,
}

impl SlotAssignment {
    pub fn index(&self, slot: PeriodSlot) -> usize {
        match slot {
            PeriodSlot::Weekly => self.weekly,
            PeriodSlot::Current => self.current,
            PeriodSlot::Prior => self.prior,
        }
    }
}

/// Pick one weekly and two cumulative reports; the later year is current.
///
/// Input order does not matter. Anything other than exactly one weekly and
/// two cumulative reports with different years is an error.
pub fn assign_slots(labels: &[PeriodLabel]) -> Result<SlotAssignment, String> {
    let weekly: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.kind == PeriodKind::Weekly)
        .map(|(i, _)| i)
        .collect();
    let cumulative: Vec<usize> = labels
        .iter()
        .enumerate()
        .filter(|(_, l)| l.kind == PeriodKind::Cumulative)
        .map(|(i, _)| i)
        .collect();

    if weekly.len() != 1 {
        return Err(format!("expected 1 weekly report, found {}", weekly.len()));
    }
    if cumulative.len() != 2 {
        return Err(format!(
            "expected 2 cumulative reports, found {}",
            cumulative.len()
        ));
    }

    let (a, b) = (cumulative[0], cumulative[1]);
    let (ya, yb) = (labels[a].year, labels[b].year);
    if ya == yb {
        return Err(format!(
            "both cumulative reports are for year {ya}; cannot tell current from prior"
        ));
    }
    let (current, prior) = if ya > yb { (a, b) } else { (b, a) };

    Ok(SlotAssignment { weekly: weekly[0], current, prior })
}

// ---------------------------------------------------------------------------
// Filename-marker mode
// ---------------------------------------------------------------------------

/// "(1)" marks the current-year report, "(2)" the prior-year one; anything else is weekly.
pub fn marker_slot(file_name: &str) -> PeriodSlot {
    if file_name.contains("(1)") {
        PeriodSlot::Current
    } else if file_name.contains("(2)") {
        PeriodSlot::Prior
    } else {
        PeriodSlot::Weekly
    }
}

/// Pedestrian-violation reports are recognised by name.
pub fn is_pedestrian_report(file_name: &str) -> bool {
    file_name.to_ascii_lowercase().contains("footman") || file_name.contains("行人")
}

/// "(MMDD~MMDD)" from two 6-7 digit date numbers (e.g. 1130901) on the marker
/// row, falling back to the fallback row. The year is not resolved.
pub fn mmdd_range(grid: &RawGrid, config: &PeriodConfig) -> Option<String> {
    [config.marker_row, config.marker_fallback_row]
        .into_iter()
        .find_map(|row| mmdd_from_row(grid, row))
}

fn mmdd_from_row(grid: &RawGrid, row: usize) -> Option<String> {
    let text = grid.row(row)?.join(" ");
    let tokens: Vec<&str> = digit_run_re()
        .find_iter(&text)
        .map(|m| m.as_str())
        .filter(|t| (6..=7).contains(&t.len()))
        .collect();
    if tokens.len() < 2 {
        return None;
    }
    let tail = |t: &str| t[t.len() - 4..].to_string();
    Some(format!("({}~{})", tail(tokens[0]), tail(tokens[1])))
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid_with(cell: &str) -> RawGrid {
        RawGrid::from(vec![vec!["交通違規統計"], vec![cell]])
    }

    fn label(kind: PeriodKind, year: u16) -> PeriodLabel {
        let start = LocalDate::new(year, 1, 1).unwrap();
        PeriodLabel { kind, year, start, end: start, raw_text: String::new() }
    }

    #[test]
    fn tokens_accept_slash_and_dot() {
        let tokens = find_date_tokens("統計期間：113.09.01至113/9/7");
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].to_string(), "113/09/01");
        assert_eq!(tokens[1].to_string(), "113/09/07");
    }

    #[test]
    fn tokens_reject_four_digit_years_and_invalid_dates() {
        assert!(find_date_tokens("2024/09/01 2024/09/07").is_empty());
        assert!(find_date_tokens("113/02/30").is_empty());
        assert!(find_date_tokens("113/09/011").is_empty());
    }

    #[test]
    fn weekly_span_within_month() {
        let grid = grid_with("統計期間:113/09/01~113/09/07");
        let label = classify_span(&grid, &PeriodConfig::default()).unwrap();
        assert_eq!(label.kind, PeriodKind::Weekly);
        assert_eq!(label.year, 113);
        assert_eq!(label.range_text(), "(113/09/01~113/09/07)");
    }

    #[test]
    fn cumulative_span_across_months() {
        let grid = grid_with("113/01/01~113/09/07");
        let label = classify_span(&grid, &PeriodConfig::default()).unwrap();
        assert_eq!(label.kind, PeriodKind::Cumulative);
        assert_eq!(label.year, 113);
    }

    #[test]
    fn short_span_across_month_boundary_is_cumulative() {
        let start = LocalDate::new(113, 8, 28).unwrap();
        let end = LocalDate::new(113, 9, 3).unwrap();
        assert_eq!(span_kind(start, end, 20), PeriodKind::Cumulative);
    }

    #[test]
    fn threshold_is_exclusive() {
        let start = LocalDate::new(113, 9, 1).unwrap();
        assert_eq!(span_kind(start, LocalDate::new(113, 9, 20).unwrap(), 20), PeriodKind::Weekly);
        assert_eq!(span_kind(start, LocalDate::new(113, 9, 21).unwrap(), 20), PeriodKind::Cumulative);
    }

    #[test]
    fn dates_split_across_cells_use_joined_row() {
        let grid = RawGrid::from(vec![vec!["起 113/09/01", "迄 113/09/07", ""]]);
        let label = classify_span(&grid, &PeriodConfig::default()).unwrap();
        assert_eq!(label.kind, PeriodKind::Weekly);
        assert!(label.raw_text.contains("迄"));
    }

    #[test]
    fn dates_outside_window_are_not_seen() {
        let mut rows = vec![vec![""; 4]; 6];
        rows[5][0] = "113/09/01~113/09/07";
        rows[0][3] = "113/09/01~113/09/07";
        let grid = RawGrid::from(rows);
        let err = classify_span(&grid, &PeriodConfig::default()).unwrap_err();
        assert!(err.contains("first 5 rows x 3 columns"));
    }

    #[test]
    fn designated_column_window() {
        let grid = RawGrid::from(vec![vec!["", "", "", "113/01/01-113/09/07"]]);
        let config = PeriodConfig { scan_column: Some(3), ..PeriodConfig::default() };
        let label = classify_span(&grid, &config).unwrap();
        assert_eq!(label.kind, PeriodKind::Cumulative);
    }

    #[test]
    fn single_date_is_unknown() {
        let grid = grid_with("製表日期 113/09/08");
        assert!(classify_span(&grid, &PeriodConfig::default()).is_err());
    }

    #[test]
    fn assign_orders_cumulative_by_year() {
        let labels = vec![
            label(PeriodKind::Cumulative, 112),
            label(PeriodKind::Weekly, 113),
            label(PeriodKind::Cumulative, 113),
        ];
        let a = assign_slots(&labels).unwrap();
        assert_eq!(a, SlotAssignment { weekly: 1, current: 2, prior: 0 });
    }

    #[test]
    fn assign_rejects_wrong_counts_and_ties() {
        let two_weekly = vec![
            label(PeriodKind::Weekly, 113),
            label(PeriodKind::Weekly, 113),
            label(PeriodKind::Cumulative, 113),
        ];
        assert!(assign_slots(&two_weekly).unwrap_err().contains("1 weekly"));

        let tie = vec![
            label(PeriodKind::Weekly, 113),
            label(PeriodKind::Cumulative, 113),
            label(PeriodKind::Cumulative, 113),
        ];
        assert!(assign_slots(&tie).unwrap_err().contains("year 113"));
    }

    #[test]
    fn filename_markers() {
        assert_eq!(marker_slot("violations(1).xlsx"), PeriodSlot::Current);
        assert_eq!(marker_slot("violations(2).xlsx"), PeriodSlot::Prior);
        assert_eq!(marker_slot("violations.xlsx"), PeriodSlot::Weekly);
        assert!(is_pedestrian_report("Footman(1).xls"));
        assert!(is_pedestrian_report("行人違規.csv"));
        assert!(!is_pedestrian_report("violations.csv"));
    }

    #[test]
    fn mmdd_from_marker_row_with_fallback() {
        let grid = RawGrid::from(vec![
            vec!["標題"],
            vec!["期間 1130901 至 1130907"],
            vec!["製表"],
        ]);
        assert_eq!(mmdd_range(&grid, &PeriodConfig::default()).as_deref(), Some("(0901~0907)"));

        let grid = RawGrid::from(vec![
            vec!["標題"],
            vec![""],
            vec!["1130101", "1130907"],
        ]);
        assert_eq!(mmdd_range(&grid, &PeriodConfig::default()).as_deref(), Some("(0101~0907)"));

        let grid = RawGrid::from(vec![vec!["標題"], vec!["113"], vec!["no dates"]]);
        assert!(mmdd_range(&grid, &PeriodConfig::default()).is_none());
    }

    proptest! {
        #[test]
        fn same_month_short_spans_are_weekly(year in 100u16..130, month in 1u8..=12, d1 in 1u8..=28, len in 0u8..20) {
            let d2 = d1.saturating_add(len).min(28);
            let start = LocalDate::new(year, month, d1).unwrap();
            let end = LocalDate::new(year, month, d2).unwrap();
            prop_assert_eq!(span_kind(start, end, 20), PeriodKind::Weekly);
        }

        #[test]
        fn cumulative_assignment_ignores_input_order(y1 in 101u16..130, y2 in 100u16..130, swap in any::<bool>()) {
            prop_assume!(y1 != y2);
            let (hi, lo) = if y1 > y2 { (y1, y2) } else { (y2, y1) };
            let mut labels = vec![
                label(PeriodKind::Cumulative, hi),
                label(PeriodKind::Cumulative, lo),
                label(PeriodKind::Weekly, hi),
            ];
            if swap {
                labels.swap(0, 1);
            }
            let a = assign_slots(&labels).unwrap();
            prop_assert_eq!(labels[a.current].year, hi);
            prop_assert_eq!(labels[a.prior].year, lo);
        }
    }
}
