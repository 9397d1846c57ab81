use ticketboard_core::RawGrid;

use crate::config::HeaderConfig;
use crate::normalize::clean_label;

/// Where the header row was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMatch {
    /// A cell in this row contains the anchor token.
    Anchor(usize),
    /// No row carried the anchor (merged cells, OCR noise); configured fallback used.
    Fallback(usize),
}

impl HeaderMatch {
    pub fn index(&self) -> usize {
        match self {
            Self::Anchor(i) | Self::Fallback(i) => *i,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Self::Fallback(_))
    }
}

/// First row within `search_rows` with a cell whose cleaned label contains the
/// anchor, else the fallback row. Wrapped cells such as "單\n位" still match.
pub fn locate_header(grid: &RawGrid, config: &HeaderConfig) -> HeaderMatch {
    grid.rows()
        .iter()
        .take(config.search_rows)
        .position(|row| row.iter().any(|cell| clean_label(cell).contains(&config.anchor)))
        .map(HeaderMatch::Anchor)
        .unwrap_or(HeaderMatch::Fallback(config.fallback_row))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_anchor_row() {
        let grid = RawGrid::from(vec![vec!["title"], vec!["x", "取締單位"], vec!["單位"]]);
        assert_eq!(locate_header(&grid, &HeaderConfig::default()), HeaderMatch::Anchor(1));
    }

    #[test]
    fn anchor_split_by_whitespace_still_matches() {
        let grid = RawGrid::from(vec![
            vec!["龍潭分局交通違規統計"],
            vec!["113/09/01~113/09/07"],
            vec!["", "違規項目"],
            vec!["", ""],
            vec!["單\n位", "35條"],
        ]);
        assert_eq!(locate_header(&grid, &HeaderConfig::default()), HeaderMatch::Anchor(4));

        let grid = RawGrid::from(vec![vec!["x"], vec!["  單 位", "35條"]]);
        assert_eq!(locate_header(&grid, &HeaderConfig::default()), HeaderMatch::Anchor(1));
    }

    #[test]
    fn falls_back_when_anchor_missing() {
        let grid = RawGrid::from(vec![vec!["a"], vec!["b"]]);
        let m = locate_header(&grid, &HeaderConfig::default());
        assert_eq!(m, HeaderMatch::Fallback(3));
        assert!(m.is_fallback());
        assert_eq!(m.index(), 3);
    }

    #[test]
    fn anchor_past_search_window_is_ignored() {
        let mut rows = vec![vec!["x"]; 5];
        rows.push(vec!["單位"]);
        let grid = RawGrid::from(rows);
        let config = HeaderConfig { search_rows: 5, ..HeaderConfig::default() };
        assert_eq!(locate_header(&grid, &config), HeaderMatch::Fallback(3));
    }
}
