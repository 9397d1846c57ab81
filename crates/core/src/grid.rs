use serde::Serialize;

/// Headerless, positional grid of cell text as read from an uploaded file.
///
/// Row and column indices are positional: leading blank rows of the source are
/// kept so that fixed-index fallbacks (header row, period row) stay meaningful.
/// A grid with `failure` set is the sentinel produced when no load strategy
/// could read the file; it has no rows.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RawGrid {
    rows: Vec<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failure: Option<String>,
}

impl RawGrid {
    pub fn new(rows: Vec<Vec<String>>) -> Self {
        Self { rows, failure: None }
    }

    /// Sentinel for an unreadable source. The reason is kept for diagnostics.
    pub fn unreadable(reason: impl Into<String>) -> Self {
        Self {
            rows: Vec::new(),
            failure: Some(reason.into()),
        }
    }

    pub fn failure(&self) -> Option<&str> {
        self.failure.as_deref()
    }

    pub fn is_unreadable(&self) -> bool {
        self.failure.is_some()
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row(&self, idx: usize) -> Option<&[String]> {
        self.rows.get(idx).map(|r| r.as_slice())
    }

    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// Widest row length.
    pub fn width(&self) -> usize {
        self.rows.iter().map(|r| r.len()).max().unwrap_or(0)
    }

    /// Cell text, or "" for positions past the end of a ragged row.
    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(|s| s.as_str())
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.rows.iter().all(|r| r.iter().all(|c| c.trim().is_empty()))
    }
}

impl From<Vec<Vec<&str>>> for RawGrid {
    fn from(rows: Vec<Vec<&str>>) -> Self {
        Self::new(
            rows.into_iter()
                .map(|r| r.into_iter().map(str::to_string).collect())
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ragged_rows_read_as_blank() {
        let grid = RawGrid::from(vec![vec!["a", "b", "c"], vec!["d"]]);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.width(), 3);
        assert_eq!(grid.cell(1, 0), "d");
        assert_eq!(grid.cell(1, 2), "");
        assert_eq!(grid.cell(9, 9), "");
    }

    #[test]
    fn sentinel_carries_reason() {
        let grid = RawGrid::unreadable("csv-utf8: invalid byte");
        assert!(grid.is_unreadable());
        assert!(grid.is_empty());
        assert_eq!(grid.failure(), Some("csv-utf8: invalid byte"));
        assert_eq!(grid.height(), 0);
    }

    #[test]
    fn whitespace_only_grid_is_empty() {
        let grid = RawGrid::from(vec![vec!["  ", ""], vec!["\n"]]);
        assert!(grid.is_empty());
        assert!(!grid.is_unreadable());
    }
}
