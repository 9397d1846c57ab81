use serde::Serialize;

/// Presentation model for a comparison report with a two-level column header.
///
/// Layout, left to right: one label column, then each group's sub-columns in
/// order. Every data row has exactly `value_columns()` values.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSheet {
    pub title: String,
    /// Header of the label column (spans both header rows).
    pub label_header: String,
    pub groups: Vec<HeaderGroup>,
    pub rows: Vec<ReportRow>,
}

/// Top-level header cell spanning one sub-column per entry in `columns`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HeaderGroup {
    pub label: String,
    pub columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportRow {
    pub label: String,
    pub values: Vec<f64>,
}

impl ReportSheet {
    /// Number of numeric columns (label column excluded).
    pub fn value_columns(&self) -> usize {
        self.groups.iter().map(|g| g.columns.len()).sum()
    }

    /// Total columns including the label column.
    pub fn total_columns(&self) -> usize {
        self.value_columns() + 1
    }

    /// First absolute column (label column = 0) of each group.
    pub fn group_starts(&self) -> Vec<usize> {
        let mut next = 1;
        self.groups
            .iter()
            .map(|g| {
                let start = next;
                next += g.columns.len();
                start
            })
            .collect()
    }

    /// Sub-header labels flattened in column order.
    pub fn flat_columns(&self) -> Vec<(&str, &str)> {
        self.groups
            .iter()
            .flat_map(|g| g.columns.iter().map(move |c| (g.label.as_str(), c.as_str())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sheet() -> ReportSheet {
        ReportSheet {
            title: "t".into(),
            label_header: "單位".into(),
            groups: vec![
                HeaderGroup { label: "本期".into(), columns: vec!["酒駕".into(), "闖紅燈".into()] },
                HeaderGroup { label: "增減".into(), columns: vec!["酒駕".into()] },
            ],
            rows: vec![],
        }
    }

    #[test]
    fn group_starts_follow_column_counts() {
        let s = sheet();
        assert_eq!(s.value_columns(), 3);
        assert_eq!(s.total_columns(), 4);
        assert_eq!(s.group_starts(), vec![1, 3]);
    }

    #[test]
    fn flat_columns_pair_group_and_sub_label() {
        let s = sheet();
        assert_eq!(
            s.flat_columns(),
            vec![("本期", "酒駕"), ("本期", "闖紅燈"), ("增減", "酒駕")]
        );
    }
}
