//! Terminal rendering of a report sheet.

use ticketboard_core::ReportSheet;

use crate::util::{display_width, format_count, pad_left, pad_right};

const GAP: usize = 2;

/// Two header lines (group, category) above the data rows, all columns
/// aligned by display width so CJK labels line up.
pub fn render_sheet(sheet: &ReportSheet) -> String {
    let flat = sheet.flat_columns();

    let label_width = sheet
        .rows
        .iter()
        .map(|r| display_width(&r.label))
        .chain(std::iter::once(display_width(&sheet.label_header)))
        .max()
        .unwrap_or(0);

    let widths: Vec<usize> = flat
        .iter()
        .enumerate()
        .map(|(i, (_, category))| {
            sheet
                .rows
                .iter()
                .filter_map(|r| r.values.get(i))
                .map(|v| format_count(*v).len())
                .chain(std::iter::once(display_width(category)))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    out.push_str(&sheet.title);
    out.push('\n');

    // group line: each label spans its block
    out.push_str(&" ".repeat(label_width));
    let mut col = 0;
    for group in &sheet.groups {
        let block: usize = widths[col..col + group.columns.len()]
            .iter()
            .map(|w| w + GAP)
            .sum();
        out.push_str(&" ".repeat(GAP));
        out.push_str(&pad_right(&group.label, block.saturating_sub(GAP)));
        col += group.columns.len();
    }
    out.push('\n');

    out.push_str(&pad_right(&sheet.label_header, label_width));
    for ((_, category), w) in flat.iter().zip(&widths) {
        out.push_str(&" ".repeat(GAP));
        out.push_str(&pad_left(category, *w));
    }
    out.push('\n');

    for row in &sheet.rows {
        out.push_str(&pad_right(&row.label, label_width));
        for (v, w) in row.values.iter().zip(&widths) {
            out.push_str(&" ".repeat(GAP));
            out.push_str(&pad_left(&format_count(*v), *w));
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use ticketboard_core::{HeaderGroup, ReportRow};

    fn sheet() -> ReportSheet {
        ReportSheet {
            title: "龍潭分局交通執法成效比較表".into(),
            label_header: "單位".into(),
            groups: vec![
                HeaderGroup { label: "本期".into(), columns: vec!["酒駕".into(), "闖紅燈".into()] },
                HeaderGroup { label: "增減比較".into(), columns: vec!["酒駕".into(), "闖紅燈".into()] },
            ],
            rows: vec![
                ReportRow { label: "合計".into(), values: vec![12.0, 1234.0, -5.0, 0.0] },
                ReportRow { label: "交通分隊".into(), values: vec![2.0, 4.0, 1.0, 0.0] },
            ],
        }
    }

    #[test]
    fn lines_share_a_display_width() {
        let text = render_sheet(&sheet());
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 1 + 2 + 2);
        assert_eq!(lines[0], "龍潭分局交通執法成效比較表");

        let widths: Vec<usize> = lines[2..].iter().map(|l| display_width(l)).collect();
        assert!(widths.windows(2).all(|w| w[0] == w[1]), "{widths:?}\n{text}");
    }

    #[test]
    fn values_are_right_aligned_counts() {
        let text = render_sheet(&sheet());
        let total = text.lines().nth(3).unwrap();
        assert!(total.starts_with("合計    "));
        assert!(total.contains("  1234"));
        assert!(total.trim_end().ends_with('0'));
        assert!(total.contains("-5"));
    }
}
