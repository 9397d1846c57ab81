//! Projection of a comparison into the two-level report layout.

use ticketboard_core::{HeaderGroup, ReportRow, ReportSheet};

use crate::config::ReportConfig;
use crate::model::{ColumnGroup, ComparisonTable, PeriodSlot, SlotSource};

/// Display order of the column groups.
const GROUP_ORDER: [ColumnGroup; 4] = [
    ColumnGroup::Period(PeriodSlot::Weekly),
    ColumnGroup::Period(PeriodSlot::Current),
    ColumnGroup::Period(PeriodSlot::Prior),
    ColumnGroup::Delta,
];

/// Heading of a column group: the configured label, plus the period's range when known.
pub fn group_label(group: ColumnGroup, slots: &[SlotSource], config: &ReportConfig) -> String {
    let labels = &config.labels;
    let (base, slot) = match group {
        ColumnGroup::Period(PeriodSlot::Weekly) => (&labels.weekly, Some(PeriodSlot::Weekly)),
        ColumnGroup::Period(PeriodSlot::Current) => (&labels.current, Some(PeriodSlot::Current)),
        ColumnGroup::Period(PeriodSlot::Prior) => (&labels.prior, Some(PeriodSlot::Prior)),
        ColumnGroup::Delta => (&labels.delta, None),
    };
    let range = slot
        .and_then(|s| slots.iter().find(|src| src.slot == s))
        .map(|src| src.range.as_str())
        .unwrap_or("");
    format!("{base}{range}")
}

/// Always four groups (weekly, current, prior, delta) × every configured
/// category. Columns the comparison lacks are zero-filled.
pub fn build_report_sheet(
    table: &ComparisonTable,
    slots: &[SlotSource],
    config: &ReportConfig,
) -> ReportSheet {
    let categories = config.category_names();

    let groups: Vec<HeaderGroup> = GROUP_ORDER
        .iter()
        .map(|g| HeaderGroup {
            label: group_label(*g, slots, config),
            columns: categories.clone(),
        })
        .collect();

    let index: Vec<Option<usize>> = GROUP_ORDER
        .iter()
        .flat_map(|g| categories.iter().map(move |c| table.column_index(*g, c)))
        .collect();

    let rows = table
        .rows
        .iter()
        .map(|row| ReportRow {
            label: row.unit.clone(),
            values: index
                .iter()
                .map(|col| col.and_then(|c| row.values.get(c).copied()).unwrap_or(0.0))
                .collect(),
        })
        .collect();

    ReportSheet {
        title: config.title.clone(),
        label_header: config.labels.unit_header.clone(),
        groups,
        rows,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{PeriodTables, TidyTable};
    use crate::reconcile::reconcile;

    #[test]
    fn four_groups_with_ranges_and_zero_fill() {
        let config = ReportConfig::builtin().unwrap();
        let mut weekly = TidyTable::new(config.category_names());
        weekly.add("龍潭派出所", &[2.0, 1.0, 0.0, 0.0, 0.0]);
        let tables = PeriodTables { weekly: Some(weekly), ..PeriodTables::default() };
        let comparison = reconcile(&tables, &config).table;

        let slots = vec![SlotSource {
            slot: PeriodSlot::Weekly,
            range: "(113/09/01~113/09/07)".into(),
            files: vec!["w.csv".into()],
        }];
        let sheet = build_report_sheet(&comparison, &slots, &config);

        assert_eq!(sheet.groups.len(), 4);
        assert_eq!(sheet.groups[0].label, "本期(113/09/01~113/09/07)");
        assert_eq!(sheet.groups[1].label, "本年累計");
        assert_eq!(sheet.groups[3].label, "增減比較");
        assert_eq!(sheet.value_columns(), 20);
        assert_eq!(sheet.label_header, "單位");

        assert_eq!(sheet.rows.len(), 2);
        assert_eq!(sheet.rows[0].label, "合計");
        assert_eq!(sheet.rows[1].label, "龍潭所");
        assert_eq!(&sheet.rows[1].values[..2], &[2.0, 1.0]);
        // current/prior/delta absent from the comparison
        assert!(sheet.rows[1].values[5..].iter().all(|v| *v == 0.0));
    }
}
