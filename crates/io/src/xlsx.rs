// Excel import (xlsx, xls, xlsb, ods) into raw rows, and report export (xlsx only)
//
// Import: first worksheet only, values as calamine extracted them (cached
//         formula results, numbers, strings). Positions are absolute.
// Export: presentation snapshot of a ReportSheet. Merged title, merged group
//         headers, per-category sub-headers, fixed column widths.

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader, Sheets};
use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook as XlsxWorkbook, Worksheet};
use ticketboard_core::ReportSheet;

/// Maximum dimensions read from a sheet
const MAX_ROWS: usize = 65536;
const MAX_COLS: usize = 256;

/// Label column width (Excel character units)
pub const LABEL_COL_WIDTH: f64 = 14.0;
/// Width of every value column
pub const VALUE_COL_WIDTH: f64 = 10.0;

/// First row of the data region in an exported report (title, group, sub-header above)
pub const DATA_START_ROW: u32 = 3;

/// Read the first worksheet of an in-memory workbook into positional rows.
pub fn read_first_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto_from_rs(Cursor::new(bytes.to_vec()))
        .map_err(|e| format!("Failed to open Excel file: {}", e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let first = sheet_names
        .first()
        .ok_or_else(|| "Excel file contains no sheets".to_string())?;

    let range = workbook
        .worksheet_range(first)
        .map_err(|e| format!("Failed to read sheet '{}': {}", first, e))?;

    let (height, width) = range.get_size();
    if height == 0 || width == 0 {
        return Ok(Vec::new());
    }

    // Range start offset (data may not begin at A1)
    let (start_row, start_col) = range.start().unwrap_or((0, 0));
    let start_row = start_row as usize;
    let start_col = start_col as usize;

    let mut rows: Vec<Vec<String>> = vec![Vec::new(); start_row.min(MAX_ROWS)];
    for row in range.rows() {
        if rows.len() >= MAX_ROWS {
            break;
        }
        let mut out = vec![String::new(); start_col.min(MAX_COLS)];
        for cell in row.iter().take(MAX_COLS.saturating_sub(start_col)) {
            out.push(cell_text(cell));
        }
        rows.push(out);
    }

    Ok(rows)
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => (if *b { "TRUE" } else { "FALSE" }).to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => format!("{}", dt.as_f64()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Statistics from an export operation
#[derive(Debug, Default, Clone)]
pub struct ExportResult {
    pub rows_exported: usize,
    pub columns_exported: usize,
    pub merges_exported: usize,
}

/// Export a report to an xlsx file.
pub fn export_report(sheet: &ReportSheet, path: &Path) -> Result<ExportResult, String> {
    let mut workbook = XlsxWorkbook::new();
    let result = build_report(&mut workbook, sheet)?;
    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;
    Ok(result)
}

/// Export a report to an in-memory xlsx (used for mail attachments).
pub fn export_report_to_buffer(sheet: &ReportSheet) -> Result<Vec<u8>, String> {
    let mut workbook = XlsxWorkbook::new();
    build_report(&mut workbook, sheet)?;
    workbook
        .save_to_buffer()
        .map_err(|e| format!("Failed to build XLSX buffer: {}", e))
}

fn build_report(workbook: &mut XlsxWorkbook, sheet: &ReportSheet) -> Result<ExportResult, String> {
    let mut result = ExportResult::default();
    let worksheet = workbook
        .add_worksheet()
        .set_name("report")
        .map_err(|e| format!("Failed to create sheet: {}", e))?;

    let last_col = (sheet.total_columns() - 1) as u16;

    let title_format = Format::new()
        .set_bold()
        .set_font_size(14)
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter);
    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_text_wrap()
        .set_border(FormatBorder::Thin);
    let label_format = Format::new().set_border(FormatBorder::Thin);
    let total_label_format = Format::new().set_bold().set_border(FormatBorder::Thin);
    let number_format = Format::new()
        .set_num_format("#,##0")
        .set_border(FormatBorder::Thin);
    let total_number_format = Format::new()
        .set_bold()
        .set_num_format("#,##0")
        .set_border(FormatBorder::Thin);

    // Row 0: title across every column
    if last_col > 0 {
        worksheet
            .merge_range(0, 0, 0, last_col, &sheet.title, &title_format)
            .map_err(|e| format!("Failed to write title: {}", e))?;
        result.merges_exported += 1;
    } else {
        worksheet
            .write_string_with_format(0, 0, &sheet.title, &title_format)
            .map_err(|e| format!("Failed to write title: {}", e))?;
    }

    // Rows 1-2: label column header spans both header rows
    worksheet
        .merge_range(1, 0, 2, 0, &sheet.label_header, &header_format)
        .map_err(|e| format!("Failed to write label header: {}", e))?;
    result.merges_exported += 1;

    for (group, start) in sheet.groups.iter().zip(sheet.group_starts()) {
        if group.columns.is_empty() {
            continue;
        }
        let start = start as u16;
        let end = start + group.columns.len() as u16 - 1;
        if end > start {
            worksheet
                .merge_range(1, start, 1, end, &group.label, &header_format)
                .map_err(|e| format!("Failed to write group '{}': {}", group.label, e))?;
            result.merges_exported += 1;
        } else {
            worksheet
                .write_string_with_format(1, start, &group.label, &header_format)
                .map_err(|e| format!("Failed to write group '{}': {}", group.label, e))?;
        }
        for (offset, column) in group.columns.iter().enumerate() {
            worksheet
                .write_string_with_format(2, start + offset as u16, column, &header_format)
                .map_err(|e| format!("Failed to write header '{}': {}", column, e))?;
        }
    }

    for (idx, row) in sheet.rows.iter().enumerate() {
        let r = DATA_START_ROW + idx as u32;
        let (lf, nf) = if idx == 0 {
            (&total_label_format, &total_number_format)
        } else {
            (&label_format, &number_format)
        };
        worksheet
            .write_string_with_format(r, 0, &row.label, lf)
            .map_err(|e| format!("Failed to write row '{}': {}", row.label, e))?;
        for (c, value) in row.values.iter().enumerate() {
            worksheet
                .write_number_with_format(r, 1 + c as u16, *value, nf)
                .map_err(|e| format!("Failed to write value in row '{}': {}", row.label, e))?;
        }
        result.rows_exported += 1;
    }

    apply_column_widths(worksheet, sheet.total_columns())?;
    result.columns_exported = sheet.total_columns();
    Ok(result)
}

/// First column wide, remaining narrow
fn apply_column_widths(worksheet: &mut Worksheet, columns: usize) -> Result<(), String> {
    worksheet
        .set_column_width(0, LABEL_COL_WIDTH)
        .map_err(|e| format!("Failed to set column 0 width: {}", e))?;
    for col in 1..columns {
        worksheet
            .set_column_width(col as u16, VALUE_COL_WIDTH)
            .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
    }
    Ok(())
}
