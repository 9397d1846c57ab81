// Tolerant tabular loading
//
// Uploaded reports do not reliably declare their true format or encoding, so
// each file is tried against an ordered list of strategies until one reads it.
// When all fail the result is a sentinel grid carrying every strategy's error.

use std::path::Path;

use ticketboard_core::RawGrid;
use tracing::{debug, warn};

use crate::csv;
use crate::xlsx;

/// One way of turning bytes into rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadStrategy {
    /// calamine auto-detected workbook (xlsx, xls, xlsb, ods)
    Spreadsheet,
    /// Delimited text, UTF-8
    CsvUtf8,
    /// Delimited text, Big5
    CsvBig5,
}

impl LoadStrategy {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Spreadsheet => "spreadsheet",
            Self::CsvUtf8 => "csv-utf8",
            Self::CsvBig5 => "csv-big5",
        }
    }

    pub fn attempt(&self, bytes: &[u8]) -> Result<Vec<Vec<String>>, String> {
        match self {
            Self::Spreadsheet => xlsx::read_first_sheet(bytes),
            Self::CsvUtf8 => csv::parse_rows(&csv::decode_utf8(bytes)?),
            Self::CsvBig5 => csv::parse_rows(&csv::decode_big5(bytes)?),
        }
    }
}

impl std::fmt::Display for LoadStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

const SPREADSHEET_FIRST: &[LoadStrategy] = &[
    LoadStrategy::Spreadsheet,
    LoadStrategy::CsvUtf8,
    LoadStrategy::CsvBig5,
];

const TEXT_FIRST: &[LoadStrategy] = &[
    LoadStrategy::CsvUtf8,
    LoadStrategy::CsvBig5,
    LoadStrategy::Spreadsheet,
];

/// Strategy order for a file name. The extension is only a hint.
pub fn strategies_for(file_name: &str) -> &'static [LoadStrategy] {
    let ext = Path::new(file_name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    match ext.as_str() {
        "xlsx" | "xlsm" | "xls" | "xlsb" | "ods" => SPREADSHEET_FIRST,
        _ => TEXT_FIRST,
    }
}

/// Load an uploaded file's bytes. Never fails: an unreadable file becomes a
/// sentinel grid whose failure reason lists what each strategy reported.
pub fn load_bytes(file_name: &str, bytes: &[u8]) -> RawGrid {
    load_with(file_name, bytes, strategies_for(file_name))
}

/// Load with an explicit strategy order.
pub fn load_with(file_name: &str, bytes: &[u8], strategies: &[LoadStrategy]) -> RawGrid {
    if bytes.is_empty() {
        warn!(file = file_name, "empty upload");
        return RawGrid::unreadable("file is empty");
    }

    let mut failures: Vec<String> = Vec::with_capacity(strategies.len());
    for (idx, strategy) in strategies.iter().enumerate() {
        match strategy.attempt(bytes) {
            Ok(rows) => {
                let grid = RawGrid::new(rows);
                if idx > 0 {
                    warn!(file = file_name, strategy = %strategy, "read with fallback strategy");
                }
                debug!(
                    file = file_name,
                    strategy = %strategy,
                    rows = grid.height(),
                    cols = grid.width(),
                    "read"
                );
                return grid;
            }
            Err(e) => {
                debug!(file = file_name, strategy = %strategy, error = %e, "strategy failed");
                failures.push(format!("{strategy}: {e}"));
            }
        }
    }

    warn!(file = file_name, "no strategy could read file");
    RawGrid::unreadable(failures.join("; "))
}

/// Read a file from disk and load it. An unreadable path also yields a sentinel.
pub fn load_path(path: &Path) -> RawGrid {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    match std::fs::read(path) {
        Ok(bytes) => load_bytes(&name, &bytes),
        Err(e) => RawGrid::unreadable(format!("cannot read {}: {e}", path.display())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_extension_picks_order() {
        assert_eq!(strategies_for("週報.XLSX")[0], LoadStrategy::Spreadsheet);
        assert_eq!(strategies_for("weekly.csv")[0], LoadStrategy::CsvUtf8);
        assert_eq!(strategies_for("no_extension")[0], LoadStrategy::CsvUtf8);
    }

    #[test]
    fn test_mislabeled_csv_falls_back_to_text() {
        let grid = load_bytes("report.xlsx", "單位,35條\n龍潭派出所,4\n".as_bytes());
        assert!(!grid.is_unreadable());
        assert_eq!(grid.cell(1, 0), "龍潭派出所");
        assert_eq!(grid.cell(1, 1), "4");
    }

    #[test]
    fn test_big5_csv_falls_back_to_big5() {
        let (encoded, _, _) = encoding_rs::BIG5.encode("單位,35條\n龍潭派出所,4\n");
        let grid = load_bytes("report.csv", &encoded);
        assert!(!grid.is_unreadable(), "{:?}", grid.failure());
        assert_eq!(grid.cell(0, 0), "單位");
        assert_eq!(grid.cell(1, 0), "龍潭派出所");
    }

    #[test]
    fn test_all_strategies_fail_aggregates_reasons() {
        let bytes = [0xFFu8, 0x00, 0xFE, 0x00, 0x81];
        let grid = load_bytes("junk.csv", &bytes);
        assert!(grid.is_unreadable());
        let reason = grid.failure().unwrap();
        assert!(reason.contains("csv-utf8:"), "{reason}");
        assert!(reason.contains("csv-big5:"), "{reason}");
        assert!(reason.contains("spreadsheet:"), "{reason}");
    }

    #[test]
    fn test_empty_upload_is_sentinel() {
        let grid = load_bytes("empty.csv", b"");
        assert_eq!(grid.failure(), Some("file is empty"));
    }

    #[test]
    fn test_load_path_missing_file() {
        let dir = tempdir().unwrap();
        let grid = load_path(&dir.path().join("missing.xlsx"));
        assert!(grid.failure().unwrap().starts_with("cannot read"));
    }

    #[test]
    fn test_load_path_reads_csv() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("weekly.csv");
        fs::write(&path, "a,b\n1,2\n").unwrap();
        let grid = load_path(&path);
        assert_eq!(grid.height(), 2);
        assert_eq!(grid.cell(1, 1), "2");
    }
}
