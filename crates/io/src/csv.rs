// Delimited-text decoding into raw rows

/// Detect the most likely field delimiter by checking consistency across the first few lines.
///
/// For each candidate (tab, semicolon, comma, pipe), count fields per line. The delimiter
/// that produces the most consistent field count (>1 field) wins.
pub fn sniff_delimiter(content: &str) -> u8 {
    let candidates: &[u8] = &[b'\t', b';', b',', b'|'];
    let sample_lines: Vec<&str> = content
        .lines()
        .filter(|l| !l.trim().is_empty())
        .take(10)
        .collect();

    if sample_lines.is_empty() {
        return b',';
    }

    let mut best = b',';
    let mut best_score = 0u64;

    for &delim in candidates {
        let counts: Vec<usize> = sample_lines
            .iter()
            .map(|line| {
                csv::ReaderBuilder::new()
                    .delimiter(delim)
                    .has_headers(false)
                    .flexible(true)
                    .from_reader(line.as_bytes())
                    .records()
                    .next()
                    .and_then(|r| r.ok())
                    .map(|r| r.len())
                    .unwrap_or(1)
            })
            .collect();

        // Report files often open with a one-cell title line, so judge by the
        // most common field count rather than by line 1 alone
        let target = counts.iter().copied().max().unwrap_or(1);
        if target <= 1 {
            continue;
        }

        let consistent = counts.iter().filter(|&&c| c == target).count() as u64;
        let score = consistent * target as u64;

        if score > best_score {
            best_score = score;
            best = delim;
        }
    }

    best
}

/// Strict UTF-8 decode. A leading BOM is dropped.
pub fn decode_utf8(bytes: &[u8]) -> Result<String, String> {
    let bytes = bytes.strip_prefix(b"\xEF\xBB\xBF").unwrap_or(bytes);
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| format!("not valid UTF-8: {e}"))
}

/// Big5 decode (Traditional Chinese exports from older office suites).
/// Rejects input that needed replacement characters.
pub fn decode_big5(bytes: &[u8]) -> Result<String, String> {
    let (decoded, _, had_errors) = encoding_rs::BIG5.decode(bytes);
    if had_errors {
        return Err("not valid Big5".to_string());
    }
    Ok(decoded.into_owned())
}

/// Parse delimited text into rows of cell text. Ragged rows are kept as-is.
pub fn parse_rows(content: &str) -> Result<Vec<Vec<String>>, String> {
    if content.contains('\0') {
        return Err("binary content".to_string());
    }

    let delimiter = sniff_delimiter(content);
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes());

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(|f| f.to_string()).collect());
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sniff_semicolon_delimiter() {
        let content = "Name;Age;City\nAlice;30;Paris\nBob;25;London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_sniff_comma_delimiter() {
        let content = "單位,35條,53條\n龍潭派出所,3,4\n";
        assert_eq!(sniff_delimiter(content), b',');
    }

    #[test]
    fn test_sniff_tab_with_title_line() {
        let content = "交通違規統計表\n單位\t35條\t53條\n龍潭派出所\t3\t4\n";
        assert_eq!(sniff_delimiter(content), b'\t');
    }

    #[test]
    fn test_sniff_semicolon_with_commas_in_values() {
        let content = "Name;Address;City\n\"Doe, Jane\";\"123 Main St, Apt 4\";Paris\nBob;\"456 Elm\";London\n";
        assert_eq!(sniff_delimiter(content), b';');
    }

    #[test]
    fn test_utf8_bom_stripped() {
        let bytes = b"\xEF\xBB\xBFa,b\n";
        assert_eq!(decode_utf8(bytes).unwrap(), "a,b\n");
    }

    #[test]
    fn test_big5_decodes_unit_name() {
        let (encoded, _, _) = encoding_rs::BIG5.encode("龍潭派出所,3\n");
        assert!(decode_utf8(&encoded).is_err());
        assert_eq!(decode_big5(&encoded).unwrap(), "龍潭派出所,3\n");
    }

    #[test]
    fn test_parse_rows_keeps_ragged_rows() {
        let rows = parse_rows("title\n單位,a,b\nx,1,2\n").unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0], vec!["title"]);
        assert_eq!(rows[2], vec!["x", "1", "2"]);
    }

    #[test]
    fn test_parse_rows_rejects_binary() {
        assert!(parse_rows("PK\u{3}\u{4}\0\0").is_err());
    }
}
