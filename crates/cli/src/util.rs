use unicode_width::UnicodeWidthStr;

/// Display width of a string, accounting for CJK double-width, emoji, etc.
pub(crate) fn display_width(s: &str) -> usize {
    UnicodeWidthStr::width(s)
}

/// Truncate a string to fit within `width` display columns, adding ".." if truncated.
/// Uses Unicode display width so CJK alignment stays correct.
pub(crate) fn truncate_display(s: &str, width: usize) -> String {
    if width < 3 {
        for ch in s.chars() {
            let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
            if cw <= width {
                return ch.to_string();
            }
        }
        return String::new();
    }

    if display_width(s) <= width {
        return s.to_string();
    }

    // Stop at width - 2 to leave room for ".."
    let budget = width - 2;
    let mut used = 0;
    let mut end_byte = 0;
    for (i, ch) in s.char_indices() {
        let cw = unicode_width::UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + cw > budget {
            end_byte = i;
            break;
        }
        used += cw;
        end_byte = i + ch.len_utf8();
    }

    format!("{}..", &s[..end_byte])
}

/// Pad or truncate a string to exactly `width` display columns, text on the left.
pub(crate) fn pad_right(s: &str, width: usize) -> String {
    let sw = display_width(s);
    if sw > width {
        truncate_display(s, width)
    } else {
        format!("{}{}", s, " ".repeat(width - sw))
    }
}

/// Pad a string to `width` display columns, text on the right. Never truncates.
pub(crate) fn pad_left(s: &str, width: usize) -> String {
    let sw = display_width(s);
    format!("{}{}", " ".repeat(width.saturating_sub(sw)), s)
}

/// Counts print without a fractional part; anything else keeps two decimals.
pub(crate) fn format_count(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{:.0}", v)
    } else {
        format!("{:.2}", v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_width_cjk() {
        assert_eq!(display_width("酒駕"), 4);
        assert_eq!(display_width("(113/09/01~113/09/07)"), 21);
    }

    #[test]
    fn truncate_cjk_boundary() {
        let t = truncate_display("去年同期累計", 7);
        assert_eq!(t, "去年..");
        assert!(display_width(&t) <= 7);
    }

    #[test]
    fn truncate_narrow() {
        assert_eq!(truncate_display("abc", 2), "a");
        assert_eq!(truncate_display("", 0), "");
    }

    #[test]
    fn pad_right_cjk() {
        assert_eq!(pad_right("龍潭所", 8), "龍潭所  ");
        assert_eq!(pad_right("abcdef", 5), "abc..");
    }

    #[test]
    fn pad_left_numbers() {
        assert_eq!(pad_left("42", 5), "   42");
        assert_eq!(pad_left("123456", 3), "123456");
    }

    #[test]
    fn counts_drop_trailing_zero() {
        assert_eq!(format_count(12.0), "12");
        assert_eq!(format_count(-3.0), "-3");
        assert_eq!(format_count(1.5), "1.50");
    }
}
