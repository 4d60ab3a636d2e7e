use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

pub fn char_display_width(ch: char) -> usize {
    UnicodeWidthChar::width(ch).unwrap_or(0)
}

pub fn display_width(text: &str) -> usize {
    UnicodeWidthStr::width(text)
}

pub fn clamp_to_char_boundary_left(text: &str, cursor: usize) -> usize {
    let mut cursor = cursor.min(text.len());
    while cursor > 0 && !text.is_char_boundary(cursor) {
        cursor -= 1;
    }
    cursor
}

/// Soft-wraps `text` at `width` display columns. Hard newlines always break;
/// the result has at least one row.
pub fn wrap_rows(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut rows = vec![String::new()];
    let mut used = 0usize;
    for ch in text.chars().filter(|ch| *ch != '\r') {
        if ch == '\n' {
            rows.push(String::new());
            used = 0;
            continue;
        }
        let ch_width = char_display_width(ch);
        if used > 0 && used + ch_width > width {
            rows.push(String::new());
            used = 0;
        }
        if let Some(row) = rows.last_mut() {
            row.push(ch);
        }
        used += ch_width;
    }
    rows
}

/// Wrapped (row, column) of the byte offset `cursor`, consistent with [`wrap_rows`].
pub fn cursor_row_col(text: &str, cursor: usize, width: usize) -> (usize, usize) {
    let width = width.max(1);
    let cursor = clamp_to_char_boundary_left(text, cursor);
    let (mut row, mut col) = (0usize, 0usize);
    for ch in text[..cursor].chars().filter(|ch| *ch != '\r') {
        if ch == '\n' {
            row += 1;
            col = 0;
            continue;
        }
        let ch_width = char_display_width(ch);
        if col > 0 && col + ch_width > width {
            row += 1;
            col = 0;
        }
        col += ch_width;
    }
    if col >= width {
        row += 1;
        col = 0;
    }
    (row, col)
}

/// Cuts `text` to `width` columns, ending in `...` when something was dropped.
pub fn fit_to_width(text: &str, width: usize) -> String {
    if display_width(text) <= width {
        return text.to_string();
    }
    if width < 4 {
        return take_columns(text, width);
    }
    let mut out = take_columns(text, width - 3);
    out.push_str("...");
    out
}

fn take_columns(text: &str, max_width: usize) -> String {
    let mut out = String::new();
    let mut used = 0usize;
    for ch in text.chars() {
        let ch_width = char_display_width(ch);
        if used + ch_width > max_width {
            break;
        }
        out.push(ch);
        used += ch_width;
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrap_rows_breaks_on_width_and_newlines() {
        assert_eq!(wrap_rows("abcdef", 4), vec!["abcd", "ef"]);
        assert_eq!(wrap_rows("ab\n\ncd", 10), vec!["ab", "", "cd"]);
        assert_eq!(wrap_rows("", 5), vec![""]);
    }

    #[test]
    fn test_cursor_row_col_tracks_wrapping() {
        assert_eq!(cursor_row_col("abcdef", 6, 4), (1, 2));
        assert_eq!(cursor_row_col("abcd", 4, 4), (1, 0));
        assert_eq!(cursor_row_col("ab\ncd", 4, 10), (1, 1));
    }

    #[test]
    fn test_wide_chars_count_two_columns() {
        assert_eq!(display_width("日本"), 4);
        assert_eq!(wrap_rows("日本語", 4), vec!["日本", "語"]);
        assert_eq!(clamp_to_char_boundary_left("日本", 2), 0);
    }

    #[test]
    fn test_fit_to_width_adds_ellipsis() {
        assert_eq!(fit_to_width("short", 10), "short");
        assert_eq!(fit_to_width("Knowledge base updates", 10), "Knowled...");
        assert_eq!(fit_to_width("abcdef", 3), "abc");
    }
}
