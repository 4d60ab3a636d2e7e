use std::borrow::Cow;
use std::collections::HashMap;

/// Band, as a fraction of the longer side, within which a removed line snaps to
/// a nearby added line instead of its proportional position.
pub const REMOVED_LINE_TOLERANCE: f64 = 0.10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiffTier {
    Draft,
    Staged,
    Submitted,
}

impl DiffTier {
    pub fn label(self) -> &'static str {
        match self {
            DiffTier::Draft => "draft",
            DiffTier::Staged => "staged",
            DiffTier::Submitted => "submitted",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineKind {
    Unchanged,
    Added,
    Removed,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffLine {
    pub kind: LineKind,
    pub text: String,
}

impl DiffLine {
    fn new(kind: LineKind, text: &str) -> Self {
        Self {
            kind,
            text: text.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DiffStats {
    pub added: usize,
    pub removed: usize,
}

impl DiffStats {
    pub fn is_empty(&self) -> bool {
        self.added == 0 && self.removed == 0
    }
}

pub fn diff_stats(lines: &[DiffLine]) -> DiffStats {
    lines.iter().fold(DiffStats::default(), |mut stats, line| {
        match line.kind {
            LineKind::Added => stats.added += 1,
            LineKind::Removed => stats.removed += 1,
            LineKind::Unchanged => {}
        }
        stats
    })
}

/// Classifies the lines of `modified` against `original`.
///
/// Lines compare by trimmed content and match by occurrence count, so moving an
/// identical line is not a change. Blank lines are always unchanged. Removed
/// lines are placed approximately; their exact position is not a contract.
pub fn compute_line_diff(original: &str, modified: &str) -> Vec<DiffLine> {
    let original_lines: Vec<&str> = original.split('\n').collect();
    let modified_lines: Vec<&str> = modified.split('\n').collect();

    let original_counts = count_lines(&original_lines);
    let modified_counts = count_lines(&modified_lines);

    let added = classify_excess(&modified_lines, &original_counts);
    let removed_flags = classify_excess(&original_lines, &modified_counts);
    let removed: Vec<usize> = removed_flags
        .iter()
        .enumerate()
        .filter_map(|(index, flagged)| flagged.then_some(index))
        .collect();

    let placements = place_removed_lines(&removed, original_lines.len(), &added);

    let mut out = Vec::with_capacity(modified_lines.len() + removed.len());
    let mut next_removed = 0usize;
    for (index, line) in modified_lines.iter().enumerate() {
        while next_removed < placements.len() && placements[next_removed].0 <= index {
            out.push(DiffLine::new(
                LineKind::Removed,
                original_lines[placements[next_removed].1],
            ));
            next_removed += 1;
        }
        let kind = if added[index] {
            LineKind::Added
        } else {
            LineKind::Unchanged
        };
        out.push(DiffLine::new(kind, line));
    }
    for &(_, original_index) in &placements[next_removed..] {
        out.push(DiffLine::new(LineKind::Removed, original_lines[original_index]));
    }

    out
}

/// All-unchanged lines when there is nothing to compare against.
pub fn diff_or_passthrough(original: Option<&str>, modified: &str, enabled: bool) -> Vec<DiffLine> {
    match original {
        Some(original) if enabled && !original.is_empty() => compute_line_diff(original, modified),
        _ => modified
            .split('\n')
            .map(|line| DiffLine::new(LineKind::Unchanged, line))
            .collect(),
    }
}

fn count_lines<'a>(lines: &[&'a str]) -> HashMap<&'a str, usize> {
    let mut counts = HashMap::new();
    for line in lines {
        let key = line.trim();
        if !key.is_empty() {
            *counts.entry(key).or_insert(0) += 1;
        }
    }
    counts
}

/// Flags each non-blank line whose running occurrence count exceeds the count
/// available on the other side.
fn classify_excess(lines: &[&str], other_counts: &HashMap<&str, usize>) -> Vec<bool> {
    let mut seen: HashMap<&str, usize> = HashMap::new();
    lines
        .iter()
        .map(|line| {
            let key = line.trim();
            if key.is_empty() {
                return false;
            }
            let count = seen.entry(key).or_insert(0);
            *count += 1;
            *count > other_counts.get(key).copied().unwrap_or(0)
        })
        .collect()
}

/// Returns `(modified_position, original_index)` pairs sorted for emission. A
/// removed line is emitted before the modified line at `modified_position`.
fn place_removed_lines(
    removed: &[usize],
    original_len: usize,
    added: &[bool],
) -> Vec<(usize, usize)> {
    let modified_len = added.len();
    let band = ((original_len.max(modified_len) as f64) * REMOVED_LINE_TOLERANCE).ceil() as usize;

    let mut placements: Vec<(usize, usize)> = removed
        .iter()
        .map(|&original_index| {
            let anchor = if original_len == 0 {
                0
            } else {
                ((original_index as f64) * (modified_len as f64) / (original_len as f64)).round()
                    as usize
            }
            .min(modified_len);
            let position = nearest_added(added, anchor, band).unwrap_or(anchor);
            (position, original_index)
        })
        .collect();
    placements.sort();
    placements
}

fn nearest_added(added: &[bool], anchor: usize, band: usize) -> Option<usize> {
    (0..=band).find_map(|distance| {
        let after = anchor + distance;
        if added.get(after).copied().unwrap_or(false) {
            return Some(after);
        }
        let before = anchor.checked_sub(distance)?;
        added.get(before).copied().unwrap_or(false).then_some(before)
    })
}

/// Escapes characters that would otherwise be read as markup.
pub fn escape_markup(text: &str) -> Cow<'_, str> {
    if !text.contains(['&', '<', '>', '"', '\'']) {
        return Cow::Borrowed(text);
    }
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            other => out.push(other),
        }
    }
    Cow::Owned(out)
}

/// Renders line operations as HTML-like markup for web surfaces. Unchanged
/// lines pass through untouched; runs of removed lines become one collapsed fold.
pub fn render_markup(lines: &[DiffLine], tier: DiffTier) -> String {
    let tier = tier.label();
    let mut rendered: Vec<String> = Vec::with_capacity(lines.len());
    let mut index = 0usize;

    while index < lines.len() {
        let line = &lines[index];
        match line.kind {
            LineKind::Unchanged => {
                rendered.push(line.text.clone());
                index += 1;
            }
            LineKind::Added => {
                rendered.push(format!(
                    "<span class=\"diff-added diff-{tier}\">{}</span>",
                    escape_markup(&line.text)
                ));
                index += 1;
            }
            LineKind::Removed => {
                let run_end = lines[index..]
                    .iter()
                    .position(|line| line.kind != LineKind::Removed)
                    .map_or(lines.len(), |offset| index + offset);
                let run = &lines[index..run_end];
                let noun = if run.len() == 1 { "line" } else { "lines" };
                let mut fold = format!(
                    "<details class=\"diff-removed diff-{tier}\"><summary>{} removed {noun}</summary>",
                    run.len()
                );
                for removed in run {
                    fold.push_str("<del>");
                    fold.push_str(&escape_markup(&removed.text));
                    fold.push_str("</del>");
                }
                fold.push_str("</details>");
                rendered.push(fold);
                index = run_end;
            }
        }
    }

    rendered.join("\n")
}

/// Annotated text for `modified`. Returns `modified` unchanged when diffing is
/// off, there is no original, or nothing changed.
pub fn compute_diff_highlight(
    original: Option<&str>,
    modified: &str,
    tier: DiffTier,
    enabled: bool,
) -> String {
    let lines = diff_or_passthrough(original, modified, enabled);
    if diff_stats(&lines).is_empty() {
        return modified.to_string();
    }
    render_markup(&lines, tier)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(lines: &[DiffLine]) -> Vec<(LineKind, &str)> {
        lines
            .iter()
            .map(|line| (line.kind, line.text.as_str()))
            .collect()
    }

    #[test]
    fn test_duplicate_lines_match_by_occurrence_count() {
        let lines = compute_line_diff("X\nX", "X");
        let stats = diff_stats(&lines);
        assert_eq!(stats.removed, 1);
        assert_eq!(stats.added, 0);
    }

    #[test]
    fn test_identical_input_has_no_markup() {
        let text = "# Title\n\nBody <b>\n";
        let lines = compute_line_diff(text, text);
        assert!(diff_stats(&lines).is_empty());
        assert_eq!(
            compute_diff_highlight(Some(text), text, DiffTier::Staged, true),
            text
        );
    }

    #[test]
    fn test_reordered_identical_lines_are_not_flagged() {
        let lines = compute_line_diff("a\nb\nc", "c\nb\na");
        assert!(diff_stats(&lines).is_empty());
    }

    #[test]
    fn test_replaced_line_is_removed_before_its_replacement() {
        let lines = compute_line_diff("A\nB", "A\nC");
        assert_eq!(
            kinds(&lines),
            vec![
                (LineKind::Unchanged, "A"),
                (LineKind::Removed, "B"),
                (LineKind::Added, "C"),
            ]
        );
    }

    #[test]
    fn test_whitespace_only_changes_are_unchanged() {
        let lines = compute_line_diff("  indented\nplain", "indented\nplain   ");
        assert!(diff_stats(&lines).is_empty());
    }

    #[test]
    fn test_blank_lines_are_never_classified() {
        let lines = compute_line_diff("a\n\n\nb", "a\nb\n\n\n\n");
        assert!(diff_stats(&lines).is_empty());
    }

    #[test]
    fn test_passthrough_without_original_or_when_disabled() {
        let modified = "# New\n<script>\n";
        assert_eq!(
            compute_diff_highlight(None, modified, DiffTier::Draft, true),
            modified
        );
        assert_eq!(
            compute_diff_highlight(Some(""), modified, DiffTier::Draft, true),
            modified
        );
        assert_eq!(
            compute_diff_highlight(Some("# Old"), modified, DiffTier::Draft, false),
            modified
        );
    }

    #[test]
    fn test_markup_escapes_changed_lines_only() {
        let rendered = compute_diff_highlight(
            Some("keep <raw>\nold & gone"),
            "keep <raw>\nnew <em>",
            DiffTier::Submitted,
            true,
        );
        assert!(rendered.starts_with("keep <raw>\n"));
        assert!(rendered.contains("<del>old &amp; gone</del>"));
        assert!(rendered.contains(
            "<span class=\"diff-added diff-submitted\">new &lt;em&gt;</span>"
        ));
    }

    #[test]
    fn test_removed_run_is_one_fold() {
        let lines = compute_line_diff("a\nb\nc\nd", "a\nd");
        let rendered = render_markup(&lines, DiffTier::Staged);
        assert_eq!(rendered.matches("<details").count(), 1);
        assert!(rendered.contains("2 removed lines"));
    }

    #[test]
    fn test_tier_changes_styling_not_classification() {
        let draft = compute_line_diff("A\nB", "A\nC");
        let staged = compute_line_diff("A\nB", "A\nC");
        assert_eq!(draft, staged);
        assert_ne!(
            render_markup(&draft, DiffTier::Draft),
            render_markup(&staged, DiffTier::Staged)
        );
    }
}
