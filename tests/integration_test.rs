use kbstage::config::Config;
use kbstage::note_diff::{compute_line_diff, diff_or_passthrough, render_markup, DiffTier, LineKind};
use std::time::Duration;

#[test]
fn test_config_validation_rejects_blank_pr_title() {
    let config = Config {
        pr_title: "   ".to_string(),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_config_validation_allows_remote_https_backend() {
    let config = Config {
        api_url: "https://kb.internal.example.com".to_string(),
        poll_interval: Duration::from_secs(10),
        ..Config::default()
    };
    assert!(config.validate().is_ok());
    assert!(!config.is_local_endpoint());
}

#[test]
fn test_config_validation_rejects_oversized_interval() {
    let config = Config {
        poll_interval: Duration::from_secs(7200),
        ..Config::default()
    };
    assert!(config.validate().is_err());
}

#[test]
fn test_line_diff_marks_replaced_line() {
    let lines = compute_line_diff("# On-call\n\nA\nB\n", "# On-call\n\nA\nC\n");
    let kinds: Vec<LineKind> = lines.iter().map(|line| line.kind).collect();
    assert!(kinds.contains(&LineKind::Removed));
    assert!(kinds.contains(&LineKind::Added));
    let removed: Vec<&str> = lines
        .iter()
        .filter(|line| line.kind == LineKind::Removed)
        .map(|line| line.text.as_str())
        .collect();
    assert_eq!(removed, vec!["B"]);
}

#[test]
fn test_disabled_diff_passes_text_through() {
    let lines = diff_or_passthrough(Some("old"), "new\ntext", false);
    assert!(lines.iter().all(|line| line.kind == LineKind::Unchanged));
    assert_eq!(lines.len(), 2);
}

#[test]
fn test_markup_escapes_note_text() {
    let lines = compute_line_diff("", "<b>bold</b>");
    let markup = render_markup(&lines, DiffTier::Staged);
    assert!(markup.contains("&lt;b&gt;bold&lt;/b&gt;"));
    assert!(!markup.contains("<b>"));
}
