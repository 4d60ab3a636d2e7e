use crate::note_diff::escape_markup;
use crate::state::NoteStore;
use aho_corasick::AhoCorasick;
use std::ops::Range;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkSegment {
    Text(String),
    /// `[[target]]` or `[[target|label]]`; `path` is set when the target resolves.
    Link {
        target: String,
        label: String,
        path: Option<String>,
    },
}

/// Splits `text` around `[[wiki links]]`, resolving each against the store.
/// An unclosed `[[` is kept as plain text.
pub fn split_wiki_links(text: &str, store: &NoteStore) -> Vec<LinkSegment> {
    let mut segments = Vec::new();
    let mut cursor = 0usize;
    while let Some(start) = text[cursor..].find("[[") {
        let start_ix = cursor + start;
        let link_start = start_ix + 2;
        let Some(end_rel) = text[link_start..].find("]]") else {
            break;
        };
        let link_end = link_start + end_rel;
        let inner = text[link_start..link_end].trim();
        if inner.is_empty() {
            push_text(&mut segments, &text[cursor..link_end + 2]);
            cursor = link_end + 2;
            continue;
        }

        push_text(&mut segments, &text[cursor..start_ix]);
        let (target, label) = match inner.split_once('|') {
            Some((target, alias)) if !alias.trim().is_empty() => (target.trim(), alias.trim()),
            Some((target, _)) => (target.trim(), target.trim()),
            None => (inner, inner),
        };
        segments.push(LinkSegment::Link {
            target: target.to_string(),
            label: label.to_string(),
            path: store.resolve_link(target).map(|note| note.path.clone()),
        });
        cursor = link_end + 2;
    }
    push_text(&mut segments, &text[cursor..]);
    segments
}

fn push_text(segments: &mut Vec<LinkSegment>, text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(LinkSegment::Text(previous)) = segments.last_mut() {
        previous.push_str(text);
    } else {
        segments.push(LinkSegment::Text(text.to_string()));
    }
}

/// Byte ranges of every ASCII-case-insensitive occurrence of `needle`.
pub fn find_highlights(text: &str, needle: &str) -> Vec<Range<usize>> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Vec::new();
    }
    let matcher = match AhoCorasick::builder()
        .ascii_case_insensitive(true)
        .build([needle])
    {
        Ok(matcher) => matcher,
        Err(error) => {
            tracing::warn!(error = %error, "highlight matcher failed to build");
            return Vec::new();
        }
    };
    matcher
        .find_iter(text)
        .map(|found| found.start()..found.end())
        .collect()
}

/// Line index of the heading titled `section_title`, for scrolling the viewer.
pub fn section_line(content: &str, section_title: &str) -> Option<usize> {
    let wanted = section_title.trim().to_lowercase();
    if wanted.is_empty() {
        return None;
    }
    let headings: Vec<(usize, String)> = content
        .lines()
        .enumerate()
        .filter_map(|(index, line)| {
            let trimmed = line.trim_start();
            let heading = trimmed.trim_start_matches('#');
            (heading.len() < trimmed.len()).then(|| (index, heading.trim().to_lowercase()))
        })
        .collect();
    headings
        .iter()
        .find(|(_, heading)| *heading == wanted)
        .or_else(|| headings.iter().find(|(_, heading)| heading.contains(&wanted)))
        .map(|(index, _)| *index)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpanKind {
    Plain,
    Highlight,
    Link { resolved: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreviewSpan {
    pub text: String,
    pub kind: SpanKind,
}

/// Per-line spans for the terminal viewer: links collapsed to their label,
/// highlight matches marked outside links.
pub fn preview_lines(
    content: &str,
    store: &NoteStore,
    highlight: Option<&str>,
) -> Vec<Vec<PreviewSpan>> {
    content
        .split('\n')
        .map(|line| {
            let mut spans = Vec::new();
            for segment in split_wiki_links(line, store) {
                match segment {
                    LinkSegment::Text(text) => push_highlighted(&mut spans, &text, highlight),
                    LinkSegment::Link { label, path, .. } => spans.push(PreviewSpan {
                        text: label,
                        kind: SpanKind::Link {
                            resolved: path.is_some(),
                        },
                    }),
                }
            }
            spans
        })
        .collect()
}

fn push_highlighted(spans: &mut Vec<PreviewSpan>, text: &str, highlight: Option<&str>) {
    let ranges = highlight.map_or_else(Vec::new, |needle| find_highlights(text, needle));
    let mut cursor = 0usize;
    for range in ranges {
        if range.start > cursor {
            spans.push(PreviewSpan {
                text: text[cursor..range.start].to_string(),
                kind: SpanKind::Plain,
            });
        }
        spans.push(PreviewSpan {
            text: text[range.clone()].to_string(),
            kind: SpanKind::Highlight,
        });
        cursor = range.end;
    }
    if cursor < text.len() {
        spans.push(PreviewSpan {
            text: text[cursor..].to_string(),
            kind: SpanKind::Plain,
        });
    }
}

/// HTML-like rendering for web surfaces: resolved links become anchors, missing
/// ones a flagged span, highlight matches `<mark>`. Other text passes through.
pub fn render_note_markup(content: &str, store: &NoteStore, highlight: Option<&str>) -> String {
    let mut out = String::with_capacity(content.len());
    for segment in split_wiki_links(content, store) {
        match segment {
            LinkSegment::Text(text) => {
                let ranges = highlight.map_or_else(Vec::new, |needle| find_highlights(&text, needle));
                let mut cursor = 0usize;
                for range in ranges {
                    out.push_str(&text[cursor..range.start]);
                    out.push_str("<mark>");
                    out.push_str(&escape_markup(&text[range.clone()]));
                    out.push_str("</mark>");
                    cursor = range.end;
                }
                out.push_str(&text[cursor..]);
            }
            LinkSegment::Link { label, path, .. } => match path {
                Some(path) => out.push_str(&format!(
                    "<a class=\"wiki-link\" data-path=\"{}\">{}</a>",
                    escape_markup(&path),
                    escape_markup(&label)
                )),
                None => out.push_str(&format!(
                    "<span class=\"wiki-link missing\">{}</span>",
                    escape_markup(&label)
                )),
            },
        }
    }
    out
}
