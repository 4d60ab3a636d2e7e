use crate::note_diff::{diff_stats, DiffLine, DiffTier, LineKind};
use crate::note_preview::{PreviewSpan, SpanKind};
use crate::state::{DiffView, PathState, RestorePrompt};
use crate::ui::layout::{split_editor_preview, split_workspace_layout};
use crate::ui::text_metrics::{cursor_row_col, fit_to_width, wrap_rows};
use ratatui::{
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph, Wrap},
    Frame,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Pane {
    Notes,
    Viewer,
    Tray,
    Input,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatRole {
    User,
    Agent,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BannerLevel {
    Info,
    Success,
    Error,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Banner {
    pub level: BannerLevel,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NoteRow {
    pub title: String,
    pub topic: String,
    pub state: PathState,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrayRow {
    pub title: String,
    pub path: String,
    pub is_new: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrRow {
    pub pr_number: u64,
    pub status: &'static str,
    pub files: usize,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ViewerContent {
    Empty(String),
    Preview {
        title: String,
        state: PathState,
        lines: Vec<Vec<PreviewSpan>>,
    },
    Diff {
        title: String,
        state: PathState,
        view: DiffView,
    },
    Editing {
        title: String,
        text: String,
        cursor: usize,
        diff: Option<DiffView>,
    },
}

/// Borrowed snapshot of everything one frame draws.
#[derive(Clone, Debug)]
pub struct WorkspaceView<'a> {
    pub header: String,
    pub status: String,
    pub focus: Pane,
    pub notes: Vec<NoteRow>,
    pub note_cursor: usize,
    pub viewer: ViewerContent,
    pub viewer_scroll: usize,
    pub tray: Vec<TrayRow>,
    pub tray_cursor: usize,
    pub prs: Vec<PrRow>,
    pub submitting: bool,
    pub chat: &'a [ChatMessage],
    pub chat_scroll: usize,
    pub input_label: &'static str,
    pub input: &'a str,
    pub input_cursor: usize,
    pub banners: Vec<&'a Banner>,
    pub restore: Option<&'a RestorePrompt>,
}

pub fn tier_color(tier: DiffTier) -> Color {
    match tier {
        DiffTier::Draft => Color::Yellow,
        DiffTier::Staged => Color::Cyan,
        DiffTier::Submitted => Color::Magenta,
    }
}

fn state_color(state: PathState) -> Color {
    match state {
        PathState::Clean => Color::Gray,
        PathState::Drafting => tier_color(DiffTier::Draft),
        PathState::Staged => tier_color(DiffTier::Staged),
        PathState::SubmittedOpen => tier_color(DiffTier::Submitted),
    }
}

fn pane_block(title: String, focused: bool) -> Block<'static> {
    let border = if focused {
        Style::default().fg(Color::White)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    Block::default()
        .borders(Borders::ALL)
        .border_style(border)
        .title(title)
}

fn titled_with_badge(title: &str, state: PathState) -> String {
    match state.badge() {
        Some(badge) => format!("{title} [{badge}]"),
        None => title.to_string(),
    }
}

/// Note list lines grouped under topic headings, plus the line index of
/// the row at `cursor`.
pub fn note_list_lines(rows: &[NoteRow], cursor: usize, width: usize) -> (Vec<Line<'static>>, usize) {
    let mut lines = Vec::new();
    let mut selected_line = 0usize;
    let mut topic: Option<&str> = None;
    for (index, row) in rows.iter().enumerate() {
        if topic != Some(row.topic.as_str()) {
            topic = Some(row.topic.as_str());
            lines.push(Line::styled(
                fit_to_width(&row.topic, width),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::BOLD),
            ));
        }
        let badge = row.state.badge().map(|badge| format!(" [{badge}]")).unwrap_or_default();
        let title_width = width.saturating_sub(2 + badge.len());
        let mut style = Style::default();
        if index == cursor {
            selected_line = lines.len();
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::from(vec![
            Span::styled(format!("  {}", fit_to_width(&row.title, title_width)), style),
            Span::styled(badge, Style::default().fg(state_color(row.state))),
        ]));
    }
    (lines, selected_line)
}

pub fn preview_line(spans: &[PreviewSpan]) -> Line<'static> {
    Line::from(
        spans
            .iter()
            .map(|span| {
                let style = match span.kind {
                    SpanKind::Plain => Style::default(),
                    SpanKind::Highlight => Style::default().fg(Color::Black).bg(Color::Yellow),
                    SpanKind::Link { resolved: true } => Style::default()
                        .fg(Color::Blue)
                        .add_modifier(Modifier::UNDERLINED),
                    SpanKind::Link { resolved: false } => Style::default()
                        .fg(Color::Red)
                        .add_modifier(Modifier::UNDERLINED | Modifier::DIM),
                };
                Span::styled(span.text.clone(), style)
            })
            .collect::<Vec<_>>(),
    )
}

pub fn diff_line(line: &DiffLine) -> Line<'static> {
    let (prefix, style) = match line.kind {
        LineKind::Unchanged => ("  ", Style::default()),
        LineKind::Added => ("+ ", Style::default().fg(Color::Green)),
        LineKind::Removed => (
            "- ",
            Style::default()
                .fg(Color::Red)
                .add_modifier(Modifier::CROSSED_OUT),
        ),
    };
    Line::styled(format!("{prefix}{}", line.text), style)
}

fn diff_header(view: &DiffView) -> Line<'static> {
    let stats = diff_stats(&view.lines);
    Line::styled(
        format!("{} changes  +{} -{}", view.tier.label(), stats.added, stats.removed),
        Style::default()
            .fg(tier_color(view.tier))
            .add_modifier(Modifier::BOLD),
    )
}

pub fn tray_lines(rows: &[TrayRow], cursor: usize, prs: &[PrRow], width: usize) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    if rows.is_empty() {
        lines.push(Line::styled(
            "nothing staged",
            Style::default().fg(Color::DarkGray),
        ));
    }
    for (index, row) in rows.iter().enumerate() {
        let marker = if row.is_new { "new " } else { "" };
        let text = fit_to_width(&format!("{marker}{}", row.title), width);
        let mut style = Style::default().fg(tier_color(DiffTier::Staged));
        if index == cursor {
            style = style.add_modifier(Modifier::REVERSED);
        }
        lines.push(Line::styled(text, style));
    }
    for pr in prs {
        let plural = if pr.files == 1 { "" } else { "s" };
        lines.push(Line::styled(
            fit_to_width(
                &format!("PR #{} {} ({} file{plural})", pr.pr_number, pr.status, pr.files),
                width,
            ),
            Style::default().fg(tier_color(DiffTier::Submitted)),
        ));
    }
    lines
}

pub fn chat_lines(messages: &[ChatMessage]) -> Vec<Line<'static>> {
    let mut lines = Vec::new();
    for message in messages {
        let (label, style) = match message.role {
            ChatRole::User => ("you", Style::default().fg(Color::Cyan)),
            ChatRole::Agent => ("agent", Style::default().fg(Color::White)),
            ChatRole::Error => ("error", Style::default().fg(Color::Red)),
        };
        let mut first = true;
        for text_line in message.text.split('\n') {
            let prefix = if first { format!("{label}: ") } else { "  ".to_string() };
            first = false;
            lines.push(Line::styled(format!("{prefix}{text_line}"), style));
        }
    }
    lines
}

fn banner_style(level: BannerLevel) -> Style {
    match level {
        BannerLevel::Info => Style::default().fg(Color::Blue),
        BannerLevel::Success => Style::default().fg(Color::Green),
        BannerLevel::Error => Style::default().fg(Color::Red).add_modifier(Modifier::BOLD),
    }
}

pub fn input_visual_rows(input: &str, width: usize) -> usize {
    wrap_rows(input, width).len().max(1)
}

pub fn render_workspace(frame: &mut Frame<'_>, view: &WorkspaceView<'_>) {
    let area = frame.area();
    frame.render_widget(Clear, area);
    let input_width = area.width.saturating_sub(2 + view.input_label.len() as u16).max(1) as usize;
    let input_rows = input_visual_rows(view.input, input_width).min(6) as u16;
    let tray_rows = (view.tray.len().max(1) + view.prs.len() + 2).min(12) as u16;
    let panes = split_workspace_layout(area, input_rows, tray_rows);

    render_header(frame, panes.header, &view.header, &view.banners);
    render_note_list(frame, panes.notes, view);
    render_viewer(frame, panes.viewer, view);
    render_tray(frame, panes.tray, view);
    render_chat(frame, panes.chat, view.chat, view.chat_scroll);
    render_input(
        frame,
        panes.input,
        view.input_label,
        view.input,
        view.input_cursor,
        view.focus == Pane::Input && view.restore.is_none(),
    );
    render_status_line(frame, panes.status, &view.status);

    if let Some(prompt) = view.restore {
        render_restore_modal(frame, prompt);
    }
}

fn render_header(frame: &mut Frame<'_>, area: Rect, header: &str, banners: &[&Banner]) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let line = match banners.last() {
        Some(banner) => Line::from(vec![
            Span::styled(
                fit_to_width(header, width / 3),
                Style::default().add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(
                fit_to_width(&banner.text, width.saturating_sub(width / 3 + 2)),
                banner_style(banner.level),
            ),
        ]),
        None => Line::styled(
            fit_to_width(header, width),
            Style::default().add_modifier(Modifier::BOLD),
        ),
    };
    frame.render_widget(Paragraph::new(line), area);
}

fn render_note_list(frame: &mut Frame<'_>, area: Rect, view: &WorkspaceView<'_>) {
    let block = pane_block(format!("Notes ({})", view.notes.len()), view.focus == Pane::Notes);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }
    let (lines, selected_line) = note_list_lines(&view.notes, view.note_cursor, inner.width as usize);
    let scroll = selected_line.saturating_sub(inner.height.saturating_sub(1) as usize);
    frame.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), inner);
}

fn render_viewer(frame: &mut Frame<'_>, area: Rect, view: &WorkspaceView<'_>) {
    let focused = view.focus == Pane::Viewer;
    match &view.viewer {
        ViewerContent::Empty(message) => {
            let block = pane_block("Note".to_string(), focused);
            frame.render_widget(
                Paragraph::new(Line::styled(message.clone(), Style::default().fg(Color::DarkGray)))
                    .block(block),
                area,
            );
        }
        ViewerContent::Preview { title, state, lines } => {
            let block = pane_block(titled_with_badge(title, *state), focused);
            let lines: Vec<Line<'static>> = lines.iter().map(|spans| preview_line(spans)).collect();
            frame.render_widget(
                Paragraph::new(lines)
                    .block(block)
                    .wrap(Wrap { trim: false })
                    .scroll((view.viewer_scroll as u16, 0)),
                area,
            );
        }
        ViewerContent::Diff { title, state, view: diff } => {
            let block = pane_block(titled_with_badge(title, *state), focused)
                .border_style(Style::default().fg(tier_color(diff.tier)));
            let mut lines = vec![diff_header(diff)];
            lines.extend(diff.lines.iter().map(diff_line));
            frame.render_widget(
                Paragraph::new(lines)
                    .block(block)
                    .wrap(Wrap { trim: false })
                    .scroll((view.viewer_scroll as u16, 0)),
                area,
            );
        }
        ViewerContent::Editing {
            title,
            text,
            cursor,
            diff,
        } => {
            let (editor_area, preview_area) = split_editor_preview(area);
            let block = pane_block(format!("Editing {title}  ctrl+s stage, esc discard"), focused)
                .border_style(Style::default().fg(tier_color(DiffTier::Draft)));
            let inner = block.inner(editor_area);
            frame.render_widget(block, editor_area);
            render_text_area(frame, inner, text, *cursor, focused);

            let preview_block = pane_block("Live diff".to_string(), false);
            let lines = match diff {
                Some(diff) => {
                    let mut lines = vec![diff_header(diff)];
                    lines.extend(diff.lines.iter().map(diff_line));
                    lines
                }
                None => vec![Line::styled("no changes yet", Style::default().fg(Color::DarkGray))],
            };
            frame.render_widget(
                Paragraph::new(lines).block(preview_block).wrap(Wrap { trim: false }),
                preview_area,
            );
        }
    }
}

fn render_text_area(frame: &mut Frame<'_>, area: Rect, text: &str, cursor: usize, show_cursor: bool) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    let width = area.width as usize;
    let rows = wrap_rows(text, width);
    let (cursor_row, cursor_col) = cursor_row_col(text, cursor, width);
    let visible = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible);
    let lines: Vec<Line<'static>> = rows
        .into_iter()
        .skip(window_start)
        .take(visible)
        .map(Line::from)
        .collect();
    frame.render_widget(Paragraph::new(lines), area);
    if show_cursor {
        let x = area
            .x
            .saturating_add(cursor_col as u16)
            .min(area.x.saturating_add(area.width.saturating_sub(1)));
        let y = area.y.saturating_add((cursor_row - window_start) as u16);
        frame.set_cursor_position((x, y));
    }
}

fn render_tray(frame: &mut Frame<'_>, area: Rect, view: &WorkspaceView<'_>) {
    let title = if view.submitting {
        format!("Staged ({}) submitting...", view.tray.len())
    } else {
        format!("Staged ({})", view.tray.len())
    };
    let block = pane_block(title, view.focus == Pane::Tray);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }
    let lines = tray_lines(&view.tray, view.tray_cursor, &view.prs, inner.width as usize);
    let scroll = view
        .tray_cursor
        .saturating_sub(inner.height.saturating_sub(1) as usize);
    frame.render_widget(Paragraph::new(lines).scroll((scroll as u16, 0)), inner);
}

fn render_chat(frame: &mut Frame<'_>, area: Rect, messages: &[ChatMessage], scroll: usize) {
    let block = pane_block("Chat".to_string(), false);
    let inner = block.inner(area);
    frame.render_widget(block, area);
    if inner.height == 0 || inner.width == 0 {
        return;
    }
    let lines = chat_lines(messages);
    // Scroll counts lines up from the bottom.
    let total = lines.len();
    let visible = inner.height as usize;
    let top = total.saturating_sub(visible).saturating_sub(scroll);
    frame.render_widget(
        Paragraph::new(lines)
            .wrap(Wrap { trim: false })
            .scroll((top as u16, 0)),
        inner,
    );
}

pub fn render_input(
    frame: &mut Frame<'_>,
    area: Rect,
    label: &str,
    input: &str,
    cursor_byte: usize,
    show_cursor: bool,
) {
    if area.height == 0 || area.width <= 2 {
        return;
    }
    let prefix_width = label.len() + 2;
    let input_width = (area.width as usize).saturating_sub(prefix_width).max(1);
    let rows = wrap_rows(input, input_width);
    let (cursor_row, cursor_col) = cursor_row_col(input, cursor_byte, input_width);
    let visible_rows = area.height as usize;
    let window_start = cursor_row.saturating_add(1).saturating_sub(visible_rows);

    let mut rendered = Vec::with_capacity(visible_rows);
    for offset in 0..visible_rows {
        let row_index = window_start + offset;
        let prefix = if row_index == 0 {
            format!("{label}> ")
        } else {
            " ".repeat(prefix_width)
        };
        let row = rows.get(row_index).cloned().unwrap_or_default();
        rendered.push(Line::from(format!("{prefix}{row}")));
    }

    frame.render_widget(
        Paragraph::new(rendered).style(Style::default().fg(Color::Gray).bg(Color::Rgb(24, 24, 24))),
        area,
    );

    if show_cursor {
        let cursor_y = area
            .y
            .saturating_add(cursor_row.saturating_sub(window_start) as u16);
        let cursor_x = area
            .x
            .saturating_add((prefix_width + cursor_col) as u16)
            .min(area.x.saturating_add(area.width.saturating_sub(1)));
        frame.set_cursor_position((cursor_x, cursor_y));
    }
}

pub fn render_status_line(frame: &mut Frame<'_>, area: Rect, status: &str) {
    if area.height == 0 || area.width == 0 {
        return;
    }
    frame.render_widget(
        Paragraph::new(fit_to_width(status, area.width as usize))
            .style(Style::default().fg(Color::DarkGray)),
        area,
    );
}

pub fn render_restore_modal(frame: &mut Frame<'_>, prompt: &RestorePrompt) {
    let size = frame.area();
    let width = size.width.clamp(40, 80).min(size.width);
    let height = (prompt.paths.len() as u16 + 6).clamp(7, 16).min(size.height);
    let x = size.x + (size.width.saturating_sub(width)) / 2;
    let y = size.y + (size.height.saturating_sub(height)) / 2;
    let area = Rect::new(x, y, width, height);
    frame.render_widget(Clear, area);

    let block = Block::default()
        .borders(Borders::ALL)
        .title(format!("PR #{} was closed without merging", prompt.pr_number))
        .style(Style::default().fg(Color::Yellow));
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = vec![
        Line::from("y restore its changes to staging   n discard"),
        Line::from(""),
        Line::styled("Files", Style::default().add_modifier(Modifier::BOLD)),
    ];
    let room = inner.height.saturating_sub(3) as usize;
    for path in prompt.paths.iter().take(room) {
        lines.push(Line::from(format!("  {path}")));
    }

    frame.render_widget(
        Paragraph::new(Text::from(lines))
            .alignment(Alignment::Left)
            .wrap(Wrap { trim: false }),
        inner,
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn row(title: &str, topic: &str, state: PathState) -> NoteRow {
        NoteRow {
            title: title.to_string(),
            topic: topic.to_string(),
            state,
        }
    }

    fn empty_view<'a>(chat: &'a [ChatMessage]) -> WorkspaceView<'a> {
        WorkspaceView {
            header: "kbstage".to_string(),
            status: "ready".to_string(),
            focus: Pane::Notes,
            notes: Vec::new(),
            note_cursor: 0,
            viewer: ViewerContent::Empty("Select a note".to_string()),
            viewer_scroll: 0,
            tray: Vec::new(),
            tray_cursor: 0,
            prs: Vec::new(),
            submitting: false,
            chat,
            chat_scroll: 0,
            input_label: "chat",
            input: "",
            input_cursor: 0,
            banners: Vec::new(),
            restore: None,
        }
    }

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn note_list_groups_topics_and_tracks_cursor() {
        let rows = vec![
            row("Deploying", "General", PathState::Clean),
            row("FAQ", "General", PathState::Staged),
            row("New page", "Pending", PathState::SubmittedOpen),
        ];
        let (lines, selected) = note_list_lines(&rows, 2, 40);
        let texts: Vec<String> = lines.iter().map(line_text).collect();
        assert_eq!(
            texts,
            vec!["General", "  Deploying", "  FAQ [staged]", "Pending", "  New page [in PR]"]
        );
        assert_eq!(selected, 4);
    }

    #[test]
    fn diff_lines_carry_markers() {
        let added = DiffLine {
            kind: LineKind::Added,
            text: "new".to_string(),
        };
        let removed = DiffLine {
            kind: LineKind::Removed,
            text: "old".to_string(),
        };
        assert_eq!(line_text(&diff_line(&added)), "+ new");
        assert_eq!(line_text(&diff_line(&removed)), "- old");
    }

    #[test]
    fn tray_lists_staged_then_prs() {
        let rows = vec![TrayRow {
            title: "FAQ".to_string(),
            path: "faq.md".to_string(),
            is_new: true,
        }];
        let prs = vec![PrRow {
            pr_number: 7,
            status: "open",
            files: 2,
        }];
        let texts: Vec<String> = tray_lines(&rows, 0, &prs, 40).iter().map(line_text).collect();
        assert_eq!(texts, vec!["new FAQ", "PR #7 open (2 files)"]);
        let empty: Vec<String> = tray_lines(&[], 0, &[], 40).iter().map(line_text).collect();
        assert_eq!(empty, vec!["nothing staged"]);
    }

    #[test]
    fn chat_lines_prefix_roles() {
        let messages = vec![
            ChatMessage {
                role: ChatRole::User,
                text: "hi".to_string(),
            },
            ChatMessage {
                role: ChatRole::Agent,
                text: "one\ntwo".to_string(),
            },
        ];
        let texts: Vec<String> = chat_lines(&messages).iter().map(line_text).collect();
        assert_eq!(texts, vec!["you: hi", "agent: one", "  two"]);
    }

    #[test]
    fn workspace_renders_panes_and_restore_modal() {
        let chat = vec![ChatMessage {
            role: ChatRole::Agent,
            text: "hello there".to_string(),
        }];
        let prompt = RestorePrompt {
            pr_number: 3,
            pr_url: "https://example.test/pull/3".to_string(),
            paths: vec!["faq.md".to_string()],
        };
        let banner = Banner {
            level: BannerLevel::Info,
            text: "PR #3 closed".to_string(),
        };
        let mut view = empty_view(&chat);
        view.notes = vec![row("FAQ", "General", PathState::Clean)];
        view.banners = vec![&banner];
        view.restore = Some(&prompt);

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal
            .draw(|frame| render_workspace(frame, &view))
            .expect("draw");
        let screen = screen_text(&terminal);
        assert!(screen.contains("Notes (1)"));
        assert!(screen.contains("hello there"));
        assert!(screen.contains("PR #3 closed"));
        assert!(screen.contains("PR #3 was closed without merging"));
        assert!(screen.contains("faq.md"));
    }

    #[test]
    fn workspace_renders_editor_with_live_diff() {
        let chat = Vec::new();
        let mut view = empty_view(&chat);
        view.focus = Pane::Viewer;
        view.viewer = ViewerContent::Editing {
            title: "FAQ".to_string(),
            text: "# FAQ\nQ".to_string(),
            cursor: 7,
            diff: Some(DiffView {
                tier: DiffTier::Draft,
                lines: vec![DiffLine {
                    kind: LineKind::Added,
                    text: "Q".to_string(),
                }],
            }),
        };

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("terminal");
        terminal
            .draw(|frame| render_workspace(frame, &view))
            .expect("draw");
        let screen = screen_text(&terminal);
        assert!(screen.contains("Editing FAQ"));
        assert!(screen.contains("draft changes  +1 -0"));
        assert!(screen.contains("+ Q"));
    }
}
