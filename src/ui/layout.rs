use ratatui::layout::{Constraint, Direction, Layout, Rect};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WorkspaceLayout {
    pub header: Rect,
    pub notes: Rect,
    pub tray: Rect,
    pub viewer: Rect,
    pub chat: Rect,
    pub input: Rect,
    pub status: Rect,
}

/// Header row, a left column (note list over the staging tray), a right
/// column (note viewer over chat), then the input box and a status row.
pub fn split_workspace_layout(area: Rect, input_rows: u16, tray_rows: u16) -> WorkspaceLayout {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Min(4),
            Constraint::Length(input_rows.max(1)),
            Constraint::Length(1),
        ])
        .split(area);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(30), Constraint::Percentage(70)])
        .split(rows[1]);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(tray_rows.max(3))])
        .split(columns[0]);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(columns[1]);

    WorkspaceLayout {
        header: rows[0],
        notes: left[0],
        tray: left[1],
        viewer: right[0],
        chat: right[1],
        input: rows[2],
        status: rows[3],
    }
}

/// Splits the viewer while editing: the buffer on top, its live diff below.
pub fn split_editor_preview(area: Rect) -> (Rect, Rect) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);
    (chunks[0], chunks[1])
}
