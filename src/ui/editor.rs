use super::text_metrics::clamp_to_char_boundary_left;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

#[derive(Clone, Debug, PartialEq, Eq)]
struct Snapshot {
    buffer: String,
    cursor: usize,
}

#[derive(Debug, PartialEq, Eq)]
pub enum EditorAction {
    None,
    Submit(String),
    Cancel,
}

/// Text buffer with a byte cursor kept on char boundaries and undo/redo.
///
/// Single-line editors submit on Enter and recall earlier submissions with
/// Up/Down. Multi-line editors insert newlines and move between lines.
#[derive(Debug, Default)]
pub struct TextEditor {
    buffer: String,
    cursor: usize,
    multiline: bool,
    history: Vec<String>,
    history_index: Option<usize>,
    history_stash: Option<Snapshot>,
    undo_stack: Vec<Snapshot>,
    redo_stack: Vec<Snapshot>,
}

impl TextEditor {
    pub fn single_line() -> Self {
        Self::default()
    }

    pub fn multiline() -> Self {
        Self {
            multiline: true,
            ..Self::default()
        }
    }

    pub fn text(&self) -> &str {
        &self.buffer
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Replaces the whole buffer, cursor at the end, undo history dropped.
    pub fn set_text(&mut self, text: &str) {
        self.buffer = text.to_string();
        self.cursor = self.buffer.len();
        self.undo_stack.clear();
        self.redo_stack.clear();
        self.history_index = None;
        self.history_stash = None;
    }

    pub fn clear(&mut self) {
        self.set_text("");
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            buffer: self.buffer.clone(),
            cursor: self.cursor,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.buffer = snapshot.buffer;
        self.cursor = clamp_to_char_boundary_left(&self.buffer, snapshot.cursor);
    }

    fn push_undo(&mut self) {
        self.undo_stack.push(self.snapshot());
        self.redo_stack.clear();
    }

    fn prev_boundary(&self, index: usize) -> usize {
        let index = clamp_to_char_boundary_left(&self.buffer, index);
        self.buffer[..index]
            .char_indices()
            .next_back()
            .map_or(0, |(start, _)| start)
    }

    fn next_boundary(&self, index: usize) -> usize {
        let index = clamp_to_char_boundary_left(&self.buffer, index);
        self.buffer[index..]
            .chars()
            .next()
            .map_or(self.buffer.len(), |ch| index + ch.len_utf8())
    }

    pub fn insert_str(&mut self, value: &str) {
        let value = if self.multiline {
            value.replace("\r\n", "\n")
        } else {
            value.replace(['\r', '\n'], " ")
        };
        self.history_index = None;
        self.history_stash = None;
        let cursor = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        self.push_undo();
        self.buffer.insert_str(cursor, &value);
        self.cursor = cursor + value.len();
    }

    pub fn backspace(&mut self) {
        let end = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        if end == 0 {
            return;
        }
        let start = self.prev_boundary(end);
        self.push_undo();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    pub fn delete(&mut self) {
        let start = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        if start >= self.buffer.len() {
            return;
        }
        let end = self.next_boundary(start);
        self.push_undo();
        self.buffer.replace_range(start..end, "");
        self.cursor = start;
    }

    pub fn undo(&mut self) {
        if let Some(previous) = self.undo_stack.pop() {
            self.redo_stack.push(self.snapshot());
            self.restore(previous);
        }
    }

    pub fn redo(&mut self) {
        if let Some(next) = self.redo_stack.pop() {
            self.undo_stack.push(self.snapshot());
            self.restore(next);
        }
    }

    fn submit(&mut self) -> Option<String> {
        let value = self.buffer.trim().to_string();
        if value.is_empty() {
            return None;
        }
        self.history.push(value.clone());
        self.set_text("");
        Some(value)
    }

    fn line_start(&self, index: usize) -> usize {
        self.buffer[..index].rfind('\n').map_or(0, |newline| newline + 1)
    }

    fn line_end(&self, index: usize) -> usize {
        self.buffer[index..]
            .find('\n')
            .map_or(self.buffer.len(), |offset| index + offset)
    }

    /// Byte offset of `column` chars into the line starting at `start`.
    fn offset_in_line(&self, start: usize, column: usize) -> usize {
        let end = self.line_end(start);
        self.buffer[start..end]
            .char_indices()
            .nth(column)
            .map_or(end, |(offset, _)| start + offset)
    }

    fn move_line(&mut self, down: bool) {
        let cursor = clamp_to_char_boundary_left(&self.buffer, self.cursor);
        let start = self.line_start(cursor);
        let column = self.buffer[start..cursor].chars().count();
        if down {
            let end = self.line_end(cursor);
            if end < self.buffer.len() {
                self.cursor = self.offset_in_line(end + 1, column);
            }
        } else if start > 0 {
            let previous_start = self.line_start(start - 1);
            self.cursor = self.offset_in_line(previous_start, column);
        }
    }

    fn history_up(&mut self) {
        if self.history.is_empty() {
            return;
        }
        if self.history_index.is_none() {
            self.history_stash = Some(self.snapshot());
        }
        let next = match self.history_index {
            Some(index) => index.saturating_sub(1),
            None => self.history.len() - 1,
        };
        self.history_index = Some(next);
        self.buffer = self.history[next].clone();
        self.cursor = self.buffer.len();
    }

    fn history_down(&mut self) {
        let Some(index) = self.history_index else {
            return;
        };
        if index + 1 < self.history.len() {
            self.history_index = Some(index + 1);
            self.buffer = self.history[index + 1].clone();
            self.cursor = self.buffer.len();
            return;
        }
        self.history_index = None;
        match self.history_stash.take() {
            Some(stash) => self.restore(stash),
            None => {
                self.buffer.clear();
                self.cursor = 0;
            }
        }
    }

    pub fn apply_key(&mut self, key: KeyEvent) -> EditorAction {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        match key.code {
            KeyCode::Char('z') if ctrl => self.undo(),
            KeyCode::Char('y') if ctrl => self.redo(),
            KeyCode::Char('j') if ctrl => self.insert_newline(),
            KeyCode::Enter if key.modifiers.contains(KeyModifiers::SHIFT) => self.insert_newline(),
            KeyCode::Enter if self.multiline => self.insert_str("\n"),
            KeyCode::Enter => {
                if let Some(value) = self.submit() {
                    return EditorAction::Submit(value);
                }
            }
            KeyCode::Esc => return EditorAction::Cancel,
            KeyCode::Backspace => self.backspace(),
            KeyCode::Delete => self.delete(),
            KeyCode::Left => self.cursor = self.prev_boundary(self.cursor),
            KeyCode::Right => self.cursor = self.next_boundary(self.cursor),
            KeyCode::Home if self.multiline => self.cursor = self.line_start(self.cursor),
            KeyCode::End if self.multiline => self.cursor = self.line_end(self.cursor),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = self.buffer.len(),
            KeyCode::Up if self.multiline => self.move_line(false),
            KeyCode::Down if self.multiline => self.move_line(true),
            KeyCode::Up => self.history_up(),
            KeyCode::Down => self.history_down(),
            KeyCode::Tab if self.multiline => self.insert_str("    "),
            KeyCode::Char(ch) if !ctrl && !key.modifiers.contains(KeyModifiers::ALT) => {
                self.insert_str(ch.encode_utf8(&mut [0u8; 4]));
            }
            _ => {}
        }
        EditorAction::None
    }

    fn insert_newline(&mut self) {
        if self.multiline {
            self.insert_str("\n");
        }
    }
}
