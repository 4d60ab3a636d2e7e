use crate::api::stream::{ChatStreamAccumulator, StreamUpdate};
use crate::api::KnowledgeBackend;
use crate::config::Config;
use crate::note_preview::{preview_lines, section_line};
use crate::runtime::context::RuntimeContext;
use crate::runtime::controller::{SubmissionController, SubmitOutcome};
use crate::runtime::event::AppEvent;
use crate::runtime::frontend::UserInputEvent;
use crate::runtime::mode::RuntimeMode;
use crate::runtime::r#loop::Runtime;
use crate::state::{PathState, ReconcileOutcome, StageOutcome, Workspace, WorkspaceError};
use crate::ui::editor::{EditorAction, TextEditor};
use crate::ui::render::{
    Banner, BannerLevel, ChatMessage, ChatRole, NoteRow, Pane, PrRow, TrayRow, ViewerContent,
    WorkspaceView,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::sync::Arc;
use tokio::sync::mpsc;

const MAX_BANNERS: usize = 4;
const PAGE_ROWS: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum InputPurpose {
    Chat,
    NewNoteTitle,
}

#[derive(Debug)]
struct ActiveTurn {
    turn: u64,
    accumulator: ChatStreamAccumulator,
    message_index: usize,
}

/// Terminal mode: note list, viewer/editor, staging tray and agent chat.
pub struct TuiMode {
    focus: Pane,
    note_cursor: usize,
    tray_cursor: usize,
    viewer_scroll: usize,
    chat_scroll: usize,
    note_editor: TextEditor,
    input: TextEditor,
    input_purpose: InputPurpose,
    chat: Vec<ChatMessage>,
    active_turn: Option<ActiveTurn>,
    banners: Vec<Banner>,
    quit: bool,
}

impl Default for TuiMode {
    fn default() -> Self {
        Self::new()
    }
}

impl TuiMode {
    pub fn new() -> Self {
        Self {
            focus: Pane::Notes,
            note_cursor: 0,
            tray_cursor: 0,
            viewer_scroll: 0,
            chat_scroll: 0,
            note_editor: TextEditor::multiline(),
            input: TextEditor::single_line(),
            input_purpose: InputPurpose::Chat,
            chat: Vec::new(),
            active_turn: None,
            banners: Vec::new(),
            quit: false,
        }
    }

    pub fn focus(&self) -> Pane {
        self.focus
    }

    pub fn chat_messages(&self) -> &[ChatMessage] {
        &self.chat
    }

    pub fn banners(&self) -> &[Banner] {
        &self.banners
    }

    pub fn latest_banner(&self) -> Option<&Banner> {
        self.banners.last()
    }

    pub fn chat_in_progress(&self) -> bool {
        self.active_turn.is_some()
    }

    fn push_banner(&mut self, level: BannerLevel, text: impl Into<String>) {
        let text = text.into();
        match level {
            BannerLevel::Error => tracing::warn!(banner = %text),
            _ => tracing::debug!(banner = %text),
        }
        self.banners.push(Banner { level, text });
        if self.banners.len() > MAX_BANNERS {
            self.banners.remove(0);
        }
    }

    fn editing_selected(workspace: &Workspace) -> bool {
        workspace
            .selected_path()
            .is_some_and(|path| workspace.is_editing(path))
    }

    /// Points the list cursor at the selected note, or clamps it to the list.
    fn sync_note_cursor(&mut self, workspace: &Workspace) {
        let listing = workspace.note_listing();
        if let Some(selected) = workspace.selected_path() {
            if let Some(index) = listing.iter().position(|entry| entry.path == selected) {
                self.note_cursor = index;
                return;
            }
        }
        self.note_cursor = self.note_cursor.min(listing.len().saturating_sub(1));
    }

    fn clamp_tray_cursor(&mut self, workspace: &Workspace) {
        self.tray_cursor = self
            .tray_cursor
            .min(workspace.pending_changes().len().saturating_sub(1));
    }

    fn cycle_focus(&mut self, backwards: bool) {
        let order = [Pane::Notes, Pane::Viewer, Pane::Tray, Pane::Input];
        let index = order.iter().position(|pane| *pane == self.focus).unwrap_or(0);
        let next = if backwards {
            (index + order.len() - 1) % order.len()
        } else {
            (index + 1) % order.len()
        };
        self.focus = order[next];
    }

    fn select_path(&mut self, workspace: &mut Workspace, path: &str) -> bool {
        match workspace.select_note(path) {
            Ok(()) => {
                self.viewer_scroll = 0;
                self.sync_note_cursor(workspace);
                true
            }
            Err(error) => {
                self.push_banner(BannerLevel::Error, error.to_string());
                false
            }
        }
    }

    fn begin_editing(&mut self, workspace: &mut Workspace) {
        match workspace.start_editing() {
            Ok(session) => {
                self.note_editor.set_text(&session.text);
                self.focus = Pane::Viewer;
            }
            Err(error) => self.push_banner(BannerLevel::Info, error.to_string()),
        }
    }

    fn stage_edit(&mut self, workspace: &mut Workspace) {
        let path = workspace.selected_path().map(str::to_string);
        match workspace.stage_current() {
            Ok(outcome) => {
                let path = path.unwrap_or_default();
                let (level, text) = match outcome {
                    StageOutcome::Created => (BannerLevel::Success, format!("Staged {path}")),
                    StageOutcome::Updated => {
                        (BannerLevel::Success, format!("Updated staged change to {path}"))
                    }
                    StageOutcome::Unchanged => {
                        (BannerLevel::Info, format!("{path} matches its current version"))
                    }
                    StageOutcome::Reverted => (
                        BannerLevel::Info,
                        format!("{path} is back to its original; unstaged"),
                    ),
                };
                self.push_banner(level, text);
                self.sync_note_cursor(workspace);
            }
            Err(WorkspaceError::NoChanges(path)) => {
                self.push_banner(BannerLevel::Info, format!("No changes to stage in {path}"));
            }
            Err(error) => self.push_banner(BannerLevel::Error, error.to_string()),
        }
    }

    fn discard_edit(&mut self, workspace: &mut Workspace) {
        if workspace.cancel_editing().is_ok() {
            self.note_editor.clear();
            self.push_banner(BannerLevel::Info, "Discarded unsaved edits");
            self.sync_note_cursor(workspace);
        }
    }

    fn submit(&mut self, ctx: &mut RuntimeContext) {
        let outcome = ctx
            .controller
            .submit_batch(&ctx.workspace, &ctx.config.pr_title);
        match outcome {
            SubmitOutcome::NothingStaged => {
                self.push_banner(BannerLevel::Info, "Nothing staged to submit");
            }
            SubmitOutcome::AlreadyInFlight => {
                self.push_banner(BannerLevel::Info, "A submission is already in flight");
            }
            SubmitOutcome::Sent { files } => {
                let plural = if files == 1 { "" } else { "s" };
                self.push_banner(
                    BannerLevel::Info,
                    format!("Submitting {files} file{plural} as one pull request..."),
                );
            }
        }
    }

    fn start_new_note_prompt(&mut self) {
        self.input_purpose = InputPurpose::NewNoteTitle;
        self.input.clear();
        self.focus = Pane::Input;
    }

    fn send_chat(&mut self, controller: &mut SubmissionController, message: String) {
        self.chat.push(ChatMessage {
            role: ChatRole::User,
            text: message.clone(),
        });
        self.chat.push(ChatMessage {
            role: ChatRole::Agent,
            text: String::new(),
        });
        let turn = controller.start_chat(message);
        self.active_turn = Some(ActiveTurn {
            turn,
            accumulator: ChatStreamAccumulator::new(),
            message_index: self.chat.len() - 1,
        });
        self.chat_scroll = 0;
    }

    fn apply_stream_update(
        &mut self,
        workspace: &mut Workspace,
        message_index: usize,
        update: StreamUpdate,
    ) {
        if let Some(message) = self.chat.get_mut(message_index) {
            message.text = update.clean_text;
        }
        for event in &update.surface_events {
            if workspace.apply_surface_event(event) {
                self.sync_note_cursor(workspace);
                self.viewer_scroll = event
                    .section_title
                    .as_deref()
                    .and_then(|title| {
                        workspace
                            .effective_content(&event.path)
                            .and_then(|content| section_line(content, title))
                    })
                    .unwrap_or(0);
            }
        }
        for event in &update.draft_events {
            let was_editing = workspace.is_editing(&event.path);
            let outcome = workspace.apply_draft_event(event);
            if was_editing {
                self.note_editor.clear();
                if workspace.draft(&event.path).is_some() {
                    self.push_banner(
                        BannerLevel::Info,
                        format!("Your unsaved edits to {} were kept as a draft", event.path),
                    );
                }
            }
            let (level, text) = match outcome {
                StageOutcome::Created | StageOutcome::Updated => (
                    BannerLevel::Success,
                    format!("Agent staged changes to {}", event.path),
                ),
                StageOutcome::Unchanged => (
                    BannerLevel::Info,
                    format!("Agent proposal for {} matches the current note", event.path),
                ),
                StageOutcome::Reverted => (
                    BannerLevel::Info,
                    format!("Agent proposal restores {}; unstaged", event.path),
                ),
            };
            self.push_banner(level, text);
            self.viewer_scroll = 0;
            self.sync_note_cursor(workspace);
        }
    }

    fn on_chat_chunk(&mut self, workspace: &mut Workspace, turn: u64, bytes: &[u8]) {
        let Some(active) = self.active_turn.as_mut().filter(|active| active.turn == turn) else {
            return;
        };
        let update = active.accumulator.push_bytes(bytes);
        let message_index = active.message_index;
        self.apply_stream_update(workspace, message_index, update);
    }

    fn on_chat_finished(&mut self, workspace: &mut Workspace, turn: u64) {
        if self.active_turn.as_ref().map(|active| active.turn) != Some(turn) {
            return;
        }
        let Some(mut active) = self.active_turn.take() else {
            return;
        };
        let update = active.accumulator.finish();
        self.apply_stream_update(workspace, active.message_index, update);
        if let Some(message) = self.chat.get_mut(active.message_index) {
            if message.text.trim().is_empty() {
                message.text = "(no reply)".to_string();
            }
        }
    }

    fn on_chat_failed(&mut self, turn: u64, error: String) {
        if self.active_turn.as_ref().map(|active| active.turn) != Some(turn) {
            return;
        }
        if let Some(active) = self.active_turn.take() {
            let empty = self
                .chat
                .get(active.message_index)
                .is_some_and(|message| message.text.is_empty());
            if empty {
                self.chat.remove(active.message_index);
            }
        }
        self.chat.push(ChatMessage {
            role: ChatRole::Error,
            text: error,
        });
    }

    fn interrupt(&mut self, controller: &mut SubmissionController) {
        if let Some(active) = self.active_turn.take() {
            controller.cancel_chat();
            if let Some(message) = self.chat.get_mut(active.message_index) {
                message.text.push_str(" [cancelled]");
            }
            return;
        }
        self.quit = true;
    }

    fn handle_restore_key(&mut self, key: KeyEvent, workspace: &mut Workspace) {
        let Some(pr_number) = workspace.restore_prompts().first().map(|prompt| prompt.pr_number) else {
            return;
        };
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') => match workspace.restore_closed(pr_number) {
                Ok(0) => self.push_banner(
                    BannerLevel::Info,
                    format!("Nothing from PR #{pr_number} could be restored"),
                ),
                Ok(restored) => {
                    let plural = if restored == 1 { "" } else { "s" };
                    self.push_banner(
                        BannerLevel::Success,
                        format!("Restored {restored} change{plural} from PR #{pr_number} to staging"),
                    );
                }
                Err(error) => self.push_banner(BannerLevel::Error, error.to_string()),
            },
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                if let Err(error) = workspace.dismiss_closed(pr_number) {
                    self.push_banner(BannerLevel::Error, error.to_string());
                } else {
                    self.push_banner(BannerLevel::Info, format!("Discarded PR #{pr_number}"));
                }
            }
            _ => return,
        }
        self.sync_note_cursor(workspace);
        self.clamp_tray_cursor(workspace);
    }

    fn handle_key(&mut self, key: KeyEvent, ctx: &mut RuntimeContext) {
        let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
        // Quit and reload stay available while the restore prompt is modal.
        match key.code {
            KeyCode::Char('q') if ctrl => {
                self.quit = true;
                return;
            }
            KeyCode::F(5) => {
                ctx.controller.load_notes();
                self.push_banner(BannerLevel::Info, "Reloading notes...");
                return;
            }
            _ => {}
        }

        if !ctx.workspace.restore_prompts().is_empty() {
            self.handle_restore_key(key, &mut ctx.workspace);
            return;
        }

        match key.code {
            KeyCode::Char('p') if ctrl => {
                self.submit(ctx);
                return;
            }
            KeyCode::Char('n') if ctrl => {
                self.start_new_note_prompt();
                return;
            }
            KeyCode::Tab => {
                self.cycle_focus(false);
                return;
            }
            KeyCode::BackTab => {
                self.cycle_focus(true);
                return;
            }
            _ => {}
        }

        match self.focus {
            Pane::Notes => self.handle_notes_key(key, ctx),
            Pane::Viewer => self.handle_viewer_key(key, &mut ctx.workspace),
            Pane::Tray => self.handle_tray_key(key, &mut ctx.workspace),
            Pane::Input => self.handle_input_key(key, ctx),
        }
    }

    fn handle_notes_key(&mut self, key: KeyEvent, ctx: &mut RuntimeContext) {
        let listing = ctx.workspace.note_listing();
        let last = listing.len().saturating_sub(1);
        match key.code {
            KeyCode::Up => self.note_cursor = self.note_cursor.saturating_sub(1),
            KeyCode::Down => self.note_cursor = (self.note_cursor + 1).min(last),
            KeyCode::PageUp => self.note_cursor = self.note_cursor.saturating_sub(PAGE_ROWS),
            KeyCode::PageDown => self.note_cursor = (self.note_cursor + PAGE_ROWS).min(last),
            KeyCode::Home => self.note_cursor = 0,
            KeyCode::End => self.note_cursor = last,
            KeyCode::Enter | KeyCode::Char('e') => {
                let Some(entry) = listing.get(self.note_cursor) else {
                    return;
                };
                if self.select_path(&mut ctx.workspace, &entry.path) {
                    self.focus = Pane::Viewer;
                    if key.code == KeyCode::Char('e') {
                        self.begin_editing(&mut ctx.workspace);
                    }
                }
            }
            KeyCode::Char('n') => self.start_new_note_prompt(),
            KeyCode::Char('r') => ctx.controller.load_notes(),
            KeyCode::Char('q') => self.quit = true,
            _ => {}
        }
    }

    fn handle_viewer_key(&mut self, key: KeyEvent, workspace: &mut Workspace) {
        if Self::editing_selected(workspace) {
            if key.code == KeyCode::Char('s') && key.modifiers.contains(KeyModifiers::CONTROL) {
                self.stage_edit(workspace);
                return;
            }
            match self.note_editor.apply_key(key) {
                EditorAction::Cancel => self.discard_edit(workspace),
                EditorAction::None | EditorAction::Submit(_) => {
                    if let Err(error) = workspace.set_edit_text(self.note_editor.text()) {
                        tracing::warn!(error = %error, "edit buffer out of sync");
                    }
                }
            }
            return;
        }

        match key.code {
            KeyCode::Char('e') | KeyCode::Enter => self.begin_editing(workspace),
            KeyCode::Up => self.viewer_scroll = self.viewer_scroll.saturating_sub(1),
            KeyCode::Down => self.viewer_scroll += 1,
            KeyCode::PageUp => self.viewer_scroll = self.viewer_scroll.saturating_sub(PAGE_ROWS),
            KeyCode::PageDown => self.viewer_scroll += PAGE_ROWS,
            KeyCode::Home => self.viewer_scroll = 0,
            KeyCode::Char('u') => {
                if let Some(path) = workspace.selected_path().map(str::to_string) {
                    self.unstage(workspace, &path);
                }
            }
            KeyCode::Esc => {
                let highlighted = workspace
                    .selection()
                    .is_some_and(|selection| selection.highlight.is_some());
                if highlighted {
                    workspace.clear_highlight();
                } else {
                    self.focus = Pane::Notes;
                }
            }
            _ => {}
        }
    }

    fn unstage(&mut self, workspace: &mut Workspace, path: &str) {
        if workspace.unstage(path).is_some() {
            self.push_banner(BannerLevel::Info, format!("Unstaged {path}"));
            self.sync_note_cursor(workspace);
            self.clamp_tray_cursor(workspace);
        }
    }

    fn handle_tray_key(&mut self, key: KeyEvent, workspace: &mut Workspace) {
        let selected = workspace
            .pending_changes()
            .get(self.tray_cursor)
            .map(|change| change.path.clone());
        let last = workspace.pending_changes().len().saturating_sub(1);
        match key.code {
            KeyCode::Up => self.tray_cursor = self.tray_cursor.saturating_sub(1),
            KeyCode::Down => self.tray_cursor = (self.tray_cursor + 1).min(last),
            KeyCode::Char('u') | KeyCode::Char('x') | KeyCode::Delete | KeyCode::Backspace => {
                if let Some(path) = selected {
                    self.unstage(workspace, &path);
                }
            }
            KeyCode::Enter => {
                if let Some(path) = selected {
                    if self.select_path(workspace, &path) {
                        self.focus = Pane::Viewer;
                    }
                }
            }
            _ => {}
        }
    }

    fn handle_input_key(&mut self, key: KeyEvent, ctx: &mut RuntimeContext) {
        match key.code {
            KeyCode::PageUp => {
                self.chat_scroll += PAGE_ROWS / 2;
                return;
            }
            KeyCode::PageDown => {
                self.chat_scroll = self.chat_scroll.saturating_sub(PAGE_ROWS / 2);
                return;
            }
            KeyCode::Char('d')
                if key.modifiers.contains(KeyModifiers::CONTROL) && self.input.is_empty() =>
            {
                self.quit = true;
                return;
            }
            _ => {}
        }

        match self.input.apply_key(key) {
            EditorAction::Submit(text) => match self.input_purpose {
                InputPurpose::Chat => self.send_chat(&mut ctx.controller, text),
                InputPurpose::NewNoteTitle => {
                    self.input_purpose = InputPurpose::Chat;
                    self.create_note(&mut ctx.workspace, &text);
                }
            },
            EditorAction::Cancel => {
                if self.input_purpose == InputPurpose::NewNoteTitle {
                    self.input_purpose = InputPurpose::Chat;
                    self.input.clear();
                }
                self.focus = Pane::Notes;
            }
            EditorAction::None => {}
        }
    }

    fn create_note(&mut self, workspace: &mut Workspace, title: &str) {
        let path = workspace.create_note(title);
        self.viewer_scroll = 0;
        self.sync_note_cursor(workspace);
        if let Some(session) = workspace.editing() {
            self.note_editor.set_text(&session.text);
        }
        self.focus = Pane::Viewer;
        self.push_banner(BannerLevel::Info, format!("Created {path}; ctrl+s stages it"));
    }

    fn on_paste(&mut self, text: String, workspace: &mut Workspace) {
        if self.focus == Pane::Viewer && Self::editing_selected(workspace) {
            self.note_editor.insert_str(&text);
            if let Err(error) = workspace.set_edit_text(self.note_editor.text()) {
                tracing::warn!(error = %error, "edit buffer out of sync");
            }
            return;
        }
        self.input.insert_str(text.trim());
        self.focus = Pane::Input;
    }

    fn viewer_content(&self, ctx: &RuntimeContext) -> ViewerContent {
        let workspace = &ctx.workspace;
        let diff_enabled = ctx.config.diff_enabled;
        let Some(selection) = workspace.selection() else {
            let message = if workspace.notes_loaded() {
                "Select a note, or ask the agent in chat"
            } else {
                "Loading notes..."
            };
            return ViewerContent::Empty(message.to_string());
        };
        let path = selection.path.as_str();
        let title = workspace.title_for(path);

        if workspace.is_editing(path) {
            let diff = workspace
                .is_dirty()
                .then(|| workspace.diff_for(path, diff_enabled))
                .flatten();
            return ViewerContent::Editing {
                title,
                text: self.note_editor.text().to_string(),
                cursor: self.note_editor.cursor(),
                diff,
            };
        }

        let state = workspace.path_state(path);
        if state != PathState::Clean {
            if let Some(view) = workspace.diff_for(path, diff_enabled) {
                return ViewerContent::Diff { title, state, view };
            }
        }
        let highlight = selection
            .highlight
            .as_ref()
            .and_then(|highlight| highlight.text.as_deref());
        let content = workspace.effective_content(path).unwrap_or_default();
        ViewerContent::Preview {
            title,
            state,
            lines: preview_lines(content, workspace.store(), highlight),
        }
    }

    fn status_line(&self, ctx: &RuntimeContext) -> String {
        let workspace = &ctx.workspace;
        let open_prs = workspace
            .submitted_prs()
            .iter()
            .filter(|pr| pr.is_open())
            .count();
        let mut status = format!(
            "{} staged  {} drafts  {} open PRs",
            workspace.pending_changes().len(),
            workspace.draft_count(),
            open_prs
        );
        if ctx.controller.is_polling() {
            status.push_str("  (watching)");
        }
        if self.active_turn.is_some() {
            status.push_str("  agent replying...");
        }
        status.push_str(
            "  | tab focus  e edit  ctrl+s stage  u unstage  ctrl+p submit  ctrl+n new  F5 reload  ctrl+c quit",
        );
        status
    }

    /// Snapshot of the current frame for the renderer.
    pub fn view<'a>(&'a self, ctx: &'a RuntimeContext) -> WorkspaceView<'a> {
        let workspace = &ctx.workspace;
        let notes = workspace
            .note_listing()
            .into_iter()
            .map(|entry| NoteRow {
                title: entry.title,
                topic: entry.topic,
                state: entry.state,
            })
            .collect();
        let tray = workspace
            .pending_changes()
            .iter()
            .map(|change| TrayRow {
                title: change.title.clone(),
                path: change.path.clone(),
                is_new: change.is_new,
            })
            .collect();
        let prs = workspace
            .submitted_prs()
            .iter()
            .rev()
            .map(|pr| PrRow {
                pr_number: pr.pr_number,
                status: pr.status.label(),
                files: pr.changes.len(),
            })
            .collect();
        let input_label = match self.input_purpose {
            InputPurpose::Chat => "chat",
            InputPurpose::NewNoteTitle => "new note title",
        };

        WorkspaceView {
            header: format!("kbstage  {}", ctx.config.api_url),
            status: self.status_line(ctx),
            focus: self.focus,
            notes,
            note_cursor: self.note_cursor,
            viewer: self.viewer_content(ctx),
            viewer_scroll: self.viewer_scroll,
            tray,
            tray_cursor: self.tray_cursor,
            prs,
            submitting: ctx.controller.submit_in_flight(),
            chat: &self.chat,
            chat_scroll: self.chat_scroll,
            input_label,
            input: self.input.text(),
            input_cursor: self.input.cursor(),
            banners: self.banners.iter().collect(),
            restore: workspace.restore_prompts().first(),
        }
    }
}

impl RuntimeMode for TuiMode {
    fn on_frontend_event(&mut self, event: UserInputEvent, ctx: &mut RuntimeContext) {
        match event {
            UserInputEvent::Interrupt => self.interrupt(&mut ctx.controller),
            UserInputEvent::Paste(text) => self.on_paste(text, &mut ctx.workspace),
            UserInputEvent::Key(key) => self.handle_key(key, ctx),
        }
    }

    fn on_app_event(&mut self, event: AppEvent, ctx: &mut RuntimeContext) {
        match event {
            AppEvent::NotesLoaded(result) => {
                if let Err(message) = ctx.controller.on_notes_loaded(&mut ctx.workspace, result) {
                    self.push_banner(
                        BannerLevel::Error,
                        format!("Could not load notes: {message}"),
                    );
                }
                self.sync_note_cursor(&ctx.workspace);
            }
            AppEvent::SubmittedPrsLoaded(result) => {
                let added = ctx
                    .controller
                    .on_submitted_loaded(&mut ctx.workspace, result);
                if added > 0 {
                    let plural = if added == 1 { "" } else { "s" };
                    self.push_banner(
                        BannerLevel::Info,
                        format!("Tracking {added} open pull request{plural} from earlier sessions"),
                    );
                }
                self.sync_note_cursor(&ctx.workspace);
            }
            AppEvent::SubmitFinished { batch, result } => {
                match ctx
                    .controller
                    .on_submit_finished(&mut ctx.workspace, batch, result)
                {
                    Ok(pr_number) => {
                        let url = ctx
                            .workspace
                            .submitted_pr(pr_number)
                            .map(|pr| pr.pr_url.clone())
                            .unwrap_or_default();
                        self.push_banner(
                            BannerLevel::Success,
                            format!("Opened PR #{pr_number} {url}"),
                        );
                    }
                    Err(message) => self.push_banner(BannerLevel::Error, message),
                }
                self.clamp_tray_cursor(&ctx.workspace);
                self.sync_note_cursor(&ctx.workspace);
            }
            AppEvent::PrStatusesPolled(result) => {
                for outcome in ctx.controller.on_poll_result(&mut ctx.workspace, result) {
                    match outcome {
                        ReconcileOutcome::Merged { pr_number, .. } => self.push_banner(
                            BannerLevel::Success,
                            format!("PR #{pr_number} merged; refreshing notes"),
                        ),
                        ReconcileOutcome::Closed {
                            pr_number,
                            restorable: true,
                        } => self.push_banner(
                            BannerLevel::Info,
                            format!("PR #{pr_number} was closed without merging"),
                        ),
                        ReconcileOutcome::Closed {
                            pr_number,
                            restorable: false,
                        } => self.push_banner(
                            BannerLevel::Info,
                            format!(
                                "PR #{pr_number} was closed; its content predates this session and cannot be restored"
                            ),
                        ),
                    }
                }
                self.clamp_tray_cursor(&ctx.workspace);
                self.sync_note_cursor(&ctx.workspace);
            }
            AppEvent::ChatChunk { turn, bytes } => {
                self.on_chat_chunk(&mut ctx.workspace, turn, &bytes);
            }
            AppEvent::ChatFinished { turn } => self.on_chat_finished(&mut ctx.workspace, turn),
            AppEvent::ChatFailed { turn, error } => self.on_chat_failed(turn, error),
        }
    }

    fn quit_requested(&self) -> bool {
        self.quit
    }
}

/// Wires a runtime and its context around `backend`.
pub fn build_runtime(
    config: Config,
    backend: Arc<dyn KnowledgeBackend>,
) -> (Runtime<TuiMode>, RuntimeContext) {
    let (events_tx, events_rx) = mpsc::unbounded_channel::<AppEvent>();
    let controller = SubmissionController::new(backend, events_tx, config.poll_interval);
    let ctx = RuntimeContext::new(Workspace::new(), controller, config);
    (Runtime::new(TuiMode::new(), events_rx), ctx)
}
