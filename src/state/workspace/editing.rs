use super::super::notes::{slug_path, Note, DRAFT_TOPIC};
use super::{EditSession, Highlight, Selection, UnsavedDraft, Workspace, WorkspaceError};

const UNTITLED_NOTE: &str = "Untitled Note";

impl Workspace {
    pub fn select_note(&mut self, path: &str) -> Result<(), WorkspaceError> {
        self.select_with_highlight(path, None)
    }

    /// Selects `path`. Re-selecting the current note keeps the edit session and
    /// only refreshes the highlight; switching away parks a dirty edit as a draft.
    pub fn select_with_highlight(
        &mut self,
        path: &str,
        highlight: Option<Highlight>,
    ) -> Result<(), WorkspaceError> {
        if !self.knows_path(path) {
            return Err(WorkspaceError::UnknownNote(path.to_string()));
        }
        if let Some(selection) = self.selection.as_mut() {
            if selection.path == path {
                if highlight.is_some() {
                    selection.highlight = highlight;
                }
                return Ok(());
            }
        }

        self.park_edit_session();
        self.selection = Some(Selection {
            path: path.to_string(),
            highlight,
        });
        Ok(())
    }

    pub fn clear_selection(&mut self) {
        self.park_edit_session();
        self.selection = None;
    }

    pub fn clear_highlight(&mut self) {
        if let Some(selection) = self.selection.as_mut() {
            selection.highlight = None;
        }
    }

    pub(super) fn park_edit_session(&mut self) {
        let Some(session) = self.editing.take() else {
            return;
        };
        if session.is_dirty() {
            tracing::debug!(path = %session.path, "parking unsaved edit as draft");
            self.drafts.insert(
                session.path,
                UnsavedDraft {
                    content: session.text,
                    is_new: session.is_new,
                },
            );
        } else {
            self.drafts.remove(&session.path);
        }
    }

    /// Opens the selected note for editing, resuming its draft when one exists.
    pub fn start_editing(&mut self) -> Result<&EditSession, WorkspaceError> {
        let path = self
            .selected_path()
            .ok_or(WorkspaceError::NoSelection)?
            .to_string();
        if !self.is_editing(&path) {
            let baseline = self.committed_content(&path).unwrap_or_default().to_string();
            let draft = self.drafts.get(&path);
            let is_new = draft
                .map(|draft| draft.is_new)
                .or_else(|| self.pending_change(&path).map(|change| change.is_new))
                .unwrap_or_else(|| !self.store.contains(&path));
            let text = draft.map_or_else(|| baseline.clone(), |draft| draft.content.clone());
            let title = self.title_for(&path);
            self.editing = Some(EditSession {
                path,
                title,
                baseline,
                text,
                is_new,
            });
        }
        self.editing.as_ref().ok_or(WorkspaceError::NotEditing)
    }

    pub fn set_edit_text(&mut self, text: impl Into<String>) -> Result<(), WorkspaceError> {
        let session = self.editing.as_mut().ok_or(WorkspaceError::NotEditing)?;
        session.text = text.into();
        Ok(())
    }

    pub fn is_dirty(&self) -> bool {
        self.editing.as_ref().is_some_and(EditSession::is_dirty)
    }

    /// Discards the edit and its draft. A new local note with nothing staged or
    /// submitted is removed entirely.
    pub fn cancel_editing(&mut self) -> Result<(), WorkspaceError> {
        let session = self.editing.take().ok_or(WorkspaceError::NotEditing)?;
        self.drafts.remove(&session.path);
        self.drop_orphan_local_note(&session.path);
        Ok(())
    }

    /// Creates an empty local note, selects it and opens it for editing.
    /// Returns the path, suffixed `-2`, `-3`, ... if the slug is taken.
    pub fn create_note(&mut self, title: &str) -> String {
        let title = match title.trim() {
            "" => UNTITLED_NOTE,
            trimmed => trimmed,
        };
        let path = self.unique_path(&slug_path(title));

        self.park_edit_session();
        self.local_notes.insert(
            path.clone(),
            Note {
                path: path.clone(),
                title: title.to_string(),
                topic: DRAFT_TOPIC.to_string(),
                content: String::new(),
            },
        );
        self.selection = Some(Selection {
            path: path.clone(),
            highlight: None,
        });
        self.editing = Some(EditSession {
            path: path.clone(),
            title: title.to_string(),
            baseline: String::new(),
            text: format!("# {title}\n"),
            is_new: true,
        });
        tracing::info!(path = %path, "created local note");
        path
    }

    fn unique_path(&self, candidate: &str) -> String {
        if !self.knows_path(candidate) {
            return candidate.to_string();
        }
        let stem = candidate.strip_suffix(".md").unwrap_or(candidate);
        (2usize..)
            .map(|suffix| format!("{stem}-{suffix}.md"))
            .find(|path| !self.knows_path(path))
            .unwrap_or_else(|| candidate.to_string())
    }

    /// Removes a local note that no longer has any draft, staged or open
    /// submitted representation, deselecting it if needed.
    pub(super) fn drop_orphan_local_note(&mut self, path: &str) {
        let orphaned = self.local_notes.contains_key(path)
            && !self.drafts.contains_key(path)
            && self.pending_change(path).is_none()
            && self.open_pr_for(path).is_none()
            && !self.is_editing(path);
        if !orphaned {
            return;
        }
        self.local_notes.remove(path);
        if self.selected_path() == Some(path) {
            self.selection = None;
        }
    }
}
