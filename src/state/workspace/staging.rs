use super::super::notes::{extract_title, Note, DRAFT_TOPIC};
use super::{Highlight, PendingChange, StageOutcome, Workspace, WorkspaceError};
use crate::types::{DraftEvent, SurfaceEvent};

impl Workspace {
    /// Promotes the current edit into the pending batch and closes the editor.
    pub fn stage_current(&mut self) -> Result<StageOutcome, WorkspaceError> {
        let session = self.editing.as_ref().ok_or(WorkspaceError::NotEditing)?;
        if !session.is_dirty() {
            return Err(WorkspaceError::NoChanges(session.path.clone()));
        }
        let Some(session) = self.editing.take() else {
            return Err(WorkspaceError::NotEditing);
        };

        let title = if session.is_new {
            extract_title(&session.text, &session.path)
        } else {
            session.title.clone()
        };
        self.drafts.remove(&session.path);
        let outcome = self.stage_change(&session.path, &title, &session.text, session.is_new);
        self.drop_orphan_local_note(&session.path);
        Ok(outcome)
    }

    /// Records `content` as the staged version of `path`, at most one entry
    /// per path. The base captured on first staging is kept across re-stages.
    pub fn stage_change(
        &mut self,
        path: &str,
        title: &str,
        content: &str,
        is_new: bool,
    ) -> StageOutcome {
        if let Some(index) = self.pending.iter().position(|change| change.path == path) {
            let existing = &mut self.pending[index];
            if existing.content == content {
                return StageOutcome::Unchanged;
            }
            if existing.original_content.as_deref() == Some(content) {
                self.pending.remove(index);
                tracing::info!(path, "staged change reverted to base");
                return StageOutcome::Reverted;
            }
            existing.content = content.to_string();
            existing.title = title.to_string();
            tracing::info!(path, "updated staged change");
            return StageOutcome::Updated;
        }

        let base = self.base_content(path).map(str::to_string);
        if base.as_deref() == Some(content) {
            return StageOutcome::Unchanged;
        }
        let is_new = if self.store.is_loaded() {
            base.is_none()
        } else {
            is_new
        };
        if is_new && !self.store.contains(path) && !self.local_notes.contains_key(path) {
            self.local_notes.insert(
                path.to_string(),
                Note {
                    path: path.to_string(),
                    title: title.to_string(),
                    topic: DRAFT_TOPIC.to_string(),
                    content: String::new(),
                },
            );
        }
        self.pending.push(PendingChange {
            path: path.to_string(),
            title: title.to_string(),
            content: content.to_string(),
            is_new,
            original_content: base,
        });
        tracing::info!(path, is_new, "staged change");
        StageOutcome::Created
    }

    /// Drops the staged change for `path`, leaving drafts and base untouched.
    pub fn unstage(&mut self, path: &str) -> Option<PendingChange> {
        let index = self.pending.iter().position(|change| change.path == path)?;
        let removed = self.pending.remove(index);
        self.drop_orphan_local_note(path);
        tracing::info!(path, "unstaged change");
        Some(removed)
    }

    /// Applies an agent-proposed note body: stages it directly and selects the note.
    /// An edit session on the same note ends; unsaved edits in it become a draft.
    pub fn apply_draft_event(&mut self, event: &DraftEvent) -> StageOutcome {
        let title = event
            .title
            .as_deref()
            .map(str::trim)
            .filter(|title| !title.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| extract_title(&event.content, &event.path));
        // An open editor on this note was based on content the proposal replaces.
        if self.is_editing(&event.path) {
            self.park_edit_session();
        }
        let outcome = self.stage_change(&event.path, &title, &event.content, event.is_new);
        if let Err(error) = self.select_note(&event.path) {
            tracing::warn!(path = %event.path, error = %error, "draft target not selectable");
        }
        outcome
    }

    /// Focuses the note an agent pointed at. Unknown paths are ignored.
    pub fn apply_surface_event(&mut self, event: &SurfaceEvent) -> bool {
        let highlight = (event.highlight_text.is_some() || event.section_title.is_some()).then(
            || Highlight {
                text: event.highlight_text.clone(),
                section_title: event.section_title.clone(),
            },
        );
        match self.select_with_highlight(&event.path, highlight) {
            Ok(()) => true,
            Err(error) => {
                tracing::warn!(path = %event.path, error = %error, "ignoring surface event");
                false
            }
        }
    }
}
