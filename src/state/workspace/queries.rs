use super::super::notes::{Note, NoteStore, DRAFT_TOPIC, PENDING_TOPIC};
use super::{
    DiffView, EditSession, NoteEntry, PathState, PendingChange, RestorePrompt, Selection,
    SubmittedPr, UnsavedDraft, Workspace,
};
use crate::note_diff::{diff_or_passthrough, DiffTier};

impl Workspace {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &NoteStore {
        &self.store
    }

    pub fn notes_loaded(&self) -> bool {
        self.store.is_loaded()
    }

    /// Swaps in a fresh base note list. Local new notes that now exist on the
    /// backend are dropped in favour of the fetched copy.
    pub fn replace_notes(&mut self, notes: impl IntoIterator<Item = Note>) {
        self.store.replace_all(notes);
        let store = &self.store;
        self.local_notes.retain(|path, _| !store.contains(path));
    }

    pub fn mark_notes_unavailable(&mut self) {
        self.store.mark_loaded_empty();
    }

    pub fn note(&self, path: &str) -> Option<&Note> {
        self.store.get(path).or_else(|| self.local_notes.get(path))
    }

    pub fn is_local_note(&self, path: &str) -> bool {
        self.local_notes.contains_key(path)
    }

    pub(super) fn knows_path(&self, path: &str) -> bool {
        self.note(path).is_some()
            || self.pending_change(path).is_some()
            || self.open_pr_for(path).is_some()
    }

    pub fn selection(&self) -> Option<&Selection> {
        self.selection.as_ref()
    }

    pub fn selected_path(&self) -> Option<&str> {
        self.selection.as_ref().map(|selection| selection.path.as_str())
    }

    pub fn editing(&self) -> Option<&EditSession> {
        self.editing.as_ref()
    }

    pub fn is_editing(&self, path: &str) -> bool {
        self.editing
            .as_ref()
            .is_some_and(|session| session.path == path)
    }

    pub fn pending_changes(&self) -> &[PendingChange] {
        &self.pending
    }

    pub fn pending_change(&self, path: &str) -> Option<&PendingChange> {
        self.pending.iter().find(|change| change.path == path)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    pub fn draft(&self, path: &str) -> Option<&UnsavedDraft> {
        self.drafts.get(path)
    }

    /// Unsaved drafts keyed by path, in no particular order.
    pub fn drafts(&self) -> impl Iterator<Item = (&str, &UnsavedDraft)> {
        self.drafts
            .iter()
            .map(|(path, draft)| (path.as_str(), draft))
    }

    pub fn draft_count(&self) -> usize {
        self.drafts.len()
    }

    pub fn submitted_prs(&self) -> &[SubmittedPr] {
        &self.submitted
    }

    pub fn submitted_pr(&self, pr_number: u64) -> Option<&SubmittedPr> {
        self.submitted.iter().find(|pr| pr.pr_number == pr_number)
    }

    pub fn has_open_prs(&self) -> bool {
        self.submitted.iter().any(SubmittedPr::is_open)
    }

    pub fn restore_prompts(&self) -> &[RestorePrompt] {
        &self.restore_prompts
    }

    /// Newest open pull request that touches `path`.
    pub fn open_pr_for(&self, path: &str) -> Option<&SubmittedPr> {
        self.submitted
            .iter()
            .rev()
            .find(|pr| pr.is_open() && pr.contains(path))
    }

    /// Submitted content for `path`, when the open PR carrying it still has it.
    fn submitted_change(&self, path: &str) -> Option<&PendingChange> {
        self.open_pr_for(path)
            .filter(|pr| pr.hydrated)
            .and_then(|pr| pr.change_for(path))
    }

    pub fn base_content(&self, path: &str) -> Option<&str> {
        self.store.get(path).map(|note| note.content.as_str())
    }

    /// The true base for diffs: content captured at first staging, else the
    /// current base note.
    pub fn original_for(&self, path: &str) -> Option<&str> {
        if let Some(change) = self.pending_change(path) {
            return change.original_content.as_deref();
        }
        if let Some(change) = self.submitted_change(path) {
            return change.original_content.as_deref();
        }
        self.base_content(path)
    }

    /// Highest committed representation, ignoring unsaved drafts.
    pub fn committed_content(&self, path: &str) -> Option<&str> {
        if let Some(change) = self.submitted_change(path) {
            return Some(change.content.as_str());
        }
        if let Some(change) = self.pending_change(path) {
            return Some(change.content.as_str());
        }
        self.note(path).map(|note| note.content.as_str())
    }

    /// What the note currently looks like to the user: submitted-open, then
    /// staged, then draft, then base.
    pub fn effective_content(&self, path: &str) -> Option<&str> {
        if let Some(change) = self.submitted_change(path) {
            return Some(change.content.as_str());
        }
        if let Some(change) = self.pending_change(path) {
            return Some(change.content.as_str());
        }
        if let Some(draft) = self.drafts.get(path) {
            return Some(draft.content.as_str());
        }
        self.note(path).map(|note| note.content.as_str())
    }

    pub fn path_state(&self, path: &str) -> PathState {
        if self.open_pr_for(path).is_some() {
            PathState::SubmittedOpen
        } else if self.pending_change(path).is_some() {
            PathState::Staged
        } else if self.drafts.contains_key(path)
            || self
                .editing
                .as_ref()
                .is_some_and(|session| session.path == path && session.is_dirty())
        {
            PathState::Drafting
        } else {
            PathState::Clean
        }
    }

    pub fn title_for(&self, path: &str) -> String {
        if let Some(note) = self.note(path) {
            return note.title.clone();
        }
        if let Some(change) = self.pending_change(path) {
            return change.title.clone();
        }
        self.open_pr_for(path)
            .and_then(|pr| pr.change_for(path))
            .map(|change| change.title.clone())
            .unwrap_or_else(|| super::super::notes::extract_title("", path))
    }

    /// Diff of what the user sees for `path` against its true base, tiered by
    /// the highest state the visible text has reached.
    pub fn diff_for(&self, path: &str, enabled: bool) -> Option<DiffView> {
        let (tier, modified) = match self.editing.as_ref() {
            Some(session) if session.path == path && session.is_dirty() => {
                (DiffTier::Draft, session.text.as_str())
            }
            _ => match self.path_state(path) {
                PathState::SubmittedOpen => {
                    (DiffTier::Submitted, self.submitted_change(path)?.content.as_str())
                }
                PathState::Staged => (DiffTier::Staged, self.pending_change(path)?.content.as_str()),
                PathState::Drafting => (DiffTier::Draft, self.drafts.get(path)?.content.as_str()),
                PathState::Clean => return None,
            },
        };
        Some(DiffView {
            tier,
            lines: diff_or_passthrough(self.original_for(path), modified, enabled),
        })
    }

    /// Base and local notes for the sidebar, grouped by topic then title.
    pub fn note_listing(&self) -> Vec<NoteEntry> {
        let mut entries: Vec<NoteEntry> = self
            .store
            .iter()
            .map(|note| NoteEntry {
                path: note.path.clone(),
                title: note.title.clone(),
                topic: note.topic.clone(),
                state: self.path_state(&note.path),
            })
            .collect();

        entries.extend(self.local_notes.values().map(|note| {
            let staged = self.pending_change(&note.path).is_some()
                || self.open_pr_for(&note.path).is_some();
            NoteEntry {
                path: note.path.clone(),
                title: note.title.clone(),
                topic: if staged { PENDING_TOPIC } else { DRAFT_TOPIC }.to_string(),
                state: self.path_state(&note.path),
            }
        }));

        entries.sort_by(|a, b| {
            a.topic
                .cmp(&b.topic)
                .then_with(|| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        });
        entries
    }
}
