use super::super::notes::{Note, NoteStore};
use crate::note_diff::{DiffLine, DiffTier};
use crate::types::{BatchChange, SubmitBatchRequest};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use thiserror::Error;

/// A note edit promoted into the next pull request batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingChange {
    pub path: String,
    pub title: String,
    pub content: String,
    pub is_new: bool,
    /// Base text captured the first time this path was staged.
    pub original_content: Option<String>,
}

impl PendingChange {
    pub fn to_batch_change(&self) -> BatchChange {
        BatchChange {
            path: self.path.clone(),
            title: self.title.clone(),
            content: self.content.clone(),
            is_new: self.is_new,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnsavedDraft {
    pub content: String,
    pub is_new: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmissionStatus {
    Open,
    Merged,
    Closed,
}

impl SubmissionStatus {
    pub fn label(self) -> &'static str {
        match self {
            SubmissionStatus::Open => "open",
            SubmissionStatus::Merged => "merged",
            SubmissionStatus::Closed => "closed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmittedPr {
    pub pr_number: u64,
    pub pr_url: String,
    pub branch: String,
    pub changes: Vec<PendingChange>,
    pub status: SubmissionStatus,
    pub submitted_at: DateTime<Utc>,
    /// False when rebuilt from the backend list, which carries paths but no content.
    pub hydrated: bool,
}

impl SubmittedPr {
    pub fn is_open(&self) -> bool {
        self.status == SubmissionStatus::Open
    }

    pub fn contains(&self, path: &str) -> bool {
        self.changes.iter().any(|change| change.path == path)
    }

    pub fn change_for(&self, path: &str) -> Option<&PendingChange> {
        self.changes.iter().find(|change| change.path == path)
    }

    pub fn paths(&self) -> Vec<String> {
        self.changes.iter().map(|change| change.path.clone()).collect()
    }
}

/// The live edit buffer for the selected note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditSession {
    pub path: String,
    pub title: String,
    /// Committed representation the edit started from.
    pub baseline: String,
    pub text: String,
    pub is_new: bool,
}

impl EditSession {
    pub fn is_dirty(&self) -> bool {
        self.text != self.baseline
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Highlight {
    pub text: Option<String>,
    pub section_title: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub path: String,
    pub highlight: Option<Highlight>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestorePrompt {
    pub pr_number: u64,
    pub pr_url: String,
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathState {
    Clean,
    Drafting,
    Staged,
    SubmittedOpen,
}

impl PathState {
    pub fn badge(self) -> Option<&'static str> {
        match self {
            PathState::Clean => None,
            PathState::Drafting => Some("draft"),
            PathState::Staged => Some("staged"),
            PathState::SubmittedOpen => Some("in PR"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Created,
    Updated,
    /// Content matched what was already staged or the base; nothing recorded.
    Unchanged,
    /// Content went back to the original base, so the staged change was dropped.
    Reverted,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Merged { pr_number: u64, paths: Vec<String> },
    Closed { pr_number: u64, restorable: bool },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NoteEntry {
    pub path: String,
    pub title: String,
    pub topic: String,
    pub state: PathState,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffView {
    pub tier: DiffTier,
    pub lines: Vec<DiffLine>,
}

/// Snapshot of everything staged at submit time, plus the request built from it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedBatch {
    pub changes: Vec<PendingChange>,
    pub request: SubmitBatchRequest,
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum WorkspaceError {
    #[error("no note is selected")]
    NoSelection,
    #[error("not editing a note")]
    NotEditing,
    #[error("no changes to stage for {0}")]
    NoChanges(String),
    #[error("unknown note: {0}")]
    UnknownNote(String),
    #[error("no restore prompt for PR #{0}")]
    NoRestorePrompt(u64),
}

/// All client-side note state: base notes, local new notes, drafts, staged
/// changes and submitted pull requests, keyed by note path.
#[derive(Debug, Default)]
pub struct Workspace {
    pub(super) store: NoteStore,
    pub(super) local_notes: BTreeMap<String, Note>,
    pub(super) pending: Vec<PendingChange>,
    pub(super) drafts: HashMap<String, UnsavedDraft>,
    pub(super) submitted: Vec<SubmittedPr>,
    pub(super) restore_prompts: Vec<RestorePrompt>,
    pub(super) selection: Option<Selection>,
    pub(super) editing: Option<EditSession>,
}
