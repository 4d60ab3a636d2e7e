mod notes;
mod workspace;

pub use notes::{
    extract_title, slug_path, Note, NoteStore, DEFAULT_TOPIC, DRAFT_TOPIC, PENDING_TOPIC,
};
pub use workspace::{
    DiffView, EditSession, Highlight, NoteEntry, PathState, PendingChange, PreparedBatch,
    ReconcileOutcome, RestorePrompt, Selection, StageOutcome, SubmissionStatus, SubmittedPr,
    UnsavedDraft, Workspace, WorkspaceError,
};
