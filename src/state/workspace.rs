mod editing;
mod queries;
mod reconcile;
mod staging;
mod state;
mod submission;

#[cfg(test)]
mod tests;

pub use state::{
    DiffView, EditSession, Highlight, NoteEntry, PathState, PendingChange, PreparedBatch,
    ReconcileOutcome, RestorePrompt, Selection, StageOutcome, SubmissionStatus, SubmittedPr,
    UnsavedDraft, Workspace, WorkspaceError,
};
