use super::*;
use crate::note_diff::{diff_stats, DiffTier, LineKind};
use crate::state::{DRAFT_TOPIC, PENDING_TOPIC};
use crate::test_support::sample_notes;
use crate::types::{DraftEvent, RemotePrStatus, SubmitBatchResponse, SubmittedPrRecord, SurfaceEvent};
use chrono::Utc;

fn workspace() -> Workspace {
    let mut workspace = Workspace::new();
    workspace.replace_notes(sample_notes());
    workspace
}

fn edit(workspace: &mut Workspace, path: &str, text: &str) {
    workspace.select_note(path).expect("select");
    workspace.start_editing().expect("start editing");
    workspace.set_edit_text(text).expect("set text");
}

fn response(pr_number: u64) -> SubmitBatchResponse {
    SubmitBatchResponse {
        pr_url: format!("https://github.com/org/kb/pull/{pr_number}"),
        pr_number,
        branch: format!("kb/batch-{pr_number}"),
        files_changed: None,
    }
}

fn record(pr_number: u64, status: RemotePrStatus, files: &[&str]) -> SubmittedPrRecord {
    SubmittedPrRecord {
        pr_number,
        pr_url: format!("https://github.com/org/kb/pull/{pr_number}"),
        status,
        submitted_at: "2025-01-05T10:00:00".to_string(),
        branch: String::new(),
        files: files.iter().map(|path| path.to_string()).collect(),
        merged_at: None,
        closed_at: None,
    }
}

fn submit(workspace: &mut Workspace, pr_number: u64) {
    let batch = workspace.prepare_batch("Knowledge base updates").expect("batch");
    workspace.complete_submission(batch, response(pr_number), Utc::now());
}

#[test]
fn test_faq_edit_flows_from_draft_to_merged() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nQ: x?\n");
    assert_eq!(workspace.path_state("faq.md"), PathState::Drafting);

    let diff = workspace.diff_for("faq.md", true).expect("draft diff");
    assert_eq!(diff.tier, DiffTier::Draft);
    assert_eq!(diff_stats(&diff.lines).added, 1);

    assert_eq!(workspace.stage_current(), Ok(StageOutcome::Created));
    assert!(workspace.editing().is_none());
    assert_eq!(workspace.path_state("faq.md"), PathState::Staged);
    let staged = workspace.pending_change("faq.md").expect("staged");
    assert_eq!(staged.original_content.as_deref(), Some("# FAQ\n"));
    assert!(!staged.is_new);

    submit(&mut workspace, 42);
    assert!(!workspace.has_pending());
    assert_eq!(workspace.path_state("faq.md"), PathState::SubmittedOpen);
    assert_eq!(workspace.effective_content("faq.md"), Some("# FAQ\nQ: x?\n"));
    assert_eq!(
        workspace.diff_for("faq.md", true).map(|diff| diff.tier),
        Some(DiffTier::Submitted)
    );

    let outcomes =
        workspace.apply_remote_statuses(&[record(42, RemotePrStatus::Merged, &["faq.md"])]);
    assert_eq!(
        outcomes,
        vec![ReconcileOutcome::Merged {
            pr_number: 42,
            paths: vec!["faq.md".to_string()],
        }]
    );
    assert_eq!(workspace.path_state("faq.md"), PathState::Clean);
    assert!(!workspace.has_open_prs());
}

#[test]
fn test_restaging_keeps_first_original_content() {
    let mut workspace = workspace();
    edit(&mut workspace, "oncall.md", "# On-call\n\nA\nC\n");
    workspace.stage_current().expect("first stage");
    edit(&mut workspace, "oncall.md", "# On-call\n\nA\nD\n");
    assert_eq!(workspace.stage_current(), Ok(StageOutcome::Updated));

    assert_eq!(workspace.pending_changes().len(), 1);
    let staged = workspace.pending_change("oncall.md").expect("staged");
    assert_eq!(staged.content, "# On-call\n\nA\nD\n");
    assert_eq!(staged.original_content.as_deref(), Some("# On-call\n\nA\nB\n"));

    let diff = workspace.diff_for("oncall.md", true).expect("staged diff");
    let changed: Vec<(LineKind, &str)> = diff
        .lines
        .iter()
        .filter(|line| line.kind != LineKind::Unchanged)
        .map(|line| (line.kind, line.text.as_str()))
        .collect();
    assert_eq!(changed, vec![(LineKind::Removed, "B"), (LineKind::Added, "D")]);
}

#[test]
fn test_restaging_the_base_text_drops_the_change() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nmore\n");
    workspace.stage_current().expect("stage");
    edit(&mut workspace, "faq.md", "# FAQ\n");
    assert_eq!(workspace.stage_current(), Ok(StageOutcome::Reverted));
    assert!(!workspace.has_pending());
}

#[test]
fn test_stage_requires_a_content_delta() {
    let mut workspace = workspace();
    workspace.select_note("faq.md").expect("select");
    workspace.start_editing().expect("edit");
    assert_eq!(
        workspace.stage_current(),
        Err(WorkspaceError::NoChanges("faq.md".to_string()))
    );
    assert!(workspace.editing().is_some());
    assert_eq!(workspace.stage_current().ok(), None);

    workspace.cancel_editing().expect("cancel");
    assert_eq!(workspace.stage_current(), Err(WorkspaceError::NotEditing));
}

#[test]
fn test_switching_notes_parks_dirty_edit_as_draft() {
    let mut workspace = workspace();
    edit(&mut workspace, "deploy.md", "# Deploying\n\nRun it twice.\n");
    workspace.select_note("faq.md").expect("switch");

    assert!(workspace.editing().is_none());
    assert_eq!(workspace.path_state("deploy.md"), PathState::Drafting);
    let parked: Vec<&str> = workspace.drafts().map(|(path, _)| path).collect();
    assert_eq!(parked, vec!["deploy.md"]);
    assert_eq!(
        workspace.effective_content("deploy.md"),
        Some("# Deploying\n\nRun it twice.\n")
    );
    assert_eq!(
        workspace.committed_content("deploy.md"),
        Some("# Deploying\n\nRun the pipeline.\n")
    );

    workspace.select_note("deploy.md").expect("back");
    let session = workspace.start_editing().expect("resume");
    assert_eq!(session.text, "# Deploying\n\nRun it twice.\n");
    assert_eq!(session.baseline, "# Deploying\n\nRun the pipeline.\n");
}

#[test]
fn test_reselecting_same_note_keeps_edit_session() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nchanged\n");
    workspace.select_note("faq.md").expect("reselect");
    assert!(workspace.is_editing("faq.md"));
    assert_eq!(workspace.draft_count(), 0);
}

#[test]
fn test_selecting_unknown_note_is_rejected() {
    let mut workspace = workspace();
    assert_eq!(
        workspace.select_note("nope.md"),
        Err(WorkspaceError::UnknownNote("nope.md".to_string()))
    );
    assert!(workspace.selection().is_none());
    assert_eq!(workspace.start_editing().err(), Some(WorkspaceError::NoSelection));
}

#[test]
fn test_cancel_discards_draft_for_existing_note() {
    let mut workspace = workspace();
    edit(&mut workspace, "deploy.md", "changed");
    workspace.select_note("faq.md").expect("park");
    workspace.select_note("deploy.md").expect("back");
    workspace.start_editing().expect("resume");
    workspace.cancel_editing().expect("cancel");

    assert!(workspace.draft("deploy.md").is_none());
    assert_eq!(workspace.path_state("deploy.md"), PathState::Clean);
    assert_eq!(workspace.selected_path(), Some("deploy.md"));
}

#[test]
fn test_cancel_on_new_note_removes_and_deselects_it() {
    let mut workspace = workspace();
    let path = workspace.create_note("Release Process");
    assert_eq!(path, "release-process.md");
    assert!(workspace.is_local_note(&path));
    assert_eq!(workspace.selected_path(), Some(path.as_str()));

    workspace.cancel_editing().expect("cancel");
    assert!(workspace.note(&path).is_none());
    assert!(workspace.selection().is_none());
}

#[test]
fn test_create_note_suffixes_colliding_paths() {
    let mut workspace = workspace();
    assert_eq!(workspace.create_note("FAQ"), "faq-2.md");
    workspace.stage_current().expect("stage first");
    assert_eq!(workspace.create_note("faq"), "faq-3.md");
    assert_eq!(workspace.create_note("   "), "untitled-note.md");
}

#[test]
fn test_new_note_moves_from_draft_to_pending_topic() {
    let mut workspace = workspace();
    let path = workspace.create_note("Runbook");
    let topic = |workspace: &Workspace| {
        workspace
            .note_listing()
            .into_iter()
            .find(|entry| entry.path == "runbook.md")
            .map(|entry| entry.topic)
    };
    assert_eq!(topic(&workspace).as_deref(), Some(DRAFT_TOPIC));

    workspace.set_edit_text("# Runbook\n\nStep one.\n").expect("text");
    workspace.stage_current().expect("stage");
    assert_eq!(topic(&workspace).as_deref(), Some(PENDING_TOPIC));
    let staged = workspace.pending_change(&path).expect("staged");
    assert!(staged.is_new);
    assert_eq!(staged.title, "Runbook");
    assert!(staged.original_content.is_none());

    workspace.unstage(&path).expect("unstage");
    assert!(workspace.note(&path).is_none());
}

#[test]
fn test_unstage_keeps_drafts_and_base() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nstaged\n");
    workspace.stage_current().expect("stage");
    edit(&mut workspace, "deploy.md", "draft only");
    workspace.select_note("faq.md").expect("park deploy");

    assert!(workspace.unstage("faq.md").is_some());
    assert!(workspace.unstage("faq.md").is_none());
    assert_eq!(workspace.path_state("faq.md"), PathState::Clean);
    assert_eq!(workspace.path_state("deploy.md"), PathState::Drafting);
    assert_eq!(workspace.base_content("faq.md"), Some("# FAQ\n"));
}

#[test]
fn test_empty_batch_is_not_prepared() {
    let workspace = workspace();
    assert!(workspace.prepare_batch("Knowledge base updates").is_none());
}

#[test]
fn test_batch_carries_every_staged_change_in_order() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nOne\n");
    workspace.stage_current().expect("stage faq");
    edit(&mut workspace, "deploy.md", "# Deploying\n");
    workspace.stage_current().expect("stage deploy");

    let batch = workspace.prepare_batch("Docs refresh").expect("batch");
    assert_eq!(batch.request.pr_title, "Docs refresh");
    let paths: Vec<&str> = batch
        .request
        .changes
        .iter()
        .map(|change| change.path.as_str())
        .collect();
    assert_eq!(paths, vec!["faq.md", "deploy.md"]);
}

#[test]
fn test_restage_during_submit_survives_completion() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nv1\n");
    workspace.stage_current().expect("stage v1");
    let batch = workspace.prepare_batch("t").expect("batch");

    edit(&mut workspace, "faq.md", "# FAQ\nv2\n");
    workspace.stage_current().expect("stage v2");

    workspace.complete_submission(batch, response(9), Utc::now());
    let pending = workspace.pending_change("faq.md").expect("v2 still staged");
    assert_eq!(pending.content, "# FAQ\nv2\n");
    assert_eq!(pending.original_content.as_deref(), Some("# FAQ\n"));
}

#[test]
fn test_submission_leaves_unrelated_drafts_alone() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nnew\n");
    workspace.stage_current().expect("stage");
    edit(&mut workspace, "deploy.md", "wip");
    workspace.select_note("faq.md").expect("park");

    submit(&mut workspace, 5);
    assert_eq!(workspace.draft("deploy.md").map(|d| d.content.as_str()), Some("wip"));
}

#[test]
fn test_duplicate_pr_number_is_ignored() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nA\n");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 3);
    edit(&mut workspace, "deploy.md", "# Deploying\nB\n");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 3);

    assert_eq!(workspace.submitted_prs().len(), 1);
    assert!(workspace.pending_change("deploy.md").is_some());
}

#[test]
fn test_merge_clears_only_paths_in_that_pr() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nmerged\n");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 42);

    edit(&mut workspace, "faq.md", "# FAQ\nfollow-up\n");
    workspace.select_note("deploy.md").expect("park faq draft");
    edit(&mut workspace, "deploy.md", "# Deploying\nlater\n");
    workspace.stage_current().expect("stage deploy");

    workspace.apply_remote_statuses(&[record(42, RemotePrStatus::Merged, &["faq.md"])]);
    assert!(workspace.draft("faq.md").is_none());
    assert!(workspace.pending_change("deploy.md").is_some());
    assert_eq!(
        workspace.submitted_pr(42).map(|pr| pr.status),
        Some(SubmissionStatus::Merged)
    );
}

#[test]
fn test_missing_or_unknown_status_keeps_pr_open() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nx\n");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 7);

    assert!(workspace.apply_remote_statuses(&[]).is_empty());
    assert!(workspace
        .apply_remote_statuses(&[record(7, RemotePrStatus::Unknown, &[])])
        .is_empty());
    assert!(workspace.has_open_prs());
}

#[test]
fn test_closed_pr_restores_identical_changes() {
    let mut workspace = workspace();
    edit(&mut workspace, "oncall.md", "# On-call\n\nA\nC\n");
    workspace.stage_current().expect("stage");
    let before = workspace.pending_changes().to_vec();
    submit(&mut workspace, 11);

    let outcomes =
        workspace.apply_remote_statuses(&[record(11, RemotePrStatus::Closed, &["oncall.md"])]);
    assert_eq!(
        outcomes,
        vec![ReconcileOutcome::Closed {
            pr_number: 11,
            restorable: true,
        }]
    );
    assert_eq!(workspace.restore_prompts().len(), 1);
    assert_eq!(workspace.path_state("oncall.md"), PathState::Clean);

    assert_eq!(workspace.restore_closed(11), Ok(1));
    assert_eq!(workspace.pending_changes(), before.as_slice());
    assert!(workspace.restore_prompts().is_empty());
    assert_eq!(
        workspace.restore_closed(11),
        Err(WorkspaceError::NoRestorePrompt(11))
    );
}

#[test]
fn test_restore_keeps_newer_staged_change() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nold\n");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 12);
    edit(&mut workspace, "faq.md", "# FAQ\nnewer\n");
    workspace.stage_current().expect("stage newer");

    workspace.apply_remote_statuses(&[record(12, RemotePrStatus::Closed, &["faq.md"])]);
    assert_eq!(workspace.restore_closed(12), Ok(0));
    assert_eq!(
        workspace.pending_change("faq.md").map(|c| c.content.as_str()),
        Some("# FAQ\nnewer\n")
    );
}

#[test]
fn test_dismissing_closed_pr_drops_orphan_new_note() {
    let mut workspace = workspace();
    let path = workspace.create_note("Glossary");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 13);
    assert!(workspace.note(&path).is_some());

    workspace.apply_remote_statuses(&[record(13, RemotePrStatus::Closed, &["glossary.md"])]);
    workspace.dismiss_closed(13).expect("dismiss");
    assert!(workspace.note(&path).is_none());
    assert_eq!(
        workspace.submitted_pr(13).map(|pr| pr.status),
        Some(SubmissionStatus::Closed)
    );
}

#[test]
fn test_hydrate_adds_only_unknown_open_prs() {
    let mut workspace = workspace();
    let added = workspace.hydrate_submitted(&[
        record(1, RemotePrStatus::Open, &["faq.md", "new-page.md"]),
        record(2, RemotePrStatus::Merged, &["deploy.md"]),
        record(3, RemotePrStatus::Closed, &["deploy.md"]),
    ]);
    assert_eq!(added, 1);
    assert_eq!(
        workspace.hydrate_submitted(&[record(1, RemotePrStatus::Open, &["faq.md"])]),
        0
    );

    let pr = workspace.submitted_pr(1).expect("tracked");
    assert!(!pr.hydrated);
    assert!(pr.change_for("new-page.md").is_some_and(|change| change.is_new));
    assert_eq!(workspace.path_state("faq.md"), PathState::SubmittedOpen);
    // Placeholder content never shadows the base note.
    assert_eq!(workspace.effective_content("faq.md"), Some("# FAQ\n"));
    assert!(workspace.has_open_prs());
}

#[test]
fn test_closed_placeholder_pr_is_not_restorable() {
    let mut workspace = workspace();
    workspace.hydrate_submitted(&[record(4, RemotePrStatus::Open, &["faq.md"])]);
    let outcomes =
        workspace.apply_remote_statuses(&[record(4, RemotePrStatus::Closed, &["faq.md"])]);
    assert_eq!(
        outcomes,
        vec![ReconcileOutcome::Closed {
            pr_number: 4,
            restorable: false,
        }]
    );
    assert_eq!(workspace.restore_closed(4), Ok(0));
    assert!(!workspace.has_pending());
}

#[test]
fn test_draft_event_stages_and_selects() {
    let mut workspace = workspace();
    let outcome = workspace.apply_draft_event(&DraftEvent {
        path: "gcp.md".to_string(),
        title: None,
        content: "# GCP Deploys\n\nUse the console.\n".to_string(),
        is_new: true,
    });
    assert_eq!(outcome, StageOutcome::Created);
    assert_eq!(workspace.selected_path(), Some("gcp.md"));
    assert_eq!(workspace.path_state("gcp.md"), PathState::Staged);
    assert_eq!(
        workspace.pending_change("gcp.md").map(|c| c.title.as_str()),
        Some("GCP Deploys")
    );
    assert!(workspace
        .note_listing()
        .iter()
        .any(|entry| entry.path == "gcp.md" && entry.topic == PENDING_TOPIC));
}

#[test]
fn test_draft_event_for_existing_note_is_not_new() {
    let mut workspace = workspace();
    workspace.apply_draft_event(&DraftEvent {
        path: "faq.md".to_string(),
        title: Some("FAQ".to_string()),
        content: "# FAQ\nAgent answer\n".to_string(),
        is_new: true,
    });
    let staged = workspace.pending_change("faq.md").expect("staged");
    assert!(!staged.is_new);
    assert_eq!(staged.original_content.as_deref(), Some("# FAQ\n"));
}

#[test]
fn test_draft_event_parks_edit_on_another_note() {
    let mut workspace = workspace();
    edit(&mut workspace, "deploy.md", "mine");
    workspace.apply_draft_event(&DraftEvent {
        path: "faq.md".to_string(),
        title: None,
        content: "# FAQ\nfrom agent\n".to_string(),
        is_new: false,
    });
    assert_eq!(workspace.draft("deploy.md").map(|d| d.content.as_str()), Some("mine"));
    assert_eq!(workspace.selected_path(), Some("faq.md"));
}

#[test]
fn test_draft_event_for_note_being_edited_rebases_clean_buffer() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\n");
    let outcome = workspace.apply_draft_event(&DraftEvent {
        path: "faq.md".to_string(),
        title: None,
        content: "# FAQ\n\nAgent answer.\n".to_string(),
        is_new: false,
    });
    assert_eq!(outcome, StageOutcome::Created);
    assert!(workspace.editing().is_none());
    assert!(workspace.draft("faq.md").is_none());

    let session = workspace.start_editing().expect("edit again");
    assert_eq!(session.baseline, "# FAQ\n\nAgent answer.\n");
    assert_eq!(session.text, "# FAQ\n\nAgent answer.\n");

    workspace.set_edit_text("# FAQ\n\nAgent answer.\nmine\n").expect("set text");
    assert_eq!(workspace.stage_current(), Ok(StageOutcome::Updated));
    let staged = workspace.pending_change("faq.md").expect("staged");
    assert_eq!(staged.content, "# FAQ\n\nAgent answer.\nmine\n");
    assert_eq!(staged.original_content.as_deref(), Some("# FAQ\n"));
}

#[test]
fn test_draft_event_for_note_being_edited_parks_dirty_buffer() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\n\nmine\n");
    workspace.apply_draft_event(&DraftEvent {
        path: "faq.md".to_string(),
        title: None,
        content: "# FAQ\n\nAgent answer.\n".to_string(),
        is_new: false,
    });

    assert!(workspace.editing().is_none());
    assert_eq!(
        workspace.pending_change("faq.md").map(|change| change.content.as_str()),
        Some("# FAQ\n\nAgent answer.\n")
    );
    assert_eq!(
        workspace.draft("faq.md").map(|draft| draft.content.as_str()),
        Some("# FAQ\n\nmine\n")
    );
    assert_eq!(workspace.path_state("faq.md"), PathState::Staged);

    let session = workspace.start_editing().expect("resume");
    assert_eq!(session.text, "# FAQ\n\nmine\n");
    assert_eq!(session.baseline, "# FAQ\n\nAgent answer.\n");
}

#[test]
fn test_surface_event_selects_with_highlight() {
    let mut workspace = workspace();
    assert!(workspace.apply_surface_event(&SurfaceEvent {
        path: "deploy.md".to_string(),
        title: None,
        highlight_text: Some("pipeline".to_string()),
        section_title: None,
    }));
    let selection = workspace.selection().expect("selected");
    assert_eq!(selection.path, "deploy.md");
    assert_eq!(
        selection.highlight.as_ref().and_then(|h| h.text.as_deref()),
        Some("pipeline")
    );

    assert!(!workspace.apply_surface_event(&SurfaceEvent {
        path: "ghost.md".to_string(),
        title: None,
        highlight_text: None,
        section_title: None,
    }));
    assert_eq!(workspace.selected_path(), Some("deploy.md"));
}

#[test]
fn test_effective_content_precedence() {
    let mut workspace = workspace();
    edit(&mut workspace, "faq.md", "# FAQ\nsubmitted\n");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 20);
    edit(&mut workspace, "faq.md", "# FAQ\nstaged again\n");
    workspace.stage_current().expect("restage");
    edit(&mut workspace, "faq.md", "# FAQ\ndrafting\n");
    workspace.select_note("deploy.md").expect("park");

    assert_eq!(workspace.effective_content("faq.md"), Some("# FAQ\nsubmitted\n"));
    assert_eq!(workspace.path_state("faq.md"), PathState::SubmittedOpen);
    assert_eq!(workspace.base_content("faq.md"), Some("# FAQ\n"));
}

#[test]
fn test_refresh_replaces_local_note_with_fetched_copy() {
    let mut workspace = workspace();
    let path = workspace.create_note("Runbook");
    workspace.stage_current().expect("stage");
    submit(&mut workspace, 30);
    workspace.apply_remote_statuses(&[record(30, RemotePrStatus::Merged, &["runbook.md"])]);

    let mut notes = sample_notes();
    notes.push(crate::test_support::note(
        "runbook.md",
        "Runbook",
        "Operations",
        "# Runbook\n",
    ));
    workspace.replace_notes(notes);
    assert!(!workspace.is_local_note(&path));
    assert_eq!(workspace.note(&path).map(|n| n.topic.as_str()), Some("Operations"));
}
