use super::super::notes::{Note, DRAFT_TOPIC};
use super::{
    PendingChange, ReconcileOutcome, RestorePrompt, SubmissionStatus, SubmittedPr, Workspace,
    WorkspaceError,
};
use crate::types::{RemotePrStatus, SubmittedPrRecord};
use chrono::{DateTime, NaiveDateTime, Utc};

impl Workspace {
    /// Seeds tracking from the backend's record of earlier submissions. Only
    /// open PRs not already tracked are added; their content is unknown.
    pub fn hydrate_submitted(&mut self, records: &[SubmittedPrRecord]) -> usize {
        let mut added = 0usize;
        for record in records {
            if matches!(record.status, RemotePrStatus::Merged | RemotePrStatus::Closed) {
                continue;
            }
            if self.submitted_pr(record.pr_number).is_some() {
                continue;
            }
            let changes = record
                .files
                .iter()
                .map(|path| PendingChange {
                    path: path.clone(),
                    title: self.title_for(path),
                    content: String::new(),
                    is_new: !self.store.contains(path),
                    original_content: None,
                })
                .collect();
            self.submitted.push(SubmittedPr {
                pr_number: record.pr_number,
                pr_url: record.pr_url.clone(),
                branch: record.branch.clone(),
                changes,
                status: SubmissionStatus::Open,
                submitted_at: parse_submitted_at(&record.submitted_at),
                hydrated: false,
            });
            added += 1;
        }
        if added > 0 {
            tracing::info!(added, "tracking open pull requests from backend");
        }
        added
    }

    /// Applies polled statuses to locally open PRs. Numbers missing from the
    /// poll, or with an unrecognised status, stay open.
    pub fn apply_remote_statuses(&mut self, records: &[SubmittedPrRecord]) -> Vec<ReconcileOutcome> {
        let mut outcomes = Vec::new();
        for index in 0..self.submitted.len() {
            if !self.submitted[index].is_open() {
                continue;
            }
            let pr_number = self.submitted[index].pr_number;
            let Some(record) = records.iter().find(|record| record.pr_number == pr_number) else {
                continue;
            };
            match record.status {
                RemotePrStatus::Open | RemotePrStatus::Unknown => {}
                RemotePrStatus::Merged => {
                    self.submitted[index].status = SubmissionStatus::Merged;
                    let paths = self.submitted[index].paths();
                    self.pending.retain(|change| !paths.contains(&change.path));
                    self.drafts.retain(|path, _| !paths.contains(path));
                    tracing::info!(pr_number, files = paths.len(), "pull request merged");
                    outcomes.push(ReconcileOutcome::Merged { pr_number, paths });
                }
                RemotePrStatus::Closed => {
                    let pr = &mut self.submitted[index];
                    pr.status = SubmissionStatus::Closed;
                    let restorable = pr.hydrated;
                    let prompt = RestorePrompt {
                        pr_number,
                        pr_url: pr.pr_url.clone(),
                        paths: pr.paths(),
                    };
                    self.restore_prompts.push(prompt);
                    tracing::info!(pr_number, restorable, "pull request closed without merge");
                    outcomes.push(ReconcileOutcome::Closed {
                        pr_number,
                        restorable,
                    });
                }
            }
        }
        outcomes
    }

    /// Re-stages the changes of a closed PR exactly as submitted. A path that
    /// has been staged again since is left alone.
    pub fn restore_closed(&mut self, pr_number: u64) -> Result<usize, WorkspaceError> {
        self.take_restore_prompt(pr_number)?;
        let Some(pr) = self.submitted_pr(pr_number) else {
            return Ok(0);
        };
        if !pr.hydrated {
            tracing::warn!(pr_number, "closed pull request has no local content to restore");
            let paths = pr.paths();
            for path in &paths {
                self.drop_orphan_local_note(path);
            }
            return Ok(0);
        }

        let changes = pr.changes.clone();
        let mut restored = 0usize;
        for change in changes {
            if self.pending_change(&change.path).is_some() {
                tracing::debug!(path = %change.path, "keeping newer staged change over restore");
                continue;
            }
            if change.is_new
                && !self.store.contains(&change.path)
                && !self.local_notes.contains_key(&change.path)
            {
                self.local_notes.insert(
                    change.path.clone(),
                    Note {
                        path: change.path.clone(),
                        title: change.title.clone(),
                        topic: DRAFT_TOPIC.to_string(),
                        content: String::new(),
                    },
                );
            }
            self.pending.push(change);
            restored += 1;
        }
        tracing::info!(pr_number, restored, "restored closed pull request changes");
        Ok(restored)
    }

    /// Declines restoring a closed PR. Local notes it alone kept alive go away.
    pub fn dismiss_closed(&mut self, pr_number: u64) -> Result<(), WorkspaceError> {
        let prompt = self.take_restore_prompt(pr_number)?;
        for path in &prompt.paths {
            self.drop_orphan_local_note(path);
        }
        Ok(())
    }

    fn take_restore_prompt(&mut self, pr_number: u64) -> Result<RestorePrompt, WorkspaceError> {
        let index = self
            .restore_prompts
            .iter()
            .position(|prompt| prompt.pr_number == pr_number)
            .ok_or(WorkspaceError::NoRestorePrompt(pr_number))?;
        Ok(self.restore_prompts.remove(index))
    }
}

/// Backend timestamps are ISO 8601, with or without an offset.
fn parse_submitted_at(raw: &str) -> DateTime<Utc> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return parsed.with_timezone(&Utc);
    }
    NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f")
        .map(|naive| naive.and_utc())
        .unwrap_or_else(|_| Utc::now())
}
