use super::{PreparedBatch, SubmissionStatus, SubmittedPr, Workspace};
use crate::types::{SubmitBatchRequest, SubmitBatchResponse};
use chrono::{DateTime, Utc};

impl Workspace {
    /// Snapshot of every staged change, or `None` when nothing is staged.
    pub fn prepare_batch(&self, pr_title: &str) -> Option<PreparedBatch> {
        if self.pending.is_empty() {
            return None;
        }
        let changes = self.pending.clone();
        let request = SubmitBatchRequest {
            changes: changes.iter().map(|change| change.to_batch_change()).collect(),
            pr_title: pr_title.to_string(),
        };
        Some(PreparedBatch { changes, request })
    }

    /// Records an accepted batch as an open pull request.
    ///
    /// Only staged entries still identical to the snapshot are cleared, so
    /// anything re-staged while the request was in flight stays pending. A
    /// response for a PR number already tracked is ignored.
    pub fn complete_submission(
        &mut self,
        batch: PreparedBatch,
        response: SubmitBatchResponse,
        submitted_at: DateTime<Utc>,
    ) -> &SubmittedPr {
        if let Some(index) = self
            .submitted
            .iter()
            .position(|pr| pr.pr_number == response.pr_number)
        {
            tracing::warn!(pr_number = response.pr_number, "duplicate submission response");
            return &self.submitted[index];
        }

        self.pending.retain(|change| {
            !batch
                .changes
                .iter()
                .any(|sent| sent.path == change.path && sent.content == change.content)
        });
        tracing::info!(
            pr_number = response.pr_number,
            files = batch.changes.len(),
            still_pending = self.pending.len(),
            "batch submitted"
        );
        self.submitted.push(SubmittedPr {
            pr_number: response.pr_number,
            pr_url: response.pr_url,
            branch: response.branch,
            changes: batch.changes,
            status: SubmissionStatus::Open,
            submitted_at,
            hydrated: true,
        });
        let index = self.submitted.len() - 1;
        &self.submitted[index]
    }
}
