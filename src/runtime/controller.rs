use super::event::AppEvent;
use super::poller::PollTask;
use crate::api::{ApiError, KnowledgeBackend};
use crate::state::{Note, PreparedBatch, ReconcileOutcome, Workspace};
use crate::types::{NoteRecord, SubmitBatchResponse, SubmittedPrRecord};
use chrono::Utc;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    NothingStaged,
    AlreadyInFlight,
    Sent { files: usize },
}

/// Owns every exchange with the backend: note loads, batch submission,
/// the PR status poller and chat turns. Work runs on spawned tasks that
/// report back as [`AppEvent`]s; results are applied by the `on_*` methods.
pub struct SubmissionController {
    backend: Arc<dyn KnowledgeBackend>,
    events_tx: mpsc::UnboundedSender<AppEvent>,
    poll_interval: Duration,
    poller: Option<PollTask>,
    submit_in_flight: bool,
    next_turn: u64,
    chat_cancel: Option<CancellationToken>,
}

impl SubmissionController {
    pub fn new(
        backend: Arc<dyn KnowledgeBackend>,
        events_tx: mpsc::UnboundedSender<AppEvent>,
        poll_interval: Duration,
    ) -> Self {
        Self {
            backend,
            events_tx,
            poll_interval,
            poller: None,
            submit_in_flight: false,
            next_turn: 0,
            chat_cancel: None,
        }
    }

    pub fn load_notes(&self) {
        let backend = Arc::clone(&self.backend);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch_notes().await;
            let _ = events_tx.send(AppEvent::NotesLoaded(result));
        });
    }

    /// Forces the backend to drop its note cache, then reloads. The refresh
    /// is best effort; the reload happens either way.
    pub fn refresh_notes_after_merge(&self) {
        let backend = Arc::clone(&self.backend);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            if let Err(error) = backend.refresh_notes().await {
                tracing::warn!(error = %error, "note cache refresh failed");
            }
            let result = backend.fetch_notes().await;
            let _ = events_tx.send(AppEvent::NotesLoaded(result));
        });
    }

    pub fn load_submitted(&self) {
        let backend = Arc::clone(&self.backend);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.fetch_submitted_prs().await;
            let _ = events_tx.send(AppEvent::SubmittedPrsLoaded(result));
        });
    }

    pub fn submit_in_flight(&self) -> bool {
        self.submit_in_flight
    }

    pub fn submit_batch(&mut self, workspace: &Workspace, pr_title: &str) -> SubmitOutcome {
        if self.submit_in_flight {
            return SubmitOutcome::AlreadyInFlight;
        }
        let Some(batch) = workspace.prepare_batch(pr_title) else {
            return SubmitOutcome::NothingStaged;
        };
        let files = batch.changes.len();
        self.submit_in_flight = true;
        tracing::info!(files, pr_title, "submitting batch");

        let backend = Arc::clone(&self.backend);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let result = backend.submit_batch(&batch.request).await;
            let _ = events_tx.send(AppEvent::SubmitFinished { batch, result });
        });
        SubmitOutcome::Sent { files }
    }

    /// Applies a submission result. Errors leave staging untouched and come
    /// back as the message to show the user.
    pub fn on_submit_finished(
        &mut self,
        workspace: &mut Workspace,
        batch: PreparedBatch,
        result: Result<SubmitBatchResponse, ApiError>,
    ) -> Result<u64, String> {
        self.submit_in_flight = false;
        match result {
            Ok(response) => {
                let pr_number = workspace
                    .complete_submission(batch, response, Utc::now())
                    .pr_number;
                self.sync_polling(workspace);
                Ok(pr_number)
            }
            Err(error) => {
                tracing::warn!(error = %error, "batch submission failed");
                Err(error.to_string())
            }
        }
    }

    /// Applies a note fetch. A failure keeps whatever list is already shown,
    /// or an empty one when nothing has loaded yet.
    pub fn on_notes_loaded(
        &self,
        workspace: &mut Workspace,
        result: Result<Vec<NoteRecord>, ApiError>,
    ) -> Result<usize, String> {
        match result {
            Ok(records) => {
                let count = records.len();
                workspace.replace_notes(records.into_iter().map(Note::from));
                tracing::info!(count, "notes loaded");
                Ok(count)
            }
            Err(error) => {
                tracing::warn!(error = %error, "note fetch failed");
                workspace.mark_notes_unavailable();
                Err(error.to_string())
            }
        }
    }

    pub fn on_submitted_loaded(
        &mut self,
        workspace: &mut Workspace,
        result: Result<Vec<SubmittedPrRecord>, ApiError>,
    ) -> usize {
        let added = match result {
            Ok(records) => workspace.hydrate_submitted(&records),
            Err(error) => {
                tracing::warn!(error = %error, "could not load submitted PRs");
                0
            }
        };
        self.sync_polling(workspace);
        added
    }

    pub fn on_poll_result(
        &mut self,
        workspace: &mut Workspace,
        result: Result<Vec<SubmittedPrRecord>, ApiError>,
    ) -> Vec<ReconcileOutcome> {
        let outcomes = match result {
            Ok(records) => workspace.apply_remote_statuses(&records),
            Err(_) => Vec::new(),
        };
        if outcomes
            .iter()
            .any(|outcome| matches!(outcome, ReconcileOutcome::Merged { .. }))
        {
            self.refresh_notes_after_merge();
        }
        self.sync_polling(workspace);
        outcomes
    }

    /// Runs the poller exactly while some submitted PR is still open.
    pub fn sync_polling(&mut self, workspace: &Workspace) {
        let wanted = workspace.has_open_prs();
        if self.poller.as_ref().is_some_and(PollTask::is_finished) {
            self.poller = None;
        }
        match (wanted, self.poller.is_some()) {
            (true, false) => {
                self.poller = Some(PollTask::spawn(
                    Arc::clone(&self.backend),
                    self.poll_interval,
                    self.events_tx.clone(),
                ));
            }
            (false, true) => {
                self.poller = None;
                tracing::info!("no open PRs; PR status poller disarmed");
            }
            _ => {}
        }
    }

    pub fn is_polling(&self) -> bool {
        self.poller.is_some()
    }

    /// Starts a streamed chat turn, abandoning any turn still running.
    pub fn start_chat(&mut self, message: String) -> u64 {
        self.cancel_chat();
        self.next_turn += 1;
        let turn = self.next_turn;
        let cancel = CancellationToken::new();
        self.chat_cancel = Some(cancel.clone());

        let backend = Arc::clone(&self.backend);
        let events_tx = self.events_tx.clone();
        tokio::spawn(async move {
            let mut stream = match backend.stream_chat(&message).await {
                Ok(stream) => stream,
                Err(error) => {
                    let _ = events_tx.send(AppEvent::ChatFailed {
                        turn,
                        error: error.to_string(),
                    });
                    return;
                }
            };
            loop {
                let next = tokio::select! {
                    _ = cancel.cancelled() => return,
                    next = stream.next() => next,
                };
                let event = match next {
                    Some(Ok(bytes)) => AppEvent::ChatChunk { turn, bytes },
                    Some(Err(error)) => {
                        let _ = events_tx.send(AppEvent::ChatFailed {
                            turn,
                            error: error.to_string(),
                        });
                        return;
                    }
                    None => {
                        let _ = events_tx.send(AppEvent::ChatFinished { turn });
                        return;
                    }
                };
                if events_tx.send(event).is_err() {
                    return;
                }
            }
        });
        turn
    }

    pub fn cancel_chat(&mut self) {
        if let Some(cancel) = self.chat_cancel.take() {
            cancel.cancel();
        }
    }

    pub fn shutdown(&mut self) {
        self.cancel_chat();
        if self.poller.take().is_some() {
            tracing::info!("PR status poller stopped for shutdown");
        }
    }
}
