use super::{ApiError, ByteStream, KnowledgeBackend};
use crate::types::{
    NoteRecord, RemotePrStatus, SubmitBatchRequest, SubmitBatchResponse, SubmittedPrRecord,
};
use async_trait::async_trait;
use bytes::Bytes;
use futures::stream;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

#[derive(Debug, Default)]
struct MockState {
    notes: Vec<NoteRecord>,
    notes_error: Option<String>,
    prs: Vec<SubmittedPrRecord>,
    prs_error: Option<String>,
    submit_results: VecDeque<Result<SubmitBatchResponse, String>>,
    next_pr_number: u64,
    chat_responses: VecDeque<Vec<String>>,
    submissions: Vec<SubmitBatchRequest>,
    chat_messages: Vec<String>,
    refresh_calls: usize,
    pr_fetches: usize,
}

/// In-memory backend for tests and offline runs. Accepted batches are
/// recorded as open PRs, so later polls see them until a test flips them.
#[derive(Debug, Clone, Default)]
pub struct MockApiClient {
    state: Arc<Mutex<MockState>>,
}

impl MockApiClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_notes(notes: Vec<NoteRecord>) -> Self {
        let client = Self::new();
        client.set_notes(notes);
        client
    }

    fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn set_notes(&self, notes: Vec<NoteRecord>) {
        let mut state = self.state();
        state.notes = notes;
        state.notes_error = None;
    }

    pub fn fail_notes(&self, detail: impl Into<String>) {
        self.state().notes_error = Some(detail.into());
    }

    pub fn fail_submitted_prs(&self, detail: impl Into<String>) {
        self.state().prs_error = Some(detail.into());
    }

    pub fn add_pr(&self, record: SubmittedPrRecord) {
        let mut state = self.state();
        state.prs.retain(|existing| existing.pr_number != record.pr_number);
        state.prs.push(record);
    }

    pub fn set_pr_status(&self, pr_number: u64, status: RemotePrStatus) {
        let mut state = self.state();
        if let Some(record) = state
            .prs
            .iter_mut()
            .find(|record| record.pr_number == pr_number)
        {
            record.status = status;
        }
    }

    pub fn queue_submit_response(&self, response: SubmitBatchResponse) {
        self.state().submit_results.push_back(Ok(response));
    }

    pub fn queue_submit_error(&self, detail: impl Into<String>) {
        self.state().submit_results.push_back(Err(detail.into()));
    }

    /// Queues one chat reply, delivered as the given chunks.
    pub fn queue_chat(&self, chunks: Vec<String>) {
        self.state().chat_responses.push_back(chunks);
    }

    pub fn submissions(&self) -> Vec<SubmitBatchRequest> {
        self.state().submissions.clone()
    }

    pub fn chat_messages(&self) -> Vec<String> {
        self.state().chat_messages.clone()
    }

    pub fn refresh_calls(&self) -> usize {
        self.state().refresh_calls
    }

    pub fn pr_fetches(&self) -> usize {
        self.state().pr_fetches
    }
}

#[async_trait]
impl KnowledgeBackend for MockApiClient {
    async fn fetch_notes(&self) -> Result<Vec<NoteRecord>, ApiError> {
        let state = self.state();
        match &state.notes_error {
            Some(detail) => Err(ApiError::Mock(detail.clone())),
            None => Ok(state.notes.clone()),
        }
    }

    async fn refresh_notes(&self) -> Result<(), ApiError> {
        self.state().refresh_calls += 1;
        Ok(())
    }

    async fn fetch_submitted_prs(&self) -> Result<Vec<SubmittedPrRecord>, ApiError> {
        let mut state = self.state();
        state.pr_fetches += 1;
        match &state.prs_error {
            Some(detail) => Err(ApiError::Mock(detail.clone())),
            None => Ok(state.prs.clone()),
        }
    }

    async fn submit_batch(
        &self,
        request: &SubmitBatchRequest,
    ) -> Result<SubmitBatchResponse, ApiError> {
        let mut state = self.state();
        state.submissions.push(request.clone());
        let result = match state.submit_results.pop_front() {
            Some(result) => result,
            None => {
                state.next_pr_number += 1;
                let pr_number = state.next_pr_number;
                Ok(SubmitBatchResponse {
                    pr_url: format!("https://github.com/example/kb/pull/{pr_number}"),
                    pr_number,
                    branch: format!("kb/batch-{pr_number}"),
                    files_changed: Some(request.changes.len()),
                })
            }
        };

        let response = result.map_err(|detail| ApiError::Backend {
            status: 500,
            detail,
        })?;
        let record = SubmittedPrRecord {
            pr_number: response.pr_number,
            pr_url: response.pr_url.clone(),
            status: RemotePrStatus::Open,
            submitted_at: String::new(),
            branch: response.branch.clone(),
            files: request
                .changes
                .iter()
                .map(|change| change.path.clone())
                .collect(),
            merged_at: None,
            closed_at: None,
        };
        state.prs.retain(|existing| existing.pr_number != record.pr_number);
        state.prs.push(record);
        Ok(response)
    }

    async fn stream_chat(&self, message: &str) -> Result<ByteStream, ApiError> {
        let mut state = self.state();
        state.chat_messages.push(message.to_string());
        let chunks = state
            .chat_responses
            .pop_front()
            .ok_or_else(|| ApiError::Mock("MockApiClient: no chat response queued".to_string()))?;
        let items: Vec<Result<Bytes, ApiError>> =
            chunks.into_iter().map(|chunk| Ok(Bytes::from(chunk))).collect();
        Ok(Box::pin(stream::iter(items)))
    }
}
