pub mod client;
pub mod logging;
pub mod mock_client;
pub mod stream;

pub use client::ApiClient;
pub use mock_client::MockApiClient;

use crate::types::{NoteRecord, SubmitBatchRequest, SubmitBatchResponse, SubmittedPrRecord};
use async_trait::async_trait;
use bytes::Bytes;
use futures::Stream;
use std::pin::Pin;
use thiserror::Error;

pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, ApiError>> + Send>>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("cannot reach knowledge base API at '{url}': {source}. Start the backend or update KB_API_URL.")]
    Unreachable {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("request to '{url}' timed out")]
    Timeout { url: String },
    /// Backend rejected the request; `detail` is shown to the user as-is.
    #[error("{detail}")]
    Backend { status: u16, detail: String },
    #[error("unexpected response from '{url}': {message}")]
    Decode { url: String, message: String },
    #[error("request to '{url}' failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("{0}")]
    Mock(String),
}

/// The knowledge-base service: note listing, chat and pull request endpoints.
#[async_trait]
pub trait KnowledgeBackend: Send + Sync {
    async fn fetch_notes(&self) -> Result<Vec<NoteRecord>, ApiError>;

    /// Asks the backend to drop its cached note list so the next fetch is fresh.
    async fn refresh_notes(&self) -> Result<(), ApiError>;

    async fn fetch_submitted_prs(&self) -> Result<Vec<SubmittedPrRecord>, ApiError>;

    async fn submit_batch(
        &self,
        request: &SubmitBatchRequest,
    ) -> Result<SubmitBatchResponse, ApiError>;

    /// Streams the agent's plain-text reply, markers included.
    async fn stream_chat(&self, message: &str) -> Result<ByteStream, ApiError>;
}
