use super::logging::{debug_payload_enabled, emit_debug_payload, emit_error_body};
use super::{ApiError, ByteStream, KnowledgeBackend};
use crate::config::Config;
use crate::types::{
    ChatRequest, ErrorPayload, NoteRecord, NotesResponse, SubmitBatchRequest,
    SubmitBatchResponse, SubmittedPrRecord, SubmittedPrsResponse,
};
use crate::util::join_api_path;
use anyhow::{Context, Result};
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::time::Duration;

const NOTES_PATH: &str = "/api/notes";
const NOTES_REFRESH_PATH: &str = "/api/notes/refresh";
const CHAT_PATH: &str = "/api/chat";
const SUBMITTED_PRS_PATH: &str = "/api/submitted-prs";
const CONTRIBUTE_BATCH_PATH: &str = "/api/contribute-batch";

/// HTTP client for the knowledge-base backend.
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    api_url: String,
    request_timeout: Duration,
}

impl ApiClient {
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .build()
            .context("failed to build HTTP client")?;
        Ok(Self {
            http,
            api_url: config.api_url.clone(),
            request_timeout: config.request_timeout,
        })
    }

    fn url(&self, path: &str) -> String {
        join_api_path(&self.api_url, path)
    }

    /// Non-streaming calls carry the configured timeout; the chat stream does not.
    async fn send(&self, request: RequestBuilder, url: &str) -> Result<Response, ApiError> {
        request
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, url))
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let url = self.url(path);
        let response = self.send(self.http.get(&url), &url).await?;
        read_json(response, &url).await
    }
}

#[async_trait]
impl KnowledgeBackend for ApiClient {
    async fn fetch_notes(&self) -> Result<Vec<NoteRecord>, ApiError> {
        let response: NotesResponse = self.get_json(NOTES_PATH).await?;
        tracing::debug!(count = response.notes.len(), "fetched notes");
        Ok(response.notes)
    }

    async fn refresh_notes(&self) -> Result<(), ApiError> {
        let url = self.url(NOTES_REFRESH_PATH);
        let response = self.send(self.http.post(&url), &url).await?;
        ensure_success(response, &url).await
    }

    async fn fetch_submitted_prs(&self) -> Result<Vec<SubmittedPrRecord>, ApiError> {
        let response: SubmittedPrsResponse = self.get_json(SUBMITTED_PRS_PATH).await?;
        Ok(response.prs)
    }

    async fn submit_batch(
        &self,
        request: &SubmitBatchRequest,
    ) -> Result<SubmitBatchResponse, ApiError> {
        let url = self.url(CONTRIBUTE_BATCH_PATH);
        if debug_payload_enabled() {
            if let Ok(payload) = serde_json::to_value(request) {
                emit_debug_payload(&url, &payload);
            }
        }
        let response = self.send(self.http.post(&url).json(request), &url).await?;
        read_json(response, &url).await
    }

    async fn stream_chat(&self, message: &str) -> Result<ByteStream, ApiError> {
        let url = self.url(CHAT_PATH);
        let payload = ChatRequest { message };
        if debug_payload_enabled() {
            if let Ok(value) = serde_json::to_value(&payload) {
                emit_debug_payload(&url, &value);
            }
        }

        let response = self
            .http
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|error| map_api_request_error(error, &url))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(backend_error(&url, status, &body));
        }

        let url_for_stream = url.clone();
        let stream = response
            .bytes_stream()
            .map(move |item| item.map_err(|error| map_api_request_error(error, &url_for_stream)));
        Ok(Box::pin(stream))
    }
}

async fn read_json<T: DeserializeOwned>(response: Response, url: &str) -> Result<T, ApiError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|error| map_api_request_error(error, url))?;
    if !status.is_success() {
        return Err(backend_error(url, status, &body));
    }
    serde_json::from_str(&body).map_err(|error| ApiError::Decode {
        url: url.to_string(),
        message: error.to_string(),
    })
}

async fn ensure_success(response: Response, url: &str) -> Result<(), ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(());
    }
    let body = response.text().await.unwrap_or_default();
    Err(backend_error(url, status, &body))
}

/// Prefers the backend's `{"detail": ...}` message so it reaches the user verbatim.
fn backend_error(url: &str, status: StatusCode, body: &str) -> ApiError {
    emit_error_body(url, status.as_u16(), body);
    let detail = serde_json::from_str::<ErrorPayload>(body)
        .ok()
        .map(|payload| payload.message())
        .filter(|message| !message.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {status}")
            } else {
                trimmed.to_string()
            }
        });
    ApiError::Backend {
        status: status.as_u16(),
        detail,
    }
}

fn map_api_request_error(error: reqwest::Error, request_url: &str) -> ApiError {
    let url = request_url.to_string();
    if error.is_connect() {
        return ApiError::Unreachable { url, source: error };
    }
    if error.is_timeout() {
        return ApiError::Timeout { url };
    }
    if let Some(status) = error.status() {
        return ApiError::Backend {
            status: status.as_u16(),
            detail: format!("HTTP {status}"),
        };
    }
    if error.is_decode() {
        return ApiError::Decode {
            url,
            message: error.to_string(),
        };
    }
    ApiError::Transport { url, source: error }
}
