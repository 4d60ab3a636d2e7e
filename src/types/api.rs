use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest<'a> {
    pub message: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoteRecord {
    pub path: String,
    pub title: String,
    #[serde(default)]
    pub topic: String,
    #[serde(default)]
    pub content: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NotesResponse {
    #[serde(default)]
    pub notes: Vec<NoteRecord>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchChange {
    pub path: String,
    pub title: String,
    pub content: String,
    #[serde(default)]
    pub is_new: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBatchRequest {
    pub changes: Vec<BatchChange>,
    pub pr_title: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmitBatchResponse {
    pub pr_url: String,
    pub pr_number: u64,
    pub branch: String,
    #[serde(default)]
    pub files_changed: Option<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RemotePrStatus {
    Open,
    Merged,
    Closed,
    #[serde(other)]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubmittedPrRecord {
    pub pr_number: u64,
    #[serde(default)]
    pub pr_url: String,
    pub status: RemotePrStatus,
    #[serde(default)]
    pub submitted_at: String,
    #[serde(default)]
    pub branch: String,
    #[serde(default)]
    pub files: Vec<String>,
    #[serde(default)]
    pub merged_at: Option<String>,
    #[serde(default)]
    pub closed_at: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmittedPrsResponse {
    #[serde(default)]
    pub prs: Vec<SubmittedPrRecord>,
}

/// Error body returned by the backend. `detail` is a plain message for handled
/// failures and a list of field errors for request validation failures.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorPayload {
    pub detail: serde_json::Value,
}

impl ErrorPayload {
    pub fn message(&self) -> String {
        match &self.detail {
            serde_json::Value::String(text) => text.clone(),
            other => other.to_string(),
        }
    }
}
