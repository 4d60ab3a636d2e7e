use serde::{Deserialize, Serialize};

/// Agent request to focus an existing note, optionally highlighting a passage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceEvent {
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub highlight_text: Option<String>,
    #[serde(default)]
    pub section_title: Option<String>,
}

/// Agent proposal of a full note body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftEvent {
    pub path: String,
    #[serde(default)]
    pub title: Option<String>,
    pub content: String,
    #[serde(default)]
    pub is_new: bool,
}
