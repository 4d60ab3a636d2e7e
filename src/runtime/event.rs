use crate::api::ApiError;
use crate::state::PreparedBatch;
use crate::types::{NoteRecord, SubmitBatchResponse, SubmittedPrRecord};
use bytes::Bytes;

/// Results of background work, applied on the runtime loop in arrival order.
#[derive(Debug)]
pub enum AppEvent {
    NotesLoaded(Result<Vec<NoteRecord>, ApiError>),
    SubmittedPrsLoaded(Result<Vec<SubmittedPrRecord>, ApiError>),
    SubmitFinished {
        batch: PreparedBatch,
        result: Result<SubmitBatchResponse, ApiError>,
    },
    PrStatusesPolled(Result<Vec<SubmittedPrRecord>, ApiError>),
    ChatChunk { turn: u64, bytes: Bytes },
    ChatFinished { turn: u64 },
    ChatFailed { turn: u64, error: String },
}
