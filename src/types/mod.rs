mod api;
mod events;

pub use api::{
    BatchChange, ChatRequest, ErrorPayload, NoteRecord, NotesResponse, RemotePrStatus,
    SubmitBatchRequest, SubmitBatchResponse, SubmittedPrRecord, SubmittedPrsResponse,
};
pub use events::{DraftEvent, SurfaceEvent};
