use crate::types::{DraftEvent, SurfaceEvent};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::de::DeserializeOwned;
use serde_json::Value;

const SURFACE_KIND: &str = "SURFACE";
const DRAFT_KIND: &str = "DRAFT";
const MARKER_OPENERS: [&str; 2] = ["<!--SURFACE:", "<!--DRAFT:"];
const MARKER_CLOSER: &str = "-->";

static MARKER_OPENER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"<!--(SURFACE|DRAFT):").expect("marker pattern must compile"));

/// Display text with every complete marker removed, plus the events those
/// markers carried, in stream order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedStream {
    pub clean_text: String,
    pub surface_events: Vec<SurfaceEvent>,
    pub draft_events: Vec<DraftEvent>,
}

/// Parses the full accumulated chat text.
///
/// The payload after an opener is read as one JSON value, so `-->` inside a
/// JSON string does not end the marker. A marker whose JSON does not parse is
/// stripped up to the next `-->`; the event is logged and dropped. An opener
/// whose JSON or closer has not arrived yet hides everything after it.
pub fn parse_stream_text(text: &str) -> ParsedStream {
    let mut parsed = ParsedStream::default();
    let mut cursor = 0usize;

    while let Some(caps) = MARKER_OPENER_RE.captures(&text[cursor..]) {
        let (Some(opener), Some(kind)) = (caps.get(0), caps.get(1)) else {
            break;
        };
        let start = cursor + opener.start();
        let payload_start = cursor + opener.end();
        parsed.clean_text.push_str(&text[cursor..start]);

        let Some(marker) = scan_marker(&text[payload_start..]) else {
            return parsed;
        };
        cursor = payload_start + marker.end;

        match kind.as_str() {
            SURFACE_KIND => match decode_payload::<SurfaceEvent>(marker.payload) {
                Ok(event) => parsed.surface_events.push(event),
                Err(error) => log_malformed_marker(SURFACE_KIND, &error),
            },
            DRAFT_KIND => match decode_payload::<DraftEvent>(marker.payload) {
                Ok(event) => parsed.draft_events.push(event),
                Err(error) => log_malformed_marker(DRAFT_KIND, &error),
            },
            _ => {}
        }
    }

    parsed.clean_text.push_str(&text[cursor..]);
    parsed
}

enum MarkerPayload<'a> {
    Json(Value),
    Raw(&'a str),
}

struct ScannedMarker<'a> {
    payload: MarkerPayload<'a>,
    /// Byte offset just past the closing `-->`, relative to the payload start.
    end: usize,
}

/// Finds where the marker body starting at `rest` ends. `None` means the
/// marker is still incomplete.
fn scan_marker(rest: &str) -> Option<ScannedMarker<'_>> {
    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<Value>();
    match values.next() {
        Some(Ok(value)) => {
            let json_end = values.byte_offset();
            let after = &rest[json_end..];
            let gap = after.len() - after.trim_start().len();
            let tail = &after[gap..];
            if tail.starts_with(MARKER_CLOSER) {
                return Some(ScannedMarker {
                    payload: MarkerPayload::Json(value),
                    end: json_end + gap + MARKER_CLOSER.len(),
                });
            }
            // The closer may still be on its way.
            if MARKER_CLOSER.starts_with(tail) {
                return None;
            }
        }
        Some(Err(error)) if error.is_eof() => return None,
        _ => {}
    }

    let close = rest.find(MARKER_CLOSER)?;
    Some(ScannedMarker {
        payload: MarkerPayload::Raw(rest[..close].trim()),
        end: close + MARKER_CLOSER.len(),
    })
}

fn decode_payload<T: DeserializeOwned>(payload: MarkerPayload<'_>) -> serde_json::Result<T> {
    match payload {
        MarkerPayload::Json(value) => serde_json::from_value(value),
        MarkerPayload::Raw(raw) => serde_json::from_str(raw),
    }
}

fn log_malformed_marker(kind: &str, error: &serde_json::Error) {
    tracing::warn!(marker = kind, error = %error, "skipping malformed stream marker");
}

/// Length of the longest suffix of `text` that could still grow into a marker opener.
fn partial_opener_len(text: &str) -> usize {
    MARKER_OPENERS
        .iter()
        .copied()
        .flat_map(|opener| (1..opener.len()).map(move |len| &opener[..len]))
        .filter(|prefix| text.ends_with(prefix))
        .map(str::len)
        .max()
        .unwrap_or(0)
}

/// What changed after feeding one chunk: the full display text so far and the
/// events that completed since the previous update.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamUpdate {
    pub clean_text: String,
    pub surface_events: Vec<SurfaceEvent>,
    pub draft_events: Vec<DraftEvent>,
}

/// Accumulates one chat turn and re-parses the whole buffer on every chunk.
#[derive(Debug, Default)]
pub struct ChatStreamAccumulator {
    text: String,
    carry: Vec<u8>,
    delivered_surface: usize,
    delivered_draft: usize,
}

impl ChatStreamAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_bytes(&mut self, chunk: &[u8]) -> StreamUpdate {
        self.carry.extend_from_slice(chunk);
        self.decode_carry();
        self.update(true)
    }

    /// Final parse once the stream ends. Trailing partial openers become visible
    /// text again and any dangling UTF-8 bytes are decoded lossily.
    pub fn finish(&mut self) -> StreamUpdate {
        self.flush_carry_lossy();
        self.update(false)
    }

    fn decode_carry(&mut self) {
        loop {
            match std::str::from_utf8(&self.carry) {
                Ok(decoded) => {
                    self.text.push_str(decoded);
                    self.carry.clear();
                    return;
                }
                Err(error) => {
                    let valid = error.valid_up_to();
                    if let Ok(prefix) = std::str::from_utf8(&self.carry[..valid]) {
                        self.text.push_str(prefix);
                    }
                    match error.error_len() {
                        // Incomplete sequence at the end: wait for the next chunk.
                        None => {
                            self.carry.drain(..valid);
                            return;
                        }
                        Some(invalid_len) => {
                            self.text.push(char::REPLACEMENT_CHARACTER);
                            self.carry.drain(..valid + invalid_len);
                        }
                    }
                }
            }
        }
    }

    fn flush_carry_lossy(&mut self) {
        if !self.carry.is_empty() {
            self.text.push_str(&String::from_utf8_lossy(&self.carry));
            self.carry.clear();
        }
    }

    fn update(&mut self, streaming: bool) -> StreamUpdate {
        let parsed = parse_stream_text(&self.text);
        let mut clean_text = parsed.clean_text;
        if streaming {
            let hidden = partial_opener_len(&clean_text);
            clean_text.truncate(clean_text.len() - hidden);
        }

        let surface_events: Vec<SurfaceEvent> = parsed
            .surface_events
            .into_iter()
            .skip(self.delivered_surface)
            .collect();
        let draft_events: Vec<DraftEvent> = parsed
            .draft_events
            .into_iter()
            .skip(self.delivered_draft)
            .collect();
        self.delivered_surface += surface_events.len();
        self.delivered_draft += draft_events.len();

        StreamUpdate {
            clean_text,
            surface_events,
            draft_events,
        }
    }
}
