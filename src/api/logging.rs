use crate::util::parse_bool_flag;
use serde_json::Value;

const DEBUG_PAYLOAD_ENV: &str = "KB_DEBUG_PAYLOAD";

pub fn debug_payload_enabled() -> bool {
    std::env::var(DEBUG_PAYLOAD_ENV)
        .ok()
        .and_then(parse_bool_flag)
        .unwrap_or(false)
}

pub fn emit_debug_payload(request_url: &str, payload: &Value) {
    let formatted_payload = serde_json::to_string_pretty(payload)
        .unwrap_or_else(|_| "<payload serialization error>".to_string());
    tracing::debug!(url = request_url, "request payload:\n{formatted_payload}");
}

pub fn emit_error_body(request_url: &str, status: u16, body: &str) {
    tracing::debug!(url = request_url, status, "error response body:\n{body}");
}
