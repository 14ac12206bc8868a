// Shared HTTP response types for consistent API error payloads.

#[derive(Debug, serde::Serialize)]
pub struct ErrorResponse {
    // Same text a WebSocket client would get in an `error` frame.
    pub error: String,
}
