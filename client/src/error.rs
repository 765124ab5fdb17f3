//! Error types for the todo API client.
//!
//! # Design
//! `NotFound` and `BadRequest` get dedicated variants because callers act on
//! them (drop a stale item, show the validation message). Every other
//! unexpected status lands in `HttpError` with the raw body for debugging.

/// Errors returned by `TodoClient` methods.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The server returned 404 — the requested todo does not exist.
    #[error("resource not found")]
    NotFound,

    /// The server rejected the input; carries the server's message.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The server returned any other unexpected status.
    #[error("HTTP {status}: {body}")]
    HttpError { status: u16, body: String },

    /// The response body could not be deserialized into the expected type.
    #[error("deserialization failed: {0}")]
    DeserializationError(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    SerializationError(String),
}
