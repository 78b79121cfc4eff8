//! Error taxonomy for the request path and model services.
//!
//! Every error a handler can produce maps to exactly one HTTP status code via
//! [`ServiceError::status`]. Handlers catch these at the routing boundary and
//! serialize them as `{"error": "<message>"}` — a fault in a service layer
//! must never terminate the connection.

use thiserror::Error;

/// Errors surfaced by parsing, validation, and the model services.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Request headers or body shape could not be parsed.
    #[error("{0}")]
    MalformedRequest(String),

    /// A required field was empty or missing.
    #[error("{0}")]
    InvalidInput(String),

    /// No usable backend exists for the requested service, or its one-time
    /// model load failed earlier in the process lifetime.
    #[error("{0}")]
    ServiceUnavailable(String),

    /// The embedding backend failed at runtime.
    #[error("Embedding failed: {0}")]
    EncodingFailed(String),

    /// The transcription backend failed at runtime.
    #[error("Transcription failed: {0}")]
    TranscriptionFailed(String),

    /// No route matched the request method and path.
    #[error("Endpoint not found")]
    NotFound,
}

impl ServiceError {
    /// HTTP status code this error maps to at the handler boundary.
    pub fn status(&self) -> u16 {
        match self {
            ServiceError::MalformedRequest(_) | ServiceError::InvalidInput(_) => 400,
            ServiceError::NotFound => 404,
            ServiceError::ServiceUnavailable(_) => 503,
            ServiceError::EncodingFailed(_) | ServiceError::TranscriptionFailed(_) => 500,
        }
    }
}
