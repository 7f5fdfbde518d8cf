//! Client error types

use thiserror::Error;

/// Errors produced by the server client.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Transport-level failure (connect, timeout, TLS, body read)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The server answered with a non-success status
    #[error("server returned status {status}: {message}")]
    Api { status: u16, message: String },

    /// The server answered 2xx but the body did not match the expected shape
    #[error("invalid server response: {message}")]
    InvalidResponse { message: String },

    /// Failed to decode a response body
    #[error("failed to decode server response: {0}")]
    Decode(#[from] serde_json::Error),

    /// A plugin type outside the server's enumeration
    #[error("unknown plugin type '{value}' (expected auth, database, or secret)")]
    InvalidPluginType { value: String },
}

impl ClientError {
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }

    /// Whether the server rejected a write because the endpoint is
    /// immutable once created. The server only signals this through its
    /// error message, hence the substring match.
    pub fn is_overwrite_prohibited(&self) -> bool {
        matches!(self, Self::Api { message, .. } if message.contains("delete them before reconfiguring"))
    }
}
