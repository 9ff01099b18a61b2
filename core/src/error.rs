//! Error types for the WebP Converter client.
//!
//! # Design
//! A 4xx/5xx whose body decodes into an `ErrorResponse` becomes `Api` and
//! carries the server's message verbatim. Any other non-2xx lands in
//! `HttpError` with the raw status and body for debugging. Client-side checks
//! (`MissingApiKey`, `Validation`, `InvalidFile`) always fire before any
//! network I/O.

use std::path::PathBuf;

use thiserror::Error;

use crate::validation::ValidationError;

/// Errors returned by `WebPConverterClient`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The client was constructed with an empty API key.
    #[error("API key is required. Get your API key at: https://apiverve.com")]
    MissingApiKey,

    /// The API key failed the optional shape check.
    #[error("{0}")]
    InvalidApiKey(&'static str),

    /// One or more request parameters broke the client-side rules.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The upload is of an unsupported type or too large.
    #[error("invalid file: {0}")]
    InvalidFile(String),

    /// The upload could not be read from disk.
    #[error("could not read file {}: {source}", .path.display())]
    File {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The request never produced a response (connect, TLS, timeout, ...).
    #[error("request failed: {0}")]
    Transport(String),

    /// The server answered non-2xx with a decodable error body.
    #[error("API error: {message}")]
    Api { status: u16, message: String },

    /// The server answered non-2xx and the body was not an error payload.
    #[error("API error: status {status}")]
    HttpError { status: u16, body: String },

    /// A 2xx body could not be deserialized into `Response`.
    #[error("failed to parse response: {0}")]
    Deserialization(String),

    /// The request payload could not be serialized to JSON.
    #[error("serialization failed: {0}")]
    Serialization(String),
}

impl ApiError {
    /// HTTP status attached to the error, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Api { status, .. } | ApiError::HttpError { status, .. } => Some(*status),
            _ => None,
        }
    }
}
