//! Error types for the provider clients.

use thiserror::Error;

/// Errors from the image generation collaborator.
#[derive(Debug, Error)]
pub enum GenerationError {
    /// Transport-level failure, including timeouts.
    #[error("generation request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("generation API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 200 but the payload was not usable.
    #[error("malformed generation response: {0}")]
    MalformedResponse(String),
}

/// Errors from the posting collaborator.
#[derive(Debug, Error)]
pub enum PostError {
    /// Transport-level failure, including timeouts.
    #[error("post request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The API answered with a non-success status.
    #[error("posting API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// The API answered 200 but the payload was not usable.
    #[error("malformed posting response: {0}")]
    MalformedResponse(String),
}
