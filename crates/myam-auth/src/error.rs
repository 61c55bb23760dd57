//! Error types for the MyAM login walk

use thiserror::Error;

/// Errors from PKCE generation and the authentication walk.
#[derive(Error, Debug)]
pub enum Error {
    #[error("secure random source unavailable: {0}")]
    Random(String),

    #[error("failed to build HTTP client: {0}")]
    Http(String),

    #[error("request to {operation} failed: {message}")]
    Transport { operation: String, message: String },

    #[error("{operation} endpoint returned {status}: {body}")]
    AuthorizeFailed {
        operation: String,
        status: u16,
        body: String,
    },

    #[error("invalid redirect target from {operation}: {location}")]
    MalformedRedirect { operation: String, location: String },

    #[error("redirect loop while calling {0}")]
    TooManyRedirects(String),

    #[error("no authorization code obtained after completing all login steps")]
    NoAuthCode,
}

/// Result alias for auth operations.
pub type Result<T> = std::result::Result<T, Error>;
