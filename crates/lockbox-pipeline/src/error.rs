//! Pipeline error types

use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// Request never produced an HTTP response (connect, timeout, body read).
    #[error("error sending {operation} request to simulator: {message}")]
    Transport { operation: String, message: String },

    /// The simulator answered with a status other than the one the protocol
    /// promises for this operation. The body is kept verbatim; simulator
    /// error bodies are the only diagnostic available.
    #[error("{operation} returned status {status}, expected {expected}: {body}")]
    StatusMismatch {
        operation: String,
        status: u16,
        expected: u16,
        body: String,
    },

    /// A response (or an opaque state blob inside one) failed to parse.
    #[error("{0}")]
    Decode(String),

    /// A pipeline stage was invoked before the stage it depends on.
    /// Raised locally, before any request is sent.
    #[error("{0}")]
    PreconditionNotMet(String),

    /// The simulator created a different number of assets than requested.
    #[error("expected createdigitalasset to create {expected} assets, got {actual}")]
    AssetCountMismatch { expected: usize, actual: usize },

    /// Request-object response carried no login URL.
    #[error("requestobject response carried no login url")]
    EmptyLoginUrl,

    /// Request-object response carried a login URL that does not parse.
    #[error("requestobject returned an unparseable login url: {0}")]
    MalformedLoginUrl(String),

    /// A basic-profile login URL is missing the configured locale.
    #[error("login url ui_locales {actual:?} does not match configured locale {expected:?}")]
    LocaleMismatch {
        expected: String,
        actual: Option<String>,
    },

    #[error(transparent)]
    Auth(#[from] myam_auth::Error),

    /// A wrapped failure annotated with the pipeline stage it came from.
    #[error("{stage}: {source}")]
    Stage {
        stage: &'static str,
        #[source]
        source: Box<Error>,
    },
}

impl Error {
    /// Annotate an error with the pipeline stage that produced it.
    pub fn stage(stage: &'static str, source: Error) -> Self {
        Error::Stage {
            stage,
            source: Box::new(source),
        }
    }

    /// True for an HTTP 504 from the simulator, the one status the lockbox
    /// recovery loop retries.
    pub fn is_gateway_timeout(&self) -> bool {
        match self {
            Error::StatusMismatch { status: 504, .. } => true,
            Error::Stage { source, .. } => source.is_gateway_timeout(),
            _ => false,
        }
    }
}
