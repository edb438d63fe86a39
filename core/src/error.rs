//! Error types for request dispatch.
//!
//! # Design
//! Every variant names the stage that failed. Errors never escape
//! `RequestBuilder::dispatch`; they are recorded in the `Outcome` next to
//! whatever body and status were captured before the failure, so a request
//! that never reached the server can be told apart from one that returned
//! an empty body. Reasons are stored as strings to keep the type `Clone`:
//! one outcome is handed both to the completion callback and to the
//! dispatch handle.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// The target URL could not be parsed.
    #[error("invalid url `{url}`: {reason}")]
    InvalidUrl { url: String, reason: String },

    /// A POST was dispatched with the request body disabled.
    #[error("request body is disabled but the method requires one")]
    BodyNotAllowed,

    /// The host could not be resolved or the connection was refused.
    #[error("connection failed: {0}")]
    Connect(String),

    /// Writing the request or reading the status line failed.
    #[error("transport error: {0}")]
    Transport(String),

    /// The response body could not be read to the end.
    #[error("failed to read response body: {0}")]
    Read(String),

    /// The worker pool no longer accepts jobs.
    #[error("worker pool is shut down")]
    WorkerPoolClosed,
}

impl From<ureq::Error> for RequestError {
    fn from(err: ureq::Error) -> Self {
        match err {
            ureq::Error::BadUri(reason) => RequestError::InvalidUrl {
                url: String::new(),
                reason,
            },
            ureq::Error::HostNotFound | ureq::Error::ConnectionFailed => {
                RequestError::Connect(err.to_string())
            }
            ureq::Error::Io(io) => match io.kind() {
                std::io::ErrorKind::ConnectionRefused
                | std::io::ErrorKind::ConnectionReset
                | std::io::ErrorKind::NotFound => RequestError::Connect(io.to_string()),
                _ => RequestError::Transport(io.to_string()),
            },
            other => RequestError::Transport(other.to_string()),
        }
    }
}
