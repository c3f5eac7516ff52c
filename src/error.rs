//! Typed errors for the HTTP seam and for individual bulk items.
//!
//! Command and orchestrator code works with `anyhow::Result`; these enums exist
//! where callers need to tell failures apart (tests, per-item reports).

use thiserror::Error;

/// Failure of a single control plane call
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("error connecting to {url}: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {url} failed with {status}: {message}")]
    Status {
        method: String,
        url: String,
        status: u16,
        message: &'static str,
        body: String,
    },

    #[error("invalid url: {0}")]
    InvalidUrl(String),
}

impl InvokeError {
    /// HTTP status of the failed call, if the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            InvokeError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Human readable text for the control plane's error statuses
pub fn status_message(status: u16) -> &'static str {
    match status {
        400 => "Bad Request - malformed request syntax",
        401 => "Unauthorized - the client must authenticate itself",
        403 => "Forbidden - the client does not have access rights",
        404 => "Not found - the server cannot find the requested resource",
        405 => "Method Not Allowed - the request method is not supported by the target resource",
        409 => "Conflict - request conflicts with the current state of the server",
        415 => "Unsupported media type - media format of the requested data is not supported by the server",
        429 => "Too Many Request - user has sent too many requests",
        500 => "Internal server error",
        501 => "Not Implemented - request method is not supported by the server",
        502 => "Bad Gateway",
        503 => "Service Unavailable - the server is not ready to handle the request",
        504 => "Gateway Timeout",
        _ => "unknown error",
    }
}

/// Failure of one item inside a bulk job. Never aborts the job.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Invoke(#[from] InvokeError),

    #[error("malformed payload: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("response is missing '{0}'")]
    MissingField(&'static str),

    #[error("developer id was not found")]
    MissingDeveloperId,

    #[error("developer '{0}' was not imported into the destination org")]
    UnresolvedDeveloper(String),

    #[error("worker task failed: {0}")]
    Task(String),
}
