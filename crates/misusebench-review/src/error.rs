//! Transport error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised by review-site uploads
///
/// A transport error aborts the remaining upload slices of the current run;
/// it never crosses entity boundaries.
#[derive(Debug, Error)]
pub enum TransportError {
    /// Request could not be sent at all
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// Server answered with a non-success status
    #[error("{status} {reason}: {body}")]
    Status {
        status: u16,
        reason: String,
        body: String,
    },

    /// An attachment could not be read
    #[error("cannot attach {path}: {source}")]
    Attachment {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl TransportError {
    /// HTTP status code, when the server answered
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Request(err) => err.status().map(|status| status.as_u16()),
            Self::Attachment { .. } => None,
        }
    }
}
