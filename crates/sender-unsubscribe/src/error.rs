//! Error types for the unsubscribe workflow.
//!
//! Only caller-input and persistence problems are errors. Network outcomes
//! (timeouts, rejections, unsafe redirects) are reported as
//! [`UnsubscribeFailure`](crate::UnsubscribeFailure) values instead.

use database::{DatabaseError, ValidationError};
use thiserror::Error;

/// Errors returned by [`Unsubscriber`](crate::Unsubscriber).
#[derive(Debug, Error)]
pub enum UnsubscribeError {
    /// No valid address could be extracted from the sender.
    #[error("invalid sender email {email:?}: {source}")]
    InvalidSenderEmail {
        email: String,
        #[source]
        source: ValidationError,
    },

    /// Writing the sender status failed.
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// The HTTP client could not be built.
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),
}

/// Errors a transport reports for a single request.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The request did not complete in time.
    #[error("request timed out")]
    Timeout,

    /// Connection, TLS or protocol failure.
    #[error("request failed: {0}")]
    Failed(String),

    /// The host resolved to an address we refuse to contact.
    #[error("refusing to contact {0}")]
    UnsafeTarget(String),
}
