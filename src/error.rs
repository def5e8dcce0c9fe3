//! Error types for skythread operations.
//!
//! The core components return typed errors so callers can tell local
//! validation failures from remote ones and report partial thread
//! publication.

use thiserror::Error;

use crate::bluesky::StrongRef;

/// Result type alias for adapter-level operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by a [`Transport`](crate::transport::Transport).
#[derive(Error, Debug)]
pub enum TransportError {
    /// The request never produced a response (DNS, TLS, connection reset...)
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered with an XRPC error body
    #[error("XRPC error ({status}) {error}: {message}")]
    Xrpc {
        status: u16,
        error: String,
        message: String,
    },

    /// The response body could not be decoded
    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// The configured service URL is unusable
    #[error("invalid service URL: {0}")]
    InvalidUrl(String),
}

/// Session Manager errors.
#[derive(Error, Debug)]
pub enum AuthError {
    #[error("missing credentials: set an identifier and an app password")]
    MissingCredentials,

    #[error("login failed: {0}")]
    RemoteAuthFailure(#[source] TransportError),

    #[error("not logged in")]
    NotLoggedIn,
}

/// Thread Publisher errors.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("nothing to publish: the thread has no segments")]
    EmptyThread,

    #[error("the first post of a thread cannot be blank")]
    BlankRoot,

    #[error("post {} is too long: {length} graphemes (max {max})", .index + 1)]
    SegmentTooLong {
        index: usize,
        length: usize,
        max: usize,
    },

    #[error("publishing cancelled after {} post(s)", .published.len())]
    Cancelled { published: Vec<StrongRef> },

    #[error("failed to publish post {} ({} already published): {source}", .index + 1, .published.len())]
    Submission {
        index: usize,
        published: Vec<StrongRef>,
        #[source]
        source: TransportError,
    },
}

impl PublishError {
    /// References of the posts that made it to the server before the failure.
    pub fn published(&self) -> &[StrongRef] {
        match self {
            PublishError::Cancelled { published } | PublishError::Submission { published, .. } => {
                published
            }
            _ => &[],
        }
    }
}

/// Settings store errors.
#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("settings file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("settings encryption error: {0}")]
    Crypto(String),
}

/// Top-level error for the composer and the front ends.
#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Publish(#[from] PublishError),

    #[error(transparent)]
    Settings(#[from] SettingsError),
}
