//! Transport abstraction for the remote publishing service.
//!
//! The Session Manager and the Thread Publisher only talk to the PDS through
//! this trait. [`XrpcTransport`](crate::bluesky::XrpcTransport) is the HTTP
//! implementation; tests plug in a recording mock.

use async_trait::async_trait;

use crate::bluesky::{Facet, PostRecord, StrongRef};
use crate::error::TransportError;
use crate::session::Session;

/// Result type for transport operations.
pub type Result<T> = std::result::Result<T, TransportError>;

/// Remote operations needed to log in and publish posts.
///
/// Implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Exchange an identifier and app password for a session.
    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Session>;

    /// Exchange the session's refresh token for a fresh session.
    async fn refresh_session(&self, session: &Session) -> Result<Session>;

    /// Store a post record in the session's repository.
    async fn submit_record(&self, session: &Session, record: &PostRecord) -> Result<StrongRef>;

    /// Detect rich-text facets in `text`, resolving mentions to DIDs.
    ///
    /// May perform network lookups. Callers treat failures as non-fatal.
    async fn detect_facets(&self, session: &Session, text: &str) -> Result<Vec<Facet>>;
}
