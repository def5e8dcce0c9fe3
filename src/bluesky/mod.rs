//! Bluesky / AT Protocol integration module.
//!
//! This module contains the XRPC transport, the post record types and the
//! rich-text facet detection used when publishing posts.

mod api;
pub mod facets;
mod records;

pub use api::XrpcTransport;
pub use records::{
    ByteSlice, Facet, FacetFeature, PostRecord, ReplyRef, StrongRef, MAX_POST_GRAPHEMES,
    POST_COLLECTION,
};

pub(crate) use api::sanitize_for_logging;
