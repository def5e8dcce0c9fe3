//! AT Protocol record types used when publishing posts.
//!
//! These mirror the `app.bsky.feed.post` lexicon closely enough for the
//! fields this crate writes: text, creation time, rich-text facets and the
//! reply reference.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Collection NSID for posts.
pub const POST_COLLECTION: &str = "app.bsky.feed.post";

/// Maximum post length, in extended grapheme clusters.
pub const MAX_POST_GRAPHEMES: usize = 300;

/// Reference to a stored record: its AT URI and content hash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StrongRef {
    pub uri: String,
    pub cid: String,
}

/// Reply metadata attached to every non-root post of a thread.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRef {
    pub root: StrongRef,
    pub parent: StrongRef,
}

/// UTF-8 byte range of a facet within the post text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ByteSlice {
    pub byte_start: usize,
    pub byte_end: usize,
}

/// A single rich-text feature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "$type")]
pub enum FacetFeature {
    #[serde(rename = "app.bsky.richtext.facet#mention")]
    Mention { did: String },
    #[serde(rename = "app.bsky.richtext.facet#link")]
    Link { uri: String },
    #[serde(rename = "app.bsky.richtext.facet#tag")]
    Tag { tag: String },
}

/// Annotation of a byte range of the post text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Facet {
    pub index: ByteSlice,
    pub features: Vec<FacetFeature>,
}

/// An `app.bsky.feed.post` record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    #[serde(rename = "$type")]
    pub record_type: String,
    pub text: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub facets: Vec<Facet>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reply: Option<ReplyRef>,
}

impl PostRecord {
    /// Builds a post record stamped with the current time.
    pub fn new(text: impl Into<String>, facets: Vec<Facet>, reply: Option<ReplyRef>) -> Self {
        Self::at(text, facets, reply, Utc::now())
    }

    /// Builds a post record with an explicit creation time.
    pub fn at(
        text: impl Into<String>,
        facets: Vec<Facet>,
        reply: Option<ReplyRef>,
        created_at: DateTime<Utc>,
    ) -> Self {
        PostRecord {
            record_type: POST_COLLECTION.to_string(),
            text: text.into(),
            created_at: created_at.to_rfc3339_opts(SecondsFormat::Millis, true),
            facets,
            reply,
        }
    }
}
