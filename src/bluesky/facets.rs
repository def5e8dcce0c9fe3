//! Rich-text facet detection.
//!
//! This module finds mentions, links and hashtags in post text and reports
//! their UTF-8 byte ranges. Mentions come back as handles; turning them into
//! DIDs needs the network and happens in the transport.

use regex::Regex;
use std::sync::OnceLock;
use url::Url;

use super::records::{ByteSlice, Facet, FacetFeature};

/// Longest tag accepted, in characters (without the leading `#`).
pub const MAX_TAG_LENGTH: usize = 64;

/// TLDs accepted for links written without a scheme ("example.com/page").
const BARE_LINK_TLDS: &[&str] = &[
    "ai", "app", "art", "au", "be", "blog", "br", "ca", "cc", "ch", "cloud", "co", "com", "de",
    "dev", "es", "eu", "fi", "fm", "fr", "gg", "gov", "in", "info", "io", "it", "jp", "ly", "me",
    "net", "news", "nl", "no", "nz", "org", "rs", "pub", "se", "site", "social", "tech", "tv", "uk",
    "us", "xyz",
];

/// Characters that end a hashtag.
const TAG_BREAKERS: &[char] = &[
    '\u{00AD}', '\u{2060}', '\u{200A}', '\u{200B}', '\u{200C}', '\u{200D}', '\u{20E2}',
];

/// A facet found in text, before mention resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectedFacet {
    pub index: ByteSlice,
    pub kind: DetectedKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DetectedKind {
    /// Handle without the leading `@`
    Mention(String),
    Link(String),
    /// Tag without the leading `#`
    Tag(String),
}

impl DetectedFacet {
    /// Converts links and tags directly. Mentions need a DID, so they are
    /// converted through [`DetectedFacet::into_mention_facet`] instead.
    pub fn into_facet(self) -> Option<Facet> {
        let feature = match self.kind {
            DetectedKind::Link(uri) => FacetFeature::Link { uri },
            DetectedKind::Tag(tag) => FacetFeature::Tag { tag },
            DetectedKind::Mention(_) => return None,
        };
        Some(Facet {
            index: self.index,
            features: vec![feature],
        })
    }

    pub fn into_mention_facet(self, did: impl Into<String>) -> Facet {
        Facet {
            index: self.index,
            features: vec![FacetFeature::Mention { did: did.into() }],
        }
    }
}

// Each pattern must be preceded by start of text, whitespace or (for
// mentions and links) an opening parenthesis.
fn mention_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s|\()(@)([a-zA-Z0-9.-]+)\b").ok())
        .as_ref()
}

fn link_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)(^|\s|\()((?:https?://\S+)|(?:[a-z][a-z0-9]*(?:\.[a-z0-9]+)+\S*))").ok()
    })
    .as_ref()
}

fn tag_regex() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(^|\s)([#＃])(\S+)").ok())
        .as_ref()
}

/// Finds every mention, link and tag in `text`, ordered by byte offset.
///
/// ```rust
/// use skythread::bluesky::facets::{detect, DetectedKind};
///
/// let found = detect("hi @alice.bsky.social see example.com #rust");
/// assert_eq!(found.len(), 3);
/// assert_eq!(found[0].kind, DetectedKind::Mention("alice.bsky.social".into()));
/// assert_eq!(found[1].kind, DetectedKind::Link("https://example.com".into()));
/// assert_eq!(found[2].kind, DetectedKind::Tag("rust".into()));
/// ```
pub fn detect(text: &str) -> Vec<DetectedFacet> {
    let mut found = Vec::new();
    found.extend(detect_mentions(text));
    found.extend(detect_links(text));
    found.extend(detect_tags(text));
    found.sort_by_key(|facet| facet.index.byte_start);
    found
}

fn detect_mentions(text: &str) -> Vec<DetectedFacet> {
    let Some(re) = mention_regex() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|cap| {
            let at = cap.get(2)?;
            let handle = cap.get(3)?;
            if !is_valid_handle(handle.as_str()) {
                return None;
            }
            Some(DetectedFacet {
                index: ByteSlice {
                    byte_start: at.start(),
                    byte_end: handle.end(),
                },
                kind: DetectedKind::Mention(handle.as_str().to_string()),
            })
        })
        .collect()
}

fn detect_links(text: &str) -> Vec<DetectedFacet> {
    let Some(re) = link_regex() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|cap| {
            let matched = cap.get(2)?;
            let start = matched.start();
            let mut candidate = matched.as_str();

            if candidate.ends_with(['.', ',', ';', ':', '!', '?']) {
                candidate = &candidate[..candidate.len() - 1];
            }
            if candidate.ends_with(')') && !candidate.contains('(') {
                candidate = &candidate[..candidate.len() - 1];
            }

            let lowered = candidate.to_ascii_lowercase();
            let uri = if lowered.starts_with("http://") || lowered.starts_with("https://") {
                candidate.to_string()
            } else {
                let domain = candidate
                    .split(['/', '?', '#'])
                    .next()
                    .unwrap_or(candidate);
                if !has_known_tld(domain) {
                    return None;
                }
                format!("https://{}", candidate)
            };

            let parsed = Url::parse(&uri).ok()?;
            parsed.host_str()?;

            Some(DetectedFacet {
                index: ByteSlice {
                    byte_start: start,
                    byte_end: start + candidate.len(),
                },
                kind: DetectedKind::Link(uri),
            })
        })
        .collect()
}

fn detect_tags(text: &str) -> Vec<DetectedFacet> {
    let Some(re) = tag_regex() else {
        return Vec::new();
    };
    re.captures_iter(text)
        .filter_map(|cap| {
            let hash = cap.get(2)?;
            let body = cap.get(3)?.as_str();

            if body.starts_with('\u{FE0F}') {
                return None;
            }
            let body = match body.find(TAG_BREAKERS) {
                Some(cut) => &body[..cut],
                None => body,
            };
            let tag = body
                .trim_end_matches(|c: char| c.is_ascii_punctuation() || is_general_punctuation(c));

            if tag.is_empty()
                || tag.chars().all(|c| c.is_ascii_digit())
                || tag.chars().count() > MAX_TAG_LENGTH
            {
                return None;
            }

            Some(DetectedFacet {
                index: ByteSlice {
                    byte_start: hash.start(),
                    byte_end: hash.end() + tag.len(),
                },
                kind: DetectedKind::Tag(tag.to_string()),
            })
        })
        .collect()
}

/// Punctuation outside ASCII that commonly trails a tag ("#rust。", "#rust…").
fn is_general_punctuation(c: char) -> bool {
    matches!(
        c,
        '\u{2010}'..='\u{2027}' | '\u{3001}' | '\u{3002}' | '\u{FF01}' | '\u{FF0C}' | '\u{FF1F}'
    )
}

/// Syntactic handle check: a domain name with at least two labels and an
/// alphabetic TLD.
pub fn is_valid_handle(handle: &str) -> bool {
    if handle.len() > 253 {
        return false;
    }
    let labels: Vec<&str> = handle.split('.').collect();
    if labels.len() < 2 {
        return false;
    }
    let labels_ok = labels.iter().all(|label| {
        !label.is_empty()
            && label.len() <= 63
            && !label.starts_with('-')
            && !label.ends_with('-')
            && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
    });
    let tld_ok = labels
        .last()
        .map(|tld| tld.chars().next().is_some_and(|c| c.is_ascii_alphabetic()))
        .unwrap_or(false);
    labels_ok && tld_ok
}

fn has_known_tld(domain: &str) -> bool {
    domain
        .rsplit('.')
        .next()
        .map(|tld| BARE_LINK_TLDS.contains(&tld.to_ascii_lowercase().as_str()))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slice(text: &str, facet: &DetectedFacet) -> String {
        text[facet.index.byte_start..facet.index.byte_end].to_string()
    }

    #[test]
    fn test_mentions_cover_the_at_sign_and_handle() {
        let text = "thanks @alice.bsky.social and (@bob.example.com)";
        let found = detect(text);
        assert_eq!(found.len(), 2);
        assert_eq!(slice(text, &found[0]), "@alice.bsky.social");
        assert_eq!(slice(text, &found[1]), "@bob.example.com");
    }

    #[test]
    fn test_mentions_ignore_trailing_period_and_emails() {
        let text = "ping @carol.bsky.social. or mail me@example.com";
        let found: Vec<_> = detect(text)
            .into_iter()
            .filter(|f| matches!(f.kind, DetectedKind::Mention(_)))
            .collect();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DetectedKind::Mention("carol.bsky.social".into()));
    }

    #[test]
    fn test_mentions_require_a_domain() {
        assert!(detect("hello @alice").is_empty());
        assert!(!is_valid_handle("alice"));
        assert!(!is_valid_handle("-bad.com"));
        assert!(!is_valid_handle("alice.123"));
        assert!(is_valid_handle("alice.bsky.social"));
    }

    #[test]
    fn test_links_with_scheme_strip_trailing_punctuation() {
        let text = "read https://example.com/post?id=1. now";
        let found = detect(text);
        assert_eq!(found.len(), 1);
        assert_eq!(
            found[0].kind,
            DetectedKind::Link("https://example.com/post?id=1".into())
        );
        assert_eq!(slice(text, &found[0]), "https://example.com/post?id=1");
    }

    #[test]
    fn test_links_inside_parentheses() {
        let text = "(see https://example.com/a)";
        let found = detect(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DetectedKind::Link("https://example.com/a".into()));

        let wiki = "https://en.wikipedia.org/wiki/Rust_(programming_language)";
        let found = detect(wiki);
        assert_eq!(found[0].kind, DetectedKind::Link(wiki.into()));
    }

    #[test]
    fn test_bare_links_need_known_tld() {
        let found = detect("go to docs.rs/regex");
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].kind, DetectedKind::Link("https://docs.rs/regex".into()));

        assert!(detect("open notes.txt please").is_empty());
        assert!(detect("i.e. this").is_empty());
    }

    #[test]
    fn test_tags() {
        let text = "shipping #rust, #100 and ＃日本語!";
        let found = detect(text);
        let tags: Vec<_> = found
            .iter()
            .filter_map(|f| match &f.kind {
                DetectedKind::Tag(tag) => Some(tag.clone()),
                _ => None,
            })
            .collect();
        assert_eq!(tags, vec!["rust".to_string(), "日本語".to_string()]);

        let japanese = found.last().unwrap();
        assert_eq!(slice(text, japanese), "＃日本語");
    }

    #[test]
    fn test_tags_stop_at_zero_width_space_and_length_limit() {
        let found = detect("#rust\u{200B}lang");
        assert_eq!(found[0].kind, DetectedKind::Tag("rust".into()));

        let long = format!("#{}", "a".repeat(MAX_TAG_LENGTH + 1));
        assert!(detect(&long).is_empty());
        assert!(detect("a#notatag").is_empty());
    }

    #[test]
    fn test_byte_offsets_after_multibyte_text() {
        let text = "héllo 👋 https://example.com";
        let found = detect(text);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index.byte_start, "héllo 👋 ".len());
        assert_eq!(found[0].index.byte_end, text.len());
    }

    #[test]
    fn test_facets_are_sorted() {
        let text = "#first https://example.com @dan.bsky.social";
        let starts: Vec<_> = detect(text).iter().map(|f| f.index.byte_start).collect();
        let mut sorted = starts.clone();
        sorted.sort();
        assert_eq!(starts, sorted);
        assert_eq!(starts.len(), 3);
    }
}
