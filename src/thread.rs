//! Thread publishing.
//!
//! The [`ThreadPublisher`] turns an ordered list of post bodies into a reply
//! chain on the PDS. Posts are submitted one at a time; every post after the
//! first replies to its predecessor and names the first post as thread root.

use log::{debug, error, info, warn};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use unicode_segmentation::UnicodeSegmentation;

use crate::bluesky::{
    sanitize_for_logging, Facet, PostRecord, ReplyRef, StrongRef, MAX_POST_GRAPHEMES,
};
use crate::error::PublishError;
use crate::notify::Notifier;
use crate::session::Session;
use crate::transport::Transport;

/// Progress of the current (or last) publish invocation.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum PublishState {
    #[default]
    Idle,
    /// Working on the segment at this input index
    Publishing(usize),
    Succeeded,
    Failed { index: usize, reason: String },
}

/// Outcome of a successful publish.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishReport {
    /// Reference of the first post
    pub root: StrongRef,
    /// References of every published post, in thread order
    pub posts: Vec<StrongRef>,
}

impl PublishReport {
    pub fn is_thread(&self) -> bool {
        self.posts.len() > 1
    }
}

/// Number of extended grapheme clusters in `text`, the unit of the post
/// length limit.
pub fn grapheme_len(text: &str) -> usize {
    text.graphemes(true).count()
}

/// Checks the segments and returns the ones to publish with their input
/// indices.
///
/// Blank segments after the first are skipped. Nothing is truncated: an
/// oversized segment rejects the whole thread.
pub fn plan_thread<S: AsRef<str>>(segments: &[S]) -> Result<Vec<(usize, &str)>, PublishError> {
    let root = segments.first().ok_or(PublishError::EmptyThread)?;
    if root.as_ref().trim().is_empty() {
        return Err(PublishError::BlankRoot);
    }

    let mut plan = Vec::with_capacity(segments.len());
    for (index, segment) in segments.iter().enumerate() {
        let text = segment.as_ref();
        if text.trim().is_empty() {
            debug!("Skipping blank segment {}", index);
            continue;
        }
        let length = grapheme_len(text);
        if length > MAX_POST_GRAPHEMES {
            return Err(PublishError::SegmentTooLong {
                index,
                length,
                max: MAX_POST_GRAPHEMES,
            });
        }
        plan.push((index, text));
    }
    Ok(plan)
}

/// Publishes posts and threads through a [`Transport`].
pub struct ThreadPublisher {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    state: PublishState,
}

impl ThreadPublisher {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>) -> Self {
        ThreadPublisher {
            transport,
            notifier,
            state: PublishState::Idle,
        }
    }

    pub fn state(&self) -> &PublishState {
        &self.state
    }

    /// Publishes a single post without reply metadata.
    pub async fn publish_single(
        &mut self,
        text: &str,
        session: &Session,
    ) -> Result<StrongRef, PublishError> {
        let report = self.publish(&[text], session).await?;
        Ok(report.root)
    }

    /// Publishes `segments` as one post (one segment) or a reply chain.
    ///
    /// # Errors
    ///
    /// - [`PublishError::EmptyThread`], [`PublishError::BlankRoot`] and
    ///   [`PublishError::SegmentTooLong`] before anything is sent.
    /// - [`PublishError::Submission`] when a post fails; posts already
    ///   published stay published and are listed in the error.
    pub async fn publish<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        session: &Session,
    ) -> Result<PublishReport, PublishError> {
        self.publish_with_cancel(segments, session, &CancellationToken::new())
            .await
    }

    /// Like [`ThreadPublisher::publish`], checking `cancel` before each
    /// submission. A submission already sent is never interrupted.
    pub async fn publish_with_cancel<S: AsRef<str>>(
        &mut self,
        segments: &[S],
        session: &Session,
        cancel: &CancellationToken,
    ) -> Result<PublishReport, PublishError> {
        self.state = PublishState::Idle;

        let plan = plan_thread(segments).map_err(|e| {
            warn!("Refusing to publish: {}", e);
            e
        })?;
        let total = plan.len();
        if total == 1 {
            info!("Publishing a single post as {}", session.handle);
        } else {
            info!("Publishing a thread of {} posts as {}", total, session.handle);
        }

        let mut published: Vec<StrongRef> = Vec::with_capacity(total);
        let mut root: Option<StrongRef> = None;
        let mut previous: Option<StrongRef> = None;

        for (position, (index, text)) in plan.into_iter().enumerate() {
            self.state = PublishState::Publishing(index);
            info!(
                "Publishing post {}/{}: '{}'",
                position + 1,
                total,
                sanitize_for_logging(text, 80)
            );

            let facets = self.detect_facets(session, text).await;
            let reply = match (&root, &previous) {
                (Some(root), Some(parent)) => Some(ReplyRef {
                    root: root.clone(),
                    parent: parent.clone(),
                }),
                _ => None,
            };
            let record = PostRecord::new(text, facets, reply);

            if cancel.is_cancelled() {
                warn!(
                    "Publishing cancelled before post {} ({} already published)",
                    index + 1,
                    published.len()
                );
                self.state = PublishState::Failed {
                    index,
                    reason: "cancelled".to_string(),
                };
                return Err(PublishError::Cancelled { published });
            }

            match self.transport.submit_record(session, &record).await {
                Ok(reference) => {
                    debug!(
                        "Post {} stored as {} ({})",
                        index + 1,
                        reference.uri,
                        reference.cid
                    );
                    if root.is_none() {
                        root = Some(reference.clone());
                    }
                    previous = Some(reference.clone());
                    published.push(reference);
                }
                Err(source) => {
                    error!(
                        "Failed to publish post {} ({} already published): {}",
                        index + 1,
                        published.len(),
                        source
                    );
                    self.state = PublishState::Failed {
                        index,
                        reason: source.to_string(),
                    };
                    return Err(PublishError::Submission {
                        index,
                        published,
                        source,
                    });
                }
            }
        }

        // plan_thread never returns an empty plan, so the root is set here.
        let root = match root {
            Some(root) => root,
            None => return Err(PublishError::EmptyThread),
        };

        self.state = PublishState::Succeeded;
        let message = if published.len() == 1 {
            "Post published successfully.".to_string()
        } else {
            format!("Thread of {} posts published successfully.", published.len())
        };
        self.notifier.notify(&message);
        info!("Published {} post(s), root {}", published.len(), root.uri);

        Ok(PublishReport {
            root,
            posts: published,
        })
    }

    /// Facet detection never stops a publish: failures mean no facets.
    async fn detect_facets(&self, session: &Session, text: &str) -> Vec<Facet> {
        match self.transport.detect_facets(session, text).await {
            Ok(facets) => facets,
            Err(e) => {
                warn!("Facet detection failed, publishing without rich text: {}", e);
                Vec::new()
            }
        }
    }
}
