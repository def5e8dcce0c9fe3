//! Segment editor model.
//!
//! The [`Composer`] holds the posts being written and enforces the editor
//! rules: every segment is capped at the post length limit, segments can only
//! be added once the first one has content, and publishing needs a non-blank
//! first segment. It is the piece every front end drives.

use log::{info, warn};
use std::sync::Arc;
use unicode_segmentation::UnicodeSegmentation;

use crate::bluesky::MAX_POST_GRAPHEMES;
use crate::error::{AuthError, Error, PublishError, Result};
use crate::notify::Notifier;
use crate::session::SessionManager;
use crate::settings::SettingsStore;
use crate::thread::{plan_thread, PublishReport, ThreadPublisher};

/// Posts being composed.
pub struct Composer {
    segments: Vec<String>,
    notifier: Arc<dyn Notifier>,
}

impl Composer {
    /// A composer with a single empty segment.
    pub fn new(notifier: Arc<dyn Notifier>) -> Self {
        Composer {
            segments: vec![String::new()],
            notifier,
        }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    /// Replaces the text of segment `index`, cut to the post length limit.
    ///
    /// Returns `false` if there is no such segment.
    pub fn update_segment(&mut self, index: usize, text: &str) -> bool {
        match self.segments.get_mut(index) {
            Some(segment) => {
                *segment = cap_graphemes(text, MAX_POST_GRAPHEMES);
                true
            }
            None => false,
        }
    }

    pub fn can_add_segment(&self) -> bool {
        self.root_has_content()
    }

    /// Appends an empty segment when allowed.
    pub fn add_segment(&mut self) -> bool {
        if !self.can_add_segment() {
            return false;
        }
        self.segments.push(String::new());
        true
    }

    /// Removes segment `index`, keeping at least one segment.
    pub fn remove_segment(&mut self, index: usize) -> bool {
        if self.segments.len() <= 1 || index >= self.segments.len() {
            return false;
        }
        self.segments.remove(index);
        true
    }

    pub fn can_publish(&self) -> bool {
        self.root_has_content() && self.segments.iter().any(|s| !s.trim().is_empty())
    }

    /// Resets to a single empty segment.
    pub fn clear(&mut self) {
        self.segments = vec![String::new()];
    }

    fn root_has_content(&self) -> bool {
        self.segments
            .first()
            .is_some_and(|root| !root.trim().is_empty())
    }

    /// Publishes the composed segments.
    ///
    /// Logs in with the stored settings when there is no session yet. On
    /// success the segments are cleared; on failure one notification carries
    /// the error message and the segments are left as they were.
    pub async fn publish(
        &mut self,
        sessions: &mut SessionManager,
        publisher: &mut ThreadPublisher,
        settings: &dyn SettingsStore,
    ) -> Result<PublishReport> {
        match self.try_publish(sessions, publisher, settings).await {
            Ok(report) => {
                info!("Composer published {} post(s)", report.posts.len());
                self.clear();
                Ok(report)
            }
            Err(e) => {
                // The session manager already explained missing credentials.
                if !matches!(e, Error::Auth(AuthError::MissingCredentials)) {
                    self.notifier.notify(&e.to_string());
                }
                Err(e)
            }
        }
    }

    async fn try_publish(
        &self,
        sessions: &mut SessionManager,
        publisher: &mut ThreadPublisher,
        settings: &dyn SettingsStore,
    ) -> Result<PublishReport> {
        if !self.can_publish() {
            warn!("Publish requested with a blank first post");
            return Err(PublishError::BlankRoot.into());
        }
        plan_thread(&self.segments)?;

        let existing = sessions.current_session().cloned();
        let session = match existing {
            Some(session) => session,
            None => {
                let credentials = settings.load()?.credentials();
                sessions.login(&credentials).await?.clone()
            }
        };

        Ok(publisher.publish(&self.segments, &session).await?)
    }
}

/// Cuts `text` to at most `max` graphemes.
fn cap_graphemes(text: &str, max: usize) -> String {
    match text.grapheme_indices(true).nth(max) {
        Some((cut, _)) => text[..cut].to_string(),
        None => text.to_string(),
    }
}
