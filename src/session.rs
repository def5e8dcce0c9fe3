//! Session management.
//!
//! The [`SessionManager`] owns the single authenticated session used for
//! publishing. Sessions live in memory only and are dropped on logout.

use log::{debug, error, info, warn};
use std::fmt;
use std::sync::Arc;

use crate::config::mask_secret;
use crate::error::AuthError;
use crate::notify::Notifier;
use crate::transport::Transport;

/// Notification shown when login is attempted without credentials.
pub const MISSING_CREDENTIALS_NOTICE: &str =
    "Please set your Bluesky identifier and app password in the settings first.";

/// Account identifier and app password.
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Credentials {
    pub identifier: String,
    pub secret: String,
}

impl Credentials {
    pub fn new(identifier: impl Into<String>, secret: impl Into<String>) -> Self {
        Credentials {
            identifier: identifier.into(),
            secret: secret.into(),
        }
    }

    /// Both halves present after trimming. The secret itself is sent as
    /// given; only the identifier is trimmed before login.
    pub fn is_complete(&self) -> bool {
        !self.identifier.trim().is_empty() && !self.secret.trim().is_empty()
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("identifier", &self.identifier)
            .field("secret", &"[REDACTED]")
            .finish()
    }
}

/// An authenticated session on the PDS.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    /// Account DID; posts are written to this repository
    pub did: String,
    pub handle: String,
    pub access_jwt: String,
    pub refresh_jwt: String,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("did", &self.did)
            .field("handle", &self.handle)
            .field("access_jwt", &mask_secret(&self.access_jwt))
            .field("refresh_jwt", &mask_secret(&self.refresh_jwt))
            .finish()
    }
}

/// Owns authentication state against the remote service.
pub struct SessionManager {
    transport: Arc<dyn Transport>,
    notifier: Arc<dyn Notifier>,
    session: Option<Session>,
}

impl SessionManager {
    pub fn new(transport: Arc<dyn Transport>, notifier: Arc<dyn Notifier>) -> Self {
        SessionManager {
            transport,
            notifier,
            session: None,
        }
    }

    /// Logs in with `credentials`, replacing any existing session.
    ///
    /// # Errors
    ///
    /// - [`AuthError::MissingCredentials`] when the identifier or secret is
    ///   blank. No request is made and the user is notified first.
    /// - [`AuthError::RemoteAuthFailure`] when the service rejects the
    ///   credentials or cannot be reached.
    pub async fn login(&mut self, credentials: &Credentials) -> Result<&Session, AuthError> {
        if !credentials.is_complete() {
            warn!("Login attempted without a complete identifier/app password pair");
            self.notifier.notify(MISSING_CREDENTIALS_NOTICE);
            return Err(AuthError::MissingCredentials);
        }

        let identifier = credentials.identifier.trim();
        info!("Logging in as {}", identifier);

        match self
            .transport
            .authenticate(identifier, &credentials.secret)
            .await
        {
            Ok(session) => {
                info!("Logged in as {} ({})", session.handle, session.did);
                debug!("Session: {:?}", session);
                Ok(self.session.insert(session))
            }
            Err(e) => {
                error!("Login failed for {}: {}", identifier, e);
                Err(AuthError::RemoteAuthFailure(e))
            }
        }
    }

    /// Exchanges the current session's refresh token for a new session.
    ///
    /// Only runs when asked to; nothing in the crate refreshes on its own.
    pub async fn refresh(&mut self) -> Result<&Session, AuthError> {
        let current = self.session.as_ref().ok_or(AuthError::NotLoggedIn)?;
        info!("Refreshing session for {}", current.handle);

        match self.transport.refresh_session(current).await {
            Ok(session) => {
                info!("Session refreshed for {}", session.handle);
                Ok(self.session.insert(session))
            }
            Err(e) => {
                error!("Session refresh failed: {}", e);
                Err(AuthError::RemoteAuthFailure(e))
            }
        }
    }

    pub fn current_session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_logged_in(&self) -> bool {
        self.session.is_some()
    }

    /// The current session, or [`AuthError::NotLoggedIn`].
    pub fn require_session(&self) -> Result<&Session, AuthError> {
        self.session.as_ref().ok_or(AuthError::NotLoggedIn)
    }

    /// Drops the in-memory session.
    pub fn logout(&mut self) {
        if let Some(session) = self.session.take() {
            info!("Logged out {}", session.handle);
        }
    }
}
