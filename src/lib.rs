//! # Skythread Library
//!
//! Compose and publish Bluesky posts, including multi-post threads, over the
//! AT Protocol. A thread is published as a reply chain: every post after the
//! first replies to its predecessor and names the first post as the thread
//! root.
//!
//! ## Features
//!
//! - Session management against a PDS (`com.atproto.server.createSession`)
//! - Sequential thread publishing with partial-failure reporting
//! - Rich-text facet detection (mentions, links, hashtags)
//! - Settings persistence with optional encryption of the app password
//! - HTTP service and command-line front ends
//! - Structured logging
//!
//! ## Configuration
//!
//! - `BSKY_SERVICE`: PDS base URL (defaults to `https://bsky.social`)
//! - `BSKY_IDENTIFIER` / `BSKY_APP_PASSWORD`: fallback credentials
//! - `SKYTHREAD_SETTINGS_PATH`: settings file location
//! - `SKYTHREAD_ENCRYPTION_KEY`: 64 hex chars, encrypts the stored app password
//! - `SKYTHREAD_HTTP_TIMEOUT_SECS`: XRPC request timeout
//! - `PORT`: Server port (defaults to 3000)
//!
//! ## Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use skythread::{Credentials, LogNotifier, SessionManager, ThreadPublisher, XrpcTransport};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
//!     let transport = Arc::new(XrpcTransport::new("https://bsky.social")?);
//!     let notifier = Arc::new(LogNotifier);
//!
//!     let mut sessions = SessionManager::new(transport.clone(), notifier.clone());
//!     let session = sessions
//!         .login(&Credentials::new("alice.bsky.social", "app-password"))
//!         .await?
//!         .clone();
//!
//!     let mut publisher = ThreadPublisher::new(transport, notifier);
//!     let report = publisher
//!         .publish(&["Root post", "Reply one", "Reply two"], &session)
//!         .await?;
//!     println!("Thread root: {}", report.root.uri);
//!     Ok(())
//! }
//! ```

pub mod bluesky;
pub mod composer;
pub mod config;
pub mod crypto;
pub mod error;
pub mod handlers;
pub mod notify;
pub mod session;
pub mod settings;
pub mod thread;
pub mod transport;

// Re-export commonly used types and functions
pub use bluesky::{Facet, PostRecord, ReplyRef, StrongRef, XrpcTransport, MAX_POST_GRAPHEMES};
pub use composer::Composer;
pub use config::{get_server_port, ServiceConfig};
pub use crypto::validate_encryption_config;
pub use error::{AuthError, Error, PublishError, SettingsError, TransportError};
pub use handlers::{router, AppState};
pub use notify::{CollectingNotifier, LogNotifier, Notifier};
pub use session::{Credentials, Session, SessionManager};
pub use settings::{FileSettingsStore, MemorySettingsStore, Settings, SettingsStore};
pub use thread::{PublishReport, PublishState, ThreadPublisher};
pub use transport::Transport;
