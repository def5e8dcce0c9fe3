//! Configuration module for the skythread service.
//!
//! This module contains configuration structures and environment variable handling
//! for the Bluesky / AT Protocol integration.

use log::{debug, info, warn};
use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::session::Credentials;

/// Default PDS used when `BSKY_SERVICE` is not set.
pub const DEFAULT_SERVICE: &str = "https://bsky.social";

/// Default location of the settings file.
pub const DEFAULT_SETTINGS_PATH: &str = "skythread-settings.json";

/// Default client-level timeout for XRPC calls, in seconds.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Configuration for talking to a Bluesky PDS.
///
/// Credentials in the environment are optional: the settings store is the
/// usual source, the environment only overrides it for headless use.
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Base URL of the PDS, without a trailing slash
    pub service: String,
    /// Client-level timeout applied to every request
    pub http_timeout: Duration,
    /// Identifier (handle, DID or email) from `BSKY_IDENTIFIER`
    pub identifier: Option<String>,
    /// App password from `BSKY_APP_PASSWORD`
    pub app_password: Option<String>,
    /// Path of the JSON settings file
    pub settings_path: PathBuf,
}

impl ServiceConfig {
    /// Loads the configuration from environment variables.
    ///
    /// # Environment Variables
    ///
    /// - `BSKY_SERVICE`: PDS base URL (defaults to `https://bsky.social`)
    /// - `BSKY_IDENTIFIER`: account identifier used when no settings are stored
    /// - `BSKY_APP_PASSWORD`: app password used when no settings are stored
    /// - `SKYTHREAD_SETTINGS_PATH`: settings file (defaults to `skythread-settings.json`)
    /// - `SKYTHREAD_HTTP_TIMEOUT_SECS`: request timeout (defaults to 30)
    ///
    /// # Example
    ///
    /// ```rust
    /// use skythread::ServiceConfig;
    ///
    /// let config = ServiceConfig::from_env();
    /// assert!(config.service.starts_with("http"));
    /// ```
    pub fn from_env() -> Self {
        info!("Loading Bluesky configuration from environment variables");

        let service = match env::var("BSKY_SERVICE") {
            Ok(url) if !url.trim().is_empty() => {
                info!("Using PDS from BSKY_SERVICE: {}", url.trim());
                url.trim().trim_end_matches('/').to_string()
            }
            _ => {
                info!("No BSKY_SERVICE set, defaulting to {}", DEFAULT_SERVICE);
                DEFAULT_SERVICE.to_string()
            }
        };

        let identifier = non_empty_var("BSKY_IDENTIFIER");
        match &identifier {
            Some(id) => info!("Found BSKY_IDENTIFIER: {}", id),
            None => debug!("No BSKY_IDENTIFIER found in environment variables"),
        }

        let app_password = non_empty_var("BSKY_APP_PASSWORD");
        match &app_password {
            Some(password) => debug!("App password (masked): {}", mask_secret(password)),
            None => debug!("No BSKY_APP_PASSWORD found in environment variables"),
        }

        if identifier.is_some() != app_password.is_some() {
            warn!("Only one of BSKY_IDENTIFIER / BSKY_APP_PASSWORD is set - environment credentials will be ignored");
        }

        let settings_path = non_empty_var("SKYTHREAD_SETTINGS_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_SETTINGS_PATH));

        let http_timeout = match env::var("SKYTHREAD_HTTP_TIMEOUT_SECS") {
            Ok(raw) => match raw.trim().parse::<u64>() {
                Ok(secs) if secs > 0 => Duration::from_secs(secs),
                _ => {
                    warn!(
                        "Ignoring invalid SKYTHREAD_HTTP_TIMEOUT_SECS '{}', using {}s",
                        raw, DEFAULT_HTTP_TIMEOUT_SECS
                    );
                    Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
                }
            },
            Err(_) => Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
        };

        ServiceConfig {
            service,
            http_timeout,
            identifier,
            app_password,
            settings_path,
        }
    }

    /// Credentials from the environment, when both halves are present.
    pub fn env_credentials(&self) -> Option<Credentials> {
        match (&self.identifier, &self.app_password) {
            (Some(identifier), Some(secret)) => Some(Credentials::new(identifier, secret)),
            _ => None,
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        ServiceConfig {
            service: DEFAULT_SERVICE.to_string(),
            http_timeout: Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS),
            identifier: None,
            app_password: None,
            settings_path: PathBuf::from(DEFAULT_SETTINGS_PATH),
        }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|value| !value.trim().is_empty())
}

/// Masks a secret for logging, keeping at most a short prefix and suffix.
///
/// Short secrets are reduced to `...` so nothing usable leaks into logs.
///
/// ```rust
/// use skythread::config::mask_secret;
///
/// assert_eq!(mask_secret("abcdefgh12345678zzzz"), "abcd...zzzz");
/// assert_eq!(mask_secret("short"), "...");
/// ```
pub fn mask_secret(secret: &str) -> String {
    let chars: Vec<char> = secret.chars().collect();
    if chars.len() > 16 {
        let prefix: String = chars[..4].iter().collect();
        let suffix: String = chars[chars.len() - 4..].iter().collect();
        format!("{}...{}", prefix, suffix)
    } else if chars.len() > 8 {
        let prefix: String = chars[..2].iter().collect();
        format!("{}...", prefix)
    } else {
        "...".to_string()
    }
}

/// Gets the server port from environment variables or returns the default.
///
/// This function reads the `PORT` environment variable and parses it as a u16.
/// If the environment variable is not set or cannot be parsed, it defaults to 3000.
///
/// # Example
///
/// ```rust
/// use skythread::get_server_port;
///
/// // With no PORT set
/// let port = get_server_port(); // Returns 3000
/// ```
pub fn get_server_port() -> u16 {
    match env::var("PORT") {
        Ok(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("PORT '{}' is not a valid port number, using 3000", raw);
            3000
        }),
        Err(_) => 3000,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_secret_lengths() {
        assert_eq!(mask_secret("abcdefgh12345678zzzz"), "abcd...zzzz");
        assert_eq!(mask_secret("abcdefghij"), "ab...");
        assert_eq!(mask_secret("abcd"), "...");
        assert_eq!(mask_secret(""), "...");
    }

    #[test]
    fn test_env_credentials_need_both_halves() {
        let mut config = ServiceConfig {
            identifier: Some("alice.bsky.social".to_string()),
            ..ServiceConfig::default()
        };
        assert!(config.env_credentials().is_none());

        config.app_password = Some("app-pass".to_string());
        let credentials = config.env_credentials().unwrap();
        assert_eq!(credentials.identifier, "alice.bsky.social");
        assert_eq!(credentials.secret, "app-pass");
    }

    #[test]
    fn test_from_env_service_and_timeout() {
        env::set_var("BSKY_SERVICE", " https://pds.example.com/ ");
        env::set_var("SKYTHREAD_HTTP_TIMEOUT_SECS", "0");
        let config = ServiceConfig::from_env();
        assert_eq!(config.service, "https://pds.example.com");
        assert_eq!(
            config.http_timeout,
            Duration::from_secs(DEFAULT_HTTP_TIMEOUT_SECS)
        );

        env::remove_var("BSKY_SERVICE");
        env::set_var("SKYTHREAD_HTTP_TIMEOUT_SECS", "5");
        let config = ServiceConfig::from_env();
        assert_eq!(config.service, DEFAULT_SERVICE);
        assert_eq!(config.http_timeout, Duration::from_secs(5));
        env::remove_var("SKYTHREAD_HTTP_TIMEOUT_SECS");
    }
}
