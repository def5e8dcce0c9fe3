//! XRPC client for a Bluesky PDS.
//!
//! This module contains the HTTP [`Transport`] implementation: session
//! creation and refresh, record creation, and handle resolution for mention
//! facets. Every call goes through [`XrpcTransport::send`], which logs the
//! exchange and turns XRPC error bodies into [`TransportError::Xrpc`].

use async_trait::async_trait;
use log::{debug, error, info, warn};
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::json;
use url::Url;

use super::facets::{self, DetectedKind};
use super::records::{Facet, PostRecord, StrongRef, POST_COLLECTION};
use crate::config::ServiceConfig;
use crate::error::TransportError;
use crate::session::Session;
use crate::transport::{Result, Transport};

/// Sanitizes text for safe logging by truncating and escaping control characters.
///
/// This function:
/// - Truncates long text to prevent log flooding
/// - Replaces control characters that could manipulate log output
/// - Escapes newlines to prevent log injection
pub(crate) fn sanitize_for_logging(text: &str, max_len: usize) -> String {
    let sanitized: String = text
        .chars()
        .map(|c| match c {
            '\n' | '\r' | '\t' => ' ',
            c if c.is_control() => '?',
            c => c,
        })
        .collect();

    match sanitized.char_indices().nth(max_len) {
        Some((cut, _)) => format!(
            "{}... [truncated, {} total bytes]",
            &sanitized[..cut],
            text.len()
        ),
        None => sanitized,
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SessionResponse {
    did: String,
    handle: String,
    access_jwt: String,
    refresh_jwt: String,
}

impl From<SessionResponse> for Session {
    fn from(response: SessionResponse) -> Self {
        Session {
            did: response.did,
            handle: response.handle,
            access_jwt: response.access_jwt,
            refresh_jwt: response.refresh_jwt,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ResolveHandleResponse {
    did: String,
}

#[derive(Debug, Default, Deserialize)]
struct XrpcErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

/// [`Transport`] speaking XRPC over HTTPS to a PDS.
#[derive(Debug, Clone)]
pub struct XrpcTransport {
    client: Client,
    service: Url,
}

impl XrpcTransport {
    /// Creates a transport for the PDS at `service` (e.g. `https://bsky.social`).
    pub fn new(service: &str) -> Result<Self> {
        Self::with_client(service, Client::new())
    }

    /// Creates a transport from the loaded configuration, applying its timeout.
    pub fn from_config(config: &ServiceConfig) -> Result<Self> {
        let client = Client::builder().timeout(config.http_timeout).build()?;
        Self::with_client(&config.service, client)
    }

    pub fn with_client(service: &str, client: Client) -> Result<Self> {
        let mut service = Url::parse(service.trim())
            .map_err(|e| TransportError::InvalidUrl(format!("{}: {}", service, e)))?;
        if !matches!(service.scheme(), "http" | "https") {
            return Err(TransportError::InvalidUrl(format!(
                "{}: scheme must be http or https",
                service
            )));
        }
        if !service.path().ends_with('/') {
            let path = format!("{}/", service.path());
            service.set_path(&path);
        }
        info!("XRPC transport targeting {}", service);
        Ok(XrpcTransport { client, service })
    }

    fn endpoint(&self, nsid: &str) -> Result<Url> {
        self.service
            .join(&format!("xrpc/{}", nsid))
            .map_err(|e| TransportError::InvalidUrl(e.to_string()))
    }

    /// Sends a prepared request and decodes the JSON response.
    ///
    /// Non-success statuses are decoded as XRPC error bodies when possible.
    async fn send<T: DeserializeOwned>(
        &self,
        request_builder: RequestBuilder,
        operation_name: &str,
    ) -> Result<T> {
        debug!("Sending XRPC request for operation: {}", operation_name);

        let response = request_builder.send().await.map_err(|e| {
            error!("Request for '{}' did not complete: {}", operation_name, e);
            TransportError::Network(e)
        })?;

        let status = response.status();
        debug!(
            "Received response with status: {} for operation: {}",
            status, operation_name
        );

        let response_text = response.text().await?;

        if status.is_success() {
            debug!(
                "Response summary for '{}': {} bytes received",
                operation_name,
                response_text.len()
            );
            return Ok(serde_json::from_str(&response_text)?);
        }

        let body: XrpcErrorBody = serde_json::from_str(&response_text).unwrap_or_default();
        warn!("Operation '{}' failed - Status: {}", operation_name, status);
        debug!(
            "Error response for '{}': {}",
            operation_name,
            sanitize_for_logging(&response_text, 200)
        );

        Err(TransportError::Xrpc {
            status: status.as_u16(),
            error: body
                .error
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown").to_string()),
            message: body.message.unwrap_or_else(|| sanitize_for_logging(&response_text, 200)),
        })
    }

    /// Resolves a handle to a DID.
    ///
    /// Returns `Ok(None)` when the server answers that the handle does not
    /// resolve; transport failures are errors.
    pub async fn resolve_handle(&self, session: &Session, handle: &str) -> Result<Option<String>> {
        let url = self.endpoint("com.atproto.identity.resolveHandle")?;
        let request_builder = self
            .client
            .get(url)
            .bearer_auth(&session.access_jwt)
            .query(&[("handle", handle)]);

        match self
            .send::<ResolveHandleResponse>(request_builder, "resolve_handle")
            .await
        {
            Ok(resolved) => {
                debug!("Resolved @{} to {}", handle, resolved.did);
                Ok(Some(resolved.did))
            }
            Err(TransportError::Xrpc { status: 400, .. }) => {
                info!("Handle @{} does not resolve, skipping mention", handle);
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl Transport for XrpcTransport {
    async fn authenticate(&self, identifier: &str, secret: &str) -> Result<Session> {
        info!("Creating session for {}", identifier);
        let url = self.endpoint("com.atproto.server.createSession")?;
        let payload = json!({
            "identifier": identifier,
            "password": secret,
        });
        debug!("Request payload: {{\"identifier\": \"{}\", \"password\": [REDACTED]}}", identifier);

        let request_builder = self.client.post(url).json(&payload);
        let response: SessionResponse = self.send(request_builder, "create_session").await?;
        Ok(response.into())
    }

    async fn refresh_session(&self, session: &Session) -> Result<Session> {
        info!("Refreshing session for {}", session.handle);
        let url = self.endpoint("com.atproto.server.refreshSession")?;
        let request_builder = self.client.post(url).bearer_auth(&session.refresh_jwt);
        let response: SessionResponse = self.send(request_builder, "refresh_session").await?;
        Ok(response.into())
    }

    async fn submit_record(&self, session: &Session, record: &PostRecord) -> Result<StrongRef> {
        let url = self.endpoint("com.atproto.repo.createRecord")?;
        let payload = json!({
            "repo": session.did,
            "collection": POST_COLLECTION,
            "record": record,
        });
        debug!(
            "Request payload: {}",
            sanitize_for_logging(&payload.to_string(), 500)
        );

        let request_builder = self
            .client
            .post(url)
            .bearer_auth(&session.access_jwt)
            .json(&payload);

        let created: StrongRef = self.send(request_builder, "create_record").await?;
        info!("Created record {}", created.uri);
        Ok(created)
    }

    async fn detect_facets(&self, session: &Session, text: &str) -> Result<Vec<Facet>> {
        let mut facets = Vec::new();

        for detected in facets::detect(text) {
            let handle = match &detected.kind {
                DetectedKind::Mention(handle) => Some(handle.clone()),
                _ => None,
            };
            match handle {
                Some(handle) => {
                    if let Some(did) = self.resolve_handle(session, &handle).await? {
                        facets.push(detected.into_mention_facet(did));
                    }
                }
                None => facets.extend(detected.into_facet()),
            }
        }

        debug!("Detected {} facet(s)", facets.len());
        Ok(facets)
    }
}
