//! HTTP route handlers for the skythread service.
//!
//! This module contains the HTTP front end: login state, settings and thread
//! publishing. Every JSON response carries a `status` field and the
//! notifications raised while serving the request under `notices`.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::{get, post},
    Router,
};
use log::{error, info, warn};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::error::{AuthError, PublishError, SettingsError};
use crate::notify::{CollectingNotifier, Notifier};
use crate::session::{Credentials, Session, SessionManager};
use crate::settings::{Settings, SettingsStore};
use crate::thread::{plan_thread, ThreadPublisher};
use crate::transport::Transport;

/// Shared state behind every route.
///
/// The mutexes serialize logins and publishes: there is one session and one
/// publishing flow per process.
pub struct AppState {
    pub sessions: Mutex<SessionManager>,
    pub publisher: Mutex<ThreadPublisher>,
    pub settings: Arc<dyn SettingsStore>,
    pub notices: Arc<CollectingNotifier>,
    /// Fallback credentials from the environment
    pub env_credentials: Option<Credentials>,
}

pub type SharedState = Arc<AppState>;

impl AppState {
    pub fn new(
        transport: Arc<dyn Transport>,
        settings: Arc<dyn SettingsStore>,
        env_credentials: Option<Credentials>,
    ) -> SharedState {
        let notices = Arc::new(CollectingNotifier::new());
        Arc::new(AppState {
            sessions: Mutex::new(SessionManager::new(transport.clone(), notices.clone())),
            publisher: Mutex::new(ThreadPublisher::new(transport, notices.clone())),
            settings,
            notices,
            env_credentials,
        })
    }

    /// Stored credentials when complete, otherwise the environment's.
    fn credentials(&self) -> Result<Credentials, SettingsError> {
        let stored = self.settings.load()?.credentials();
        if stored.is_complete() {
            return Ok(stored);
        }
        Ok(self.env_credentials.clone().unwrap_or(stored))
    }
}

type ApiError = (StatusCode, Json<Value>);

/// Builds the router with every route.
pub fn router(state: SharedState) -> Router {
    Router::new()
        .route("/health", get(handle_health))
        .route("/session", get(handle_session))
        .route("/login", post(handle_login))
        .route("/logout", post(handle_logout))
        .route("/settings", get(handle_get_settings).put(handle_put_settings))
        .route("/thread", post(handle_thread))
        .with_state(state)
}

fn error_response(
    state: &AppState,
    status: StatusCode,
    message: &str,
    e: &dyn std::fmt::Display,
) -> ApiError {
    (
        status,
        Json(json!({
            "status": "error",
            "message": message,
            "error": e.to_string(),
            "notices": state.notices.drain(),
        })),
    )
}

fn auth_status(e: &AuthError) -> StatusCode {
    match e {
        AuthError::MissingCredentials => StatusCode::BAD_REQUEST,
        AuthError::RemoteAuthFailure(_) | AuthError::NotLoggedIn => StatusCode::UNAUTHORIZED,
    }
}

/// Missing credentials were already announced by the session manager; every
/// other login failure becomes one notice here.
fn auth_error_response(state: &AppState, e: AuthError) -> ApiError {
    if !matches!(e, AuthError::MissingCredentials) {
        state.notices.notify(&e.to_string());
    }
    error_response(state, auth_status(&e), "Login failed", &e)
}

fn session_json(session: &Session) -> Value {
    json!({"handle": session.handle, "did": session.did})
}

/// Handles GET requests to the `/health` endpoint.
///
/// # Example Response
///
/// ```json
/// {
///   "status": "healthy",
///   "service": "skythread"
/// }
/// ```
pub async fn handle_health() -> Json<Value> {
    Json(json!({"status": "healthy", "service": "skythread"}))
}

/// Handles GET requests to the `/session` endpoint.
pub async fn handle_session(State(state): State<SharedState>) -> Json<Value> {
    let sessions = state.sessions.lock().await;
    match sessions.current_session() {
        Some(session) => Json(json!({
            "status": "success",
            "logged_in": true,
            "session": session_json(session),
        })),
        None => Json(json!({"status": "success", "logged_in": false})),
    }
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub identifier: String,
    pub password: String,
}

/// Handles POST requests to the `/login` endpoint.
///
/// Uses the credentials in the body when given, otherwise the stored
/// settings (falling back to the environment).
pub async fn handle_login(
    State(state): State<SharedState>,
    body: Option<Json<LoginRequest>>,
) -> Result<Json<Value>, ApiError> {
    let credentials = match body {
        Some(Json(request)) => Credentials::new(request.identifier, request.password),
        None => state.credentials().map_err(|e| {
            error!("Failed to load settings: {}", e);
            error_response(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load settings",
                &e,
            )
        })?,
    };

    let mut sessions = state.sessions.lock().await;
    match sessions.login(&credentials).await {
        Ok(session) => Ok(Json(json!({
            "status": "success",
            "message": "Logged in",
            "session": session_json(session),
            "notices": state.notices.drain(),
        }))),
        Err(e) => Err(auth_error_response(&state, e)),
    }
}

/// Handles POST requests to the `/logout` endpoint.
pub async fn handle_logout(State(state): State<SharedState>) -> Json<Value> {
    state.sessions.lock().await.logout();
    Json(json!({"status": "success", "message": "Logged out"}))
}

/// Handles GET requests to the `/settings` endpoint. The secret is never
/// returned, only whether one is stored.
pub async fn handle_get_settings(
    State(state): State<SharedState>,
) -> Result<Json<Value>, ApiError> {
    match state.settings.load() {
        Ok(settings) => Ok(Json(json!({
            "status": "success",
            "identifier": settings.identifier,
            "secret_set": !settings.secret.is_empty(),
        }))),
        Err(e) => {
            error!("Failed to load settings: {}", e);
            Err(error_response(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to load settings",
                &e,
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct SettingsRequest {
    pub identifier: String,
    pub password: String,
}

/// Handles PUT requests to the `/settings` endpoint.
pub async fn handle_put_settings(
    State(state): State<SharedState>,
    Json(request): Json<SettingsRequest>,
) -> Result<Json<Value>, ApiError> {
    let settings = Settings::new(request.identifier.trim(), request.password);
    match state.settings.save(&settings) {
        Ok(()) => {
            info!("Settings updated for {}", settings.identifier);
            Ok(Json(json!({"status": "success", "message": "Settings saved"})))
        }
        Err(e) => {
            error!("Failed to save settings: {}", e);
            Err(error_response(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to save settings",
                &e,
            ))
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ThreadRequest {
    pub segments: Vec<String>,
}

/// Handles POST requests to the `/thread` endpoint.
///
/// The segments are checked before any login attempt. Login (when there is
/// no session) and publishing then run in a spawned task, so the thread
/// always reaches a final state even if the client goes away mid-request.
///
/// # Success Response
///
/// ```json
/// {
///   "status": "success",
///   "message": "Published 2 post(s)",
///   "root": {"uri": "at://...", "cid": "..."},
///   "posts": [{"uri": "at://...", "cid": "..."}, {"uri": "at://...", "cid": "..."}],
///   "notices": ["Thread of 2 posts published successfully."]
/// }
/// ```
///
/// # Partial Failure Response (502)
///
/// ```json
/// {
///   "status": "error",
///   "message": "Failed to publish thread",
///   "error": "...",
///   "failed_index": 1,
///   "published": [{"uri": "at://...", "cid": "..."}],
///   "notices": ["..."]
/// }
/// ```
pub async fn handle_thread(
    State(state): State<SharedState>,
    Json(request): Json<ThreadRequest>,
) -> Result<Json<Value>, ApiError> {
    if let Err(e) = plan_thread(&request.segments) {
        warn!("Rejecting thread before login: {}", e);
        return Err(publish_error_response(&state, e));
    }

    // A dropped request future must not interrupt a submission in flight.
    let task = tokio::spawn(publish_thread(state.clone(), request.segments));
    match task.await {
        Ok(result) => result,
        Err(e) => {
            error!("Publish task did not complete: {}", e);
            Err(error_response(
                &state,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Failed to publish thread",
                &e,
            ))
        }
    }
}

async fn publish_thread(state: SharedState, segments: Vec<String>) -> Result<Json<Value>, ApiError> {
    let mut sessions = state.sessions.lock().await;

    let existing = sessions.current_session().cloned();
    let session = match existing {
        Some(session) => session,
        None => {
            let credentials = state.credentials().map_err(|e| {
                error!("Failed to load settings: {}", e);
                error_response(
                    &state,
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Failed to load settings",
                    &e,
                )
            })?;
            match sessions.login(&credentials).await {
                Ok(session) => session.clone(),
                Err(e) => return Err(auth_error_response(&state, e)),
            }
        }
    };

    let mut publisher = state.publisher.lock().await;
    match publisher.publish(&segments, &session).await {
        Ok(report) => {
            info!("Thread request done, root {}", report.root.uri);
            Ok(Json(json!({
                "status": "success",
                "message": format!("Published {} post(s)", report.posts.len()),
                "root": report.root,
                "posts": report.posts,
                "notices": state.notices.drain(),
            })))
        }
        Err(e) => Err(publish_error_response(&state, e)),
    }
}

fn publish_error_response(state: &AppState, e: PublishError) -> ApiError {
    state.notices.notify(&e.to_string());
    let status = match &e {
        PublishError::Submission { .. } | PublishError::Cancelled { .. } => StatusCode::BAD_GATEWAY,
        _ => StatusCode::BAD_REQUEST,
    };
    let failed_index = match &e {
        PublishError::Submission { index, .. } => json!(index),
        _ => Value::Null,
    };
    (
        status,
        Json(json!({
            "status": "error",
            "message": "Failed to publish thread",
            "error": e.to_string(),
            "failed_index": failed_index,
            "published": e.published(),
            "notices": state.notices.drain(),
        })),
    )
}
