//! Session API: read, merge, replace and destroy the caller's session.

use axum::{
    Json, Router,
    extract::{State, rejection::JsonRejection},
    http::StatusCode,
    routing::MethodRouter,
};
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use satchel_session::SessionData;

use crate::config::{ApiConfig, ApiMethod};
use crate::error::ServerError;
use crate::middleware::Session;
use crate::state::AppState;

// ─────────────────────────────────────────────────────────────────────────────
// Types
// ─────────────────────────────────────────────────────────────────────────────

/// Body of PATCH and POST requests.
///
/// Metadata keys are captured in their own fields so a payload carrying
/// any of them can be rejected structurally; everything else is data.
#[derive(Debug, Deserialize)]
pub struct SessionPayload {
    #[serde(default, deserialize_with = "present")]
    id: Option<Value>,

    #[serde(default, rename = "createdAt", deserialize_with = "present")]
    created_at: Option<Value>,

    #[serde(default, deserialize_with = "present")]
    ip: Option<Value>,

    #[serde(flatten)]
    data: SessionData,
}

/// Marks a key as present even when its value is `null`.
fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

impl SessionPayload {
    /// The application data, or a rejection naming the first metadata key.
    pub fn into_data(self) -> Result<SessionData, ServerError> {
        let reserved = [
            ("id", &self.id),
            ("createdAt", &self.created_at),
            ("ip", &self.ip),
        ];
        if let Some((key, _)) = reserved.iter().find(|(_, value)| value.is_some()) {
            return Err(ServerError::BadRequest(format!(
                "cannot set reserved session key '{key}'"
            )));
        }
        Ok(self.data)
    }
}

fn parse_payload(payload: Result<Json<SessionPayload>, JsonRejection>) -> Result<SessionData, ServerError> {
    let Json(payload) = payload.map_err(|e| {
        ServerError::BadRequest(format!("session payload must be a JSON object: {}", e.body_text()))
    })?;
    payload.into_data()
}

fn current_record(session: &Session) -> Result<Json<Value>, ServerError> {
    session
        .record()
        .map(|record| Json(record.to_value()))
        .ok_or_else(|| ServerError::Internal("no session bound to request".to_string()))
}

// ─────────────────────────────────────────────────────────────────────────────
// Handlers
// ─────────────────────────────────────────────────────────────────────────────

/// GET - the current session.
pub async fn get_session_handler(session: Session) -> Result<Json<Value>, ServerError> {
    current_record(&session)
}

/// PATCH - merge the body into the session data.
pub async fn patch_session_handler(
    session: Session,
    payload: Result<Json<SessionPayload>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let patch = parse_payload(payload)?;
    session.merge(patch)?;
    current_record(&session)
}

/// POST - replace the session data with the body. Metadata is kept.
pub async fn replace_session_handler(
    session: Session,
    payload: Result<Json<SessionPayload>, JsonRejection>,
) -> Result<Json<Value>, ServerError> {
    let data = parse_payload(payload)?;
    session.replace(data)?;
    current_record(&session)
}

/// DELETE - destroy the session and clear the cookie.
pub async fn delete_session_handler(
    State(state): State<AppState>,
    session: Session,
) -> Result<StatusCode, ServerError> {
    state.sessions.destroy(&session).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Session API routes for the verbs `api` allows.
pub fn session_routes(api: &ApiConfig) -> Router<AppState> {
    let mut methods: MethodRouter<AppState> = MethodRouter::new();
    let mut any = false;

    for method in ApiMethod::ALL {
        if !api.allows(method) {
            continue;
        }
        any = true;
        methods = match method {
            ApiMethod::Get => methods.get(get_session_handler),
            ApiMethod::Patch => methods.patch(patch_session_handler),
            ApiMethod::Post => methods.post(replace_session_handler),
            ApiMethod::Delete => methods.delete(delete_session_handler),
        };
    }

    if any {
        Router::new().route(&api.base_path, methods)
    } else {
        Router::new()
    }
}
