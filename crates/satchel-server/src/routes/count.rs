//! Playground counter: bumps a number stored in the caller's session.

use axum::{Json, Router, routing::get};
use serde::{Deserialize, Serialize};

use crate::config::COUNTER_PATH;
use crate::error::ServerError;
use crate::middleware::Session;
use crate::state::AppState;

#[derive(Debug, Serialize, Deserialize)]
pub struct CountResponse {
    pub count: i64,
}

/// GET /api/count
pub async fn count_handler(session: Session) -> Result<Json<CountResponse>, ServerError> {
    let count = session
        .get::<i64>("count")?
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| ServerError::BadRequest("session count is at its maximum".to_string()))?;
    session.insert("count", count)?;
    Ok(Json(CountResponse { count }))
}

pub fn count_routes() -> Router<AppState> {
    Router::new().route(COUNTER_PATH, get(count_handler))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{Request, StatusCode, header},
        middleware,
    };
    use satchel_session::{MemoryBackend, SessionConfig, SessionManager, SessionRecord};
    use serde_json::json;
    use tower::ServiceExt;

    use crate::config::ServerConfig;
    use crate::middleware::session_middleware;

    async fn bump(start: i64) -> (StatusCode, SessionManager) {
        let manager = SessionManager::new(SessionConfig::default(), Arc::new(MemoryBackend::new()));
        let record = SessionRecord::new("counter", chrono::Utc::now())
            .with_data(json!({ "count": start }).as_object().cloned().unwrap());
        manager.store().set("counter", &record).await.unwrap();

        let state = AppState::new(manager.clone(), ServerConfig::default());
        let app = count_routes()
            .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
            .with_state(state);

        let response = app
            .oneshot(
                Request::builder()
                    .uri(COUNTER_PATH)
                    .header(header::COOKIE, "sessionId=counter")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        (response.status(), manager)
    }

    #[tokio::test]
    async fn test_counter_increments() {
        let (status, manager) = bump(41).await;
        assert_eq!(status, StatusCode::OK);
        let stored = manager.store().get("counter").await.unwrap().unwrap();
        assert_eq!(stored.data.get("count"), Some(&json!(42)));
    }

    #[tokio::test]
    async fn test_counter_at_maximum_is_rejected() {
        let (status, manager) = bump(i64::MAX).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let stored = manager.store().get("counter").await.unwrap().unwrap();
        assert_eq!(stored.data.get("count"), Some(&json!(i64::MAX)));
    }
}
