//! Structured request logging.

use axum::{
    extract::{Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::Response,
};

use crate::state::AppState;

/// Log method, path, status and latency of every request.
///
/// Also records whether the response set a cookie, which makes session
/// churn (a client that keeps getting fresh ids) visible in the logs.
pub async fn request_logging_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    if !state.config.request_logging {
        return next.run(request).await;
    }

    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let start = std::time::Instant::now();

    let response = next.run(request).await;

    let duration_ms = start.elapsed().as_millis();
    let status = response.status().as_u16();
    let cookie_set = response.headers().contains_key(SET_COOKIE);

    if response.status().is_server_error() {
        tracing::error!(%method, %path, status, duration_ms, cookie_set, "Request failed");
    } else if response.status().is_client_error() {
        tracing::warn!(%method, %path, status, duration_ms, cookie_set, "Request rejected");
    } else {
        tracing::info!(%method, %path, status, duration_ms, cookie_set, "Request completed");
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
    };
    use satchel_session::{MemoryBackend, SessionConfig, SessionManager};
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    fn router(logging: bool) -> Router {
        let manager = SessionManager::new(SessionConfig::default(), Arc::new(MemoryBackend::new()));
        let state = AppState::new(manager, ServerConfig::new().with_request_logging(logging));
        Router::new()
            .route("/ok", get(|| async { "ok" }))
            .route("/teapot", get(|| async { StatusCode::IM_A_TEAPOT }))
            .layer(middleware::from_fn_with_state(
                state.clone(),
                request_logging_middleware,
            ))
            .with_state(state)
    }

    #[tokio::test]
    async fn test_passes_responses_through() {
        for logging in [true, false] {
            let app = router(logging);
            let ok = app
                .clone()
                .oneshot(HttpRequest::builder().uri("/ok").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(ok.status(), StatusCode::OK);

            let teapot = app
                .oneshot(HttpRequest::builder().uri("/teapot").body(Body::empty()).unwrap())
                .await
                .unwrap();
            assert_eq!(teapot.status(), StatusCode::IM_A_TEAPOT);
        }
    }
}
