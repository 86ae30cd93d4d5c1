//! Session middleware: the boundary between axum and the lifecycle manager.
//!
//! For each request it resolves the session, hands a [`SessionContext`] to
//! the handler through request extensions, and fires the write-back hook
//! once the handler has produced its response. The hook also fires when
//! the handler panics. A request dropped mid-flight (client gone) never
//! fires it, so nothing is persisted.

use std::panic::AssertUnwindSafe;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use futures::FutureExt;
use tracing::{error, trace};

use satchel_session::{CompletionHook, SessionContext};

use crate::client_ip::client_ip;
use crate::cookie::{apply_directive, session_id_from_headers};
use crate::error::ServerError;
use crate::state::AppState;

/// Resolve, expose and persist the request's session.
pub async fn session_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    // An outer layer already owns this request's session.
    if request
        .extensions()
        .get::<SessionContext>()
        .is_some_and(SessionContext::is_bound)
    {
        return next.run(request).await;
    }

    let manager = state.sessions.clone();
    let cookie_id = session_id_from_headers(request.headers());
    let ip = client_ip(&request, &manager.config().ip_pinning);

    let context = request
        .extensions()
        .get::<SessionContext>()
        .cloned()
        .unwrap_or_default();

    match manager
        .resolve(&context, cookie_id.as_deref(), ip.as_deref())
        .await
    {
        Ok(resolved) => trace!(state = ?resolved, "Session resolved"),
        Err(e) => return ServerError::from(e).into_response(),
    }
    request.extensions_mut().insert(context.clone());

    let hook = {
        let manager = manager.clone();
        let context = context.clone();
        CompletionHook::new("session-commit", move || async move {
            manager.commit(&context).await
        })
    };

    let mut response = match AssertUnwindSafe(next.run(request)).catch_unwind().await {
        Ok(response) => response,
        Err(_) => {
            error!("Handler panicked, persisting session before answering");
            ServerError::Internal("request handler panicked".to_string()).into_response()
        }
    };

    if let Err(e) = hook.fire().await {
        return ServerError::from(e).into_response();
    }

    apply_directive(
        response.headers_mut(),
        &context.cookie_directive(),
        manager.config(),
    );
    response
}

/// Extractor handing the request's [`SessionContext`] to a handler.
///
/// Rejects with a 500 when the session middleware is not installed.
#[derive(Debug, Clone)]
pub struct Session(pub SessionContext);

impl std::ops::Deref for Session {
    type Target = SessionContext;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl<S> axum::extract::FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ServerError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionContext>()
            .cloned()
            .map(Session)
            .ok_or_else(|| ServerError::Internal("session middleware not installed".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::{
        Router,
        body::Body,
        http::{Request as HttpRequest, StatusCode, header},
        middleware,
        routing::get,
    };
    use satchel_session::{
        IpHasher, KvBackend, MemoryBackend, SessionConfig, SessionManager, SessionRecord,
    };
    use tower::ServiceExt;

    use crate::config::ServerConfig;

    fn fast_hasher() -> IpHasher {
        IpHasher::with_params(8, 1, 1).unwrap()
    }

    fn app(config: SessionConfig) -> (Router, SessionManager, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let manager = SessionManager::new(config, backend.clone()).with_hasher(fast_hasher());
        let state = AppState::new(manager.clone(), ServerConfig::default());

        let router = Router::new()
            .route(
                "/touch",
                get(|session: Session| async move {
                    session.insert("touched", true).unwrap();
                    "ok"
                }),
            )
            .route("/read", get(|_session: Session| async { "ok" }))
            .route(
                "/boom",
                get(|session: Session| async move {
                    session.insert("before_panic", 1).unwrap();
                    if session.id().is_some() {
                        panic!("handler exploded");
                    }
                    "unreachable"
                }),
            )
            .layer(middleware::from_fn_with_state(state.clone(), session_middleware))
            .with_state(state);

        (router, manager, backend)
    }

    fn set_cookie(response: &Response) -> Option<String> {
        response
            .headers()
            .get(header::SET_COOKIE)
            .map(|v| v.to_str().unwrap().to_string())
    }

    fn request_to(uri: &str, cookie: Option<&str>) -> HttpRequest<Body> {
        let mut builder = HttpRequest::builder().uri(uri);
        if let Some(cookie) = cookie {
            builder = builder.header(header::COOKIE, cookie);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn test_new_session_sets_cookie_and_persists() {
        let (router, _, backend) = app(SessionConfig::default());

        let response = router.oneshot(request_to("/read", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let cookie = set_cookie(&response).unwrap();
        let id = cookie
            .strip_prefix("sessionId=")
            .and_then(|rest| rest.split(';').next())
            .unwrap();
        assert_eq!(id.len(), 64);
        assert!(
            backend
                .get_item(&format!("sessions:{id}"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn test_existing_session_no_cookie_reissued() {
        let (router, manager, _) = app(SessionConfig::default());
        let record = SessionRecord::new("known", chrono::Utc::now());
        manager.store().set("known", &record).await.unwrap();

        let response = router
            .oneshot(request_to("/touch", Some("sessionId=known")))
            .await
            .unwrap();

        assert!(set_cookie(&response).is_none());
        let stored = manager.store().get("known").await.unwrap().unwrap();
        assert_eq!(stored.data.get("touched"), Some(&serde_json::json!(true)));
    }

    #[tokio::test]
    async fn test_uninitialized_session_gets_no_cookie() {
        let (router, _, backend) = app(SessionConfig::default().with_save_uninitialized(false));

        let response = router.oneshot(request_to("/read", None)).await.unwrap();
        assert!(set_cookie(&response).is_none());
        assert!(backend.is_empty().await);
    }

    #[tokio::test]
    async fn test_panicking_handler_still_persists() {
        let (router, manager, _) = app(SessionConfig::default());

        let response = router.oneshot(request_to("/boom", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let ids = manager.store().list_ids().await.unwrap();
        assert_eq!(ids.len(), 1);
        let stored = manager.store().get(&ids[0]).await.unwrap().unwrap();
        assert_eq!(stored.data.get("before_panic"), Some(&serde_json::json!(1)));
    }

    #[tokio::test]
    async fn test_extractor_without_middleware_is_500() {
        let router: Router = Router::new().route("/read", get(|_session: Session| async { "ok" }));
        let response = router.oneshot(request_to("/read", None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
