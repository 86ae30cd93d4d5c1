//! HTTP boundary for Satchel sessions.
//!
//! This crate wires [`satchel_session`] into axum:
//!
//! - [`session_middleware`] resolves the session before the handler runs and
//!   persists it once the response is ready
//! - [`Session`] extracts the request's session in handlers
//! - the session API exposes read/merge/replace/destroy under a base path
//! - request logging and HTTP tracing wrap everything
//!
//! # Example
//!
//! ```ignore
//! use satchel_server::{Server, ServerConfig, Session};
//! use satchel_session::{SessionConfig, SessionManager, StorageConfig};
//!
//! let sessions = SessionManager::from_config(SessionConfig::default(), &StorageConfig::Memory)?;
//! let server = Server::new(sessions, ServerConfig::default());
//!
//! let app = Router::new().route("/visits", get(|session: Session| async move {
//!     let visits = session.get::<u64>("visits")?.unwrap_or(0) + 1;
//!     session.insert("visits", visits)?;
//!     Ok::<_, ServerError>(visits.to_string())
//! }));
//! server.run_with_routes(app).await?;
//! ```

pub mod client_ip;
pub mod config;
pub mod cookie;
pub mod error;
pub mod logging;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::{ApiConfig, ApiMethod, ServerConfig};
pub use error::{Result, ServerError};
pub use logging::request_logging_middleware;
pub use middleware::{Session, session_middleware};
pub use state::AppState;

use std::future::Future;
use std::net::SocketAddr;

use axum::{Router, middleware as axum_middleware};
use satchel_session::SessionManager;
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// The Satchel HTTP server.
pub struct Server {
    /// Application state.
    state: AppState,
}

impl Server {
    /// Create a new server around a session manager.
    pub fn new(sessions: SessionManager, config: ServerConfig) -> Self {
        Self {
            state: AppState::new(sessions, config),
        }
    }

    /// Create a server from a pre-built application state.
    pub fn from_state(state: AppState) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Build the router with the built-in routes only.
    pub fn router(&self) -> Router {
        self.router_with(Router::new())
    }

    /// Build the router, mounting `app_routes` behind the session middleware.
    pub fn router_with(&self, app_routes: Router<AppState>) -> Router {
        let config = &self.state.config;

        let mut session_scoped = app_routes.merge(routes::session_routes(&config.api));
        if config.counter_route {
            session_scoped = session_scoped.merge(routes::count_routes());
        }

        Router::new()
            // Health stays outside the session layer so probes never mint sessions
            .merge(routes::health_routes())
            .merge(session_scoped.layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                middleware::session_middleware,
            )))
            .layer(axum_middleware::from_fn_with_state(
                self.state.clone(),
                logging::request_logging_middleware,
            ))
            .layer(TraceLayer::new_for_http())
            .with_state(self.state.clone())
    }

    /// Run the server until Ctrl-C.
    pub async fn run(self) -> Result<()> {
        self.run_with_routes(Router::new()).await
    }

    /// Run the server with extra application routes until Ctrl-C.
    pub async fn run_with_routes(self, app_routes: Router<AppState>) -> Result<()> {
        let addr = self.state.config.bind_address;
        self.serve(addr, app_routes, shutdown_signal()).await
    }

    /// Run the server on a specific address (useful for testing).
    pub async fn run_on(self, addr: SocketAddr) -> Result<()> {
        self.serve(addr, Router::new(), std::future::pending()).await
    }

    /// Serve on `addr` until `shutdown` resolves.
    pub async fn serve(
        self,
        addr: SocketAddr,
        app_routes: Router<AppState>,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> Result<()> {
        let router = self.router_with(app_routes);

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::Internal(format!("Failed to bind: {}", e)))?;

        let sweeper = self
            .state
            .sessions
            .config()
            .sweep_interval
            .map(|interval| {
                info!(interval_secs = interval.as_secs(), "Starting session sweeper");
                self.state.sessions.spawn_sweeper(interval)
            });

        info!("Starting server on {}", addr);

        let served = axum::serve(
            listener,
            router.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown)
        .await;

        if let Some(handle) = sweeper {
            handle.abort();
        }

        served.map_err(|e| ServerError::Internal(format!("Server error: {}", e)))?;
        info!("Server stopped");
        Ok(())
    }

    /// Get the configured bind address.
    pub fn bind_address(&self) -> SocketAddr {
        self.state.config.bind_address
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "Failed to listen for Ctrl-C, shutting down");
    }
}
