//! Common test utilities for integration tests.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use axum::Router;
use reqwest::{Client, Response, header};
use tokio::task::JoinHandle;
use tokio::time::timeout;

use satchel_server::{AppState, Server, ServerConfig};
use satchel_session::{
    IpHasher, MemoryBackend, SessionConfig, SessionManager, SessionRecord, SessionStore,
    SharedBackend,
};

/// A test server that runs in the background.
pub struct TestServer {
    /// The server's address.
    pub addr: SocketAddr,
    /// HTTP client for this server. Cookies are passed explicitly.
    pub client: Client,
    /// The session manager behind the server, for inspecting the store.
    pub sessions: SessionManager,
    /// Handle to the server task.
    _handle: JoinHandle<()>,
}

impl TestServer {
    /// Start a server with default session settings over an in-memory store.
    pub async fn start() -> Result<Self> {
        Self::start_with(SessionConfig::default()).await
    }

    /// Start a server with custom session settings over an in-memory store.
    pub async fn start_with(config: SessionConfig) -> Result<Self> {
        Self::start_full(config, Arc::new(MemoryBackend::new()), Router::new()).await
    }

    /// Start a server with everything configurable.
    pub async fn start_full(
        config: SessionConfig,
        backend: SharedBackend,
        app_routes: Router<AppState>,
    ) -> Result<Self> {
        let addr = find_available_port().await?;

        // Cheapest valid Argon2 costs keep pinning tests fast.
        let sessions = SessionManager::new(config, backend).with_hasher(IpHasher::with_params(8, 1, 1)?);

        let server_config = ServerConfig::new()
            .with_bind_address(addr)
            .with_request_logging(false)
            .with_counter_route(true);

        let server = Server::new(sessions.clone(), server_config);
        let handle = tokio::spawn(async move {
            let _ = server.serve(addr, app_routes, std::future::pending()).await;
        });

        let client = Client::new();
        wait_for_server(&client, addr).await?;

        Ok(Self {
            addr,
            client,
            sessions,
            _handle: handle,
        })
    }

    /// Get the base URL for the server.
    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url(), path)
    }

    /// Request builder carrying `sessionId=<id>` when `session` is given.
    pub fn request(
        &self,
        method: reqwest::Method,
        path: &str,
        session: Option<&str>,
    ) -> reqwest::RequestBuilder {
        let builder = self.client.request(method, self.url(path));
        match session {
            Some(id) => builder.header(header::COOKIE, format!("sessionId={id}")),
            None => builder,
        }
    }

    pub fn store(&self) -> &SessionStore {
        self.sessions.store()
    }

    /// Put a record straight into the store.
    pub async fn seed(&self, record: &SessionRecord) -> Result<()> {
        self.store().set(&record.id, record).await?;
        Ok(())
    }
}

/// The raw `Set-Cookie` header for the session cookie, if any.
pub fn session_set_cookie(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|v| v.starts_with("sessionId="))
        .map(str::to_string)
}

/// The session id carried by the `Set-Cookie` header, if any.
pub fn issued_session_id(response: &Response) -> Option<String> {
    let raw = session_set_cookie(response)?;
    let value = raw.strip_prefix("sessionId=")?.split(';').next()?;
    Some(value.to_string())
}

/// Find an available port for the test server.
async fn find_available_port() -> Result<SocketAddr> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(addr)
}

/// Wait for the server to become ready.
async fn wait_for_server(client: &Client, addr: SocketAddr) -> Result<()> {
    let url = format!("http://{}/health", addr);

    let result = timeout(Duration::from_secs(5), async {
        loop {
            match client.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => return,
                _ => tokio::time::sleep(Duration::from_millis(50)).await,
            }
        }
    })
    .await;

    match result {
        Ok(()) => Ok(()),
        Err(_) => anyhow::bail!("Timeout waiting for server to start"),
    }
}
