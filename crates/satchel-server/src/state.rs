//! Application state shared across handlers.

use std::sync::Arc;

use satchel_session::SessionManager;

use crate::config::ServerConfig;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Session lifecycle manager.
    pub sessions: SessionManager,

    /// Server configuration.
    pub config: Arc<ServerConfig>,
}

impl AppState {
    /// Create a new application state.
    pub fn new(sessions: SessionManager, config: ServerConfig) -> Self {
        Self {
            sessions,
            config: Arc::new(config),
        }
    }
}
