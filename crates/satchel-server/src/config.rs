//! Server configuration.

use std::net::SocketAddr;

/// Default mount point of the session API.
pub const DEFAULT_API_BASE_PATH: &str = "/api/session";

/// Path of the playground counter route.
pub const COUNTER_PATH: &str = "/api/count";

/// HTTP verbs the session API can expose.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ApiMethod {
    /// Read the current session.
    Get,
    /// Merge into session data.
    Patch,
    /// Replace session data.
    Post,
    /// Destroy the session.
    Delete,
}

impl ApiMethod {
    pub const ALL: [ApiMethod; 4] = [
        ApiMethod::Get,
        ApiMethod::Patch,
        ApiMethod::Post,
        ApiMethod::Delete,
    ];
}

impl std::str::FromStr for ApiMethod {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "get" => Ok(ApiMethod::Get),
            "patch" => Ok(ApiMethod::Patch),
            "post" => Ok(ApiMethod::Post),
            "delete" => Ok(ApiMethod::Delete),
            other => Err(format!(
                "unknown session API method '{other}' (expected get, patch, post or delete)"
            )),
        }
    }
}

/// Session API configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Mount the session API at all.
    pub enabled: bool,

    /// Verbs to register. Empty means all of them.
    pub methods: Vec<ApiMethod>,

    /// Path the API is mounted at.
    pub base_path: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            methods: Vec::new(),
            base_path: DEFAULT_API_BASE_PATH.to_string(),
        }
    }
}

impl ApiConfig {
    /// Disabled API.
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }

    /// Restrict the registered verbs.
    pub fn with_methods(mut self, methods: Vec<ApiMethod>) -> Self {
        self.methods = methods;
        self
    }

    /// Mount the API somewhere else.
    pub fn with_base_path(mut self, path: impl Into<String>) -> Self {
        self.base_path = path.into();
        self
    }

    /// Whether `method` should be registered.
    pub fn allows(&self, method: ApiMethod) -> bool {
        self.enabled && (self.methods.is_empty() || self.methods.contains(&method))
    }
}

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to.
    pub bind_address: SocketAddr,

    /// Enable request logging.
    pub request_logging: bool,

    /// Mount the playground counter at [`COUNTER_PATH`].
    pub counter_route: bool,

    /// Session API settings.
    pub api: ApiConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3000)),
            request_logging: true,
            counter_route: false,
            api: ApiConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bind address.
    pub fn with_bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = addr;
        self
    }

    /// Enable or disable request logging.
    pub fn with_request_logging(mut self, enabled: bool) -> Self {
        self.request_logging = enabled;
        self
    }

    /// Enable or disable the counter route.
    pub fn with_counter_route(mut self, enabled: bool) -> Self {
        self.counter_route = enabled;
        self
    }

    /// Set the session API configuration.
    pub fn with_api(mut self, api: ApiConfig) -> Self {
        self.api = api;
        self
    }
}
