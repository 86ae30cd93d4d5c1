//! Configuration types mapping to the TOML schema.
//!
//! Top-level config:
//! ```toml
//! [server]             # listener and built-in routes
//! [session]            # session lifecycle, cookie and pinning
//! [session.storage]    # key-value backend
//! [api]                # session CRUD endpoints
//! ```

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Default values shared by the sections below.
pub mod defaults {
    pub const PORT: u16 = 3000;
    pub const BIND: &str = "127.0.0.1";
    pub const EXPIRY_SECS: u64 = 600;
    pub const ID_LENGTH: usize = 64;
    pub const STORE_PREFIX: &str = "sessions";
    pub const SAME_SITE: &str = "lax";
    pub const STORAGE_DRIVER: &str = "memory";
    pub const HTTP_TIMEOUT_SECS: u64 = 10;
    pub const API_BASE_PATH: &str = "/api/session";
}

// ─────────────────────────────────────────────────────────────────────────────
// Top-level Config
// ─────────────────────────────────────────────────────────────────────────────

/// Root configuration structure.
///
/// All sections are optional so that partial configs (e.g. a project-local
/// override of just `[server]`) can be loaded and merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SatchelConfig {
    pub server: Option<ServerSection>,
    pub session: Option<SessionSection>,
    pub api: Option<ApiSection>,
}

impl SatchelConfig {
    /// Create an empty config.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse from a TOML string.
    pub fn from_toml(toml_str: &str) -> crate::Result<Self> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Serialize to a TOML string.
    pub fn to_toml(&self) -> crate::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Merge another config on top of this one (other takes priority).
    ///
    /// Sections are replaced whole, not field by field.
    pub fn merge(&mut self, other: SatchelConfig) {
        if other.server.is_some() {
            self.server = other.server;
        }
        if other.session.is_some() {
            self.session = other.session;
        }
        if other.api.is_some() {
            self.api = other.api;
        }
    }

    /// The `[server]` section, or its defaults.
    pub fn server(&self) -> ServerSection {
        self.server.clone().unwrap_or_default()
    }

    /// The `[session]` section, or its defaults.
    pub fn session(&self) -> SessionSection {
        self.session.clone().unwrap_or_default()
    }

    /// The `[api]` section, or its defaults.
    pub fn api(&self) -> ApiSection {
        self.api.clone().unwrap_or_default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Server
// ─────────────────────────────────────────────────────────────────────────────

/// `[server]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    /// Port to listen on.
    pub port: u16,
    /// Address to bind to.
    pub bind: String,
    /// Enable request logging.
    pub request_logging: bool,
    /// Mount the playground counter at `GET /api/count`.
    pub counter_route: bool,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            port: defaults::PORT,
            bind: defaults::BIND.to_string(),
            request_logging: true,
            counter_route: false,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Session
// ─────────────────────────────────────────────────────────────────────────────

/// `expiry_in_seconds`: a lifetime in seconds, or `false` for no expiry.
///
/// `true` parses but has no meaning; it is rejected when mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ExpirySetting {
    Seconds(u64),
    Flag(bool),
}

impl Default for ExpirySetting {
    fn default() -> Self {
        Self::Seconds(defaults::EXPIRY_SECS)
    }
}

/// `ip_pinning`: `false`, `true` (peer address) or `{ header_name = "..." }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IpPinningSetting {
    Flag(bool),
    Header { header_name: String },
}

impl Default for IpPinningSetting {
    fn default() -> Self {
        Self::Flag(false)
    }
}

/// `[session]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionSection {
    pub expiry_in_seconds: ExpirySetting,
    pub id_length: usize,
    pub store_prefix: String,
    /// `lax`, `strict` or `none`.
    pub cookie_same_site: String,
    pub cookie_secure: bool,
    pub cookie_http_only: bool,
    /// Cookie domain. Omit for a host-only cookie.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub ip_pinning: IpPinningSetting,
    /// Refresh the cookie lifetime on every response.
    pub rolling: bool,
    /// Persist sessions nobody wrote to.
    pub save_uninitialized: bool,
    /// Persist loaded sessions even when unchanged.
    pub resave: bool,
    /// Interval of the periodic sweep. Omit to disable it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sweep_interval_seconds: Option<u64>,
    pub storage: StorageSection,
}

impl Default for SessionSection {
    fn default() -> Self {
        Self {
            expiry_in_seconds: ExpirySetting::default(),
            id_length: defaults::ID_LENGTH,
            store_prefix: defaults::STORE_PREFIX.to_string(),
            cookie_same_site: defaults::SAME_SITE.to_string(),
            cookie_secure: true,
            cookie_http_only: true,
            domain: None,
            ip_pinning: IpPinningSetting::default(),
            rolling: false,
            save_uninitialized: true,
            resave: true,
            sweep_interval_seconds: None,
            storage: StorageSection::default(),
        }
    }
}

/// `[session.storage]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageSection {
    /// `memory`, `fs` or `http`.
    pub driver: String,
    /// Base directory of the `fs` driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base: Option<PathBuf>,
    /// Service URL of the `http` driver.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    /// Request timeout of the `http` driver.
    pub timeout_seconds: u64,
}

impl Default for StorageSection {
    fn default() -> Self {
        Self {
            driver: defaults::STORAGE_DRIVER.to_string(),
            base: None,
            url: None,
            timeout_seconds: defaults::HTTP_TIMEOUT_SECS,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// API
// ─────────────────────────────────────────────────────────────────────────────

/// `[api]` section.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiSection {
    pub enabled: bool,
    /// Subset of `get`, `patch`, `post`, `delete`. Empty means all.
    pub methods: Vec<String>,
    pub base_path: String,
}

impl Default for ApiSection {
    fn default() -> Self {
        Self {
            enabled: true,
            methods: Vec::new(),
            base_path: defaults::API_BASE_PATH.to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
