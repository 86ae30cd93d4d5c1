//! Configuration for the session lifecycle manager.

use std::time::Duration;

/// Name of the cookie carrying the session id.
pub const SESSION_COOKIE_NAME: &str = "sessionId";

/// Default session lifetime (10 minutes).
pub const DEFAULT_EXPIRY: Option<Duration> = Some(Duration::from_secs(600));

/// Default number of characters in a generated session id.
pub const DEFAULT_ID_LENGTH: usize = 64;

/// Default prefix under which records are stored.
pub const DEFAULT_STORE_PREFIX: &str = "sessions";

/// `SameSite` attribute of the session cookie.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SameSitePolicy {
    #[default]
    Lax,
    Strict,
    None,
}

impl std::str::FromStr for SameSitePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "lax" => Ok(Self::Lax),
            "strict" => Ok(Self::Strict),
            "none" => Ok(Self::None),
            other => Err(format!(
                "unknown SameSite policy '{other}' (expected lax, strict or none)"
            )),
        }
    }
}

/// Attributes applied to the session cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    pub same_site: SameSitePolicy,
    pub secure: bool,
    pub http_only: bool,
    /// `None` keeps the cookie host-only.
    pub domain: Option<String>,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            same_site: SameSitePolicy::Lax,
            secure: true,
            http_only: true,
            domain: None,
        }
    }
}

/// Where the client IP used for pinning comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum IpPinning {
    /// Sessions are not bound to an IP.
    #[default]
    Disabled,
    /// Use the socket peer address.
    PeerAddress,
    /// Use the first entry of a forwarding header (e.g. `X-Forwarded-For`).
    Header { header_name: String },
}

impl IpPinning {
    pub fn is_enabled(&self) -> bool {
        !matches!(self, IpPinning::Disabled)
    }
}

/// Configuration for the session lifecycle manager.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Session lifetime. `None` means sessions never expire.
    pub expiry: Option<Duration>,

    /// Number of characters in generated session ids.
    pub id_length: usize,

    /// Prefix for store keys (`{prefix}:{id}`).
    pub store_prefix: String,

    /// Session cookie attributes.
    pub cookie: CookieSettings,

    /// IP pinning policy.
    pub ip_pinning: IpPinning,

    /// Reset `createdAt` and re-issue the cookie on every valid access.
    pub rolling: bool,

    /// Persist brand-new sessions even when nothing was written to them.
    pub save_uninitialized: bool,

    /// Write existing sessions back even when they were not modified.
    pub resave: bool,

    /// Interval of the background sweep. `None` relies on lazy expiry only.
    pub sweep_interval: Option<Duration>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            expiry: DEFAULT_EXPIRY,
            id_length: DEFAULT_ID_LENGTH,
            store_prefix: DEFAULT_STORE_PREFIX.to_string(),
            cookie: CookieSettings::default(),
            ip_pinning: IpPinning::Disabled,
            rolling: false,
            save_uninitialized: true,
            resave: true,
            sweep_interval: None,
        }
    }
}

impl SessionConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the session lifetime in seconds.
    pub fn with_expiry_secs(mut self, secs: u64) -> Self {
        self.expiry = Some(Duration::from_secs(secs));
        self
    }

    /// Disable expiry (infinite sessions).
    pub fn without_expiry(mut self) -> Self {
        self.expiry = None;
        self
    }

    /// Set the generated id length.
    pub fn with_id_length(mut self, len: usize) -> Self {
        self.id_length = len;
        self
    }

    /// Set the store key prefix.
    pub fn with_store_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.store_prefix = prefix.into();
        self
    }

    /// Set the cookie attributes.
    pub fn with_cookie(mut self, cookie: CookieSettings) -> Self {
        self.cookie = cookie;
        self
    }

    /// Set the IP pinning policy.
    pub fn with_ip_pinning(mut self, pinning: IpPinning) -> Self {
        self.ip_pinning = pinning;
        self
    }

    /// Enable or disable rolling renewal.
    pub fn with_rolling(mut self, rolling: bool) -> Self {
        self.rolling = rolling;
        self
    }

    /// Enable or disable saving of untouched new sessions.
    pub fn with_save_uninitialized(mut self, save: bool) -> Self {
        self.save_uninitialized = save;
        self
    }

    /// Enable or disable unconditional write-back of existing sessions.
    pub fn with_resave(mut self, resave: bool) -> Self {
        self.resave = resave;
        self
    }

    /// Run the background sweep at the given interval.
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = Some(interval);
        self
    }

    /// Expiry in whole seconds, as used for the cookie `Max-Age`.
    pub fn expiry_secs(&self) -> Option<u64> {
        self.expiry.map(|d| d.as_secs())
    }
}
