//! Mapping from the TOML sections onto runtime configuration.
//!
//! The TOML layer accepts anything that parses; values the runtime types
//! cannot represent are rejected here with [`ConfigError::Invalid`].

use std::net::SocketAddr;
use std::time::Duration;

use satchel_config::{
    ApiSection, ConfigError, ExpirySetting, IpPinningSetting, Result, ServerSection,
    SessionSection, StorageSection,
};
use satchel_server::{ApiConfig, ApiMethod, ServerConfig};
use satchel_session::{
    CookieSettings, IpPinning, MAX_SESSION_ID_LENGTH, SameSitePolicy, SessionConfig,
    StorageConfig,
};

/// Build the lifecycle configuration from `[session]`.
pub fn session_config(section: &SessionSection) -> Result<SessionConfig> {
    let mut config = SessionConfig::new();

    config = match section.expiry_in_seconds {
        ExpirySetting::Flag(false) => config.without_expiry(),
        ExpirySetting::Flag(true) => {
            return Err(ConfigError::invalid(
                "session.expiry_in_seconds",
                "expected a number of seconds or false",
            ));
        }
        ExpirySetting::Seconds(0) => {
            return Err(ConfigError::invalid(
                "session.expiry_in_seconds",
                "must be greater than zero (use false to disable expiry)",
            ));
        }
        ExpirySetting::Seconds(secs) => config.with_expiry_secs(secs),
    };

    if section.id_length == 0 || section.id_length > MAX_SESSION_ID_LENGTH {
        return Err(ConfigError::invalid(
            "session.id_length",
            format!("must be between 1 and {MAX_SESSION_ID_LENGTH}"),
        ));
    }

    if section.store_prefix.is_empty() || section.store_prefix.contains(':') {
        return Err(ConfigError::invalid(
            "session.store_prefix",
            "must be non-empty and must not contain ':'",
        ));
    }

    let same_site: SameSitePolicy = section
        .cookie_same_site
        .parse()
        .map_err(|e: String| ConfigError::invalid("session.cookie_same_site", e))?;

    let ip_pinning = match &section.ip_pinning {
        IpPinningSetting::Flag(false) => IpPinning::Disabled,
        IpPinningSetting::Flag(true) => IpPinning::PeerAddress,
        IpPinningSetting::Header { header_name } if header_name.trim().is_empty() => {
            return Err(ConfigError::invalid(
                "session.ip_pinning.header_name",
                "must not be empty",
            ));
        }
        IpPinningSetting::Header { header_name } => IpPinning::Header {
            header_name: header_name.trim().to_string(),
        },
    };

    config = config
        .with_id_length(section.id_length)
        .with_store_prefix(section.store_prefix.clone())
        .with_cookie(CookieSettings {
            same_site,
            secure: section.cookie_secure,
            http_only: section.cookie_http_only,
            domain: section.domain.clone(),
        })
        .with_ip_pinning(ip_pinning)
        .with_rolling(section.rolling)
        .with_save_uninitialized(section.save_uninitialized)
        .with_resave(section.resave);

    match section.sweep_interval_seconds {
        Some(0) => Err(ConfigError::invalid(
            "session.sweep_interval_seconds",
            "must be greater than zero (omit it to disable the sweeper)",
        )),
        Some(secs) => Ok(config.with_sweep_interval(Duration::from_secs(secs))),
        None => Ok(config),
    }
}

/// Build the backend selection from `[session.storage]`.
pub fn storage_config(section: &StorageSection) -> Result<StorageConfig> {
    match section.driver.to_ascii_lowercase().as_str() {
        "memory" => Ok(StorageConfig::Memory),
        "fs" => {
            let base = section.base.clone().ok_or_else(|| {
                ConfigError::invalid("session.storage.base", "required by the fs driver")
            })?;
            Ok(StorageConfig::Fs { base })
        }
        "http" => {
            let url = section.url.clone().ok_or_else(|| {
                ConfigError::invalid("session.storage.url", "required by the http driver")
            })?;
            Ok(StorageConfig::Http {
                url,
                timeout: Duration::from_secs(section.timeout_seconds),
            })
        }
        other => Err(ConfigError::invalid(
            "session.storage.driver",
            format!("unknown driver '{other}' (expected memory, fs or http)"),
        )),
    }
}

/// Build the session API configuration from `[api]`.
pub fn api_config(section: &ApiSection) -> Result<ApiConfig> {
    if !section.enabled {
        return Ok(ApiConfig::disabled());
    }
    if !section.base_path.starts_with('/') {
        return Err(ConfigError::invalid("api.base_path", "must start with '/'"));
    }

    let methods = section
        .methods
        .iter()
        .map(|m| m.parse::<ApiMethod>())
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| ConfigError::invalid("api.methods", e))?;

    Ok(ApiConfig::default()
        .with_methods(methods)
        .with_base_path(section.base_path.clone()))
}

/// Build the HTTP server configuration from `[server]` and `[api]`.
pub fn server_config(server: &ServerSection, api: &ApiSection) -> Result<ServerConfig> {
    let bind_address: SocketAddr = format!("{}:{}", server.bind, server.port)
        .parse()
        .map_err(|e| ConfigError::invalid("server.bind", format!("{e}")))?;

    Ok(ServerConfig::new()
        .with_bind_address(bind_address)
        .with_request_logging(server.request_logging)
        .with_counter_route(server.counter_route)
        .with_api(api_config(api)?))
}
