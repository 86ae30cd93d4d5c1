//! Configuration system for Satchel.
//!
//! Provides TOML-based configuration with:
//! - `[server]`, `[session]`, `[session.storage]` and `[api]` sections
//! - Config file layering (user config dir + project-local overrides)
//!
//! The sections are plain data. Mapping them onto the runtime types of
//! `satchel-session` and `satchel-server` (and rejecting values those
//! types cannot represent) happens in the binary.

pub mod discovery;
pub mod error;
pub mod types;

pub use discovery::{
    ConfigSource, LoadedConfig, load_config, load_config_file, load_config_with_options,
    save_config, xdg_config_dir, xdg_config_path,
};
pub use error::{ConfigError, Result};
pub use types::*;
