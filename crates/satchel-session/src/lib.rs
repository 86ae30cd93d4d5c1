//! Server-side session lifecycle management.
//!
//! This crate resolves, validates, creates and persists sessions over a
//! pluggable key-value store:
//! - [`SessionManager`] runs the per-request state machine (expiry, rolling
//!   renewal, IP pinning, save-on-modify) and the single write-back
//! - [`SessionContext`] is the request-scoped slot handlers read and write
//! - [`CompletionHook`] carries the write-back to the end of the request
//! - [`SessionStore`] stores records at `{prefix}:{id}` on any [`KvBackend`]
//! - [`IpHasher`] produces salted Argon2id hashes of client IPs
//!
//! It knows nothing about HTTP; `satchel-server` provides the axum boundary.
//!
//! # Example
//!
//! ```rust,ignore
//! use satchel_session::{SessionConfig, SessionContext, SessionManager, StorageConfig};
//!
//! let manager = SessionManager::from_config(
//!     SessionConfig::default().with_rolling(true),
//!     &StorageConfig::Memory,
//! )?;
//!
//! let ctx = SessionContext::new();
//! manager.resolve(&ctx, cookie_id, Some("203.0.113.9")).await?;
//! ctx.insert("count", 1)?;
//! manager.commit(&ctx).await?;
//! ```

mod completion;
mod config;
mod context;
mod error;
mod events;
mod hasher;
mod manager;
mod record;
pub mod store;
mod sweep;
pub mod validator;

pub use completion::CompletionHook;
pub use config::{
    CookieSettings, DEFAULT_EXPIRY, DEFAULT_ID_LENGTH, DEFAULT_STORE_PREFIX, IpPinning,
    SESSION_COOKIE_NAME, SameSitePolicy, SessionConfig,
};
pub use context::{CookieDirective, SessionContext};
pub use error::{Error, Result, StoreError};
pub use events::{EventBus, SessionEvent};
pub use hasher::IpHasher;
pub use manager::{CommitOutcome, SessionManager, SessionState};
pub use record::{
    MAX_SESSION_ID_LENGTH, RESERVED_KEYS, SessionData, SessionRecord, generate_session_id,
    is_reserved_key, is_valid_session_id,
};
pub use store::{
    FsBackend, HttpBackend, KvBackend, Lookup, MemoryBackend, SessionStore, SharedBackend,
    StorageConfig, build_backend,
};
pub use validator::IpOutcome;
