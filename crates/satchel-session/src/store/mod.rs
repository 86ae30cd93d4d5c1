//! Session storage: pluggable key-value backends and the prefixed store façade.
//!
//! [`KvBackend`] decouples the manager from where records live. One adapter
//! exists per backend and [`build_backend`] picks one from a
//! [`StorageConfig`] at startup. [`SessionStore`] sits on top, owning the
//! `{prefix}:{id}` key scheme and the JSON encoding of records.

mod fs;
mod http;
mod memory;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{trace, warn};

use crate::error::StoreError;
use crate::record::{SessionRecord, is_valid_session_id};

pub use fs::FsBackend;
pub use http::HttpBackend;
pub use memory::MemoryBackend;

/// Result type for backend operations.
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// A string-keyed, string-valued storage backend.
///
/// Keys are `:`-separated paths (e.g. `sessions:abc`). Implementations must
/// treat a missing key as `Ok(None)` and removal of a missing key as success.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Read the value stored at `key`.
    async fn get_item(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write `value` at `key`, replacing anything already there.
    async fn set_item(&self, key: &str, value: String) -> StoreResult<()>;

    /// Remove `key`.
    async fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// List every key that starts with `prefix`.
    async fn get_keys(&self, prefix: &str) -> StoreResult<Vec<String>>;

    /// Short backend name for logs.
    fn name(&self) -> &'static str;
}

/// Shared handle to a backend.
pub type SharedBackend = Arc<dyn KvBackend>;

/// Backend selection, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum StorageConfig {
    /// Process-local map. Contents are lost on restart.
    #[default]
    Memory,
    /// One file per key under `base`.
    Fs { base: PathBuf },
    /// Remote KV service speaking plain HTTP.
    Http { url: String, timeout: Duration },
}

impl StorageConfig {
    /// Driver name as written in configuration files.
    pub fn driver(&self) -> &'static str {
        match self {
            StorageConfig::Memory => "memory",
            StorageConfig::Fs { .. } => "fs",
            StorageConfig::Http { .. } => "http",
        }
    }
}

/// Instantiate the backend described by `config`.
pub fn build_backend(config: &StorageConfig) -> StoreResult<SharedBackend> {
    let backend: SharedBackend = match config {
        StorageConfig::Memory => Arc::new(MemoryBackend::new()),
        StorageConfig::Fs { base } => Arc::new(FsBackend::new(base.clone())),
        StorageConfig::Http { url, timeout } => Arc::new(HttpBackend::new(url, *timeout)?),
    };
    Ok(backend)
}

/// Result of reading one key through [`SessionStore::lookup`].
#[derive(Debug, Clone, PartialEq)]
pub enum Lookup {
    Missing,
    Malformed,
    Found(SessionRecord),
}

/// Prefixed façade storing [`SessionRecord`]s by session id.
#[derive(Clone)]
pub struct SessionStore {
    backend: SharedBackend,
    prefix: String,
}

impl std::fmt::Debug for SessionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionStore")
            .field("backend", &self.backend.name())
            .field("prefix", &self.prefix)
            .finish()
    }
}

impl SessionStore {
    /// Create a store writing under `prefix` on `backend`.
    pub fn new(backend: SharedBackend, prefix: impl Into<String>) -> Self {
        Self {
            backend,
            prefix: prefix.into(),
        }
    }

    /// The key prefix.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// The underlying backend.
    pub fn backend(&self) -> &SharedBackend {
        &self.backend
    }

    /// Storage key for `id`.
    pub fn key(&self, id: &str) -> String {
        format!("{}:{}", self.prefix, id)
    }

    /// Load the record stored for `id`.
    ///
    /// Missing keys, ids we would never issue, and values that are not
    /// well-formed records all come back as `Ok(None)`.
    pub async fn get(&self, id: &str) -> StoreResult<Option<SessionRecord>> {
        Ok(match self.lookup(id).await? {
            Lookup::Found(record) => Some(record),
            Lookup::Missing | Lookup::Malformed => None,
        })
    }

    /// Like [`get`](Self::get), but tells a missing key apart from a
    /// stored value that is not a valid record.
    pub async fn lookup(&self, id: &str) -> StoreResult<Lookup> {
        if !is_valid_session_id(id) {
            trace!("Ignoring malformed session id");
            return Ok(Lookup::Missing);
        }

        let key = self.key(id);
        let Some(raw) = self.backend.get_item(&key).await? else {
            return Ok(Lookup::Missing);
        };

        Ok(match decode_record(&key, &raw) {
            Some(record) => Lookup::Found(record),
            None => Lookup::Malformed,
        })
    }

    /// Upsert `record` under `id`.
    pub async fn set(&self, id: &str, record: &SessionRecord) -> StoreResult<()> {
        if !is_valid_session_id(id) {
            return Err(StoreError::InvalidKey(id.to_string()));
        }
        let raw = serde_json::to_string(record)?;
        self.backend.set_item(&self.key(id), raw).await
    }

    /// Remove the record for `id`. Removing a missing record is not an error.
    pub async fn delete(&self, id: &str) -> StoreResult<()> {
        if !is_valid_session_id(id) {
            return Ok(());
        }
        self.backend.remove_item(&self.key(id)).await
    }

    /// List the ids of every stored session.
    pub async fn list_ids(&self) -> StoreResult<Vec<String>> {
        let prefix = format!("{}:", self.prefix);
        let keys = self.backend.get_keys(&prefix).await?;
        Ok(keys
            .into_iter()
            .filter_map(|key| key.strip_prefix(&prefix).map(str::to_string))
            .filter(|id| is_valid_session_id(id))
            .collect())
    }
}

/// Decode a stored value, discarding anything that is not a well-formed record.
fn decode_record(key: &str, raw: &str) -> Option<SessionRecord> {
    let value: Value = match serde_json::from_str(raw) {
        Ok(value) => value,
        Err(e) => {
            warn!(key = %key, error = %e, "Stored session is not valid JSON");
            return None;
        }
    };

    if !crate::validator::is_well_formed(&value) {
        warn!(key = %key, "Stored session is missing id or createdAt");
        return None;
    }

    match serde_json::from_value(value) {
        Ok(record) => Some(record),
        Err(e) => {
            warn!(key = %key, error = %e, "Stored session has invalid metadata");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn memory_store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryBackend::new()), "sessions")
    }

    #[tokio::test]
    async fn test_set_get_delete() {
        let store = memory_store();
        let record = SessionRecord::new("abc", Utc::now());

        store.set("abc", &record).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), Some(record));

        store.delete("abc").await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let store = memory_store();
        assert_eq!(store.get("missing").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_delete_is_idempotent() {
        let store = memory_store();
        store.delete("never-existed").await.unwrap();
        store.delete("never-existed").await.unwrap();
    }

    #[tokio::test]
    async fn test_set_overwrites() {
        let store = memory_store();
        let first = SessionRecord::new("abc", Utc::now());
        let mut second = first.clone();
        second.data.insert("count".to_string(), Value::from(2));

        store.set("abc", &first).await.unwrap();
        store.set("abc", &second).await.unwrap();
        assert_eq!(store.get("abc").await.unwrap(), Some(second));
    }

    #[tokio::test]
    async fn test_key_uses_prefix() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone(), "userSessions");
        store
            .set("abc", &SessionRecord::new("abc", Utc::now()))
            .await
            .unwrap();

        assert!(backend.get_item("userSessions:abc").await.unwrap().is_some());
        assert!(backend.get_item("sessions:abc").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_prefixes_isolate_stores() {
        let backend: SharedBackend = Arc::new(MemoryBackend::new());
        let a = SessionStore::new(backend.clone(), "a");
        let b = SessionStore::new(backend.clone(), "b");

        a.set("one", &SessionRecord::new("one", Utc::now()))
            .await
            .unwrap();
        b.set("two", &SessionRecord::new("two", Utc::now()))
            .await
            .unwrap();

        assert_eq!(a.list_ids().await.unwrap(), vec!["one".to_string()]);
        assert_eq!(b.list_ids().await.unwrap(), vec!["two".to_string()]);
        assert!(a.get("two").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_malformed_values_are_absent() {
        let backend = Arc::new(MemoryBackend::new());
        let store = SessionStore::new(backend.clone(), "sessions");

        backend
            .set_item("sessions:notjson", "{{{".to_string())
            .await
            .unwrap();
        backend
            .set_item("sessions:noid", r#"{"createdAt":"2026-01-01T00:00:00Z"}"#.to_string())
            .await
            .unwrap();
        backend
            .set_item("sessions:baddate", r#"{"id":"baddate","createdAt":42}"#.to_string())
            .await
            .unwrap();

        assert_eq!(store.lookup("notjson").await.unwrap(), Lookup::Malformed);
        assert_eq!(store.lookup("nothere").await.unwrap(), Lookup::Missing);
        assert!(store.get("notjson").await.unwrap().is_none());
        assert!(store.get("noid").await.unwrap().is_none());
        assert!(store.get("baddate").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_invalid_ids_never_reach_backend() {
        let store = memory_store();
        assert!(store.get("../escape").await.unwrap().is_none());
        assert!(matches!(
            store
                .set("../escape", &SessionRecord::new("x", Utc::now()))
                .await,
            Err(StoreError::InvalidKey(_))
        ));
        store.delete("../escape").await.unwrap();
    }

    #[test]
    fn test_build_backend_names() {
        assert_eq!(build_backend(&StorageConfig::Memory).unwrap().name(), "memory");
        let fs = StorageConfig::Fs {
            base: PathBuf::from("/tmp/satchel-test"),
        };
        assert_eq!(build_backend(&fs).unwrap().name(), "fs");
        let http = StorageConfig::Http {
            url: "http://127.0.0.1:1".to_string(),
            timeout: Duration::from_secs(1),
        };
        assert_eq!(build_backend(&http).unwrap().name(), "http");
        assert_eq!(http.driver(), "http");
    }
}
