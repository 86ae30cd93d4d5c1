//! The persisted session record and session id generation.

use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Keys that belong to session metadata and can never be written by handlers.
pub const RESERVED_KEYS: [&str; 3] = ["id", "createdAt", "ip"];

/// Upper bound on ids accepted from clients.
pub const MAX_SESSION_ID_LENGTH: usize = 256;

/// URL-safe alphabet, 64 symbols so a random byte maps without bias.
const ID_ALPHABET: &[u8; 64] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789_-";

/// Application data attached to a session.
pub type SessionData = Map<String, Value>;

/// A session as stored in the backend.
///
/// Metadata lives in typed fields; application data lives in a separate map
/// that is flattened next to the metadata on the wire:
///
/// ```json
/// {"id":"V1StGXR8...","createdAt":"2026-01-15T10:00:00Z","count":5}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionRecord {
    pub id: String,

    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,

    /// Argon2 hash of the client IP, present when IP pinning is enabled.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip: Option<String>,

    #[serde(flatten)]
    pub data: SessionData,
}

impl SessionRecord {
    /// Create a record with no application data.
    pub fn new(id: impl Into<String>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            created_at,
            ip: None,
            data: Map::new(),
        }
    }

    /// Attach an IP hash.
    pub fn with_ip(mut self, ip: Option<String>) -> Self {
        self.ip = ip;
        self
    }

    /// Attach application data.
    pub fn with_data(mut self, data: SessionData) -> Self {
        self.data = data;
        self
    }

    /// Seconds elapsed since `created_at`, relative to `now`.
    pub fn age_secs(&self, now: DateTime<Utc>) -> i64 {
        now.signed_duration_since(self.created_at).num_seconds()
    }

    /// Render the record in its flat wire shape.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert("id".to_string(), Value::String(self.id.clone()));
        map.insert(
            "createdAt".to_string(),
            Value::String(self.created_at.to_rfc3339()),
        );
        if let Some(ref ip) = self.ip {
            map.insert("ip".to_string(), Value::String(ip.clone()));
        }
        for (key, value) in &self.data {
            map.insert(key.clone(), value.clone());
        }
        Value::Object(map)
    }
}

/// Whether `key` names session metadata.
pub fn is_reserved_key(key: &str) -> bool {
    RESERVED_KEYS.contains(&key)
}

/// Generate a random session id of `len` characters.
pub fn generate_session_id(len: usize) -> String {
    let mut bytes = vec![0u8; len];
    rand::rng().fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| ID_ALPHABET[(b & 63) as usize] as char)
        .collect()
}

/// Whether an id received from a client is shaped like one we could have issued.
pub fn is_valid_session_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= MAX_SESSION_ID_LENGTH
        && id.bytes().all(|b| ID_ALPHABET.contains(&b))
}
