//! The request-scoped session slot shared between the manager and handlers.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::{Error, Result};
use crate::record::{SessionData, SessionRecord, is_reserved_key};

/// What the boundary should do with the session cookie on the way out.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum CookieDirective {
    /// Leave the client's cookie alone.
    #[default]
    Keep,
    /// Send the cookie for this id with a fresh max-age.
    Issue(String),
    /// Clear the cookie.
    Remove,
}

/// Snapshot taken when a record was bound, used for dirty-checking.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Baseline {
    /// Freshly minted; excludes any staged writes merged at mint time.
    Pristine(SessionRecord),
    /// As read from the store, before any renewal.
    Loaded(SessionRecord),
}

#[derive(Debug, Default)]
struct Slot {
    record: Option<SessionRecord>,
    baseline: Option<Baseline>,
    /// Writes made while no record is bound.
    staged: SessionData,
    cookie: CookieDirective,
    client_ip: Option<String>,
}

/// Handle to the session of one request.
///
/// Clones share the same slot. Handlers read and write application data
/// through it; the manager binds records to it during resolution and reads
/// it back at completion.
#[derive(Debug, Clone, Default)]
pub struct SessionContext {
    slot: Arc<Mutex<Slot>>,
}

impl SessionContext {
    pub fn new() -> Self {
        Self::default()
    }

    /// Id of the bound session.
    pub fn id(&self) -> Option<String> {
        self.slot.lock().record.as_ref().map(|r| r.id.clone())
    }

    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.slot.lock().record.as_ref().map(|r| r.created_at)
    }

    /// Whether a record is currently bound.
    pub fn is_bound(&self) -> bool {
        self.slot.lock().record.is_some()
    }

    /// Whether the bound record was minted during this request.
    pub fn is_new(&self) -> bool {
        matches!(self.slot.lock().baseline, Some(Baseline::Pristine(_)))
    }

    /// Raw value stored under `key`.
    pub fn get_value(&self, key: &str) -> Option<Value> {
        let slot = self.slot.lock();
        match slot.record {
            Some(ref record) => record.data.get(key).cloned(),
            None => slot.staged.get(key).cloned(),
        }
    }

    /// Value stored under `key`, deserialized into `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        match self.get_value(key) {
            Some(value) => Ok(Some(serde_json::from_value(value)?)),
            None => Ok(None),
        }
    }

    /// Store `value` under `key`. Metadata keys are rejected.
    pub fn insert<T: Serialize>(&self, key: &str, value: T) -> Result<()> {
        reject_reserved(std::iter::once(key))?;
        let value = serde_json::to_value(value)?;
        self.with_data(|data| {
            data.insert(key.to_string(), value);
        });
        Ok(())
    }

    /// Remove `key`, returning its previous value.
    pub fn remove(&self, key: &str) -> Option<Value> {
        self.with_data(|data| data.remove(key))
    }

    /// Copy of the application data.
    pub fn data(&self) -> SessionData {
        let slot = self.slot.lock();
        match slot.record {
            Some(ref record) => record.data.clone(),
            None => slot.staged.clone(),
        }
    }

    /// Merge `patch` into the application data.
    ///
    /// Fails without applying anything if `patch` names a metadata key.
    pub fn merge(&self, patch: SessionData) -> Result<()> {
        reject_reserved(patch.keys().map(String::as_str))?;
        self.with_data(|data| {
            for (key, value) in patch {
                data.insert(key, value);
            }
        });
        Ok(())
    }

    /// Replace the application data wholesale. Metadata is preserved.
    pub fn replace(&self, data: SessionData) -> Result<()> {
        reject_reserved(data.keys().map(String::as_str))?;
        self.with_data(|current| *current = data);
        Ok(())
    }

    /// Copy of the bound record.
    pub fn record(&self) -> Option<SessionRecord> {
        self.slot.lock().record.clone()
    }

    /// Pending cookie action.
    pub fn cookie_directive(&self) -> CookieDirective {
        self.slot.lock().cookie.clone()
    }

    /// Client IP observed when the session was resolved.
    pub fn client_ip(&self) -> Option<String> {
        self.slot.lock().client_ip.clone()
    }

    fn with_data<R>(&self, f: impl FnOnce(&mut SessionData) -> R) -> R {
        let mut slot = self.slot.lock();
        let slot = &mut *slot;
        match slot.record {
            Some(ref mut record) => f(&mut record.data),
            None => f(&mut slot.staged),
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Manager side
    // ─────────────────────────────────────────────────────────────────────────

    pub(crate) fn set_client_ip(&self, ip: Option<String>) {
        self.slot.lock().client_ip = ip;
    }

    pub(crate) fn set_cookie(&self, directive: CookieDirective) {
        self.slot.lock().cookie = directive;
    }

    pub(crate) fn has_staged(&self) -> bool {
        !self.slot.lock().staged.is_empty()
    }

    /// Bind a freshly minted record, folding in anything staged so far.
    ///
    /// `pristine` must not contain staged data; the returned record does.
    pub(crate) fn bind_minted(&self, pristine: SessionRecord) -> SessionRecord {
        let mut slot = self.slot.lock();
        let mut record = pristine.clone();
        for (key, value) in std::mem::take(&mut slot.staged) {
            record.data.insert(key, value);
        }
        slot.baseline = Some(Baseline::Pristine(pristine));
        slot.record = Some(record.clone());
        record
    }

    /// Bind a record read from the store. `current` may carry a renewed
    /// `createdAt`; `loaded` is what the store held.
    pub(crate) fn bind_loaded(&self, loaded: SessionRecord, current: SessionRecord) {
        let mut slot = self.slot.lock();
        let mut current = current;
        for (key, value) in std::mem::take(&mut slot.staged) {
            current.data.insert(key, value);
        }
        slot.baseline = Some(Baseline::Loaded(loaded));
        slot.record = Some(current);
    }

    /// Drop the bound record and any staged data.
    pub(crate) fn unbind(&self) {
        let mut slot = self.slot.lock();
        slot.record = None;
        slot.baseline = None;
        slot.staged.clear();
    }

    pub(crate) fn baseline(&self) -> Option<Baseline> {
        self.slot.lock().baseline.clone()
    }
}

fn reject_reserved<'a>(mut keys: impl Iterator<Item = &'a str>) -> Result<()> {
    match keys.find(|key| is_reserved_key(key)) {
        Some(key) => Err(Error::ReservedKey(key.to_string())),
        None => Ok(()),
    }
}
