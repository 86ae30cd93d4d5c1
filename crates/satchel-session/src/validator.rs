//! Decision functions applied to a loaded record.
//!
//! Apart from the IP check, which needs the hasher, nothing here touches
//! I/O or the clock: callers pass `now` in.

use std::time::Duration;

use chrono::{DateTime, Utc};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::hasher::IpHasher;
use crate::record::SessionRecord;

/// Outcome of comparing a request IP against a record's IP hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IpOutcome {
    Match,
    Mismatch,
    /// Pinning is on but the record was stored without a hash.
    MissingFromRecord,
}

/// Whether `value` is an object carrying at least `id` and `createdAt`.
pub fn is_well_formed(value: &Value) -> bool {
    value
        .as_object()
        .is_some_and(|map| map.contains_key("id") && map.contains_key("createdAt"))
}

/// Whether `record` has outlived `expiry` at `now`.
///
/// Disabled expiry never expires. The boundary is exclusive: a record
/// exactly `expiry` old is still live.
pub fn is_expired(record: &SessionRecord, expiry: Option<Duration>, now: DateTime<Utc>) -> bool {
    let Some(expiry) = expiry else {
        return false;
    };
    let limit = i64::try_from(expiry.as_secs()).unwrap_or(i64::MAX);
    record.age_secs(now) > limit
}

/// Compare `request_ip` with the hash stored on `record`.
pub async fn ip_matches(
    record: &SessionRecord,
    request_ip: Option<&str>,
    hasher: &IpHasher,
) -> IpOutcome {
    let Some(stored) = record.ip.as_deref().filter(|ip| !ip.is_empty()) else {
        return IpOutcome::MissingFromRecord;
    };

    if hasher.verify(request_ip, Some(stored)).await {
        IpOutcome::Match
    } else {
        IpOutcome::Mismatch
    }
}

/// [`ip_matches`] expressed as the distinguished error signals.
///
/// `Err(Error::IpMissingFromSession)` marks a corrupted record,
/// `Err(Error::IpMismatch)` a possible hijack attempt.
pub async fn check_ip(
    record: &SessionRecord,
    request_ip: Option<&str>,
    hasher: &IpHasher,
) -> Result<()> {
    match ip_matches(record, request_ip, hasher).await {
        IpOutcome::Match => Ok(()),
        IpOutcome::Mismatch => Err(Error::IpMismatch),
        IpOutcome::MissingFromRecord => Err(Error::IpMissingFromSession),
    }
}
