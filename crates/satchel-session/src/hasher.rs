//! One-way hashing of client IP addresses for session pinning.
//!
//! Only the Argon2id hash of an IP is ever stored. Every call draws a fresh
//! salt, so two hashes of the same address differ but both verify.
//!
//! Argon2 is deliberately expensive; [`IpHasher::hash`] and
//! [`IpHasher::verify`] run on the blocking pool so they never stall the
//! async executor.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand::RngCore;

use crate::error::{Error, Result};

/// Length of the raw Argon2 output in bytes.
pub const HASH_OUTPUT_LEN: usize = 60;

/// Argon2id hasher for client IP addresses.
#[derive(Clone)]
pub struct IpHasher {
    argon2: Argon2<'static>,
}

impl std::fmt::Debug for IpHasher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IpHasher")
            .field("params", self.argon2.params())
            .finish()
    }
}

impl Default for IpHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl IpHasher {
    /// Argon2id with the crate's recommended memory and time costs.
    pub fn new() -> Self {
        // The default costs are constants the crate guarantees to be valid.
        Self::with_params(
            Params::DEFAULT_M_COST,
            Params::DEFAULT_T_COST,
            Params::DEFAULT_P_COST,
        )
        .unwrap_or_else(|_| Self {
            argon2: Argon2::default(),
        })
    }

    /// Argon2id with explicit costs (memory in KiB, iterations, lanes).
    pub fn with_params(m_cost: u32, t_cost: u32, p_cost: u32) -> Result<Self> {
        let params = Params::new(m_cost, t_cost, p_cost, Some(HASH_OUTPUT_LEN))
            .map_err(|e| Error::Hash(e.to_string()))?;
        Ok(Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        })
    }

    /// Hash `value`. Absent input yields an absent hash.
    pub async fn hash(&self, value: Option<&str>) -> Result<Option<String>> {
        let Some(value) = value.filter(|v| !v.is_empty()) else {
            return Ok(None);
        };

        let hasher = self.clone();
        let value = value.to_string();
        tokio::task::spawn_blocking(move || hasher.hash_blocking(&value))
            .await
            .map_err(|e| Error::Hash(format!("hashing task failed: {e}")))?
            .map(Some)
    }

    /// Check `candidate` against a stored hash.
    ///
    /// Returns `false` when either side is absent or the stored hash cannot
    /// be parsed. The comparison itself is Argon2's, which recomputes the
    /// hash with the stored salt and compares outputs in constant time.
    pub async fn verify(&self, candidate: Option<&str>, stored: Option<&str>) -> bool {
        let (Some(candidate), Some(stored)) = (candidate, stored) else {
            return false;
        };

        let hasher = self.clone();
        let candidate = candidate.to_string();
        let stored = stored.to_string();
        tokio::task::spawn_blocking(move || hasher.verify_blocking(&candidate, &stored))
            .await
            .unwrap_or(false)
    }

    /// Synchronous hash, for callers already off the async executor.
    pub fn hash_blocking(&self, value: &str) -> Result<String> {
        // Salt bytes come straight from the thread-local CSPRNG.
        let mut salt_bytes = [0u8; 16];
        rand::rng().fill_bytes(&mut salt_bytes);
        let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| Error::Hash(e.to_string()))?;

        self.argon2
            .hash_password(value.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Hash(e.to_string()))
    }

    /// Synchronous verify, for callers already off the async executor.
    pub fn verify_blocking(&self, candidate: &str, stored: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(stored) else {
            return false;
        };
        self.argon2
            .verify_password(candidate.as_bytes(), &parsed)
            .is_ok()
    }
}

#[cfg(test)]
pub(crate) fn test_hasher() -> IpHasher {
    // Minimum costs keep the suite fast; the algorithm is unchanged.
    IpHasher::with_params(Params::MIN_M_COST.max(8), 1, 1).expect("valid argon2 params")
}
