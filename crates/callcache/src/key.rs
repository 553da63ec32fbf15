//! Cache key derivation
//!
//! A key is the SHA-256 digest of the canonical encoding of
//! `{endpoint, payload, version}`. Absent versions hash as the empty string.

use crate::{canonical, Error, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

/// Length of a rendered cache key in hex characters
pub const KEY_HEX_LEN: usize = 64;

/// Identity of a cache entry (SHA-256 as lowercase hex)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CacheKey(String);

impl CacheKey {
    /// Compute a key directly from already-encoded bytes
    #[must_use]
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self(hex::encode(Sha256::digest(bytes)))
    }

    /// Parse a key from its hex representation
    ///
    /// # Errors
    ///
    /// Returns error if the string is not 64 hex characters
    pub fn from_hex(hex: impl Into<String>) -> Result<Self> {
        let s = hex.into();
        if s.len() != KEY_HEX_LEN {
            return Err(Error::configuration(format!(
                "CacheKey must be {KEY_HEX_LEN} hex characters, got {}",
                s.len()
            )));
        }
        if !s.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(Error::configuration("CacheKey must contain only hex digits"));
        }
        Ok(Self(s.to_ascii_lowercase()))
    }

    /// Get the hex representation
    #[must_use]
    pub fn as_hex(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CacheKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for CacheKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// The composite value that gets hashed into a [`CacheKey`]
#[derive(Debug, Clone, Serialize)]
pub struct KeyEnvelope<'a> {
    /// Remote endpoint being called
    pub endpoint: &'a str,
    /// Request payload
    pub payload: &'a Value,
    /// Version tag, `""` when absent
    pub version: &'a str,
}

impl<'a> KeyEnvelope<'a> {
    /// Build an envelope, normalising an absent version to `""`
    #[must_use]
    pub fn new(endpoint: &'a str, payload: &'a Value, version: Option<&'a str>) -> Self {
        Self {
            endpoint,
            payload,
            version: version.unwrap_or(""),
        }
    }

    /// Hash the canonical encoding of this envelope
    pub fn key(&self) -> Result<CacheKey> {
        let bytes = canonical::to_vec(self)?;
        Ok(CacheKey::from_bytes(&bytes))
    }
}

/// Derive the cache key for a call
pub fn derive_key(endpoint: &str, payload: &Value, version: Option<&str>) -> Result<CacheKey> {
    KeyEnvelope::new(endpoint, payload, version).key()
}
