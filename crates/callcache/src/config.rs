//! Cache configuration
//!
//! [`CacheConfig`] is plain data: it can be built in code or deserialized as
//! part of a host application's own config file.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Directory used when no cache root is configured (relative to the working directory)
pub const DEFAULT_CACHE_DIR: &str = ".call_cache";

/// Settings that apply to every query made through a [`crate::CallCache`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CacheConfig {
    /// Root directory of the cache
    pub root: PathBuf,
    /// Version tag mixed into every key (model tag, image digest, git SHA...)
    pub version: Option<String>,
    /// Maximum entry age in seconds; `None` disables expiry
    pub ttl_seconds: Option<u64>,
    /// Ignore stored entries and always fetch
    pub refresh: bool,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_CACHE_DIR),
            version: None,
            ttl_seconds: None,
            refresh: false,
        }
    }
}

impl CacheConfig {
    /// Default configuration rooted at `root`
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// TTL as a [`Duration`]
    #[must_use]
    pub fn ttl(&self) -> Option<Duration> {
        self.ttl_seconds.map(Duration::from_secs)
    }

    /// Check the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the root path is empty
    pub fn validate(&self) -> Result<()> {
        if self.root.as_os_str().is_empty() {
            return Err(Error::configuration("cache root must not be empty"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = CacheConfig::default();
        assert_eq!(config.root, PathBuf::from(".call_cache"));
        assert!(config.version.is_none());
        assert!(config.ttl().is_none());
        assert!(!config.refresh);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn deserialize_partial() {
        let config: CacheConfig =
            serde_json::from_str(r#"{"root": "/var/cache/nim", "ttl_seconds": 3600}"#).unwrap();
        assert_eq!(config.root, PathBuf::from("/var/cache/nim"));
        assert_eq!(config.ttl(), Some(Duration::from_secs(3600)));
        assert!(!config.refresh);
    }

    #[test]
    fn deserialize_rejects_unknown_fields() {
        let result = serde_json::from_str::<CacheConfig>(r#"{"ttl": 5}"#);
        assert!(result.is_err());
    }

    #[test]
    fn empty_root_is_invalid() {
        let config = CacheConfig::new("");
        assert!(matches!(
            config.validate(),
            Err(Error::Configuration { .. })
        ));
    }
}
