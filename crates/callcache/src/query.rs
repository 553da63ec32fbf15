//! Cached remote calls
//!
//! [`CallCache::query`] derives a key for the call, serves the stored result if
//! the policy allows it, and otherwise runs the fetch collaborator and persists
//! what it returned. Persistence problems are logged and never change the
//! response handed back to the caller.

use crate::config::CacheConfig;
use crate::policy::{self, Decision};
use crate::store::{EntryLocation, EntryMeta, EntryStore, epoch_seconds};
use crate::{CacheKey, Error, Result, canonical, derive_key};
use serde::Serialize;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Boxed error returned by persistence hooks
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Status reported for responses served from the cache
pub const CACHE_HIT_STATUS: u16 = 200;

/// Status code and result of a call, whether fetched or cached
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Status code reported by the collaborator, or 200 for cache hits
    pub status: u16,
    /// Result value
    pub result: Value,
}

impl Response {
    /// Create a response
    #[must_use]
    pub fn new(status: u16, result: Value) -> Self {
        Self { status, result }
    }

    /// Whether the result was served from the cache
    #[must_use]
    pub fn is_from_cache(&self) -> bool {
        self.result
            .get(policy::FROM_CACHE_FIELD)
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Split into `(status, result)`
    #[must_use]
    pub fn into_parts(self) -> (u16, Value) {
        (self.status, self.result)
    }
}

impl From<(u16, Value)> for Response {
    fn from((status, result): (u16, Value)) -> Self {
        Self::new(status, result)
    }
}

/// Writes extra files next to a freshly persisted entry
///
/// Runs after `meta.json`, `payload.json` and `result.json` are on disk. Files
/// written here are not read back by the cache.
pub trait PersistHook {
    /// Called with the fetched result and the entry directory
    fn on_persist(&self, result: &Value, entry_dir: &Path) -> std::result::Result<(), BoxError>;
}

impl<F> PersistHook for F
where
    F: Fn(&Value, &Path) -> std::result::Result<(), BoxError>,
{
    fn on_persist(&self, result: &Value, entry_dir: &Path) -> std::result::Result<(), BoxError> {
        self(result, entry_dir)
    }
}

/// Memoizes a remote call on disk
#[derive(Debug, Clone)]
pub struct CallCache {
    store: EntryStore,
    version: Option<String>,
    ttl: Option<Duration>,
    refresh: bool,
}

impl CallCache {
    /// Build a cache from its configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] if the configuration is invalid
    pub fn new(config: CacheConfig) -> Result<Self> {
        config.validate()?;
        let ttl = config.ttl();
        Ok(Self {
            store: EntryStore::new(config.root),
            version: config.version,
            ttl,
            refresh: config.refresh,
        })
    }

    /// Use a different version tag
    #[must_use]
    pub fn with_version(mut self, version: Option<impl Into<String>>) -> Self {
        self.version = version.map(Into::into);
        self
    }

    /// Use a different TTL; `None` disables expiry
    #[must_use]
    pub fn with_ttl(mut self, ttl: Option<Duration>) -> Self {
        self.ttl = ttl;
        self
    }

    /// Bypass stored entries
    #[must_use]
    pub fn with_refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// The underlying entry store
    #[must_use]
    pub fn store(&self) -> &EntryStore {
        &self.store
    }

    /// Root directory of the cache
    #[must_use]
    pub fn root(&self) -> &Path {
        self.store.root()
    }

    /// Key a call would be stored under with the current version tag
    pub fn key_for<P: Serialize + ?Sized>(&self, endpoint: &str, payload: &P) -> Result<CacheKey> {
        let payload = canonical::to_value(payload)?;
        derive_key(endpoint, &payload, self.version.as_deref())
    }

    /// Directory a call's entry is stored in
    pub fn entry_dir<P: Serialize + ?Sized>(
        &self,
        step: &str,
        endpoint: &str,
        payload: &P,
    ) -> Result<PathBuf> {
        let key = self.key_for(endpoint, payload)?;
        Ok(self.store.location(step, &key)?.dir().to_path_buf())
    }

    /// Return the cached result for a call, or fetch and persist it
    ///
    /// Hits always report status 200 and, for object results, carry
    /// `"_from_cache": true`. Misses return whatever `fetch` produced, including
    /// non-success statuses, which are cached like any other result.
    ///
    /// # Errors
    ///
    /// Errors from `fetch` are returned unchanged. Payload encoding failures and
    /// invalid step names are converted into `E`. Nothing else fails the call.
    pub fn query<P, F, E>(
        &self,
        step: &str,
        endpoint: &str,
        payload: &P,
        fetch: F,
    ) -> std::result::Result<Response, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce(&Value) -> std::result::Result<Response, E>,
        E: From<Error>,
    {
        self.run(step, endpoint, payload, fetch, None)
    }

    /// Like [`CallCache::query`], running `hook` after a fresh entry is written
    ///
    /// # Errors
    ///
    /// Same as [`CallCache::query`]; hook failures are logged, not returned.
    pub fn query_with_hook<P, F, E, H>(
        &self,
        step: &str,
        endpoint: &str,
        payload: &P,
        fetch: F,
        hook: &H,
    ) -> std::result::Result<Response, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce(&Value) -> std::result::Result<Response, E>,
        E: From<Error>,
        H: PersistHook,
    {
        self.run(step, endpoint, payload, fetch, Some(hook as &dyn PersistHook))
    }

    fn run<P, F, E>(
        &self,
        step: &str,
        endpoint: &str,
        payload: &P,
        fetch: F,
        hook: Option<&dyn PersistHook>,
    ) -> std::result::Result<Response, E>
    where
        P: Serialize + ?Sized,
        F: FnOnce(&Value) -> std::result::Result<Response, E>,
        E: From<Error>,
    {
        let payload = canonical::to_value(payload)?;
        let key = derive_key(endpoint, &payload, self.version.as_deref())?;
        let location = self.store.location(step, &key)?;

        let reason = match policy::decide(&location, self.refresh, self.ttl, epoch_seconds()) {
            Decision::Hit(result) => {
                tracing::debug!(step, %key, endpoint, "Cache hit");
                return Ok(Response::new(
                    CACHE_HIT_STATUS,
                    policy::mark_from_cache(result),
                ));
            }
            Decision::Miss(reason) => reason,
        };
        tracing::debug!(step, %key, endpoint, %reason, "Cache miss, fetching");

        let response = fetch(&payload)?;

        if let Err(e) = self.persist(&location, endpoint, &payload, &response.result, hook) {
            tracing::warn!(
                step,
                %key,
                dir = %location.dir().display(),
                "Failed to write cache entry: {e}"
            );
        }

        Ok(response)
    }

    fn persist(
        &self,
        location: &EntryLocation,
        endpoint: &str,
        payload: &Value,
        result: &Value,
        hook: Option<&dyn PersistHook>,
    ) -> Result<()> {
        let meta = EntryMeta::new(
            location.step(),
            location.key(),
            endpoint,
            self.version.as_deref(),
        );
        location.write(&meta, payload, result)?;

        if let Some(hook) = hook {
            hook.on_persist(result, location.dir())
                .map_err(|e| Error::persistence(location.dir(), e))?;
        }
        Ok(())
    }
}
