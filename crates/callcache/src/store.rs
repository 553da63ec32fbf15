//! On-disk entry storage
//!
//! Every entry lives in its own directory:
//!
//! ```text
//! <root>/
//!   <step>/
//!     <key>/
//!       meta.json      step, key, endpoint, version, created_at
//!       payload.json   the request payload, kept for auditing
//!       result.json    the fetched result
//! ```
//!
//! Each artifact is written to a temp file in the entry directory, synced, and
//! then renamed over the final path, so a reader only ever sees a complete old
//! file or a complete new one. The three artifacts are not replaced as a set.

use crate::{canonical, CacheKey, Error, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs;
use std::io::Write;
use std::path::{Component, Path, PathBuf};
use tempfile::NamedTempFile;

/// One of the three files that make up an entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Artifact {
    /// `meta.json`
    Meta,
    /// `payload.json`
    Payload,
    /// `result.json`
    Result,
}

impl Artifact {
    /// All artifacts, in write order
    pub const ALL: [Self; 3] = [Self::Meta, Self::Payload, Self::Result];

    /// File name inside the entry directory
    #[must_use]
    pub const fn file_name(self) -> &'static str {
        match self {
            Self::Meta => "meta.json",
            Self::Payload => "payload.json",
            Self::Result => "result.json",
        }
    }
}

/// Contents of `meta.json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryMeta {
    /// Logical step that produced the entry
    pub step: String,
    /// Key the entry is stored under
    pub key: CacheKey,
    /// Endpoint that was called
    pub endpoint: String,
    /// Version tag, `null` when absent
    pub version: Option<String>,
    /// Creation time in fractional seconds since the Unix epoch
    #[serde(default)]
    pub created_at: f64,
}

impl EntryMeta {
    /// Metadata for an entry created now
    #[must_use]
    pub fn new(step: &str, key: &CacheKey, endpoint: &str, version: Option<&str>) -> Self {
        Self {
            step: step.to_string(),
            key: key.clone(),
            endpoint: endpoint.to_string(),
            version: version.map(str::to_string),
            created_at: epoch_seconds(),
        }
    }

    /// Seconds elapsed between creation and `now`
    #[must_use]
    pub fn age_secs(&self, now: f64) -> f64 {
        now - self.created_at
    }
}

/// Current time in fractional seconds since the Unix epoch
#[must_use]
#[expect(
    clippy::cast_precision_loss,
    reason = "Epoch seconds fit in f64 with sub-microsecond precision"
)]
pub fn epoch_seconds() -> f64 {
    let now = Utc::now();
    now.timestamp() as f64 + f64::from(now.timestamp_subsec_nanos()) / 1e9
}

/// Root of the on-disk cache
#[derive(Debug, Clone)]
pub struct EntryStore {
    root: PathBuf,
}

impl EntryStore {
    /// Create a store rooted at `root`; nothing is created until the first write
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of the store
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve where the entry for `(step, key)` lives
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidStep`] if `step` is not a single path component
    pub fn location(&self, step: &str, key: &CacheKey) -> Result<EntryLocation> {
        validate_step(step)?;
        Ok(EntryLocation {
            dir: self.root.join(step).join(key.as_hex()),
            step: step.to_string(),
            key: key.clone(),
        })
    }

    /// Find an existing entry, along with its metadata if it is readable
    #[must_use]
    pub fn lookup(&self, step: &str, key: &CacheKey) -> Option<StoredEntry> {
        let location = self.location(step, key).ok()?;
        if !location.is_present() {
            return None;
        }
        let meta = location.read_meta().ok();
        Some(StoredEntry { location, meta })
    }
}

/// An entry found on disk
#[derive(Debug, Clone)]
pub struct StoredEntry {
    /// Where the entry lives
    pub location: EntryLocation,
    /// Parsed `meta.json`, `None` if missing or unreadable
    pub meta: Option<EntryMeta>,
}

/// Directory of a single `(step, key)` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryLocation {
    dir: PathBuf,
    step: String,
    key: CacheKey,
}

impl EntryLocation {
    /// Entry directory
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Step this entry belongs to
    #[must_use]
    pub fn step(&self) -> &str {
        &self.step
    }

    /// Key of this entry
    #[must_use]
    pub fn key(&self) -> &CacheKey {
        &self.key
    }

    /// Path of one artifact
    #[must_use]
    pub fn path(&self, artifact: Artifact) -> PathBuf {
        self.dir.join(artifact.file_name())
    }

    /// Whether the artifact file exists
    #[must_use]
    pub fn exists(&self, artifact: Artifact) -> bool {
        self.path(artifact).is_file()
    }

    /// Whether the entry directory exists
    #[must_use]
    pub fn is_present(&self) -> bool {
        self.dir.is_dir()
    }

    /// Read and parse one artifact
    ///
    /// # Errors
    ///
    /// Any I/O or parse failure is reported as [`Error::CorruptEntry`]
    pub fn read(&self, artifact: Artifact) -> Result<Value> {
        let path = self.path(artifact);
        let content = fs::read(&path).map_err(|e| Error::corrupt(&path, e.to_string()))?;
        serde_json::from_slice(&content).map_err(|e| Error::corrupt(&path, e.to_string()))
    }

    /// Read `meta.json` into its typed form
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptEntry`] if the file is missing, unparseable, or
    /// does not have the expected shape
    pub fn read_meta(&self) -> Result<EntryMeta> {
        let value = self.read(Artifact::Meta)?;
        serde_json::from_value(value)
            .map_err(|e| Error::corrupt(self.path(Artifact::Meta), e.to_string()))
    }

    /// Creation time recorded in `meta.json`
    ///
    /// Only `created_at` is looked at; a missing or non-numeric value counts as
    /// the Unix epoch.
    ///
    /// # Errors
    ///
    /// Returns [`Error::CorruptEntry`] if the file is missing or is not JSON
    pub fn created_at(&self) -> Result<f64> {
        let meta = self.read(Artifact::Meta)?;
        Ok(meta
            .get("created_at")
            .and_then(Value::as_f64)
            .unwrap_or(0.0))
    }

    /// Write all three artifacts, each atomically
    ///
    /// Everything is encoded before the first file is touched. A failure part
    /// way through can leave some artifacts new and some old.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Encoding`] if a value cannot be encoded and
    /// [`Error::Persistence`] if any filesystem operation fails
    pub fn write(&self, meta: &EntryMeta, payload: &Value, result: &Value) -> Result<()> {
        let encoded = [
            (Artifact::Meta, canonical::to_vec(meta)?),
            (Artifact::Payload, canonical::to_vec(payload)?),
            (Artifact::Result, canonical::to_vec(result)?),
        ];

        fs::create_dir_all(&self.dir).map_err(|e| {
            Error::persistence(&self.dir, Error::io(e, &self.dir, "create_dir_all"))
        })?;

        for (artifact, bytes) in encoded {
            let path = self.path(artifact);
            write_atomic(&path, &bytes).map_err(|e| Error::persistence(&self.dir, e))?;
            tracing::trace!(path = %path.display(), bytes = bytes.len(), "Wrote cache artifact");
        }
        Ok(())
    }
}

/// A fully written and synced temp file that has not yet replaced its target
///
/// Dropping it without [`StagedWrite::commit`] deletes the temp file and leaves
/// the target untouched, which is exactly what a crash before the rename looks
/// like to other readers.
#[derive(Debug)]
pub struct StagedWrite {
    temp: NamedTempFile,
    target: PathBuf,
}

impl StagedWrite {
    /// Write `bytes` to a temp file next to `target` and sync it to disk
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the temp file cannot be created, written or synced
    pub fn stage(target: &Path, bytes: &[u8]) -> Result<Self> {
        let dir = match target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(dir).map_err(|e| Error::io(e, dir, "create_dir_all"))?;

        let prefix = format!(
            ".{}.",
            target
                .file_name()
                .map_or_else(|| "artifact".into(), |n| n.to_string_lossy())
        );
        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|e| Error::io(e, dir, "create"))?;

        temp.write_all(bytes)
            .map_err(|e| Error::io(e, temp.path(), "write"))?;
        temp.as_file()
            .sync_all()
            .map_err(|e| Error::io(e, temp.path(), "sync"))?;

        Ok(Self {
            temp,
            target: target.to_path_buf(),
        })
    }

    /// Path of the temp file holding the staged content
    #[must_use]
    pub fn temp_path(&self) -> &Path {
        self.temp.path()
    }

    /// Final path the content will be renamed to
    #[must_use]
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Atomically rename the temp file over the target
    ///
    /// # Errors
    ///
    /// Returns [`Error::Io`] if the rename fails
    pub fn commit(self) -> Result<()> {
        let Self { temp, target } = self;
        temp.persist(&target)
            .map_err(|e| Error::io(e.error, &target, "rename"))?;
        Ok(())
    }
}

/// Write-temp, sync, rename
///
/// # Errors
///
/// Returns [`Error::Io`] if any step fails; the target is left as it was
pub fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    StagedWrite::stage(path, bytes)?.commit()
}

fn validate_step(step: &str) -> Result<()> {
    if step.is_empty() {
        return Err(Error::invalid_step(step, "must not be empty"));
    }
    if step.contains(['/', '\\']) {
        return Err(Error::invalid_step(step, "must not contain path separators"));
    }
    match Path::new(step).components().next() {
        Some(Component::Normal(_)) => Ok(()),
        _ => Err(Error::invalid_step(step, "must be a plain directory name")),
    }
}
