//! Error types for the call cache

// Rust 1.92 compiler bug: false positives for thiserror/miette derive macro fields
// https://github.com/rust-lang/rust/issues/147648
#![allow(unused_assignments)]

use miette::Diagnostic;
use std::path::Path;
use thiserror::Error;

/// Error type for call cache operations
#[derive(Error, Debug, Diagnostic)]
pub enum Error {
    /// I/O error during cache operations
    #[error("I/O {operation} failed{}", path.as_ref().map_or(String::new(), |p| format!(": {}", p.display())))]
    #[diagnostic(
        code(callcache::io),
        help("Check file permissions and ensure the path exists")
    )]
    Io {
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
        /// Path that caused the error, if available
        path: Option<Box<Path>>,
        /// Operation that failed (e.g., "read", "write", "rename")
        operation: String,
    },

    /// A payload or result could not be canonically encoded
    #[error("Encoding error: {message}")]
    #[diagnostic(
        code(callcache::encoding),
        help("Payloads and results must be representable as JSON with string map keys")
    )]
    Encoding {
        /// Error message describing the encoding issue
        message: String,
    },

    /// A stored artifact is missing or cannot be parsed
    #[error("Corrupt cache entry at {}: {message}", path.display())]
    #[diagnostic(
        code(callcache::corrupt_entry),
        help("The entry will be recomputed on the next query")
    )]
    CorruptEntry {
        /// Artifact that failed to load
        path: Box<Path>,
        /// What went wrong while loading it
        message: String,
    },

    /// Writing an entry or running the persistence hook failed
    #[error("Failed to persist cache entry at {}", path.display())]
    #[diagnostic(code(callcache::persistence))]
    Persistence {
        /// Entry directory being written
        path: Box<Path>,
        /// The underlying failure
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Step name cannot be used as a directory component
    #[error("Invalid step name {step:?}: {reason}")]
    #[diagnostic(
        code(callcache::invalid_step),
        help("Step names must be a single, non-empty path component")
    )]
    InvalidStep {
        /// The rejected step name
        step: String,
        /// Why it was rejected
        reason: &'static str,
    },

    /// Configuration or validation error
    #[error("Cache configuration error: {message}")]
    #[diagnostic(code(callcache::config))]
    Configuration {
        /// Error message describing the configuration issue
        message: String,
    },
}

impl Error {
    /// Create a configuration error
    #[must_use]
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create an I/O error with path context
    #[must_use]
    pub fn io(
        source: std::io::Error,
        path: impl AsRef<Path>,
        operation: impl Into<String>,
    ) -> Self {
        Self::Io {
            source,
            path: Some(path.as_ref().into()),
            operation: operation.into(),
        }
    }

    /// Create an encoding error
    #[must_use]
    pub fn encoding(msg: impl Into<String>) -> Self {
        Self::Encoding {
            message: msg.into(),
        }
    }

    /// Create a corrupt entry error for the given artifact path
    #[must_use]
    pub fn corrupt(path: impl AsRef<Path>, msg: impl Into<String>) -> Self {
        Self::CorruptEntry {
            path: path.as_ref().into(),
            message: msg.into(),
        }
    }

    /// Wrap any failure that happened while persisting an entry
    #[must_use]
    pub fn persistence(
        path: impl AsRef<Path>,
        source: impl Into<Box<dyn std::error::Error + Send + Sync>>,
    ) -> Self {
        Self::Persistence {
            path: path.as_ref().into(),
            source: source.into(),
        }
    }

    /// Create an invalid step error
    #[must_use]
    pub fn invalid_step(step: impl Into<String>, reason: &'static str) -> Self {
        Self::InvalidStep {
            step: step.into(),
            reason,
        }
    }
}

/// Result type for call cache operations
pub type Result<T> = std::result::Result<T, Error>;
