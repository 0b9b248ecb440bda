//! Error types for pkgcache
//!
//! All fallible operations return `CacheResult<T>`. The interception hooks
//! never surface these to the proxied client; they are logged and the
//! request proceeds uncached.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for pkgcache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// All errors that can occur in pkgcache
#[derive(Error, Debug)]
pub enum CacheError {
    // URL errors
    #[error("Invalid URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    // Configuration errors
    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    // General errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CacheError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Create an invalid URL error
    pub fn invalid_url(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::InvalidUrl {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// Whether the error came from the filesystem (disk full, permissions, rename)
    pub fn is_io(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::ConfigDirCreate { .. })
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidUrl { .. } => Some("URLs must be absolute, e.g. https://mirror.example/debian/"),
            Self::ConfigInvalid { .. } => Some("Run: pkgcache config show"),
            Self::Io { .. } => Some("Check that the cache directory exists and is writable"),
            _ => None,
        }
    }
}
