//! On-disk cache store
//!
//! Each entry is a body file and a headers file sharing one path stem under
//! the cache root. Writers for the same key are serialized by a per-key
//! lock; every file becomes visible only through an atomic rename, so
//! readers never take locks.

use super::headers::{CacheStatus, Headers};
use super::key::{ArtifactClass, CacheKey, KeyStrategy, HEADERS_SUFFIX};
use super::locks::KeyLocks;
use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::url_norm::NormalizedUrl;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use uuid::Uuid;

/// Format bytes as human-readable size (e.g., "1.5 GB")
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.1} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.1} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.1} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}

/// A cache hit ready to be replayed
#[derive(Debug, Clone)]
pub struct CachedResponse {
    /// Key the entry was found under
    pub key: CacheKey,
    /// Raw body bytes
    pub body: Vec<u8>,
    /// Stored headers, marked `x-cache-status: HIT`
    pub headers: Headers,
}

/// Where a URL would be stored and what is there now
#[derive(Debug, Clone)]
pub struct EntryInfo {
    pub key: CacheKey,
    pub class: ArtifactClass,
    pub body_path: PathBuf,
    pub headers_path: PathBuf,
    /// Body size, if the body file exists
    pub body_len: Option<u64>,
    /// Decoded headers, if the headers file exists and parses
    pub headers: Option<Headers>,
}

impl EntryInfo {
    /// Whether `try_serve` would return this entry
    pub fn is_complete(&self) -> bool {
        self.body_len.is_some() && self.headers.is_some()
    }
}

/// One complete entry found while walking the cache root
#[derive(Debug, Clone, Serialize)]
pub struct EntrySummary {
    pub key: String,
    pub class: String,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

/// Crash-safe store of (body, headers) pairs keyed by URL
#[derive(Debug)]
pub struct CacheStore {
    root: PathBuf,
    strategy: KeyStrategy,
    locks: KeyLocks,
}

impl CacheStore {
    /// Create a store rooted at `root`; directories are created on first write
    pub fn new(root: impl Into<PathBuf>, strategy: KeyStrategy) -> Self {
        Self {
            root: root.into(),
            strategy,
            locks: KeyLocks::new(),
        }
    }

    /// Create a store from the `[cache]` config section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(config.root.clone(), KeyStrategy::from_config(config))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn strategy(&self) -> &KeyStrategy {
        &self.strategy
    }

    /// Storage key for a URL
    pub fn key_for(&self, url: &NormalizedUrl) -> CacheKey {
        self.strategy.derive_key(url)
    }

    /// Return the cached response for a URL, if a complete entry exists
    ///
    /// Unreadable or malformed entries are reported as absent.
    pub fn try_serve(&self, url: &NormalizedUrl) -> Option<CachedResponse> {
        let key = self.key_for(url);

        match self.read_entry(&key) {
            Ok(Some((body, mut headers))) => {
                headers.set_cache_status(CacheStatus::Hit);
                debug!("Cache entry {} found ({} bytes)", key, body.len());
                Some(CachedResponse { key, body, headers })
            }
            Ok(None) => None,
            Err(e) => {
                warn!("Ignoring unreadable cache entry {}: {}", key, e);
                None
            }
        }
    }

    /// Read a (body, headers) pair written by the same `persist` call
    ///
    /// The headers file is opened before the body. `persist` unlinks the
    /// headers before it replaces the body, so if the headers path still
    /// names the file we opened once the body is open, both belong to the
    /// same write. Otherwise a writer got in between and the entry is
    /// reported as absent.
    fn read_entry(&self, key: &CacheKey) -> CacheResult<Option<(Vec<u8>, Headers)>> {
        let body_path = key.body_path(&self.root);
        let headers_path = key.headers_path(&self.root);

        let Some(mut headers_file) = open_if_exists(&headers_path)? else {
            return Ok(None);
        };
        let Some(mut body_file) = open_if_exists(&body_path)? else {
            return Ok(None);
        };

        let opened = headers_file
            .metadata()
            .map_err(|e| CacheError::io(format!("inspecting {}", headers_path.display()), e))?;
        match fs::metadata(&headers_path) {
            Ok(current) if same_file(&opened, &current) => {}
            Ok(_) => {
                debug!("Cache entry {} replaced while reading", key);
                return Ok(None);
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!("Cache entry {} replaced while reading", key);
                return Ok(None);
            }
            Err(e) => {
                return Err(CacheError::io(
                    format!("inspecting {}", headers_path.display()),
                    e,
                ))
            }
        }

        if !opened.is_file() || !body_file.metadata().map(|m| m.is_file()).unwrap_or(false) {
            return Ok(None);
        }

        let mut raw = Vec::new();
        headers_file.read_to_end(&mut raw).map_err(|e| {
            CacheError::io(format!("reading headers {}", headers_path.display()), e)
        })?;
        let headers: Headers = serde_json::from_slice(&raw)?;

        let mut body = Vec::new();
        body_file
            .read_to_end(&mut body)
            .map_err(|e| CacheError::io(format!("reading body {}", body_path.display()), e))?;

        Ok(Some((body, headers)))
    }

    /// Store a response body and its replayable headers under the URL's key
    ///
    /// Hop-by-hop headers are dropped and `x-cache-status: MISS` is recorded.
    /// Blocks while another writer holds the same key.
    pub fn persist(
        &self,
        url: &NormalizedUrl,
        body: &[u8],
        headers: &Headers,
    ) -> CacheResult<CacheKey> {
        let key = self.key_for(url);
        let body_path = key.body_path(&self.root);
        let headers_path = key.headers_path(&self.root);

        let lock = self.locks.handle(&key);
        let _guard = lock.lock();

        // Without a headers file the entry reads as absent, so a crash
        // before the final rename cannot pair a new body with old headers.
        remove_if_exists(&headers_path)?;

        write_atomic(&body_path, body)?;

        let mut stored = headers.without_hop_by_hop();
        stored.set_cache_status(CacheStatus::Miss);
        let json = serde_json::to_vec(&stored)?;
        write_atomic(&headers_path, &json)?;

        debug!("Stored {} ({} bytes)", key, body.len());
        Ok(key)
    }

    /// Describe the entry a URL maps to without touching it
    pub fn lookup(&self, url: &NormalizedUrl) -> EntryInfo {
        let (class, key) = self.strategy.classify(url);
        let body_path = key.body_path(&self.root);
        let headers_path = key.headers_path(&self.root);

        let body_len = fs::metadata(&body_path)
            .ok()
            .filter(|m| m.is_file())
            .map(|m| m.len());
        let headers = fs::read(&headers_path)
            .ok()
            .and_then(|raw| serde_json::from_slice(&raw).ok());

        EntryInfo {
            key,
            class,
            body_path,
            headers_path,
            body_len,
            headers,
        }
    }

    /// List every complete entry under the cache root, sorted by key
    pub fn entries(&self) -> CacheResult<Vec<EntrySummary>> {
        let mut entries = Vec::new();
        if !self.root.exists() {
            return Ok(entries);
        }

        let mut pending = vec![self.root.clone()];
        while let Some(dir) = pending.pop() {
            let read = match fs::read_dir(&dir) {
                Ok(read) => read,
                Err(e) if dir == self.root => {
                    return Err(CacheError::io(
                        format!("reading cache root {}", dir.display()),
                        e,
                    ))
                }
                Err(e) => {
                    debug!("Skipping unreadable directory {}: {}", dir.display(), e);
                    continue;
                }
            };

            for item in read.flatten() {
                // Entries are never symlinks; following them could loop
                let Ok(file_type) = item.file_type() else {
                    continue;
                };
                let path = item.path();
                if file_type.is_dir() {
                    pending.push(path);
                } else if file_type.is_file() {
                    if let Some(summary) = self.summarize(&path) {
                        entries.push(summary);
                    }
                }
            }
        }

        entries.sort_by(|a, b| a.key.cmp(&b.key));
        Ok(entries)
    }

    fn summarize(&self, headers_path: &Path) -> Option<EntrySummary> {
        let relative = headers_path.strip_prefix(&self.root).ok()?;
        let stem = relative.to_str()?.strip_suffix(HEADERS_SUFFIX)?;
        let key = CacheKey::new(stem.replace(std::path::MAIN_SEPARATOR, "/"))?;

        let meta = fs::metadata(key.body_path(&self.root)).ok()?;
        if !meta.is_file() {
            return None;
        }

        Some(EntrySummary {
            class: key
                .class()
                .map(|c| c.to_string())
                .unwrap_or_else(|| "unknown".to_string()),
            key: key.to_string(),
            size_bytes: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }
}

fn open_if_exists(path: &Path) -> CacheResult<Option<File>> {
    match File::open(path) {
        Ok(file) => Ok(Some(file)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(CacheError::io(format!("opening {}", path.display()), e)),
    }
}

/// Whether two metadata snapshots describe the same file on disk
#[cfg(unix)]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    a.dev() == b.dev() && a.ino() == b.ino()
}

#[cfg(not(unix))]
fn same_file(a: &fs::Metadata, b: &fs::Metadata) -> bool {
    a.len() == b.len() && a.modified().ok() == b.modified().ok()
}

fn remove_if_exists(path: &Path) -> CacheResult<()> {
    match fs::remove_file(path) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(CacheError::io(format!("removing {}", path.display()), e)),
    }
}

/// Temp file beside `path`, unique per call
fn temp_path_for(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    path.with_file_name(format!(".{}.{}.tmp", name, Uuid::new_v4().simple()))
}

/// Write `data` to a temp file beside `path`, then rename it into place
fn write_atomic(path: &Path, data: &[u8]) -> CacheResult<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| CacheError::io(format!("creating directory {}", parent.display()), e))?;
    }

    let tmp = temp_path_for(path);
    let written = File::create(&tmp)
        .and_then(|mut file| {
            file.write_all(data)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&tmp, path));

    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(CacheError::io(format!("writing {}", path.display()), e));
    }
    Ok(())
}
