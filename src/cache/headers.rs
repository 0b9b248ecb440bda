//! Replayable response headers
//!
//! Stored as a flat JSON object next to each cached body. Header names are
//! compared case-insensitively; the spelling of the first insert is kept.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Header carrying the HIT/MISS marker
pub const CACHE_STATUS_HEADER: &str = "x-cache-status";

/// Connection-scoped headers that must never be replayed from the cache
pub const HOP_BY_HOP_HEADERS: &[&str] = &[
    "Content-Length",
    "Transfer-Encoding",
    "Connection",
    "Keep-Alive",
    "Proxy-Authenticate",
    "Proxy-Authorization",
    "TE",
    "Trailer",
    // Legacy spelling still sent by some origins
    "Trailers",
    "Upgrade",
];

/// Whether a response came from the store or was fetched and stored
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    /// Header value for this status
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "HIT",
            Self::Miss => "MISS",
        }
    }
}

impl fmt::Display for CacheStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Flat header name to value mapping
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Headers(BTreeMap<String, String>);

impl Headers {
    /// Create an empty header map
    pub fn new() -> Self {
        Self::default()
    }

    fn find_name(&self, name: &str) -> Option<&String> {
        self.0.keys().find(|k| k.eq_ignore_ascii_case(name))
    }

    /// Look up a header value, ignoring name case
    pub fn get(&self, name: &str) -> Option<&str> {
        self.find_name(name)
            .and_then(|k| self.0.get(k))
            .map(String::as_str)
    }

    /// Whether a header is present, ignoring name case
    pub fn contains(&self, name: &str) -> bool {
        self.find_name(name).is_some()
    }

    /// Set a header, replacing every existing spelling of the same name
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        self.remove(&name);
        self.0.insert(name, value.into());
    }

    /// Remove every spelling of a header, returning one of the removed values
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let mut removed = None;
        self.0.retain(|k, v| {
            if k.eq_ignore_ascii_case(name) {
                removed = Some(std::mem::take(v));
                false
            } else {
                true
            }
        });
        removed
    }

    /// Copy of this map without connection-scoped headers
    pub fn without_hop_by_hop(&self) -> Self {
        let mut scrubbed = self.clone();
        for name in HOP_BY_HOP_HEADERS {
            scrubbed.remove(name);
        }
        scrubbed
    }

    /// Set the HIT/MISS marker
    pub fn set_cache_status(&mut self, status: CacheStatus) {
        self.insert(CACHE_STATUS_HEADER, status.as_str());
    }

    /// The HIT/MISS marker, if present
    pub fn cache_status(&self) -> Option<&str> {
        self.get(CACHE_STATUS_HEADER)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Self::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::collections::btree_map::IntoIter<String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}
