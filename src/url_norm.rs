//! Request URL canonicalization
//!
//! Two requests for the same resource must normalize to the same string:
//! the fragment is dropped, directory-style paths map to `index.html`, and
//! the query string is kept as-is.

use crate::error::{CacheError, CacheResult};
use std::fmt;
use std::str::FromStr;
use url::Url;

/// Resource name substituted for directory-style paths
pub const INDEX_RESOURCE: &str = "index.html";

/// A request URL in canonical form
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NormalizedUrl {
    url: Url,
    text: String,
}

impl NormalizedUrl {
    /// The canonical string form
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// Path component, always non-empty
    pub fn path(&self) -> &str {
        self.url.path()
    }

    /// Last path segment (the file name the client asked for)
    pub fn basename(&self) -> &str {
        self.url.path().rsplit('/').next().unwrap_or_default()
    }

    /// Host, if the URL has one
    pub fn host(&self) -> Option<&str> {
        self.url.host_str()
    }

    /// Query string exactly as the client sent it
    pub fn query(&self) -> Option<&str> {
        self.text.split_once('?').map(|(_, q)| q)
    }
}

impl fmt::Display for NormalizedUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl AsRef<str> for NormalizedUrl {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl FromStr for NormalizedUrl {
    type Err = CacheError;

    fn from_str(s: &str) -> CacheResult<Self> {
        normalize(s)
    }
}

/// Canonicalize a raw request URL
///
/// Fails only when the input cannot be parsed as an absolute URL. Callers in
/// the request path treat that as "do not cache this request".
pub fn normalize(raw: &str) -> CacheResult<NormalizedUrl> {
    let trimmed = raw.trim();
    let mut url = Url::parse(trimmed).map_err(|e| CacheError::invalid_url(raw, e))?;

    if url.path().is_empty() || url.path().ends_with('/') {
        let path = format!("{}{}", url.path(), INDEX_RESOURCE);
        url.set_path(&path);
    }
    url.set_fragment(None);
    url.set_query(None);

    // The parser percent-encodes the query; keep the client's bytes instead
    let mut text = url.as_str().to_string();
    if let Some(query) = raw_query(trimmed).filter(|q| !q.is_empty()) {
        text.push('?');
        text.push_str(query);
    }

    Ok(NormalizedUrl { url, text })
}

/// Text between the first `?` and the fragment, if any
fn raw_query(raw: &str) -> Option<&str> {
    let without_fragment = raw.split('#').next().unwrap_or_default();
    without_fragment.split_once('?').map(|(_, q)| q)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLES: &[&str] = &[
        "http://deb.debian.org/debian/dists/stable/InRelease",
        "https://mirror.example/archlinux/core/os/x86_64/core.db",
        "http://example.com",
        "http://example.com/",
        "http://example.com/docs/?page=2#top",
        "https://example.com/a/b.deb?sig=abc&exp=1#frag",
        "HTTP://Example.COM:80/Path/",
        "http://example.com/with%20space/file.rpm",
        "http://h.example/p?a='b'&c=d e",
    ];

    #[test]
    fn normalize_is_idempotent() {
        for raw in SAMPLES {
            let once = normalize(raw).unwrap();
            let twice = normalize(once.as_str()).unwrap();
            assert_eq!(once, twice, "not idempotent for {raw}");
        }
    }

    #[test]
    fn appends_index_for_empty_path() {
        let url = normalize("http://example.com").unwrap();
        assert_eq!(url.as_str(), "http://example.com/index.html");
    }

    #[test]
    fn appends_index_for_trailing_slash_once() {
        let url = normalize("http://example.com/pub/debian/").unwrap();
        assert_eq!(url.as_str(), "http://example.com/pub/debian/index.html");
        assert_eq!(url.as_str().matches(INDEX_RESOURCE).count(), 1);
    }

    #[test]
    fn drops_fragment_keeps_query() {
        let url = normalize("http://example.com/docs/?page=2#top").unwrap();
        assert_eq!(url.as_str(), "http://example.com/docs/index.html?page=2");
    }

    #[test]
    fn fragment_does_not_change_identity() {
        let a = normalize("https://example.com/a/b.deb#one").unwrap();
        let b = normalize("https://example.com/a/b.deb#two").unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn query_is_kept_verbatim() {
        let url = normalize("http://h.example/p?a='b'&c=d e").unwrap();
        assert_eq!(url.as_str(), "http://h.example/p?a='b'&c=d e");
        assert_eq!(url.query(), Some("a='b'&c=d e"));

        let encoded = normalize("http://h.example/p?a=%27b%27&c=d%20e").unwrap();
        assert_ne!(url, encoded);
        assert_eq!(encoded.query(), Some("a=%27b%27&c=d%20e"));
    }

    #[test]
    fn empty_query_is_dropped() {
        let url = normalize("http://example.com/pool/a.deb?#x").unwrap();
        assert_eq!(url.as_str(), "http://example.com/pool/a.deb");
        assert_eq!(url.query(), None);
    }

    #[test]
    fn distinct_queries_stay_distinct() {
        let a = normalize("https://example.com/list?page=1").unwrap();
        let b = normalize("https://example.com/list?page=2").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn basename_is_last_segment() {
        let url = normalize("https://mirror.example/archlinux/core/os/x86_64/core.db").unwrap();
        assert_eq!(url.basename(), "core.db");
        assert_eq!(url.host(), Some("mirror.example"));

        let dir = normalize("https://mirror.example/archlinux/").unwrap();
        assert_eq!(dir.basename(), INDEX_RESOURCE);
    }

    #[test]
    fn rejects_relative_urls() {
        let err = normalize("/debian/dists/stable/Release").unwrap_err();
        assert!(matches!(err, CacheError::InvalidUrl { .. }));
    }

    #[test]
    fn parses_via_from_str() {
        let url: NormalizedUrl = "http://example.com/".parse().unwrap();
        assert_eq!(url.to_string(), "http://example.com/index.html");
    }
}
