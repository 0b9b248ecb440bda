//! Cache key derivation
//!
//! Maps a normalized URL to a relative path stem under the cache root.
//! Package-repository traffic is keyed by file name (or file name plus the
//! path context needed to avoid collisions) so that any mirror serving the
//! same artifact hits the same entry. Everything else is keyed by a hash of
//! the full URL.

use crate::config::CacheConfig;
use crate::url_norm::NormalizedUrl;
use regex::Regex;
use sha2::{Digest, Sha256};
use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

/// Suffix of the file holding the raw response body
pub const BODY_SUFFIX: &str = ".cache";

/// Suffix of the file holding the replayable headers
pub const HEADERS_SUFFIX: &str = ".headers.json";

/// `.../<repo>/os/<arch>/<repo>.(db|files)[.tar.{gz,xz,zst}][.sig]`
static ARCH_DATABASE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:^|/)(?P<repo>[^/]+)/os/(?P<arch>[^/]+)/(?P<file>(?P<file_repo>[^/]+)\.(?:db|files)(?:\.tar\.(?:gz|xz|zst))?(?:\.sig)?)$",
    )
    .expect("arch database pattern is valid")
});

/// APT metadata file names matched exactly (lowercase)
const APT_EXACT: &[&str] = &["release", "inrelease", "release.gpg"];

/// APT metadata file name prefixes (lowercase), any compression suffix
const APT_PREFIXES: &[&str] = &["packages", "sources", "contents-"];

const DISTS_SEGMENT: &str = "/dists/";

/// Which classification rule produced a key, in priority order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactClass {
    /// Versioned package file, keyed by file name (`pkg/`)
    Package,
    /// Arch Linux repository database, keyed by repo and arch (`arch/`)
    ArchDatabase,
    /// APT index under `dists/`, keyed by suite path (`apt/dists/`)
    AptMetadata,
    /// Anything else, keyed by URL digest (`misc/`)
    Other,
}

impl ArtifactClass {
    /// Top-level directory under the cache root for this class
    pub fn cache_dir(&self) -> &'static str {
        match self {
            Self::Package => "pkg",
            Self::ArchDatabase => "arch",
            Self::AptMetadata => "apt",
            Self::Other => "misc",
        }
    }

    /// Infer the class from a key's top-level directory
    pub fn from_cache_dir(dir: &str) -> Option<Self> {
        match dir {
            "pkg" => Some(Self::Package),
            "arch" => Some(Self::ArchDatabase),
            "apt" => Some(Self::AptMetadata),
            "misc" => Some(Self::Other),
            _ => None,
        }
    }
}

impl fmt::Display for ArtifactClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Package => "package",
            Self::ArchDatabase => "arch-db",
            Self::AptMetadata => "apt-metadata",
            Self::Other => "misc",
        };
        write!(f, "{}", name)
    }
}

/// Relative path stem (no extension) of a cache entry, `/`-separated
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CacheKey(String);

impl CacheKey {
    /// Accept a stem only if every component is a plain file or directory name
    pub fn new(stem: impl Into<String>) -> Option<Self> {
        let stem = stem.into();
        let valid = !stem.is_empty()
            && stem
                .split('/')
                .all(|c| !c.is_empty() && c != "." && c != ".." && !c.contains('\\'));
        valid.then_some(Self(stem))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Top-level class directory of this key
    pub fn class(&self) -> Option<ArtifactClass> {
        self.0
            .split('/')
            .next()
            .and_then(ArtifactClass::from_cache_dir)
    }

    /// Path of the body file under `root`
    pub fn body_path(&self, root: &Path) -> PathBuf {
        self.with_suffix(root, BODY_SUFFIX)
    }

    /// Path of the headers file under `root`
    pub fn headers_path(&self, root: &Path) -> PathBuf {
        self.with_suffix(root, HEADERS_SUFFIX)
    }

    fn with_suffix(&self, root: &Path, suffix: &str) -> PathBuf {
        let mut path = root.join(&self.0).into_os_string();
        path.push(suffix);
        PathBuf::from(path)
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Hex SHA-256 of a normalized URL
pub fn url_digest(url: &NormalizedUrl) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
}

/// Ordered URL classifier; first matching rule wins
#[derive(Debug, Clone)]
pub struct KeyStrategy {
    package_extensions: Vec<String>,
    arch_repos: HashSet<String>,
}

impl KeyStrategy {
    /// Build a strategy from extension and repository tables
    pub fn new<E, R>(package_extensions: E, arch_repos: R) -> Self
    where
        E: IntoIterator,
        E::Item: AsRef<str>,
        R: IntoIterator,
        R::Item: AsRef<str>,
    {
        Self {
            package_extensions: package_extensions
                .into_iter()
                .map(|e| e.as_ref().to_ascii_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
            arch_repos: arch_repos
                .into_iter()
                .map(|r| r.as_ref().to_string())
                .collect(),
        }
    }

    /// Build a strategy from the `[cache]` config section
    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(&config.package_extensions, &config.arch_repos)
    }

    /// Derive the storage key for a URL
    pub fn derive_key(&self, url: &NormalizedUrl) -> CacheKey {
        self.classify(url).1
    }

    /// Derive the storage key and report which rule produced it
    ///
    /// Rules apply in order: package file name, Arch database, APT metadata,
    /// URL digest. One exception: a `.sig` file that also matches the Arch
    /// database pattern (`core.db.sig`) is an Arch database signature and
    /// skips the package rule, so it is keyed per repo and arch.
    pub fn classify(&self, url: &NormalizedUrl) -> (ArtifactClass, CacheKey) {
        let matched = self
            .package_key(url)
            .map(|k| (ArtifactClass::Package, k))
            .or_else(|| self.arch_key(url).map(|k| (ArtifactClass::ArchDatabase, k)))
            .or_else(|| apt_key(url).map(|k| (ArtifactClass::AptMetadata, k)))
            .and_then(|(class, stem)| CacheKey::new(stem).map(|key| (class, key)));

        matched.unwrap_or_else(|| (ArtifactClass::Other, fallback_key(url)))
    }

    fn package_key(&self, url: &NormalizedUrl) -> Option<String> {
        let basename = url.basename();
        let lower = basename.to_ascii_lowercase();
        if !self.package_extensions.iter().any(|ext| lower.ends_with(ext)) {
            return None;
        }
        // A detached signature of a repository database is not a package;
        // its name repeats across repos and arches just like the database.
        if lower.ends_with(".sig") && self.arch_key(url).is_some() {
            return None;
        }
        Some(format!("{}/{}", ArtifactClass::Package.cache_dir(), basename))
    }

    fn arch_key(&self, url: &NormalizedUrl) -> Option<String> {
        let caps = ARCH_DATABASE.captures(url.path())?;
        let repo = caps.name("repo")?.as_str();
        if repo != caps.name("file_repo")?.as_str() || !self.arch_repos.contains(repo) {
            return None;
        }
        Some(format!(
            "{}/{}/{}/{}",
            ArtifactClass::ArchDatabase.cache_dir(),
            repo,
            caps.name("arch")?.as_str(),
            caps.name("file")?.as_str()
        ))
    }
}

impl Default for KeyStrategy {
    fn default() -> Self {
        Self::from_config(&CacheConfig::default())
    }
}

fn is_apt_metadata(basename: &str) -> bool {
    let lower = basename.to_ascii_lowercase();
    APT_EXACT.contains(&lower.as_str()) || APT_PREFIXES.iter().any(|p| lower.starts_with(p))
}

fn apt_key(url: &NormalizedUrl) -> Option<String> {
    if !is_apt_metadata(url.basename()) {
        return None;
    }
    let path = url.path();
    let start = path.find(DISTS_SEGMENT)? + DISTS_SEGMENT.len();
    Some(format!(
        "{}/dists/{}",
        ArtifactClass::AptMetadata.cache_dir(),
        &path[start..]
    ))
}

fn fallback_key(url: &NormalizedUrl) -> CacheKey {
    CacheKey(format!(
        "{}/{}",
        ArtifactClass::Other.cache_dir(),
        url_digest(url)
    ))
}
