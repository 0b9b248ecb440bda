//! Configuration schema for pkgcache
//!
//! Configuration is stored at `~/.config/pkgcache/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default cache root, relative to the proxy's working directory
pub const DEFAULT_CACHE_ROOT: &str = "./the_cache_dir";

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Cache store and key classification settings
    pub cache: CacheConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

impl GeneralConfig {
    /// Whether structured JSON log lines were requested
    pub fn json_logs(&self) -> bool {
        self.log_format.eq_ignore_ascii_case("json")
    }
}

/// Cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    /// Directory holding all cache entries
    pub root: PathBuf,

    /// File name suffixes keyed by file name alone (`pkg/<basename>`)
    pub package_extensions: Vec<String>,

    /// Arch Linux repository names whose databases are keyed by repo and arch
    pub arch_repos: Vec<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from(DEFAULT_CACHE_ROOT),
            package_extensions: [
                ".deb",
                ".ddeb",
                ".rpm",
                ".pkg.tar.zst",
                ".pkg.tar.zst.sig",
                ".sig",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            arch_repos: [
                "core",
                "extra",
                "multilib",
                "community",
                "testing",
                "staging",
                "core-testing",
                "core-staging",
                "extra-testing",
                "extra-staging",
                "multilib-testing",
                "multilib-staging",
                "community-testing",
                "community-staging",
                "gnome-unstable",
                "kde-unstable",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}
