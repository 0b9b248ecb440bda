//! pkgcache - transparent HTTP cache for Linux package mirrors
//!
//! Sits in an intercepting proxy's request/response pipeline and stores
//! GET responses on disk, keyed so that identical artifacts fetched from
//! different mirrors share one entry.
//!
//! ```rust,ignore
//! use pkgcache::config::CacheConfig;
//! use pkgcache::proxy::{CacheAddon, Flow, RequestVerdict};
//!
//! let addon = CacheAddon::from_config(&CacheConfig::default());
//!
//! let mut flow = Flow::new("GET", "https://mirror.example/archlinux/core/os/x86_64/core.db");
//! if addon.on_request(&mut flow) == RequestVerdict::Forward {
//!     // ... proxy upstream, fill flow.response ...
//!     addon.on_response(&mut flow);
//! }
//! ```

pub mod cache;
pub mod cli;
pub mod config;
pub mod error;
pub mod proxy;
pub mod url_norm;

pub use error::{CacheError, CacheResult};
