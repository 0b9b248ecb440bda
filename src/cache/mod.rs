//! Persistent response cache for package-mirror traffic
//!
//! Maps request URLs to on-disk entries and stores/replays response bodies
//! with their replayable headers.
//!
//! # Key Classes
//!
//! | Class | Key | Reuse |
//! |-------|-----|-------|
//! | Package | `pkg/<file name>` | any mirror, any path |
//! | Arch database | `arch/<repo>/<arch>/<file name>` | any mirror, same repo/arch |
//! | APT metadata | `apt/dists/<suite path>` | any mirror, same suite path |
//! | Other | `misc/<sha256 of URL>` | exact URL only |
//!
//! # Entry Layout
//!
//! `<root>/<key>.cache` holds the body, `<root>/<key>.headers.json` the
//! headers. An entry exists only when both files do. Entries never expire.

pub mod headers;
pub mod key;
pub mod locks;
pub mod store;

pub use headers::{CacheStatus, Headers, CACHE_STATUS_HEADER, HOP_BY_HOP_HEADERS};
pub use key::{ArtifactClass, CacheKey, KeyStrategy};
pub use locks::KeyLocks;
pub use store::{format_bytes, CacheStore, CachedResponse, EntryInfo, EntrySummary};
