//! Request/response hooks wiring the cache store into a proxy
//!
//! The host calls `on_request` before connecting upstream and
//! `on_response` once the upstream response is buffered. Both may run
//! concurrently for different flows. Cache failures never alter what the
//! client receives; they only make the exchange uncached.

use super::flow::{Flow, FlowCacheState, Response};
use crate::cache::{CacheStatus, CacheStore};
use crate::config::CacheConfig;
use crate::url_norm::{normalize, NormalizedUrl};
use tracing::{debug, info, warn};

/// Methods whose responses are looked up and stored
pub const CACHEABLE_METHODS: &[&str] = &["GET"];

/// What the host should do after `on_request`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestVerdict {
    /// Proxy the request upstream as usual
    Forward,
    /// `flow.response` is complete; do not contact upstream
    Respond,
}

fn is_cacheable_method(method: &str) -> bool {
    CACHEABLE_METHODS
        .iter()
        .any(|m| m.eq_ignore_ascii_case(method))
}

/// Interception adapter around a [`CacheStore`]
#[derive(Debug)]
pub struct CacheAddon {
    store: CacheStore,
}

impl CacheAddon {
    pub fn new(store: CacheStore) -> Self {
        info!("Cache addon using cache dir {}", store.root().display());
        Self { store }
    }

    pub fn from_config(config: &CacheConfig) -> Self {
        Self::new(CacheStore::from_config(config))
    }

    pub fn store(&self) -> &CacheStore {
        &self.store
    }

    /// Serve the request from the cache if a complete entry exists
    pub fn on_request(&self, flow: &mut Flow) -> RequestVerdict {
        if !is_cacheable_method(&flow.request.method) {
            debug!(
                "Skipping {} request to {}",
                flow.request.method, flow.request.url
            );
            flow.cache_state = FlowCacheState::Bypassed;
            return RequestVerdict::Forward;
        }

        let Some(url) = self.normalized(flow) else {
            flow.cache_state = FlowCacheState::Bypassed;
            return RequestVerdict::Forward;
        };

        match self.store.try_serve(&url) {
            Some(hit) => {
                info!("Cache HIT {} ({} bytes, key {})", url, hit.body.len(), hit.key);
                flow.response = Some(Response::new(200, hit.body, hit.headers));
                flow.cache_state = FlowCacheState::ServedFromCache;
                RequestVerdict::Respond
            }
            None => {
                info!("Cache MISS {}", url);
                flow.cache_state = FlowCacheState::Missed;
                RequestVerdict::Forward
            }
        }
    }

    /// Store a successful upstream response and mark it `MISS`
    pub fn on_response(&self, flow: &mut Flow) {
        if !is_cacheable_method(&flow.request.method) {
            return;
        }
        if flow.served_from_cache() {
            debug!("Not re-caching response served from cache: {}", flow.request.url);
            return;
        }
        let Some(status) = flow.response.as_ref().map(|r| r.status_code) else {
            return;
        };
        if status != 200 {
            debug!(
                "Non-200 status {} for {}, not caching",
                status, flow.request.url
            );
            return;
        }
        let Some(url) = self.normalized(flow) else {
            return;
        };
        let Some(response) = flow.response.as_mut() else {
            return;
        };

        match self
            .store
            .persist(&url, &response.content, &response.headers)
        {
            Ok(key) => {
                response.headers.set_cache_status(CacheStatus::Miss);
                info!(
                    "Cached {} as {} ({} bytes)",
                    url,
                    key,
                    response.content.len()
                );
            }
            Err(e) => warn!("Failed to cache response for {}: {}", url, e),
        }
    }

    fn normalized(&self, flow: &Flow) -> Option<NormalizedUrl> {
        match normalize(&flow.request.url) {
            Ok(url) => Some(url),
            Err(e) => {
                warn!("Not caching {}: {}", flow.request.url, e);
                None
            }
        }
    }
}
