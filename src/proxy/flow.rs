//! Per-request flow handed to the interception hooks by the host proxy

use crate::cache::Headers;

/// The client request, as seen before any upstream connection
#[derive(Debug, Clone)]
pub struct Request {
    pub method: String,
    pub url: String,
}

/// A fully buffered, decoded response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status_code: u16,
    pub content: Vec<u8>,
    pub headers: Headers,
}

impl Response {
    pub fn new(status_code: u16, content: impl Into<Vec<u8>>, headers: Headers) -> Self {
        Self {
            status_code,
            content: content.into(),
            headers,
        }
    }
}

/// Cache decision carried from `on_request` to `on_response`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum FlowCacheState {
    /// `on_request` has not run
    #[default]
    Pending,
    /// Not eligible for caching (method or unparseable URL)
    Bypassed,
    /// Looked up, not found; the host forwards upstream
    Missed,
    /// Answered from the store; must not be stored again
    ServedFromCache,
}

/// One HTTP exchange flowing through the proxy
#[derive(Debug, Clone)]
pub struct Flow {
    pub request: Request,
    /// Upstream response, or the synthesized one on a cache hit
    pub response: Option<Response>,
    pub cache_state: FlowCacheState,
}

impl Flow {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            request: Request {
                method: method.into(),
                url: url.into(),
            },
            response: None,
            cache_state: FlowCacheState::Pending,
        }
    }

    pub fn served_from_cache(&self) -> bool {
        self.cache_state == FlowCacheState::ServedFromCache
    }
}
