//! Interception adapter for a hosting HTTP proxy

pub mod addon;
pub mod flow;

pub use addon::{CacheAddon, RequestVerdict, CACHEABLE_METHODS};
pub use flow::{Flow, FlowCacheState, Request, Response};
