//! 공개 응답 캐시.

mod middleware;
mod store;

pub use middleware::{cache_layer, CachedResponse, ResponseCache};
pub use store::CacheStore;
