//! 공개 엔드포인트 응답 캐시 미들웨어.
//!
//! 캐시 키: `response:{origin}:{path}:{query}`
//!
//! 적중 시 내부 핸들러를 호출하지 않고 저장된 상태 코드, 헤더, 본문을 그대로
//! 돌려줍니다. 미스 시 응답을 기록하고 상태 코드가 300 미만이면 저장합니다.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{OriginalUri, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::{debug, warn};

use super::store::CacheStore;
use crate::middleware::origin_label;

const KEY_PREFIX: &str = "response";

/// 기록된 응답.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl IntoResponse for CachedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// 응답 캐시 핸들.
#[derive(Clone)]
pub struct ResponseCache {
    store: Arc<CacheStore<CachedResponse>>,
    ttl: Duration,
}

impl ResponseCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            store: Arc::new(CacheStore::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn store(&self) -> &Arc<CacheStore<CachedResponse>> {
        &self.store
    }

    /// 요청 지문으로 캐시 키를 만듭니다.
    pub fn key(origin: &str, path: &str, query: &str) -> String {
        format!("{}:{}:{}:{}", KEY_PREFIX, origin, path, query)
    }

    /// 만료 항목 정리 태스크를 시작합니다.
    pub fn spawn_sweeper(&self, interval: Duration) -> tokio::task::JoinHandle<()> {
        self.store.spawn_sweeper(interval)
    }

    pub fn close(&self) {
        self.store.close();
    }
}

/// 응답 캐시 미들웨어.
pub async fn cache_layer(
    State(cache): State<ResponseCache>,
    request: Request,
    next: Next,
) -> Response {
    let origin = origin_label(request.uri(), request.headers());
    // nest()는 접두사를 떼므로 원래 URI 기준으로 키를 만듦
    let uri = request
        .extensions()
        .get::<OriginalUri>()
        .map(|original| original.0.clone())
        .unwrap_or_else(|| request.uri().clone());
    let key = ResponseCache::key(&origin, uri.path(), uri.query().unwrap_or_default());

    if let Some(cached) = cache.store.get(&key) {
        debug!(key = %key, "Response cache hit");
        return cached.into_response();
    }

    let response = next.run(request).await;
    if response.status().as_u16() >= 300 {
        return response;
    }

    let (parts, body) = response.into_parts();
    match axum::body::to_bytes(body, usize::MAX).await {
        Ok(bytes) => {
            cache.store.set(
                key,
                CachedResponse {
                    status: parts.status,
                    headers: parts.headers.clone(),
                    body: bytes.clone(),
                },
                cache.ttl,
            );
            Response::from_parts(parts, Body::from(bytes))
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Response body aborted, not caching");
            cache.store.delete(&key);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
