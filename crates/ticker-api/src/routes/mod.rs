//! API 라우트.
//!
//! # 라우트 구조
//!
//! - `/health` - 헬스 체크
//! - `/v1/init`, `/v1/timeline`, `/v1/feed`, `/v1/manifest.json` - 공개 조회 (응답 캐시)
//! - `/v1/websocket` - 실시간 구독
//! - `/v1/admin/*` - 편집자용 관리
//! - `/media/{uuid}.{ext}` - 업로드 파일

pub mod admin;
pub mod feed;
pub mod health;
pub mod public;

pub use admin::admin_router;
pub use health::{health_router, HealthResponse};

use std::sync::Arc;

use axum::{middleware, routing::get, Router};

use crate::cache::cache_layer;
use crate::middleware::{metrics_layer, resolve_ticker};
use crate::state::AppState;
use crate::websocket::websocket_handler;

/// 공개 조회 라우터.
///
/// 캐시가 티커 해석보다 바깥에 있어 적중 시 저장소를 조회하지 않습니다.
fn public_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/init", get(public::init))
        .route("/timeline", get(public::timeline))
        .route("/feed", get(feed::feed))
        .route("/manifest.json", get(public::manifest))
        .layer(middleware::from_fn_with_state(
            Arc::clone(state),
            resolve_ticker,
        ))
        .layer(middleware::from_fn_with_state(
            state.cache.clone(),
            cache_layer,
        ))
}

fn websocket_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/websocket", get(websocket_handler))
        .layer(middleware::from_fn_with_state(
            Arc::clone(state),
            resolve_ticker,
        ))
}

/// 전체 API 라우터를 생성합니다.
pub fn create_api_router(state: Arc<AppState>) -> Router {
    let v1 = Router::new()
        .merge(public_router(&state))
        .merge(websocket_router(&state))
        .nest("/admin", admin_router());

    Router::new()
        .nest("/health", health_router())
        .nest("/v1", v1)
        .route("/media/{file}", get(public::media))
        .route_layer(middleware::from_fn(metrics_layer))
        .with_state(state)
}
