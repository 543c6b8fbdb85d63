//! origin → 티커 해석 미들웨어.
//!
//! 공개 라우트 앞에서 요청 origin에 연결된 티커를 찾아 request extensions에
//! 넣습니다. 찾지 못해도 요청은 계속 진행되며, 티커가 필요한 핸들러가
//! 직접 `404`를 반환합니다.

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};
use ticker_core::{FindOptions, Ticker};
use tracing::{debug, warn};

use super::origin::request_origin;
use crate::state::AppState;

/// 요청에 연결된 티커를 찾아 extensions에 저장합니다.
pub async fn resolve_ticker(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    // Body는 Sync가 아니므로 await 전에 origin만 꺼냅니다
    let host = request_origin(request.uri(), request.headers());
    if let Some(host) = host {
        if let Some(ticker) = lookup(&state, &host).await {
            request.extensions_mut().insert(ticker);
        }
    }
    next.run(request).await
}

async fn lookup(state: &AppState, host: &str) -> Option<Ticker> {
    match state
        .storage
        .find_ticker_by_domain(host, FindOptions::none().with_websites())
        .await
    {
        Ok(ticker) => Some(ticker),
        Err(e) if e.is_not_found() => {
            debug!(origin = %host, "No ticker for origin");
            None
        }
        Err(e) => {
            warn!(origin = %host, error = %e, "Failed to resolve ticker");
            None
        }
    }
}
