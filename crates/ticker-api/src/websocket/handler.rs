//! WebSocket 업그레이드 핸들러.

use std::sync::Arc;

use axum::{
    extract::{
        ws::{rejection::WebSocketUpgradeRejection, WebSocketUpgrade},
        State,
    },
    http::{HeaderMap, StatusCode, Uri},
    response::{IntoResponse, Response},
    Extension,
};
use ticker_core::Ticker;
use tracing::{debug, info};

use super::client::Client;
use crate::error::ApiError;
use crate::middleware::origin::{has_origin_signal, origin_label};
use crate::state::AppState;

/// 수신 프레임 크기 제한 (바이트).
pub const MAX_MESSAGE_SIZE: usize = 512;

/// WebSocket 업그레이드 핸들러.
///
/// `Origin` 헤더나 `origin` 쿼리 파라미터가 없으면 거부합니다. 티커는
/// 앞선 미들웨어가 요청 확장에 넣어 두어야 합니다.
///
/// # 엔드포인트
///
/// `GET /v1/websocket`
pub async fn websocket_handler(
    State(state): State<Arc<AppState>>,
    ticker: Option<Extension<Ticker>>,
    uri: Uri,
    headers: HeaderMap,
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
) -> Response {
    if !has_origin_signal(&uri, &headers) {
        debug!(uri = %uri, "Refusing websocket upgrade without origin");
        return StatusCode::FORBIDDEN.into_response();
    }

    let Some(Extension(ticker)) = ticker else {
        return ApiError::ticker_not_found().into_response();
    };

    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => return rejection.into_response(),
    };

    let engine = Arc::clone(&state.engine);
    let origin = origin_label(&uri, &headers);
    let (client, queue) = Client::new(
        &engine,
        ticker.id,
        origin,
        engine.config().client_queue_capacity,
    );

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .max_frame_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| async move {
            info!(
                client_id = client.id(),
                ticker_id = client.ticker_id(),
                origin = client.origin(),
                "WebSocket connected"
            );
            if !engine.register(Arc::clone(&client)) {
                client.close_connection();
                return;
            }
            client.serve(socket, queue);
        })
}
