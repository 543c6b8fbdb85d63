//! 헬스 체크 endpoint.
//!
//! 로드밸런서나 오케스트레이션 시스템에서 사용하는 liveness 확인용입니다.

use std::sync::Arc;

use axum::{extract::State, routing::get, Json, Router};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// 헬스 체크 응답.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// 항상 "ok"
    pub status: String,

    /// API 버전
    pub version: String,

    /// 서버 업타임(초)
    pub uptime_secs: i64,

    /// 현재 실시간 연결 수
    pub connected_clients: usize,

    /// 실시간 엔진 실행 여부
    pub realtime_running: bool,
}

/// `GET /health`
pub async fn health_check(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let uptime = chrono::Utc::now() - state.started_at;

    Json(HealthResponse {
        status: "ok".to_string(),
        version: state.version.clone(),
        uptime_secs: uptime.num_seconds(),
        connected_clients: state.engine.connected_clients(),
        realtime_running: state.engine.is_running(),
    })
}

/// 헬스 체크 라우터.
pub fn health_router() -> Router<Arc<AppState>> {
    Router::new().route("/", get(health_check))
}
