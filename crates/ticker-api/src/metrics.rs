//! Prometheus 메트릭 설정 및 유틸리티.
//!
//! WebSocket 엔진과 HTTP 요청 메트릭을 수집하고 `/metrics` 엔드포인트로 노출합니다.

use std::time::Duration;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};

/// Prometheus 메트릭 레코더를 설정하고 핸들을 반환합니다.
///
/// # 패닉
///
/// 레코더가 이미 설치되어 있으면 패닉합니다.
pub fn setup_metrics_recorder() -> PrometheusHandle {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full("http_request_duration_seconds".to_string()),
            &[0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .expect("히스토그램 버킷 설정 실패")
        .set_buckets_for_metric(
            Matcher::Full("websocket_broadcast_duration_seconds".to_string()),
            &[0.0001, 0.0005, 0.001, 0.005, 0.01, 0.05, 0.1, 0.5],
        )
        .expect("히스토그램 버킷 설정 실패")
        .install_recorder()
        .expect("Prometheus 레코더 설치 실패")
}

// ============================================================================
// WebSocket 메트릭 헬퍼 함수
// ============================================================================

/// 클라이언트 등록.
pub fn record_client_connected(origin: &str) {
    counter!("websocket_connections_total", "origin" => origin.to_string()).increment(1);
    gauge!("websocket_connected_clients", "origin" => origin.to_string()).increment(1.0);
}

/// 클라이언트 해제. `reason`은 `channel_full`, `server_shutdown`, `client_disconnected` 중 하나.
pub fn record_client_disconnected(origin: &str, reason: &str) {
    counter!(
        "websocket_disconnections_total",
        "origin" => origin.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
    gauge!("websocket_connected_clients", "origin" => origin.to_string()).decrement(1.0);
}

/// 클라이언트 큐에 메시지를 넣었음.
pub fn record_message_sent(origin: &str, kind: &str) {
    counter!(
        "websocket_messages_sent_total",
        "origin" => origin.to_string(),
        "type" => kind.to_string()
    )
    .increment(1);
}

/// 큐가 가득 차서 메시지를 버렸음.
pub fn record_message_dropped(origin: &str, kind: &str) {
    counter!(
        "websocket_messages_dropped_total",
        "origin" => origin.to_string(),
        "type" => kind.to_string()
    )
    .increment(1);
}

pub fn record_broadcast_duration(origin: &str, kind: &str, duration: Duration) {
    histogram!(
        "websocket_broadcast_duration_seconds",
        "origin" => origin.to_string(),
        "type" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

/// 엔진 전체 연결 수.
pub fn set_total_connected_clients(count: usize) {
    gauge!("websocket_total_connected_clients").set(count as f64);
}

// ============================================================================
// HTTP 메트릭 헬퍼 함수
// ============================================================================

/// HTTP 요청 지속 시간 기록.
pub fn record_http_duration(handler: &str, origin: &str, code: u16, duration_secs: f64) {
    histogram!(
        "http_request_duration_seconds",
        "handler" => handler.to_string(),
        "origin" => origin.to_string(),
        "code" => code.to_string()
    )
    .record(duration_secs);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_helpers_without_recorder() {
        // 레코더가 없으면 no-op
        record_client_connected("a.example");
        record_message_sent("a.example", "message_created");
        record_message_dropped("a.example", "message_created");
        record_broadcast_duration("a.example", "message_created", Duration::from_millis(1));
        record_client_disconnected("a.example", "channel_full");
        set_total_connected_clients(0);
        record_http_duration("/v1/timeline", "a.example", 200, 0.01);
    }
}
