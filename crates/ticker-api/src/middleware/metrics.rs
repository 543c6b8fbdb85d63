//! HTTP 요청 metrics middleware.

use axum::{
    extract::{MatchedPath, Request},
    middleware::Next,
    response::Response,
};
use std::time::Instant;

use super::origin::origin_label;
use crate::metrics::record_http_duration;

/// `http_request_duration_seconds{handler, origin, code}`를 기록합니다.
///
/// `handler`는 매칭된 라우트 경로입니다. `route_layer`로 적용해야
/// [`MatchedPath`]를 볼 수 있습니다.
pub async fn metrics_layer(request: Request, next: Next) -> Response {
    let start = Instant::now();

    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| "unmatched".to_string());
    let origin = origin_label(request.uri(), request.headers());

    let response = next.run(request).await;

    record_http_duration(
        &handler,
        &origin,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
