//! 요청 origin 추출 및 정규화.
//!
//! origin은 `origin` 쿼리 파라미터를 우선하고, 없으면 `Origin` 헤더를 사용합니다.
//! 정규화된 origin은 포트와 `www.` 접두사를 제거한 호스트 이름입니다.

use axum::http::{header::ORIGIN, HeaderMap, Uri};
use url::Url;

/// origin을 알 수 없을 때 사용하는 값.
pub const UNKNOWN_ORIGIN: &str = "unknown";

const ORIGIN_PARAM: &str = "origin";

/// 원시 origin 문자열을 호스트로 정규화합니다.
///
/// `https://www.a.example:8443` → `a.example`. 스킴이 없으면 `http://`를 붙여 해석합니다.
pub fn normalize_host(raw: &str) -> Option<String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let parsed = Url::parse(raw)
        .ok()
        .filter(|u| u.host_str().is_some())
        .or_else(|| Url::parse(&format!("http://{}", raw)).ok())?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    let host = host.strip_prefix("www.").unwrap_or(&host);

    if host.is_empty() {
        None
    } else {
        Some(host.to_string())
    }
}

/// `origin` 쿼리 파라미터 값. 값이 비어 있어도 키가 있으면 `Some`.
pub fn origin_query_param(uri: &Uri) -> Option<String> {
    let query = uri.query()?;
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == ORIGIN_PARAM)
        .map(|(_, value)| value.into_owned())
}

/// 비어 있지 않은 `Origin` 헤더 값.
pub fn origin_header(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(ORIGIN)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.trim().is_empty())
}

/// 요청의 정규화된 origin 호스트.
pub fn request_origin(uri: &Uri, headers: &HeaderMap) -> Option<String> {
    origin_query_param(uri)
        .and_then(|raw| normalize_host(&raw))
        .or_else(|| origin_header(headers).and_then(normalize_host))
}

/// 메트릭과 캐시 키에 쓰는 origin 라벨.
pub fn origin_label(uri: &Uri, headers: &HeaderMap) -> String {
    request_origin(uri, headers).unwrap_or_else(|| UNKNOWN_ORIGIN.to_string())
}

/// WebSocket 업그레이드 허용 여부.
///
/// `Origin` 헤더가 비어 있지 않거나 `origin` 쿼리 파라미터가 존재해야 합니다.
pub fn has_origin_signal(uri: &Uri, headers: &HeaderMap) -> bool {
    origin_header(headers).is_some() || origin_query_param(uri).is_some()
}
