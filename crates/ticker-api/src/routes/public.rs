//! 공개 endpoint.
//!
//! 요청 origin으로 해석된 티커를 기준으로 동작합니다. 티커 해석은
//! `resolve_ticker` 미들웨어가 먼저 수행합니다.
//!
//! - `GET /v1/init`
//! - `GET /v1/timeline?limit=&before=&after=`
//! - `GET /v1/manifest.json`
//! - `GET /media/{uuid}.{ext}`

use std::sync::Arc;

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::{
        header::{CACHE_CONTROL, CONTENT_TYPE, EXPIRES},
        HeaderMap, HeaderValue, StatusCode, Uri,
    },
    response::{IntoResponse, Response},
    Extension, Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ticker_core::{FindOptions, InactiveSettings, Pagination, Ticker};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::error::{success, ApiError, ApiResult, Envelope};
use crate::middleware::origin::{origin_header, origin_query_param};
use crate::state::AppState;
use crate::types::{PublicTicker, TimelineEntry};

/// 미디어 캐시 기간 (30일).
pub const MEDIA_MAX_AGE_SECS: i64 = 60 * 60 * 24 * 30;

/// 타임라인 최대 페이지 크기.
pub const MAX_TIMELINE_LIMIT: usize = 100;

const MANIFEST_ICONS: [(&str, &str); 2] = [
    ("192x192", "android-chrome-192x192.png"),
    ("512x512", "android-chrome-512x512.png"),
];

// ==================== 타입 ====================

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitResponse {
    pub ticker: Option<PublicTicker>,
    pub settings: InitSettings,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitSettings {
    pub refresh_interval: i64,
    /// 활성 티커가 없을 때만 포함
    #[serde(skip_serializing_if = "Option::is_none")]
    pub inactive_settings: Option<InactiveSettings>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TimelineQuery {
    pub limit: Option<usize>,
    pub before: Option<i64>,
    pub after: Option<i64>,
}

impl TimelineQuery {
    pub fn pagination(&self) -> Pagination {
        let limit = self
            .limit
            .unwrap_or(Pagination::DEFAULT_LIMIT)
            .clamp(1, MAX_TIMELINE_LIMIT);
        Pagination {
            limit,
            before: self.before,
            after: self.after,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TimelineResponse {
    pub messages: Vec<TimelineEntry>,
}

#[derive(Debug, Serialize)]
pub struct Manifest {
    pub name: String,
    pub short_name: String,
    pub description: String,
    pub start_url: String,
    pub display: &'static str,
    pub theme_color: &'static str,
    pub background_color: &'static str,
    pub icons: Vec<ManifestIcon>,
}

#[derive(Debug, Serialize)]
pub struct ManifestIcon {
    pub src: String,
    pub sizes: &'static str,
    #[serde(rename = "type")]
    pub kind: &'static str,
}

// ==================== 핸들러 ====================

/// `GET /v1/init`
///
/// 활성 티커가 없으면 `ticker`는 null이고 비활성 안내 문구가 포함됩니다.
pub async fn init(
    State(state): State<Arc<AppState>>,
    ticker: Option<Extension<Ticker>>,
) -> Json<Envelope<InitResponse>> {
    let refresh_interval = match state.storage.get_refresh_interval().await {
        Ok(interval) => interval.refresh_interval,
        Err(e) => {
            warn!(error = %e, "Failed to load refresh interval, using default");
            ticker_core::DEFAULT_REFRESH_INTERVAL_MS
        }
    };

    let ticker = ticker.map(|Extension(t)| t).filter(|t| t.active);
    let inactive_settings = if ticker.is_some() {
        None
    } else {
        Some(state.storage.get_inactive_settings().await.unwrap_or_else(|e| {
            warn!(error = %e, "Failed to load inactive settings, using default");
            InactiveSettings::default()
        }))
    };

    success(InitResponse {
        ticker: ticker.as_ref().map(PublicTicker::from),
        settings: InitSettings {
            refresh_interval,
            inactive_settings,
        },
    })
}

/// `GET /v1/timeline`
///
/// 비활성 티커는 빈 목록을 반환합니다.
pub async fn timeline(
    State(state): State<Arc<AppState>>,
    ticker: Option<Extension<Ticker>>,
    query: Result<Query<TimelineQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<TimelineResponse>>> {
    let Some(Extension(ticker)) = ticker else {
        return Err(ApiError::ticker_not_found());
    };
    let Query(query) = query.map_err(|e| {
        debug!(error = %e, "Invalid timeline query");
        ApiError::invalid_form()
    })?;

    let messages = if ticker.active {
        timeline_entries(&state, ticker.id, query.pagination()).await?
    } else {
        Vec::new()
    };

    Ok(success(TimelineResponse { messages }))
}

/// 공개 타임라인 항목을 조회합니다.
pub(crate) async fn timeline_entries(
    state: &AppState,
    ticker_id: i64,
    pagination: Pagination,
) -> ApiResult<Vec<TimelineEntry>> {
    let messages = state
        .storage
        .find_messages_by_ticker(ticker_id, pagination, FindOptions::none().with_attachments())
        .await
        .map_err(|e| {
            warn!(ticker_id, error = %e, "Failed to load timeline");
            ApiError::internal()
        })?;

    let base_url = state.publication.media_base_url();
    Ok(messages
        .iter()
        .map(|m| TimelineEntry::from_message(m, base_url))
        .collect())
}

/// `GET /v1/manifest.json`
pub async fn manifest(
    ticker: Option<Extension<Ticker>>,
    uri: Uri,
    headers: HeaderMap,
) -> ApiResult<Response> {
    let Some(Extension(ticker)) = ticker else {
        return Err(ApiError::ticker_not_found());
    };

    let start_url = origin_query_param(&uri)
        .or_else(|| origin_header(&headers).map(str::to_string))
        .filter(|o| o.starts_with("http://") || o.starts_with("https://"))
        .map(|o| format!("{}/", o.trim_end_matches('/')))
        .unwrap_or_else(|| "/".to_string());

    let manifest = Manifest {
        short_name: short_name(&ticker.title),
        name: ticker.title.clone(),
        description: ticker.description.clone(),
        start_url,
        display: "standalone",
        theme_color: "#2185d0",
        background_color: "#ffffff",
        icons: MANIFEST_ICONS
            .iter()
            .map(|&(sizes, file)| ManifestIcon {
                src: format!("/{}", file),
                sizes,
                kind: "image/png",
            })
            .collect(),
    };

    let mut response = Json(manifest).into_response();
    response.headers_mut().insert(
        CONTENT_TYPE,
        HeaderValue::from_static("application/manifest+json"),
    );
    Ok(response)
}

fn short_name(title: &str) -> String {
    const MAX: usize = 12;
    if title.chars().count() <= MAX {
        title.to_string()
    } else {
        title.chars().take(MAX).collect()
    }
}

/// `GET /media/{uuid}.{ext}`
///
/// 업로드 디렉터리에서 파일을 읽어 30일 캐시 헤더와 함께 반환합니다.
pub async fn media(
    State(state): State<Arc<AppState>>,
    Path(file): Path<String>,
) -> ApiResult<Response> {
    let uuid = file
        .split_once('.')
        .map_or(file.as_str(), |(stem, _)| stem)
        .parse::<Uuid>()
        .map_err(|_| ApiError::upload_not_found())?;

    let upload = state
        .storage
        .find_upload_by_uuid(uuid)
        .await
        .map_err(|e| {
            if !e.is_not_found() {
                warn!(%uuid, error = %e, "Failed to load upload");
            }
            ApiError::upload_not_found()
        })?;

    let path = upload.full_path(&state.config.upload.path);
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        warn!(%uuid, path = %path.display(), error = %e, "Upload file missing");
        ApiError::upload_not_found()
    })?;

    let expires = (Utc::now() + chrono::Duration::seconds(MEDIA_MAX_AGE_SECS))
        .format("%a, %d %b %Y %H:%M:%S GMT")
        .to_string();

    let mut response = (StatusCode::OK, bytes).into_response();
    let headers = response.headers_mut();
    if let Ok(value) = HeaderValue::from_str(&upload.content_type) {
        headers.insert(CONTENT_TYPE, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("public, max-age={}", MEDIA_MAX_AGE_SECS)) {
        headers.insert(CACHE_CONTROL, value);
    }
    if let Ok(value) = HeaderValue::from_str(&expires) {
        headers.insert(EXPIRES, value);
    }

    Ok(response)
}
