//! 공개 조회 API 통합 테스트.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{header, Request, StatusCode},
    middleware,
    response::Response,
    routing::get,
    Router,
};
use serde_json::Value;
use ticker_api::cache::{cache_layer, ResponseCache};
use ticker_api::routes::create_api_router;
use ticker_api::state::AppState;
use ticker_core::{AppConfig, InactiveSettings, MemoryStorage, Message, Storage, Ticker};
use tower::ServiceExt;

// ==================== 헬퍼 ====================

async fn body_bytes(response: Response) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

fn get_with_origin(uri: &str, origin: &str) -> Request<Body> {
    Request::builder()
        .uri(uri)
        .header(header::ORIGIN, origin)
        .body(Body::empty())
        .unwrap()
}

/// `a.example`에 연결된 티커와 메시지 세 개를 가진 앱.
async fn app_with_ticker(active: bool) -> (Router, Arc<MemoryStorage>, i64) {
    let storage = Arc::new(MemoryStorage::new());

    let mut ticker = Ticker::new("Demo Ticker").with_website("a.example");
    ticker.description = "Live coverage".to_string();
    ticker.active = active;
    storage.save_ticker(&mut ticker).await.unwrap();

    for text in ["first", "second", "third"] {
        let mut message = Message::new(ticker.id, text);
        storage.save_message(&mut message).await.unwrap();
    }

    let state = Arc::new(AppState::new(
        AppConfig::default(),
        Arc::clone(&storage) as Arc<dyn Storage>,
    ));
    (create_api_router(state), storage, ticker.id)
}

// ==================== 응답 캐시 ====================

#[tokio::test(start_paused = true)]
async fn test_response_cache_hit_skips_handler() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = ResponseCache::new(Duration::from_secs(60));

    let app = Router::new()
        .route(
            "/v1/timeline",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    "pong"
                }
            }),
        )
        .layer(middleware::from_fn_with_state(cache.clone(), cache_layer));

    let request = || get_with_origin("/v1/timeline?limit=5", "https://a.example");

    let first = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(body_bytes(first).await, b"pong");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    let second = app.clone().oneshot(request()).await.unwrap();
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(body_bytes(second).await, b"pong");
    assert_eq!(calls.load(Ordering::SeqCst), 1);

    // 다른 origin은 별도 항목
    let other = app
        .clone()
        .oneshot(get_with_origin("/v1/timeline?limit=5", "https://b.example"))
        .await
        .unwrap();
    assert_eq!(other.status(), StatusCode::OK);
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    tokio::time::advance(Duration::from_secs(61)).await;

    let third = app.oneshot(request()).await.unwrap();
    assert_eq!(body_bytes(third).await, b"pong");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_error_responses_are_not_cached() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&calls);
    let cache = ResponseCache::new(Duration::from_secs(60));

    let app = Router::new()
        .route(
            "/v1/timeline",
            get(move || {
                let counter = Arc::clone(&counter);
                async move {
                    counter.fetch_add(1, Ordering::SeqCst);
                    StatusCode::NOT_FOUND
                }
            }),
        )
        .layer(middleware::from_fn_with_state(cache.clone(), cache_layer));

    for _ in 0..2 {
        let response = app
            .clone()
            .oneshot(get_with_origin("/v1/timeline", "https://a.example"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert!(cache.store().is_empty());
}

#[tokio::test]
async fn test_cache_key_keeps_version_prefix() {
    let storage = Arc::new(MemoryStorage::new());
    let mut ticker = Ticker::new("Demo Ticker").with_website("a.example");
    ticker.active = true;
    storage.save_ticker(&mut ticker).await.unwrap();

    let state = Arc::new(AppState::new(AppConfig::default(), storage));
    let app = create_api_router(Arc::clone(&state));

    let response = app
        .oneshot(get_with_origin("/v1/timeline?limit=5", "https://a.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let mut keys = Vec::new();
    state.cache.store().range(|key, _| {
        keys.push(key.to_string());
        true
    });
    assert_eq!(keys, vec!["response:a.example:/v1/timeline:limit=5".to_string()]);
}

// ==================== init ====================

#[tokio::test]
async fn test_init_returns_active_ticker() {
    let (app, _, ticker_id) = app_with_ticker(true).await;

    let response = app
        .oneshot(get_with_origin("/v1/init", "https://a.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "success");
    assert_eq!(json["data"]["ticker"]["id"], ticker_id);
    assert_eq!(json["data"]["ticker"]["title"], "Demo Ticker");
    assert_eq!(json["data"]["settings"]["refreshInterval"], 10_000);
    assert!(json["data"]["settings"].get("inactiveSettings").is_none());
}

#[tokio::test]
async fn test_init_without_ticker_returns_inactive_settings() {
    let storage = Arc::new(MemoryStorage::new());
    let settings = InactiveSettings {
        headline: "Nothing here".to_string(),
        ..InactiveSettings::default()
    };
    storage.save_inactive_settings(&settings).await.unwrap();

    let state = Arc::new(AppState::new(AppConfig::default(), storage));
    let response = create_api_router(state)
        .oneshot(get_with_origin("/v1/init", "https://nobody.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert!(json["data"]["ticker"].is_null());
    assert_eq!(
        json["data"]["settings"]["inactiveSettings"]["headline"],
        "Nothing here"
    );
}

// ==================== timeline ====================

#[tokio::test]
async fn test_timeline_newest_first_with_limit() {
    let (app, _, _) = app_with_ticker(true).await;

    let response = app
        .oneshot(get_with_origin("/v1/timeline?limit=2", "https://a.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    let messages = json["data"]["messages"].as_array().unwrap();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0]["text"], "third");
    assert_eq!(messages[1]["text"], "second");
}

#[tokio::test]
async fn test_timeline_origin_query_param_wins() {
    let (app, _, _) = app_with_ticker(true).await;

    let response = app
        .oneshot(get_with_origin(
            "/v1/timeline?origin=https%3A%2F%2Fa.example",
            "https://other.example",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_timeline_inactive_ticker_is_empty() {
    let (app, _, _) = app_with_ticker(false).await;

    let response = app
        .oneshot(get_with_origin("/v1/timeline", "https://a.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["data"]["messages"].as_array().unwrap().len(), 0);
}

#[tokio::test]
async fn test_timeline_unknown_origin_is_not_found() {
    let (app, _, _) = app_with_ticker(true).await;

    let response = app
        .oneshot(get_with_origin("/v1/timeline", "https://unknown.example"))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let json = body_json(response).await;
    assert_eq!(json["status"], "error");
    assert_eq!(json["error"]["code"], 1001);
    assert!(json["data"].is_null());
}

// ==================== feed / manifest ====================

#[tokio::test]
async fn test_feed_formats() {
    let (app, _, _) = app_with_ticker(true).await;

    let rss = app
        .clone()
        .oneshot(get_with_origin("/v1/feed", "https://a.example"))
        .await
        .unwrap();
    assert_eq!(rss.status(), StatusCode::OK);
    assert_eq!(
        rss.headers()[header::CONTENT_TYPE],
        "application/xml; charset=utf-8"
    );
    let body = String::from_utf8(body_bytes(rss).await).unwrap();
    assert!(body.contains("<rss version=\"2.0\">"));
    assert_eq!(body.matches("<item>").count(), 3);

    let atom = app
        .oneshot(get_with_origin("/v1/feed?format=atom", "https://a.example"))
        .await
        .unwrap();
    let body = String::from_utf8(body_bytes(atom).await).unwrap();
    assert!(body.contains("http://www.w3.org/2005/Atom"));
    assert_eq!(body.matches("<entry>").count(), 3);
}

#[tokio::test]
async fn test_manifest() {
    let (app, _, _) = app_with_ticker(true).await;

    let response = app
        .oneshot(get_with_origin(
            "/v1/manifest.json?origin=https://a.example",
            "https://a.example",
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE],
        "application/manifest+json"
    );

    let json = body_json(response).await;
    assert_eq!(json["name"], "Demo Ticker");
    assert_eq!(json["short_name"], "Demo Ticker");
    assert_eq!(json["start_url"], "https://a.example/");
    assert_eq!(json["icons"].as_array().unwrap().len(), 2);
}

// ==================== media / health ====================

#[tokio::test]
async fn test_media_unknown_upload_is_not_found() {
    let (app, _, _) = app_with_ticker(true).await;

    let response = app
        .oneshot(
            Request::builder()
                .uri(format!("/media/{}.png", uuid::Uuid::new_v4()))
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_health() {
    let (app, _, _) = app_with_ticker(true).await;

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let json = body_json(response).await;
    assert_eq!(json["status"], "ok");
    assert_eq!(json["connected_clients"], 0);
    assert_eq!(json["realtime_running"], false);
}
