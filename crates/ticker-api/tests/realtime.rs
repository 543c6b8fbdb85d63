//! 실시간 WebSocket 통합 테스트.
//!
//! 실제 리스너에 서버를 띄우고 tokio-tungstenite 클라이언트로 접속합니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use futures::StreamExt;
use serde_json::{json, Value};
use ticker_api::routes::create_api_router;
use ticker_api::state::AppState;
use ticker_api::websocket::{BroadcastMessage, Client, SHUTDOWN_NOTICE};
use ticker_core::{AppConfig, MemoryStorage, Storage, Ticker};
use tokio::net::TcpStream;
use tokio::time::Instant;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message as WsMessage;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use tower::ServiceExt;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

// ==================== 헬퍼 ====================

struct TestServer {
    addr: SocketAddr,
    state: Arc<AppState>,
}

async fn active_ticker(storage: &MemoryStorage, origin: &str) -> i64 {
    let mut ticker = Ticker::new(origin).with_website(origin);
    ticker.active = true;
    storage.save_ticker(&mut ticker).await.unwrap();
    ticker.id
}

/// 두 티커(`a.example`, `b.example`)를 가진 서버를 띄웁니다.
async fn start_server() -> (TestServer, i64, i64) {
    let storage = MemoryStorage::new();
    let first = active_ticker(&storage, "a.example").await;
    let second = active_ticker(&storage, "b.example").await;

    let state = Arc::new(AppState::new(AppConfig::default(), Arc::new(storage)));
    state.engine.start().unwrap();

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let app = create_api_router(Arc::clone(&state));
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    (TestServer { addr, state }, first, second)
}

async fn connect(addr: SocketAddr, origin: &str) -> WsStream {
    let mut request = format!("ws://{}/v1/websocket", addr)
        .into_client_request()
        .unwrap();
    request
        .headers_mut()
        .insert("Origin", origin.parse().unwrap());
    let (ws, _) = tokio_tungstenite::connect_async(request).await.unwrap();
    ws
}

/// 다음 텍스트 프레임을 JSON으로 읽습니다. 시간 초과나 연결 종료 시 `None`.
async fn next_json(ws: &mut WsStream, wait: Duration) -> Option<Value> {
    let deadline = Instant::now() + wait;
    loop {
        let frame = tokio::time::timeout_at(deadline, ws.next()).await.ok()??;
        match frame.ok()? {
            WsMessage::Text(text) => return serde_json::from_str(&text).ok(),
            WsMessage::Close(_) => return None,
            _ => continue,
        }
    }
}

async fn wait_for_clients(state: &AppState, expected: usize) {
    for _ in 0..100 {
        if state.engine.connected_clients() == expected {
            return;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    panic!(
        "expected {} clients, got {}",
        expected,
        state.engine.connected_clients()
    );
}

// ==================== 시나리오 ====================

#[tokio::test]
async fn test_single_client_receives_broadcast() {
    let (server, ticker_id, _) = start_server().await;
    let mut ws = connect(server.addr, "https://a.example").await;

    tokio::time::sleep(Duration::from_millis(100)).await;
    wait_for_clients(&server.state, 1).await;

    assert!(server.state.engine.broadcast(BroadcastMessage::message_created(
        ticker_id,
        json!({ "id": 42, "text": "hi" }),
    )));

    let frame = next_json(&mut ws, Duration::from_secs(1))
        .await
        .expect("broadcast frame");
    assert_eq!(frame["type"], "message_created");
    assert_eq!(frame["tickerId"], ticker_id);
    assert_eq!(frame["data"]["id"], 42);
    assert_eq!(frame["data"]["text"], "hi");
}

#[tokio::test]
async fn test_broadcast_is_isolated_per_ticker() {
    let (server, first_id, second_id) = start_server().await;
    let mut first = connect(server.addr, "https://a.example").await;
    let mut second = connect(server.addr, "https://b.example").await;
    wait_for_clients(&server.state, 2).await;

    server
        .state
        .engine
        .broadcast(BroadcastMessage::message_deleted(first_id, 7));

    let frame = next_json(&mut first, Duration::from_secs(1))
        .await
        .expect("frame for first ticker");
    assert_eq!(frame["tickerId"], first_id);
    assert_eq!(frame["data"]["id"], 7);

    assert_ne!(first_id, second_id);
    assert!(next_json(&mut second, Duration::from_millis(500))
        .await
        .is_none());
}

#[tokio::test]
async fn test_shutdown_notifies_before_close() {
    let (server, ticker_id, _) = start_server().await;
    let mut ws = connect(server.addr, "https://a.example").await;
    wait_for_clients(&server.state, 1).await;

    let engine = Arc::clone(&server.state.engine);
    let started = Instant::now();
    let shutdown = tokio::spawn(async move { engine.shutdown(Duration::from_secs(2)).await });

    let notice = next_json(&mut ws, Duration::from_secs(2))
        .await
        .expect("shutdown notice");
    assert_eq!(notice["type"], "server_shutdown");
    assert_eq!(notice["tickerId"], ticker_id);
    assert_eq!(notice["data"]["message"], SHUTDOWN_NOTICE);

    // 알림 뒤에는 연결 종료만 남음
    assert!(next_json(&mut ws, Duration::from_secs(2)).await.is_none());

    assert_eq!(shutdown.await.unwrap(), Ok(()));
    assert!(started.elapsed() < Duration::from_secs(2));
    assert_eq!(server.state.engine.connected_clients(), 0);
}

#[tokio::test]
async fn test_slow_consumer_is_evicted() {
    let (server, ticker_id, _) = start_server().await;
    let engine = &server.state.engine;

    // 큐 용량 1, 소비하지 않음
    let (client, mut queue) = Client::new(engine, ticker_id, "a.example", 1);
    assert!(engine.register(Arc::clone(&client)));
    wait_for_clients(&server.state, 1).await;

    for id in 0..10 {
        engine.broadcast(BroadcastMessage::message_deleted(ticker_id, id));
    }
    wait_for_clients(&server.state, 0).await;
    assert!(client.is_closed());

    let first = queue.recv().await.expect("first message delivered");
    assert_eq!(first.data["id"], 0);
    assert!(queue.recv().await.is_none());

    // 이후 브로드캐스트는 대상이 없음
    assert!(engine.broadcast(BroadcastMessage::message_deleted(ticker_id, 11)));
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert_eq!(engine.connected_clients(), 0);
}

// ==================== 업그레이드 거부 ====================

#[tokio::test]
async fn test_upgrade_without_origin_is_forbidden() {
    let state = Arc::new(AppState::new(
        AppConfig::default(),
        Arc::new(MemoryStorage::new()),
    ));
    let app = create_api_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/websocket")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_upgrade_for_unknown_origin_is_not_found() {
    let state = Arc::new(AppState::new(
        AppConfig::default(),
        Arc::new(MemoryStorage::new()),
    ));
    let app = create_api_router(state);

    let response = app
        .oneshot(
            Request::builder()
                .uri("/v1/websocket?origin=https://unknown.example")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
