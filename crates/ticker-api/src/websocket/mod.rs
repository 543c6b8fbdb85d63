//! 실시간 WebSocket 팬아웃.
//!
//! 티커별로 연결된 공개 클라이언트에게 메시지 생성/삭제를 즉시 전달합니다.
//!
//! # 구조
//!
//! - [`Engine`]: 클라이언트 인덱스를 단독 소유하는 실행 루프
//! - [`Client`]: 연결 하나와 읽기/쓰기 펌프
//! - [`websocket_handler`]: HTTP 업그레이드
//!
//! # 서버 → 클라이언트
//!
//! ```json
//! {"type": "message_created", "tickerId": 1, "data": {...}}
//! {"type": "message_deleted", "tickerId": 1, "data": {"id": 42}}
//! {"type": "server_shutdown", "tickerId": 1, "data": {"message": "Server is shutting down"}}
//! ```
//!
//! 클라이언트가 보내는 텍스트/바이너리 프레임은 무시됩니다.

pub mod client;
pub mod engine;
pub mod handler;
pub mod messages;

pub use client::{Client, ClientTimings, QueueError, QueuedMessage};
pub use engine::{
    Engine, EngineConfig, EngineError, EngineState, REASON_CHANNEL_FULL,
    REASON_CLIENT_DISCONNECTED, REASON_SERVER_SHUTDOWN,
};
pub use handler::websocket_handler;
pub use messages::{BroadcastMessage, MessageType, SHUTDOWN_NOTICE};
