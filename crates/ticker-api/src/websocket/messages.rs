//! WebSocket 메시지 타입.
//!
//! 서버 → 클라이언트 방향만 존재합니다. 클라이언트가 보내는 프레임은 무시됩니다.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const SHUTDOWN_NOTICE: &str = "Server is shutting down";

/// 브로드캐스트 메시지 타입.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageType {
    MessageCreated,
    MessageDeleted,
    ServerShutdown,
}

impl MessageType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageType::MessageCreated => "message_created",
            MessageType::MessageDeleted => "message_deleted",
            MessageType::ServerShutdown => "server_shutdown",
        }
    }
}

impl std::fmt::Display for MessageType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 티커 단위로 전달되는 메시지.
///
/// 직렬화 형식: `{"type": "...", "tickerId": 1, "data": ...}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    pub ticker_id: i64,
    pub data: Value,
}

impl BroadcastMessage {
    pub fn new(kind: MessageType, ticker_id: i64, data: impl Serialize) -> Self {
        let data = serde_json::to_value(data).unwrap_or(Value::Null);
        Self {
            kind,
            ticker_id,
            data,
        }
    }

    pub fn message_created(ticker_id: i64, entry: impl Serialize) -> Self {
        Self::new(MessageType::MessageCreated, ticker_id, entry)
    }

    pub fn message_deleted(ticker_id: i64, message_id: i64) -> Self {
        Self::new(
            MessageType::MessageDeleted,
            ticker_id,
            serde_json::json!({ "id": message_id }),
        )
    }

    pub fn server_shutdown(ticker_id: i64) -> Self {
        Self::new(
            MessageType::ServerShutdown,
            ticker_id,
            serde_json::json!({ "message": SHUTDOWN_NOTICE }),
        )
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_format() {
        let msg = BroadcastMessage::message_deleted(7, 42);
        let json: Value = serde_json::from_str(&msg.to_json().unwrap()).unwrap();

        assert_eq!(json["type"], "message_deleted");
        assert_eq!(json["tickerId"], 7);
        assert_eq!(json["data"]["id"], 42);
    }

    #[test]
    fn test_server_shutdown_message() {
        let msg = BroadcastMessage::server_shutdown(1);
        assert_eq!(msg.kind.as_str(), "server_shutdown");
        assert_eq!(msg.data["message"], SHUTDOWN_NOTICE);
    }
}
