//! 매트릭스 룸 브리지.
//!
//! Client-Server API로 티커 전용 공개 룸을 만들고 메시지를 게시합니다.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use ticker_core::{MatrixBridgeConfig, MatrixReply, Message, Ticker};
use tracing::{info, warn};
use url::form_urlencoded::byte_serialize;

use crate::media::MediaLoader;
use crate::types::{ensure_success, Bridge, BridgeError, BridgeResult};

pub const MATRIX_BRIDGE: &str = "matrix";

/// 별칭이 사용 중일 때 접미사를 붙여 재시도하는 최대 횟수.
const MAX_ALIAS_RETRIES: u32 = 10;

const FALLBACK_ROOM_NAME: &str = "ticker-room";

#[derive(Debug, Deserialize)]
struct CreateRoomResponse {
    room_id: String,
}

#[derive(Debug, Deserialize)]
struct EventResponse {
    event_id: String,
}

#[derive(Debug, Deserialize)]
struct UploadResponse {
    content_uri: String,
}

#[derive(Debug, Deserialize)]
struct MatrixError {
    #[serde(default)]
    errcode: String,
}

/// 룸 별칭용 이름 정리.
///
/// 소문자로 바꾸고 `[a-z0-9-_]`만 남긴 뒤 앞뒤의 `-`, `_`를 제거합니다.
pub fn sanitize_room_name(title: &str) -> String {
    let cleaned: String = title
        .to_lowercase()
        .chars()
        .filter(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-' || *c == '_')
        .collect();
    let trimmed = cleaned.trim_matches(|c| c == '-' || c == '_');

    if trimmed.is_empty() {
        FALLBACK_ROOM_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

fn encode(segment: &str) -> String {
    byte_serialize(segment.as_bytes()).collect()
}

/// 매트릭스 브리지.
pub struct MatrixBridge {
    config: MatrixBridgeConfig,
    client: reqwest::Client,
    media: MediaLoader,
}

impl MatrixBridge {
    pub fn new(config: MatrixBridgeConfig, client: reqwest::Client, media: MediaLoader) -> Self {
        Self {
            config,
            client,
            media,
        }
    }

    fn is_configured(&self) -> bool {
        self.config.enabled
            && !self.config.homeserver.is_empty()
            && !self.config.access_token.is_empty()
    }

    fn is_enabled_for(&self, ticker: &Ticker) -> bool {
        self.is_configured() && ticker.matrix.active && ticker.matrix.connected()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.homeserver.trim_end_matches('/'), path)
    }

    fn txn_id() -> String {
        uuid::Uuid::new_v4().simple().to_string()
    }

    /// 별칭 충돌 시 `-1`부터 `-10`까지 접미사를 붙여 룸을 생성합니다.
    async fn create_room(&self, ticker: &Ticker) -> BridgeResult<(String, String)> {
        let base = sanitize_room_name(&ticker.title);

        for attempt in 0..=MAX_ALIAS_RETRIES {
            let alias = if attempt == 0 {
                base.clone()
            } else {
                format!("{}-{}", base, attempt)
            };

            let body = json!({
                "visibility": "public",
                "preset": "public_chat",
                "name": ticker.title,
                "topic": ticker.description,
                "room_alias_name": alias,
                "initial_state": [{
                    "type": "m.room.encryption",
                    "state_key": "",
                    "content": { "algorithm": "m.megolm.v1.aes-sha2" },
                }],
                "power_level_content_override": {
                    "invite": 50,
                    "events_default": 50,
                },
            });

            let response = self
                .client
                .post(self.url("/_matrix/client/v3/createRoom"))
                .bearer_auth(&self.config.access_token)
                .json(&body)
                .send()
                .await?;

            if response.status().is_success() {
                let created: CreateRoomResponse = response.json().await?;
                return Ok((created.room_id, alias));
            }

            let status = response.status().as_u16();
            let text = response.text().await.unwrap_or_default();
            let in_use = serde_json::from_str::<MatrixError>(&text)
                .map(|e| e.errcode == "M_ROOM_IN_USE")
                .unwrap_or(false);
            if !in_use {
                return Err(BridgeError::Api { status, body: text });
            }
            warn!(ticker_id = ticker.id, alias = %alias, "Matrix room alias in use, retrying");
        }

        Err(BridgeError::InvalidResponse(format!(
            "no free room alias for {}",
            base
        )))
    }

    async fn send_event(&self, room_id: &str, content: serde_json::Value) -> BridgeResult<String> {
        let path = format!(
            "/_matrix/client/v3/rooms/{}/send/m.room.message/{}",
            encode(room_id),
            Self::txn_id()
        );
        let response = self
            .client
            .put(self.url(&path))
            .bearer_auth(&self.config.access_token)
            .json(&content)
            .send()
            .await?;
        let event: EventResponse = ensure_success(response).await?.json().await?;
        Ok(event.event_id)
    }

    async fn send_image(
        &self,
        room_id: &str,
        attachment: &ticker_core::Attachment,
    ) -> BridgeResult<String> {
        let file = self.media.load(attachment).await?;
        let path = format!("/_matrix/media/v3/upload?filename={}", encode(&file.file_name));
        let size = file.bytes.len();
        let response = self
            .client
            .post(self.url(&path))
            .bearer_auth(&self.config.access_token)
            .header(reqwest::header::CONTENT_TYPE, file.content_type.clone())
            .body(file.bytes)
            .send()
            .await?;
        let uploaded: UploadResponse = ensure_success(response).await?.json().await?;

        self.send_event(
            room_id,
            json!({
                "msgtype": "m.image",
                "body": file.file_name,
                "url": uploaded.content_uri,
                "info": { "mimetype": file.content_type, "size": size },
            }),
        )
        .await
    }
}

#[async_trait]
impl Bridge for MatrixBridge {
    fn name(&self) -> &str {
        MATRIX_BRIDGE
    }

    async fn update(&self, ticker: &mut Ticker) -> BridgeResult<()> {
        if !self.is_configured() || !ticker.matrix.active {
            return Ok(());
        }

        if ticker.matrix.connected() {
            let path = format!(
                "/_matrix/client/v3/rooms/{}/state/m.room.name/",
                encode(&ticker.matrix.room_id)
            );
            let response = self
                .client
                .put(self.url(&path))
                .bearer_auth(&self.config.access_token)
                .json(&json!({ "name": ticker.title }))
                .send()
                .await?;
            ensure_success(response).await?;
            return Ok(());
        }

        let (room_id, alias) = self.create_room(ticker).await?;
        info!(ticker_id = ticker.id, room_id = %room_id, "Matrix room created");
        ticker.matrix.room_id = room_id;
        ticker.matrix.room_name = format!("#{}:{}", alias, self.config.server_name);
        Ok(())
    }

    async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_enabled_for(ticker) {
            return Ok(());
        }

        let room_id = ticker.matrix.room_id.clone();
        let mut event_ids = vec![
            self.send_event(&room_id, json!({ "msgtype": "m.text", "body": message.text }))
                .await?,
        ];

        for attachment in &message.attachments {
            match self.send_image(&room_id, attachment).await {
                Ok(event_id) => event_ids.push(event_id),
                Err(e) => warn!(
                    ticker_id = ticker.id,
                    uuid = %attachment.uuid,
                    error = %e,
                    "Failed to send image to Matrix, skipping"
                ),
            }
        }

        message.matrix = Some(MatrixReply { room_id, event_ids });
        Ok(())
    }

    async fn delete(&self, _ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_configured() {
            return Ok(());
        }
        let Some(reply) = message.matrix.as_ref() else {
            return Ok(());
        };

        for event_id in &reply.event_ids {
            let path = format!(
                "/_matrix/client/v3/rooms/{}/redact/{}/{}",
                encode(&reply.room_id),
                encode(event_id),
                Self::txn_id()
            );
            let response = self
                .client
                .put(self.url(&path))
                .bearer_auth(&self.config.access_token)
                .json(&json!({}))
                .send()
                .await?;
            ensure_success(response).await?;
        }
        Ok(())
    }
}
