//! 시그널 그룹 브리지.
//!
//! signal-cli의 JSON-RPC 엔드포인트를 사용합니다.

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use ticker_core::{Message, SignalGroupBridgeConfig, SignalGroupReply, Ticker};
use tracing::{debug, info, warn};

use crate::media::MediaLoader;
use crate::types::{ensure_success, Bridge, BridgeError, BridgeResult};

pub const SIGNAL_GROUP_BRIDGE: &str = "signal_group";

/// 그룹 메시지 자동 삭제 시간 (초).
pub const MESSAGE_EXPIRATION_SECS: u64 = 86_400;

#[derive(Debug, Deserialize)]
struct RpcResponse<T> {
    result: Option<T>,
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpdateGroupResult {
    group_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupInfo {
    id: String,
    #[serde(default)]
    group_invite_link: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SendResult {
    #[serde(default)]
    timestamp: i64,
}

/// 시그널 그룹 브리지.
pub struct SignalGroupBridge {
    config: SignalGroupBridgeConfig,
    client: reqwest::Client,
    media: MediaLoader,
}

impl SignalGroupBridge {
    pub fn new(
        config: SignalGroupBridgeConfig,
        client: reqwest::Client,
        media: MediaLoader,
    ) -> Self {
        Self {
            config,
            client,
            media,
        }
    }

    fn is_configured(&self) -> bool {
        self.config.enabled && !self.config.api_url.is_empty() && !self.config.account.is_empty()
    }

    fn is_enabled_for(&self, ticker: &Ticker) -> bool {
        self.is_configured() && ticker.signal_group.active && ticker.signal_group.connected()
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, params: Value) -> BridgeResult<T> {
        let request = json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": uuid::Uuid::new_v4().to_string(),
        });

        debug!(method, "Calling signal-cli");
        let response = self
            .client
            .post(&self.config.api_url)
            .json(&request)
            .send()
            .await?;
        let rpc: RpcResponse<T> = ensure_success(response).await?.json().await?;

        if let Some(error) = rpc.error {
            return Err(BridgeError::Api {
                status: 200,
                body: format!("{} ({})", error.message, error.code),
            });
        }
        rpc.result
            .ok_or_else(|| BridgeError::InvalidResponse(format!("{}: empty result", method)))
    }

    /// 그룹 생성 또는 갱신 요청 파라미터.
    fn update_group_params(&self, ticker: &Ticker) -> Value {
        let mut params = json!({
            "account": self.config.account,
            "name": ticker.title,
            "description": ticker.description,
            "link": "enabled",
            "setPermissionAddMember": "every-member",
            "setPermissionEditDetails": "only-admins",
            "setPermissionSendMessages": "only-admins",
            "expiration": MESSAGE_EXPIRATION_SECS,
        });
        if !self.config.avatar.is_empty() {
            params["avatar"] = Value::String(self.config.avatar.clone());
        }
        if ticker.signal_group.connected() {
            params["groupId"] = Value::String(ticker.signal_group.group_id.clone());
        }
        params
    }

    async fn attachment_uris(&self, ticker: &Ticker, message: &Message) -> Vec<String> {
        let mut uris = Vec::new();
        for attachment in &message.attachments {
            match self.media.load(attachment).await {
                Ok(file) => uris.push(format!(
                    "data:{};filename={};base64,{}",
                    file.content_type,
                    file.file_name,
                    BASE64.encode(&file.bytes)
                )),
                Err(e) => warn!(
                    ticker_id = ticker.id,
                    uuid = %attachment.uuid,
                    error = %e,
                    "Failed to load attachment for Signal, skipping"
                ),
            }
        }
        uris
    }
}

#[async_trait]
impl Bridge for SignalGroupBridge {
    fn name(&self) -> &str {
        SIGNAL_GROUP_BRIDGE
    }

    async fn update(&self, ticker: &mut Ticker) -> BridgeResult<()> {
        if !self.is_configured() || !ticker.signal_group.active {
            return Ok(());
        }

        let updated: UpdateGroupResult = self
            .call("updateGroup", self.update_group_params(ticker))
            .await?;
        ticker.signal_group.group_id = updated.group_id;

        let groups: Vec<GroupInfo> = self
            .call("listGroups", json!({ "account": self.config.account }))
            .await?;
        if let Some(group) = groups
            .into_iter()
            .find(|g| g.id == ticker.signal_group.group_id)
        {
            ticker.signal_group.group_invite_link = group.group_invite_link.unwrap_or_default();
        }

        info!(ticker_id = ticker.id, group_id = %ticker.signal_group.group_id, "Signal group updated");
        Ok(())
    }

    async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_enabled_for(ticker) {
            return Ok(());
        }

        let mut params = json!({
            "account": self.config.account,
            "groupId": ticker.signal_group.group_id,
            "message": message.text,
        });
        let attachments = self.attachment_uris(ticker, message).await;
        if !attachments.is_empty() {
            params["attachments"] = json!(attachments);
        }

        let sent: SendResult = self.call("send", params).await?;
        if sent.timestamp == 0 {
            return Err(BridgeError::InvalidResponse(
                "signal-cli returned no timestamp".to_string(),
            ));
        }

        message.signal_group = Some(SignalGroupReply {
            timestamp: sent.timestamp,
        });
        Ok(())
    }

    async fn delete(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_configured() || !ticker.signal_group.connected() {
            return Ok(());
        }
        let Some(reply) = message.signal_group.filter(|r| r.timestamp != 0) else {
            return Ok(());
        };

        let _: Value = self
            .call(
                "remoteDelete",
                json!({
                    "account": self.config.account,
                    "groupId": ticker.signal_group.group_id,
                    "targetTimestamp": reply.timestamp,
                }),
            )
            .await?;
        Ok(())
    }
}
