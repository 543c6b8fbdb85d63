//! 마스토돈 브리지.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;
use ticker_core::{MastodonBridgeConfig, MastodonReply, MastodonUser, Message, Ticker};
use tracing::{info, warn};

use crate::media::MediaLoader;
use crate::types::{ensure_success, Bridge, BridgeResult};

pub const MASTODON_BRIDGE: &str = "mastodon";

#[derive(Debug, Deserialize)]
struct MediaAttachment {
    id: String,
}

#[derive(Debug, Deserialize)]
struct Status {
    id: String,
    #[serde(default)]
    uri: String,
    #[serde(default)]
    url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Account {
    #[serde(default)]
    username: String,
    #[serde(default)]
    display_name: String,
    #[serde(default)]
    avatar: String,
}

/// 마스토돈 브리지. 서버와 토큰은 티커마다 다릅니다.
pub struct MastodonBridge {
    config: MastodonBridgeConfig,
    client: reqwest::Client,
    media: MediaLoader,
}

impl MastodonBridge {
    pub fn new(config: MastodonBridgeConfig, client: reqwest::Client, media: MediaLoader) -> Self {
        Self {
            config,
            client,
            media,
        }
    }

    fn is_enabled_for(&self, ticker: &Ticker) -> bool {
        self.config.enabled && ticker.mastodon.active && ticker.mastodon.connected()
    }

    fn endpoint(ticker: &Ticker, path: &str) -> String {
        format!("{}{}", ticker.mastodon.server.trim_end_matches('/'), path)
    }

    async fn upload_media(
        &self,
        ticker: &Ticker,
        attachment: &ticker_core::Attachment,
    ) -> BridgeResult<String> {
        let file = self.media.load(attachment).await?;
        let part = Part::bytes(file.bytes)
            .file_name(file.file_name)
            .mime_str(&file.content_type)?;

        let response = self
            .client
            .post(Self::endpoint(ticker, "/api/v2/media"))
            .bearer_auth(&ticker.mastodon.token)
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        let media: MediaAttachment = ensure_success(response).await?.json().await?;
        Ok(media.id)
    }
}

#[async_trait]
impl Bridge for MastodonBridge {
    fn name(&self) -> &str {
        MASTODON_BRIDGE
    }

    /// 계정 프로필을 티커에 캐시합니다.
    async fn update(&self, ticker: &mut Ticker) -> BridgeResult<()> {
        if !self.config.enabled || !ticker.mastodon.connected() {
            return Ok(());
        }

        let response = self
            .client
            .get(Self::endpoint(ticker, "/api/v1/accounts/verify_credentials"))
            .bearer_auth(&ticker.mastodon.token)
            .send()
            .await?;
        let account: Account = ensure_success(response).await?.json().await?;

        ticker.mastodon.user = MastodonUser {
            username: account.username,
            display_name: account.display_name,
            avatar: account.avatar,
        };
        Ok(())
    }

    async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_enabled_for(ticker) {
            return Ok(());
        }

        let mut media_ids = Vec::new();
        for attachment in &message.attachments {
            match self.upload_media(ticker, attachment).await {
                Ok(id) => media_ids.push(id),
                Err(e) => {
                    warn!(
                        ticker_id = ticker.id,
                        uuid = %attachment.uuid,
                        error = %e,
                        "Failed to upload media to Mastodon, skipping"
                    );
                }
            }
        }

        let params = serde_json::json!({
            "status": message.text,
            "media_ids": media_ids,
        });
        let response = self
            .client
            .post(Self::endpoint(ticker, "/api/v1/statuses"))
            .bearer_auth(&ticker.mastodon.token)
            .json(&params)
            .send()
            .await?;
        let status: Status = ensure_success(response).await?.json().await?;

        info!(ticker_id = ticker.id, status_id = %status.id, "Message sent to Mastodon");
        message.mastodon = Some(MastodonReply {
            id: status.id,
            uri: status.uri,
            url: status.url.unwrap_or_default(),
        });
        Ok(())
    }

    async fn delete(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.config.enabled || !ticker.mastodon.connected() {
            return Ok(());
        }
        let Some(reply) = message.mastodon.as_ref().filter(|r| !r.id.is_empty()) else {
            return Ok(());
        };

        let response = self
            .client
            .delete(Self::endpoint(ticker, &format!("/api/v1/statuses/{}", reply.id)))
            .bearer_auth(&ticker.mastodon.token)
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
