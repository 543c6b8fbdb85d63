//! 텔레그램 브리지.
//!
//! Telegram Bot API로 채널에 메시지를 게시합니다. 첨부 파일이 있으면
//! 미디어 그룹으로 보내고 본문은 첫 번째 항목의 캡션이 됩니다.

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use ticker_core::{Message, TelegramBridgeConfig, TelegramMessageRef, TelegramReply, Ticker};
use tracing::{debug, info, warn};

use crate::media::MediaLoader;
use crate::types::{Bridge, BridgeError, BridgeResult};

pub const TELEGRAM_BRIDGE: &str = "telegram";

#[derive(Debug, Deserialize)]
struct ApiResponse<T> {
    ok: bool,
    result: Option<T>,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct SentMessage {
    message_id: i64,
    chat: Chat,
}

#[derive(Debug, Deserialize)]
struct Chat {
    id: i64,
}

#[derive(Debug, Deserialize)]
struct BotUser {
    #[serde(default)]
    username: String,
}

/// 텔레그램 브리지.
pub struct TelegramBridge {
    config: TelegramBridgeConfig,
    client: reqwest::Client,
    media: MediaLoader,
}

impl TelegramBridge {
    pub fn new(config: TelegramBridgeConfig, client: reqwest::Client, media: MediaLoader) -> Self {
        Self {
            config,
            client,
            media,
        }
    }

    /// 티커별 토큰이 있으면 그것을, 없으면 전역 토큰을 사용합니다.
    fn token<'a>(&'a self, ticker: &'a Ticker) -> &'a str {
        if ticker.telegram.bot_token.is_empty() {
            &self.config.token
        } else {
            &ticker.telegram.bot_token
        }
    }

    fn is_enabled_for(&self, ticker: &Ticker) -> bool {
        self.config.enabled
            && ticker.telegram.active
            && ticker.telegram.connected()
            && !self.token(ticker).is_empty()
    }

    fn method_url(&self, token: &str, method: &str) -> String {
        format!(
            "{}/bot{}/{}",
            self.config.api_url.trim_end_matches('/'),
            token,
            method
        )
    }

    async fn parse<T: DeserializeOwned>(response: reqwest::Response) -> BridgeResult<T> {
        let status = response.status();
        let body = response.text().await?;
        let parsed: ApiResponse<T> = serde_json::from_str(&body).map_err(|_| BridgeError::Api {
            status: status.as_u16(),
            body: body.clone(),
        })?;

        match (parsed.ok, parsed.result) {
            (true, Some(result)) => Ok(result),
            _ => {
                if status.as_u16() == 429 {
                    warn!("Telegram rate limited");
                }
                Err(BridgeError::Api {
                    status: status.as_u16(),
                    body: parsed.description.unwrap_or(body),
                })
            }
        }
    }

    async fn send_text(&self, ticker: &Ticker, text: &str) -> BridgeResult<Vec<SentMessage>> {
        let url = self.method_url(self.token(ticker), "sendMessage");
        let params = serde_json::json!({
            "chat_id": ticker.telegram.chat_id(),
            "text": text,
        });

        let response = self.client.post(&url).json(&params).send().await?;
        let sent: SentMessage = Self::parse(response).await?;
        Ok(vec![sent])
    }

    async fn send_media_group(
        &self,
        ticker: &Ticker,
        message: &Message,
    ) -> BridgeResult<Vec<SentMessage>> {
        let mut media = Vec::new();
        let mut form = Form::new().text("chat_id", ticker.telegram.chat_id());

        for (idx, attachment) in message.attachments.iter().enumerate() {
            let file = self.media.load(attachment).await?;
            let attach_name = format!("file{}", idx);
            let kind = if file.is_gif() { "document" } else { "photo" };

            let mut item = serde_json::json!({
                "type": kind,
                "media": format!("attach://{}", attach_name),
            });
            if media.is_empty() {
                item["caption"] = serde_json::Value::String(message.text.clone());
            }
            media.push(item);

            let part = Part::bytes(file.bytes)
                .file_name(file.file_name)
                .mime_str(&file.content_type)?;
            form = form.part(attach_name, part);
        }
        form = form.text("media", serde_json::to_string(&media)?);

        let url = self.method_url(self.token(ticker), "sendMediaGroup");
        let response = self.client.post(&url).multipart(form).send().await?;
        Self::parse(response).await
    }
}

#[async_trait]
impl Bridge for TelegramBridge {
    fn name(&self) -> &str {
        TELEGRAM_BRIDGE
    }

    async fn update(&self, ticker: &mut Ticker) -> BridgeResult<()> {
        if !self.is_enabled_for(ticker) {
            return Ok(());
        }

        let url = self.method_url(self.token(ticker), "getMe");
        let response = self.client.get(&url).send().await?;
        let bot: BotUser = Self::parse(response).await?;

        debug!(ticker_id = ticker.id, username = %bot.username, "Telegram bot refreshed");
        ticker.telegram.bot_username = bot.username;
        Ok(())
    }

    async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_enabled_for(ticker) {
            return Ok(());
        }

        let sent = if message.attachments.is_empty() {
            self.send_text(ticker, &message.text).await?
        } else {
            self.send_media_group(ticker, message).await?
        };

        info!(
            ticker_id = ticker.id,
            count = sent.len(),
            "Message sent to Telegram"
        );
        message.telegram = Some(TelegramReply {
            messages: sent
                .into_iter()
                .map(|m| TelegramMessageRef {
                    chat_id: m.chat.id,
                    message_id: m.message_id,
                })
                .collect(),
        });
        Ok(())
    }

    async fn delete(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.config.enabled {
            return Ok(());
        }
        let Some(reply) = message.telegram.as_ref() else {
            return Ok(());
        };
        if reply.messages.is_empty() {
            return Ok(());
        }

        let url = self.method_url(self.token(ticker), "deleteMessage");
        for sent in &reply.messages {
            let params = serde_json::json!({
                "chat_id": sent.chat_id,
                "message_id": sent.message_id,
            });
            let response = self.client.post(&url).json(&params).send().await?;
            let _: bool = Self::parse(response).await?;
        }

        Ok(())
    }
}
