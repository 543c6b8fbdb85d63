//! 브리지 레지스트리.

use std::collections::HashMap;

use ticker_core::{BridgesConfig, Message, Ticker};
use tracing::{debug, error};

use crate::bluesky::BlueskyBridge;
use crate::mastodon::MastodonBridge;
use crate::matrix::MatrixBridge;
use crate::media::MediaLoader;
use crate::signal_group::SignalGroupBridge;
use crate::telegram::TelegramBridge;
use crate::types::{Bridge, BridgeError, BridgeResult};

/// 이름으로 등록된 브리지 모음.
///
/// 각 작업은 등록된 모든 브리지를 순회합니다. 한 브리지의 실패는 기록만 하고
/// 나머지 브리지는 계속 실행하며, 마지막으로 관찰된 에러를 반환합니다.
#[derive(Default)]
pub struct Bridges {
    bridges: HashMap<String, Box<dyn Bridge>>,
}

impl Bridges {
    pub fn new() -> Self {
        Self::default()
    }

    /// 설정된 모든 플랫폼 브리지를 등록합니다.
    pub fn from_config(config: &BridgesConfig, media: MediaLoader) -> Self {
        let client = reqwest::Client::new();
        let mut bridges = Self::new();
        bridges.register(TelegramBridge::new(
            config.telegram.clone(),
            client.clone(),
            media.clone(),
        ));
        bridges.register(MastodonBridge::new(
            config.mastodon.clone(),
            client.clone(),
            media.clone(),
        ));
        bridges.register(BlueskyBridge::new(
            config.bluesky.clone(),
            client.clone(),
            media.clone(),
        ));
        bridges.register(SignalGroupBridge::new(
            config.signal_group.clone(),
            client.clone(),
            media.clone(),
        ));
        bridges.register(MatrixBridge::new(config.matrix.clone(), client, media));
        bridges
    }

    /// 브리지를 등록합니다. 같은 이름이 있으면 교체합니다.
    pub fn register<B: Bridge + 'static>(&mut self, bridge: B) {
        debug!(bridge = bridge.name(), "Bridge registered");
        self.bridges.insert(bridge.name().to_string(), Box::new(bridge));
    }

    pub fn len(&self) -> usize {
        self.bridges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bridges.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.bridges.keys().map(String::as_str).collect()
    }

    pub async fn update(&self, ticker: &mut Ticker) -> BridgeResult<()> {
        let mut last_error: Option<BridgeError> = None;

        for (name, bridge) in &self.bridges {
            if let Err(e) = bridge.update(ticker).await {
                error!(bridge = %name, ticker_id = ticker.id, error = %e, "Failed to update bridge");
                last_error = Some(e);
            }
        }

        last_error.map_or(Ok(()), Err)
    }

    pub async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        let mut last_error: Option<BridgeError> = None;

        for (name, bridge) in &self.bridges {
            if let Err(e) = bridge.send(ticker, message).await {
                error!(
                    bridge = %name,
                    ticker_id = ticker.id,
                    message_id = message.id,
                    error = %e,
                    "Failed to send message through bridge"
                );
                last_error = Some(e);
            }
        }

        last_error.map_or(Ok(()), Err)
    }

    pub async fn delete(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        let mut last_error: Option<BridgeError> = None;

        for (name, bridge) in &self.bridges {
            if let Err(e) = bridge.delete(ticker, message).await {
                error!(
                    bridge = %name,
                    ticker_id = ticker.id,
                    message_id = message.id,
                    error = %e,
                    "Failed to delete message through bridge"
                );
                last_error = Some(e);
            }
        }

        last_error.map_or(Ok(()), Err)
    }
}
