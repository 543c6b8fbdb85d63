//! 블루스카이(AT Protocol) 브리지.
//!
//! 핸들과 앱 비밀번호로 세션을 만들고, 본문의 URL과 해시태그를
//! 리치 텍스트 facet으로 변환하여 게시합니다.

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};
use ticker_core::{BlueskyBridgeConfig, BlueskyReply, Message, Ticker};
use tracing::{info, warn};

use crate::media::MediaLoader;
use crate::richtext::{extract_hashtags, extract_urls};
use crate::types::{ensure_success, Bridge, BridgeError, BridgeResult};

pub const BLUESKY_BRIDGE: &str = "bluesky";

const POST_COLLECTION: &str = "app.bsky.feed.post";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Session {
    access_jwt: String,
    did: String,
}

#[derive(Debug, Deserialize)]
struct BlobResponse {
    blob: Value,
}

#[derive(Debug, Deserialize)]
struct RecordRef {
    uri: String,
    cid: String,
}

/// `at://{repo}/{collection}/{rkey}` 형식의 레코드 주소.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AtUri {
    pub repo: String,
    pub collection: String,
    pub rkey: String,
}

impl AtUri {
    pub fn parse(uri: &str) -> BridgeResult<Self> {
        let rest = uri
            .strip_prefix("at://")
            .ok_or_else(|| BridgeError::InvalidResponse(format!("not an at-uri: {}", uri)))?;

        let mut parts = rest.splitn(3, '/');
        match (parts.next(), parts.next(), parts.next()) {
            (Some(repo), Some(collection), Some(rkey))
                if !repo.is_empty() && !collection.is_empty() && !rkey.is_empty() =>
            {
                Ok(Self {
                    repo: repo.to_string(),
                    collection: collection.to_string(),
                    rkey: rkey.to_string(),
                })
            }
            _ => Err(BridgeError::InvalidResponse(format!(
                "incomplete at-uri: {}",
                uri
            ))),
        }
    }
}

/// 링크와 태그 facet을 생성합니다. 태그 값에는 `#`이 포함되지 않으며,
/// 빈 태그(`#` 단독)는 facet을 만들지 않습니다.
pub fn build_facets(text: &str) -> Vec<Value> {
    let links = extract_urls(text).into_iter().map(|span| {
        json!({
            "index": { "byteStart": span.start, "byteEnd": span.end },
            "features": [{ "$type": "app.bsky.richtext.facet#link", "uri": span.value }],
        })
    });

    let tags = extract_hashtags(text)
        .into_iter()
        .filter(|span| span.value.len() > 1)
        .map(|span| {
            json!({
                "index": { "byteStart": span.start, "byteEnd": span.end },
                "features": [{
                    "$type": "app.bsky.richtext.facet#tag",
                    "tag": span.value.trim_start_matches('#'),
                }],
            })
        });

    links.chain(tags).collect()
}

/// 블루스카이 브리지.
pub struct BlueskyBridge {
    config: BlueskyBridgeConfig,
    client: reqwest::Client,
    media: MediaLoader,
}

impl BlueskyBridge {
    pub fn new(config: BlueskyBridgeConfig, client: reqwest::Client, media: MediaLoader) -> Self {
        Self {
            config,
            client,
            media,
        }
    }

    fn is_enabled_for(&self, ticker: &Ticker) -> bool {
        self.config.enabled && ticker.bluesky.active && ticker.bluesky.connected()
    }

    fn xrpc(&self, method: &str) -> String {
        format!("{}/xrpc/{}", self.config.pds_url.trim_end_matches('/'), method)
    }

    async fn create_session(&self, ticker: &Ticker) -> BridgeResult<Session> {
        let response = self
            .client
            .post(self.xrpc("com.atproto.server.createSession"))
            .json(&json!({
                "identifier": ticker.bluesky.handle,
                "password": ticker.bluesky.app_key,
            }))
            .send()
            .await?;
        Ok(ensure_success(response).await?.json().await?)
    }

    async fn upload_images(
        &self,
        session: &Session,
        ticker: &Ticker,
        message: &Message,
    ) -> Vec<Value> {
        let mut images = Vec::new();
        for attachment in &message.attachments {
            let result = async {
                let file = self.media.load(attachment).await?;
                if !file.is_image() {
                    return Ok(None);
                }
                let response = self
                    .client
                    .post(self.xrpc("com.atproto.repo.uploadBlob"))
                    .bearer_auth(&session.access_jwt)
                    .header(reqwest::header::CONTENT_TYPE, file.content_type)
                    .body(file.bytes)
                    .send()
                    .await?;
                let blob: BlobResponse = ensure_success(response).await?.json().await?;
                Ok::<_, BridgeError>(Some(blob.blob))
            }
            .await;

            match result {
                Ok(Some(blob)) => images.push(json!({ "alt": "", "image": blob })),
                Ok(None) => {}
                Err(e) => warn!(
                    ticker_id = ticker.id,
                    uuid = %attachment.uuid,
                    error = %e,
                    "Failed to upload blob to Bluesky, skipping"
                ),
            }
        }
        images
    }
}

#[async_trait]
impl Bridge for BlueskyBridge {
    fn name(&self) -> &str {
        BLUESKY_BRIDGE
    }

    async fn update(&self, _ticker: &mut Ticker) -> BridgeResult<()> {
        Ok(())
    }

    async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.is_enabled_for(ticker) {
            return Ok(());
        }

        let session = self.create_session(ticker).await?;

        let mut record = json!({
            "$type": POST_COLLECTION,
            "text": message.text,
            "createdAt": Utc::now().to_rfc3339(),
        });
        let facets = build_facets(&message.text);
        if !facets.is_empty() {
            record["facets"] = Value::Array(facets);
        }
        let images = self.upload_images(&session, ticker, message).await;
        if !images.is_empty() {
            record["embed"] = json!({
                "$type": "app.bsky.embed.images",
                "images": images,
            });
        }

        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.createRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": POST_COLLECTION,
                "record": record,
            }))
            .send()
            .await?;
        let created: RecordRef = ensure_success(response).await?.json().await?;

        info!(ticker_id = ticker.id, uri = %created.uri, "Message sent to Bluesky");
        message.bluesky = Some(BlueskyReply {
            uri: created.uri,
            cid: created.cid,
        });
        Ok(())
    }

    async fn delete(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()> {
        if !self.config.enabled || !ticker.bluesky.connected() {
            return Ok(());
        }
        let Some(reply) = message.bluesky.as_ref().filter(|r| !r.uri.is_empty()) else {
            return Ok(());
        };

        let at_uri = AtUri::parse(&reply.uri)?;
        let session = self.create_session(ticker).await?;
        let response = self
            .client
            .post(self.xrpc("com.atproto.repo.deleteRecord"))
            .bearer_auth(&session.access_jwt)
            .json(&json!({
                "repo": session.did,
                "collection": at_uri.collection,
                "rkey": at_uri.rkey,
            }))
            .send()
            .await?;
        ensure_success(response).await?;
        Ok(())
    }
}
