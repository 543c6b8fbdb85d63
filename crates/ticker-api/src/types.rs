//! 공개 API 응답 타입.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ticker_core::{Message, Ticker, TickerInformation};

/// 공개 타임라인 항목.
///
/// 타임라인 응답, 피드, `message_created` 브로드캐스트가 같은 형태를 씁니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineEntry {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub text: String,
    pub attachments: Vec<TimelineAttachment>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineAttachment {
    pub url: String,
    pub content_type: String,
}

impl TimelineEntry {
    pub fn from_message(message: &Message, media_base_url: &str) -> Self {
        let base = media_base_url.trim_end_matches('/');
        Self {
            id: message.id,
            created_at: message.created_at,
            text: message.text.clone(),
            attachments: message
                .attachments
                .iter()
                .map(|a| TimelineAttachment {
                    url: format!("{}/media/{}", base, a.file_name()),
                    content_type: a.content_type.clone(),
                })
                .collect(),
        }
    }
}

/// 공개 티커 요약 (`/v1/init`).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicTicker {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub title: String,
    pub description: String,
    pub information: PublicInformation,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicInformation {
    #[serde(flatten)]
    pub info: TickerInformation,
    pub telegram_bot: String,
    pub signal_group_invite_link: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<&Ticker> for PublicTicker {
    fn from(ticker: &Ticker) -> Self {
        Self {
            id: ticker.id,
            created_at: ticker.created_at,
            title: ticker.title.clone(),
            description: ticker.description.clone(),
            information: PublicInformation {
                info: ticker.information.clone(),
                telegram_bot: ticker.telegram.bot_username.clone(),
                signal_group_invite_link: ticker.signal_group.group_invite_link.clone(),
                lat: ticker.location.lat,
                lon: ticker.location.lon,
            },
        }
    }
}
