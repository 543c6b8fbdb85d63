//! 메시지 도메인 모델.
//!
//! 메시지는 게시 후 변경되지 않습니다. 브리지가 외부 플랫폼에 복제본을
//! 게시하면 나중에 삭제할 수 있도록 브리지별 응답 블록이 채워집니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::upload::Upload;

/// 티커 메시지.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    /// 메시지 ID (저장 전에는 0)
    pub id: i64,
    /// 소속 티커 ID
    pub ticker_id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 본문
    pub text: String,
    /// 첨부 파일 (순서 유지)
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub telegram: Option<TelegramReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mastodon: Option<MastodonReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bluesky: Option<BlueskyReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal_group: Option<SignalGroupReply>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub matrix: Option<MatrixReply>,
}

impl Message {
    /// 새 메시지를 생성합니다.
    pub fn new(ticker_id: i64, text: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            ticker_id,
            created_at: now,
            updated_at: now,
            text: text.into(),
            attachments: Vec::new(),
            telegram: None,
            mastodon: None,
            bluesky: None,
            signal_group: None,
            matrix: None,
        }
    }

    /// 업로드 목록을 첨부 파일로 추가합니다.
    pub fn with_uploads(mut self, uploads: &[Upload]) -> Self {
        self.attachments
            .extend(uploads.iter().map(Attachment::from_upload));
        self
    }

    /// 첨부 파일 UUID 목록.
    pub fn attachment_uuids(&self) -> Vec<Uuid> {
        self.attachments.iter().map(|a| a.uuid).collect()
    }
}

/// 저장된 업로드에 대한 참조.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    pub uuid: Uuid,
    pub extension: String,
    pub content_type: String,
}

impl Attachment {
    pub fn from_upload(upload: &Upload) -> Self {
        Self {
            uuid: upload.uuid,
            extension: upload.extension.clone(),
            content_type: upload.content_type.clone(),
        }
    }

    /// 디스크/URL 상의 파일 이름 (`{uuid}.{ext}`).
    pub fn file_name(&self) -> String {
        format!("{}.{}", self.uuid, self.extension)
    }
}

/// 텔레그램 복제본 식별자.
///
/// 미디어 그룹은 여러 개의 플랫폼 메시지를 생성하므로 모두 기록합니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramReply {
    pub messages: Vec<TelegramMessageRef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TelegramMessageRef {
    pub chat_id: i64,
    pub message_id: i64,
}

/// 마스토돈 status 식별자.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MastodonReply {
    pub id: String,
    pub uri: String,
    pub url: String,
}

/// 블루스카이 레코드 식별자.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlueskyReply {
    /// `at://{did}/{collection}/{rkey}`
    pub uri: String,
    pub cid: String,
}

/// 시그널 그룹 메시지 타임스탬프.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignalGroupReply {
    pub timestamp: i64,
}

/// 매트릭스 이벤트 식별자.
///
/// 첫 번째 이벤트가 본문이고, 이후 이벤트는 첨부 이미지입니다.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatrixReply {
    pub room_id: String,
    pub event_ids: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_with_uploads() {
        let upload = Upload::new(1, "image/png");
        let message = Message::new(1, "hi").with_uploads(std::slice::from_ref(&upload));

        assert_eq!(message.attachments.len(), 1);
        assert_eq!(message.attachments[0].extension, "png");
        assert_eq!(message.attachment_uuids(), vec![upload.uuid]);
        assert_eq!(
            message.attachments[0].file_name(),
            format!("{}.png", upload.uuid)
        );
    }

    #[test]
    fn test_reply_blocks_skipped_when_empty() {
        let message = Message::new(1, "hi");
        let json = serde_json::to_string(&message).unwrap();

        assert!(!json.contains("mastodon"));
        assert!(json.contains(r#""tickerId":1"#));
    }
}
