//! 티커(Ticker) 도메인 모델.
//!
//! 티커는 하나 이상의 웹사이트 origin에 연결된 논리적 채널입니다.
//! 편집자가 메시지를 게시하면 구독 중인 클라이언트와 브리지로 전파됩니다.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 티커.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ticker {
    /// 티커 ID (저장 전에는 0)
    pub id: i64,
    /// 생성 시각
    pub created_at: DateTime<Utc>,
    /// 마지막 수정 시각
    pub updated_at: DateTime<Utc>,
    /// 제목
    pub title: String,
    /// 설명
    pub description: String,
    /// 활성 여부
    pub active: bool,
    /// 작성자 정보 블록
    #[serde(default)]
    pub information: TickerInformation,
    /// 연결된 웹사이트 origin 목록
    #[serde(default)]
    pub websites: Vec<TickerWebsite>,
    #[serde(default)]
    pub telegram: TickerTelegram,
    #[serde(default)]
    pub mastodon: TickerMastodon,
    #[serde(default)]
    pub bluesky: TickerBluesky,
    #[serde(default)]
    pub signal_group: TickerSignalGroup,
    #[serde(default)]
    pub matrix: TickerMatrix,
    /// 지리적 힌트
    #[serde(default)]
    pub location: TickerLocation,
}

impl Ticker {
    /// 새 티커를 생성합니다.
    pub fn new(title: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            created_at: now,
            updated_at: now,
            title: title.into(),
            description: String::new(),
            active: false,
            information: TickerInformation::default(),
            websites: Vec::new(),
            telegram: TickerTelegram::default(),
            mastodon: TickerMastodon::default(),
            bluesky: TickerBluesky::default(),
            signal_group: TickerSignalGroup::default(),
            matrix: TickerMatrix::default(),
            location: TickerLocation::default(),
        }
    }

    /// 웹사이트 origin을 추가합니다 (중복 무시).
    pub fn with_website(mut self, origin: impl Into<String>) -> Self {
        let origin = origin.into();
        if !self.websites.iter().any(|w| w.origin == origin) {
            self.websites.push(TickerWebsite { origin });
        }
        self
    }

    /// 주어진 호스트가 이 티커의 origin 중 하나인지 확인합니다.
    pub fn has_origin(&self, host: &str) -> bool {
        self.websites
            .iter()
            .any(|w| w.origin.eq_ignore_ascii_case(host))
    }
}

/// 작성자 정보 및 소셜 핸들.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerInformation {
    pub author: String,
    pub email: String,
    pub url: String,
    pub telegram: String,
    pub mastodon: String,
    pub bluesky: String,
    pub threads: String,
    pub instagram: String,
}

/// 티커에 바인딩된 웹사이트 origin (호스트 문자열).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TickerWebsite {
    pub origin: String,
}

/// 텔레그램 브리지 설정.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerTelegram {
    pub active: bool,
    /// 채널 이름 (`@` 제외)
    pub channel_name: String,
    /// 티커별 봇 토큰. 비어 있으면 전역 토큰을 사용합니다.
    pub bot_token: String,
    /// `getMe`로 갱신되는 봇 사용자 이름
    pub bot_username: String,
}

impl TickerTelegram {
    pub fn connected(&self) -> bool {
        !self.channel_name.is_empty()
    }

    /// Bot API에서 사용하는 채팅 식별자 (`@channel`).
    pub fn chat_id(&self) -> String {
        if self.channel_name.starts_with('@') {
            self.channel_name.clone()
        } else {
            format!("@{}", self.channel_name)
        }
    }
}

/// 마스토돈 브리지 설정.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerMastodon {
    pub active: bool,
    /// 서버 URL (예: `https://mastodon.social`)
    pub server: String,
    pub client_key: String,
    pub client_secret: String,
    pub token: String,
    /// 캐시된 사용자 프로필
    pub user: MastodonUser,
}

impl TickerMastodon {
    pub fn connected(&self) -> bool {
        !self.server.is_empty() && !self.token.is_empty()
    }
}

/// 마스토돈 계정 프로필 캐시.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MastodonUser {
    pub username: String,
    pub display_name: String,
    pub avatar: String,
}

/// 블루스카이 브리지 설정.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerBluesky {
    pub active: bool,
    pub handle: String,
    /// 앱 비밀번호
    pub app_key: String,
}

impl TickerBluesky {
    pub fn connected(&self) -> bool {
        !self.handle.is_empty() && !self.app_key.is_empty()
    }
}

/// 시그널 그룹 브리지 설정.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerSignalGroup {
    pub active: bool,
    pub group_id: String,
    pub group_invite_link: String,
}

impl TickerSignalGroup {
    pub fn connected(&self) -> bool {
        !self.group_id.is_empty()
    }
}

/// 매트릭스 룸 브리지 설정.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TickerMatrix {
    pub active: bool,
    pub room_id: String,
    /// 정식 별칭 (`#alias:server`)
    pub room_name: String,
}

impl TickerMatrix {
    pub fn connected(&self) -> bool {
        !self.room_id.is_empty()
    }
}

/// 지리적 힌트 (위도/경도).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TickerLocation {
    pub lat: f64,
    pub lon: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_with_website_dedup() {
        let ticker = Ticker::new("Demo")
            .with_website("a.example")
            .with_website("a.example")
            .with_website("b.example");

        assert_eq!(ticker.websites.len(), 2);
        assert!(ticker.has_origin("A.example"));
        assert!(!ticker.has_origin("c.example"));
    }

    #[test]
    fn test_telegram_chat_id() {
        let telegram = TickerTelegram {
            channel_name: "demo".to_string(),
            ..Default::default()
        };
        assert_eq!(telegram.chat_id(), "@demo");
        assert!(telegram.connected());

        let telegram = TickerTelegram {
            channel_name: "@demo".to_string(),
            ..Default::default()
        };
        assert_eq!(telegram.chat_id(), "@demo");
    }

    #[test]
    fn test_bridge_connected_flags() {
        assert!(!TickerMastodon::default().connected());
        assert!(!TickerBluesky::default().connected());
        assert!(!TickerSignalGroup::default().connected());
        assert!(!TickerMatrix::default().connected());

        let mastodon = TickerMastodon {
            server: "https://mastodon.example".to_string(),
            token: "token".to_string(),
            ..Default::default()
        };
        assert!(mastodon.connected());
    }
}
