//! 전역 설정 값 (비활성 모드 템플릿, 갱신 주기).

use serde::{Deserialize, Serialize};

pub const INACTIVE_SETTINGS_NAME: &str = "inactive_settings";
pub const REFRESH_INTERVAL_NAME: &str = "refresh_interval";

/// 기본 갱신 주기 (밀리초).
pub const DEFAULT_REFRESH_INTERVAL_MS: i64 = 10_000;

/// origin에 활성 티커가 없을 때 보여줄 안내 템플릿.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct InactiveSettings {
    pub headline: String,
    pub sub_headline: String,
    pub description: String,
    pub author: String,
    pub email: String,
    pub homepage: String,
}

impl Default for InactiveSettings {
    fn default() -> Self {
        Self {
            headline: "The ticker is currently inactive.".to_string(),
            sub_headline: "Please contact us if you want to use it.".to_string(),
            description: "This live ticker is not active right now. Check back later."
                .to_string(),
            author: "Ticker Team".to_string(),
            email: "admin@ticker.example".to_string(),
            homepage: "https://ticker.example".to_string(),
        }
    }
}

/// 클라이언트 폴링 갱신 주기.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshInterval {
    /// 밀리초
    pub refresh_interval: i64,
}

impl Default for RefreshInterval {
    fn default() -> Self {
        Self {
            refresh_interval: DEFAULT_REFRESH_INTERVAL_MS,
        }
    }
}

impl InactiveSettings {
    /// 느슨한 JSON 값에서 설정을 읽습니다.
    ///
    /// 문자열이 아닌 필드는 문자열로 변환하고 경고를 남깁니다.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let mut settings = Self::default();
        let Some(object) = value.as_object() else {
            tracing::warn!("inactive settings payload is not an object, using defaults");
            return settings;
        };

        for (key, raw) in object {
            let text = match raw {
                serde_json::Value::String(s) => s.clone(),
                serde_json::Value::Null => continue,
                other => {
                    tracing::warn!(field = %key, value = %other, "non-string inactive setting preserved as text");
                    other.to_string()
                }
            };

            match key.as_str() {
                "headline" => settings.headline = text,
                "subHeadline" | "sub_headline" => settings.sub_headline = text,
                "description" => settings.description = text,
                "author" => settings.author = text,
                "email" => settings.email = text,
                "homepage" => settings.homepage = text,
                _ => {}
            }
        }

        settings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_value_non_string_fields() {
        let value = serde_json::json!({
            "headline": "Paused",
            "author": 42,
            "email": null,
        });
        let settings = InactiveSettings::from_value(&value);

        assert_eq!(settings.headline, "Paused");
        assert_eq!(settings.author, "42");
        assert_eq!(settings.email, InactiveSettings::default().email);
    }

    #[test]
    fn test_refresh_interval_default() {
        assert_eq!(RefreshInterval::default().refresh_interval, 10_000);
    }
}
