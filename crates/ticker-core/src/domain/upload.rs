//! 업로드 도메인 모델.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Datelike, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// 영구 저장된 업로드 파일.
///
/// 디스크 배치는 `{root}/{YYYY}/{M}/{uuid}.{ext}` 입니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Upload {
    pub id: i64,
    pub uuid: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    /// 권한 확인용 소유 티커
    pub ticker_id: i64,
    pub extension: String,
    pub content_type: String,
}

impl Upload {
    /// 콘텐츠 타입에서 확장자를 결정하여 새 업로드를 생성합니다.
    pub fn new(ticker_id: i64, content_type: impl Into<String>) -> Self {
        let content_type = content_type.into();
        let now = Utc::now();
        Self {
            id: 0,
            uuid: Uuid::new_v4(),
            created_at: now,
            updated_at: now,
            ticker_id,
            extension: extension_for(&content_type).to_string(),
            content_type,
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.{}", self.uuid, self.extension)
    }

    /// 업로드 루트 기준 상대 경로 (`YYYY/M/{uuid}.{ext}`).
    pub fn relative_path(&self) -> PathBuf {
        PathBuf::from(self.created_at.year().to_string())
            .join(self.created_at.month().to_string())
            .join(self.file_name())
    }

    pub fn full_path(&self, root: impl AsRef<Path>) -> PathBuf {
        root.as_ref().join(self.relative_path())
    }

    /// 공개 미디어 URL.
    pub fn url(&self, base_url: &str) -> String {
        format!("{}/media/{}", base_url.trim_end_matches('/'), self.file_name())
    }
}

/// 콘텐츠 타입 → 파일 확장자.
pub fn extension_for(content_type: &str) -> &'static str {
    match content_type {
        "image/jpeg" | "image/jpg" => "jpg",
        "image/png" => "png",
        "image/gif" => "gif",
        "image/webp" => "webp",
        _ => "bin",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_relative_path_layout() {
        let mut upload = Upload::new(7, "image/jpeg");
        upload.created_at = Utc.with_ymd_and_hms(2024, 3, 9, 12, 0, 0).unwrap();

        let expected = PathBuf::from("2024")
            .join("3")
            .join(format!("{}.jpg", upload.uuid));
        assert_eq!(upload.relative_path(), expected);
        assert_eq!(
            upload.full_path("/srv/uploads"),
            PathBuf::from("/srv/uploads").join(expected)
        );
    }

    #[test]
    fn test_url() {
        let upload = Upload::new(7, "image/gif");
        assert_eq!(
            upload.url("https://ticker.example/"),
            format!("https://ticker.example/media/{}.gif", upload.uuid)
        );
    }

    #[test]
    fn test_extension_for() {
        assert_eq!(extension_for("image/png"), "png");
        assert_eq!(extension_for("application/pdf"), "bin");
    }
}
