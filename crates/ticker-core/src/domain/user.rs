//! 사용자 도메인 모델.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 편집자/관리자 계정.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub last_login: Option<DateTime<Utc>>,
    pub email: String,
    /// Argon2 PHC 해시
    #[serde(skip_serializing)]
    pub encrypted_password: String,
    pub is_super_admin: bool,
    /// 편집 권한이 있는 티커 ID 목록
    #[serde(default)]
    pub tickers: Vec<i64>,
}

impl User {
    pub fn new(email: impl Into<String>, encrypted_password: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: 0,
            created_at: now,
            updated_at: now,
            last_login: None,
            email: email.into(),
            encrypted_password: encrypted_password.into(),
            is_super_admin: false,
            tickers: Vec::new(),
        }
    }

    /// 티커 편집 권한 확인. 슈퍼 관리자는 모든 티커에 접근할 수 있습니다.
    pub fn can_edit(&self, ticker_id: i64) -> bool {
        self.is_super_admin || self.tickers.contains(&ticker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_can_edit() {
        let mut user = User::new("editor@example.org", "hash");
        user.tickers.push(3);

        assert!(user.can_edit(3));
        assert!(!user.can_edit(4));

        user.is_super_admin = true;
        assert!(user.can_edit(4));
    }

    #[test]
    fn test_password_not_serialized() {
        let user = User::new("editor@example.org", "secret-hash");
        let json = serde_json::to_string(&user).unwrap();
        assert!(!json.contains("secret-hash"));
    }
}
