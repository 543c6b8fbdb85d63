//! 통합 API 응답 및 에러 타입.
//!
//! `/v1` 아래의 모든 JSON 응답은 같은 봉투(envelope) 형식을 사용합니다.
//!
//! ```json
//! {
//!   "data": null,
//!   "status": "error",
//!   "error": { "code": 1001, "message": "ticker not found" }
//! }
//! ```
//!
//! 내부 에러 메시지는 응답에 노출하지 않습니다. 각 에러 종류는 고정된
//! `(HTTP 상태, 에러 코드, 표준 메시지)` 조합으로 변환됩니다.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Serialize, Serializer};
use serde_json::Value;

// ==================== 표준 메시지 ====================

pub const MSG_INVALID_FORM: &str = "invalid form values";
pub const MSG_TICKER_IDENTIFIER: &str = "ticker identifier not found";
pub const MSG_FILES_IDENTIFIER: &str = "files identifier not found";
pub const MSG_TICKER_NOT_FOUND: &str = "ticker not found";
pub const MSG_MESSAGE_NOT_FOUND: &str = "message not found";
pub const MSG_USER_NOT_FOUND: &str = "user not found";
pub const MSG_SETTING_NOT_FOUND: &str = "setting not found";
pub const MSG_UPLOAD_NOT_FOUND: &str = "upload not found";
pub const MSG_UNAUTHORIZED: &str = "unauthorized";
pub const MSG_BAD_CREDENTIALS: &str = "bad credentials";
pub const MSG_INSUFFICIENT_PERMISSIONS: &str = "insufficient permissions";
pub const MSG_FAILED_TO_SAVE: &str = "failed to save";
pub const MSG_INTERNAL: &str = "internal error";

// ==================== 에러 코드 ====================

/// 응답 봉투의 정수 에러 코드.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Default = 1000,
    NotFound = 1001,
    BadCredentials = 1002,
    InsufficientPermissions = 1003,
}

impl ErrorCode {
    pub fn as_u16(self) -> u16 {
        self as u16
    }
}

impl Serialize for ErrorCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u16(self.as_u16())
    }
}

// ==================== 응답 봉투 ====================

/// 응답 상태 문자열.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Success,
    Error,
}

/// 봉투 내 에러 본문.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub code: ErrorCode,
    pub message: &'static str,
}

/// 공통 응답 봉투.
#[derive(Debug, Clone, Serialize)]
pub struct Envelope<T: Serialize> {
    pub data: Option<T>,
    pub status: ResponseStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

/// 성공 응답을 봉투로 감쌉니다.
pub fn success<T: Serialize>(data: T) -> Json<Envelope<T>> {
    Json(Envelope {
        data: Some(data),
        status: ResponseStatus::Success,
        error: None,
    })
}

// ==================== ApiError ====================

/// 핸들러 에러.
///
/// `IntoResponse`를 구현하여 핸들러에서 `?`로 바로 반환할 수 있습니다.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiError {
    pub status: StatusCode,
    pub code: ErrorCode,
    pub message: &'static str,
}

impl ApiError {
    pub const fn new(status: StatusCode, code: ErrorCode, message: &'static str) -> Self {
        Self {
            status,
            code,
            message,
        }
    }

    // ---- validation (400 / 1000) ----

    pub const fn invalid_form() -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::Default, MSG_INVALID_FORM)
    }

    pub const fn ticker_identifier() -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::Default, MSG_TICKER_IDENTIFIER)
    }

    pub const fn files_identifier() -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::Default, MSG_FILES_IDENTIFIER)
    }

    pub const fn failed_to_save() -> Self {
        Self::new(StatusCode::BAD_REQUEST, ErrorCode::Default, MSG_FAILED_TO_SAVE)
    }

    // ---- not found (404 / 1001) ----

    pub const fn ticker_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, MSG_TICKER_NOT_FOUND)
    }

    pub const fn message_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, MSG_MESSAGE_NOT_FOUND)
    }

    pub const fn user_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, MSG_USER_NOT_FOUND)
    }

    pub const fn setting_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, MSG_SETTING_NOT_FOUND)
    }

    pub const fn upload_not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, ErrorCode::NotFound, MSG_UPLOAD_NOT_FOUND)
    }

    // ---- authorization (401, 403) ----

    pub const fn unauthorized() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::BadCredentials, MSG_UNAUTHORIZED)
    }

    pub const fn bad_credentials() -> Self {
        Self::new(StatusCode::UNAUTHORIZED, ErrorCode::BadCredentials, MSG_BAD_CREDENTIALS)
    }

    pub const fn insufficient_permissions() -> Self {
        Self::new(
            StatusCode::FORBIDDEN,
            ErrorCode::InsufficientPermissions,
            MSG_INSUFFICIENT_PERMISSIONS,
        )
    }

    pub const fn internal() -> Self {
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            ErrorCode::Default,
            MSG_INTERNAL,
        )
    }

    /// 봉투 본문.
    pub fn envelope(&self) -> Envelope<Value> {
        Envelope {
            data: None,
            status: ResponseStatus::Error,
            error: Some(ErrorBody {
                code: self.code,
                message: self.message,
            }),
        }
    }
}

impl std::fmt::Display for ApiError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({}): {}", self.status, self.code.as_u16(), self.message)
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope())).into_response()
    }
}

/// API 핸들러 결과 타입.
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_envelope_shape() {
        let json = serde_json::to_value(ApiError::ticker_not_found().envelope()).unwrap();

        assert_eq!(json["status"], "error");
        assert!(json["data"].is_null());
        assert_eq!(json["error"]["code"], 1001);
        assert_eq!(json["error"]["message"], "ticker not found");
    }

    #[test]
    fn test_success_envelope_shape() {
        let Json(envelope) = success(serde_json::json!({ "messages": [] }));
        let json = serde_json::to_value(envelope).unwrap();

        assert_eq!(json["status"], "success");
        assert!(json["data"]["messages"].is_array());
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_error_status_mapping() {
        assert_eq!(ApiError::invalid_form().status, StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::failed_to_save().code, ErrorCode::Default);
        assert_eq!(ApiError::unauthorized().code.as_u16(), 1002);
        assert_eq!(
            ApiError::insufficient_permissions().status,
            StatusCode::FORBIDDEN
        );
        assert_eq!(ApiError::insufficient_permissions().code.as_u16(), 1003);
    }
}
