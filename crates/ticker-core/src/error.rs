//! 티커 서비스의 공통 에러 타입.

use thiserror::Error;

use crate::storage::StorageError;

/// 핵심 에러.
#[derive(Debug, Error)]
pub enum TickerError {
    /// 설정 에러
    #[error("설정 에러: {0}")]
    Config(String),

    /// 저장소 에러
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// 잘못된 입력
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 권한 없음
    #[error("권한 없음: {0}")]
    Unauthorized(String),

    /// 입출력 에러
    #[error("입출력 에러: {0}")]
    Io(#[from] std::io::Error),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),

    /// 내부 에러
    #[error("내부 에러: {0}")]
    Internal(String),
}

/// 티커 작업을 위한 Result 타입.
pub type TickerResult<T> = Result<T, TickerError>;

impl TickerError {
    /// 레코드 부재로 인한 에러인지 확인합니다.
    pub fn is_not_found(&self) -> bool {
        matches!(self, TickerError::Storage(e) if e.is_not_found())
    }
}

impl From<serde_json::Error> for TickerError {
    fn from(err: serde_json::Error) -> Self {
        TickerError::Serialization(err.to_string())
    }
}

impl From<config::ConfigError> for TickerError {
    fn from(err: config::ConfigError) -> Self {
        TickerError::Config(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_not_found() {
        let err: TickerError = StorageError::NotFound("ticker 1".to_string()).into();
        assert!(err.is_not_found());

        let err = TickerError::InvalidInput("text".to_string());
        assert!(!err.is_not_found());
    }
}
