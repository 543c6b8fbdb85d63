//! 브리지 trait 및 공통 타입 정의.

use async_trait::async_trait;
use ticker_core::{Message, Ticker};

/// 브리지 작업용 Result 타입.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// 브리지 에러.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("네트워크 에러: {0}")]
    Network(#[from] reqwest::Error),

    #[error("API 에러 (HTTP {status}): {body}")]
    Api { status: u16, body: String },

    #[error("잘못된 응답: {0}")]
    InvalidResponse(String),

    #[error("미디어 로딩 실패: {0}")]
    Media(String),

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),

    #[error("직렬화 에러: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// 외부 플랫폼으로 메시지를 복제하는 아웃바운드 브리지.
///
/// 전역으로 비활성화되었거나 티커에서 비활성 상태이면 모든 메서드는
/// 아무 작업 없이 성공합니다. 동일 입력을 반복해도 결과가 같아야 합니다.
#[async_trait]
pub trait Bridge: Send + Sync {
    /// 레지스트리 키로 사용되는 이름.
    fn name(&self) -> &str;

    /// 부가 상태(그룹, 룸, 봇 이름 등)를 동기화하고 티커에 반영합니다.
    async fn update(&self, ticker: &mut Ticker) -> BridgeResult<()>;

    /// 메시지를 게시하고 삭제에 필요한 식별자를 메시지에 기록합니다.
    async fn send(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()>;

    /// 기록된 식별자로 복제본을 삭제합니다. 기록이 없으면 성공입니다.
    async fn delete(&self, ticker: &Ticker, message: &mut Message) -> BridgeResult<()>;
}

/// 실패 응답을 `BridgeError::Api`로 변환합니다.
pub(crate) async fn ensure_success(response: reqwest::Response) -> BridgeResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    Err(BridgeError::Api {
        status: status.as_u16(),
        body,
    })
}
