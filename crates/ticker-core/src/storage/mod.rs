//! 영구 저장소 추상화.
//!
//! 티커, 메시지, 업로드, 사용자, 전역 설정을 저장하고 조회하기 위한
//! 저장소 중립적인 인터페이스를 제공합니다. 실시간 엔진과 브리지는
//! 이 trait를 통해서만 영구 상태에 접근합니다.

mod memory;

pub use memory::MemoryStorage;

use async_trait::async_trait;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{InactiveSettings, Message, RefreshInterval, Ticker, Upload, User};

// =============================================================================
// 에러 타입
// =============================================================================

/// 저장소 에러.
#[derive(Debug, Error)]
pub enum StorageError {
    /// 레코드를 찾을 수 없음
    #[error("레코드를 찾을 수 없음: {0}")]
    NotFound(String),

    /// 잘못된 입력 (제약 조건 위반 등)
    #[error("잘못된 입력: {0}")]
    InvalidInput(String),

    /// 데이터베이스 에러
    #[error("데이터베이스 에러: {0}")]
    Database(String),

    /// 직렬화 에러
    #[error("직렬화 에러: {0}")]
    Serialization(String),
}

impl StorageError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound(_))
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// =============================================================================
// 조회 옵션
// =============================================================================

/// 연관 데이터 사전 로딩 옵션.
///
/// 기본값은 아무것도 로딩하지 않습니다. 필요한 호출부에서 명시적으로 켭니다.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FindOptions {
    /// 티커의 웹사이트 origin 목록
    pub with_websites: bool,
    /// 메시지의 첨부 파일
    pub with_attachments: bool,
    /// 사용자의 티커 목록
    pub with_tickers: bool,
}

impl FindOptions {
    pub fn none() -> Self {
        Self::default()
    }

    /// 모든 연관 데이터를 로딩합니다.
    pub fn all() -> Self {
        Self {
            with_websites: true,
            with_attachments: true,
            with_tickers: true,
        }
    }

    pub fn with_websites(mut self) -> Self {
        self.with_websites = true;
        self
    }

    pub fn with_attachments(mut self) -> Self {
        self.with_attachments = true;
        self
    }

    pub fn with_tickers(mut self) -> Self {
        self.with_tickers = true;
        self
    }
}

/// 메시지 페이지네이션.
///
/// `before`/`after`는 메시지 ID 기준 배타 경계입니다. 결과는 ID 내림차순입니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub limit: usize,
    pub before: Option<i64>,
    pub after: Option<i64>,
}

impl Pagination {
    pub const DEFAULT_LIMIT: usize = 10;

    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Default::default()
        }
    }

    pub fn before(mut self, id: i64) -> Self {
        self.before = Some(id);
        self
    }

    pub fn after(mut self, id: i64) -> Self {
        self.after = Some(id);
        self
    }

    /// 주어진 ID가 경계 조건을 만족하는지 확인합니다.
    pub fn matches(&self, id: i64) -> bool {
        self.before.map_or(true, |b| id < b) && self.after.map_or(true, |a| id > a)
    }
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            limit: Self::DEFAULT_LIMIT,
            before: None,
            after: None,
        }
    }
}

// =============================================================================
// Storage Trait
// =============================================================================

/// 영구 저장소 trait.
///
/// 구현체는 문장 단위로 원자적인 쓰기를 보장해야 합니다.
/// `save_*` 메서드는 ID가 0인 레코드에 새 ID를 할당합니다.
#[async_trait]
pub trait Storage: Send + Sync {
    // ==================== 사용자 ====================

    async fn find_users(&self) -> StorageResult<Vec<User>>;

    async fn find_user_by_id(&self, id: i64, opts: FindOptions) -> StorageResult<User>;

    async fn find_user_by_email(&self, email: &str, opts: FindOptions) -> StorageResult<User>;

    /// 새 사용자는 `tickers` 연결과 함께 저장됩니다. 기존 사용자의 연결은 바꾸지 않습니다.
    async fn save_user(&self, user: &mut User) -> StorageResult<()>;

    async fn delete_user(&self, id: i64) -> StorageResult<()>;

    // ==================== 티커 ====================

    /// 사용자가 편집할 수 있는 티커 목록. 슈퍼 관리자는 전체를 받습니다.
    async fn find_tickers_by_user(&self, user: &User, opts: FindOptions)
        -> StorageResult<Vec<Ticker>>;

    async fn find_ticker_by_id(&self, id: i64, opts: FindOptions) -> StorageResult<Ticker>;

    /// origin 호스트로 티커를 찾습니다.
    async fn find_ticker_by_domain(&self, domain: &str, opts: FindOptions)
        -> StorageResult<Ticker>;

    async fn save_ticker(&self, ticker: &mut Ticker) -> StorageResult<()>;

    /// 티커와 그 메시지, 업로드를 함께 삭제합니다.
    async fn delete_ticker(&self, id: i64) -> StorageResult<()>;

    async fn add_ticker_user(&self, ticker_id: i64, user_id: i64) -> StorageResult<()>;

    async fn remove_ticker_user(&self, ticker_id: i64, user_id: i64) -> StorageResult<()>;

    // ==================== 업로드 ====================

    async fn find_upload_by_uuid(&self, uuid: Uuid) -> StorageResult<Upload>;

    /// 존재하는 업로드만 반환합니다. 순서는 입력 순서를 따릅니다.
    async fn find_uploads_by_uuids(&self, uuids: &[Uuid]) -> StorageResult<Vec<Upload>>;

    async fn save_upload(&self, upload: &mut Upload) -> StorageResult<()>;

    async fn delete_upload(&self, uuid: Uuid) -> StorageResult<()>;

    async fn delete_uploads(&self, uuids: &[Uuid]) -> StorageResult<()> {
        for uuid in uuids {
            self.delete_upload(*uuid).await?;
        }
        Ok(())
    }

    // ==================== 메시지 ====================

    async fn find_message(
        &self,
        ticker_id: i64,
        message_id: i64,
        opts: FindOptions,
    ) -> StorageResult<Message>;

    async fn find_messages_by_ticker(
        &self,
        ticker_id: i64,
        pagination: Pagination,
        opts: FindOptions,
    ) -> StorageResult<Vec<Message>>;

    async fn save_message(&self, message: &mut Message) -> StorageResult<()>;

    async fn delete_message(&self, ticker_id: i64, message_id: i64) -> StorageResult<()>;

    // ==================== 설정 ====================

    /// 저장된 값이 없으면 기본값을 반환합니다.
    async fn get_inactive_settings(&self) -> StorageResult<InactiveSettings>;

    async fn save_inactive_settings(&self, settings: &InactiveSettings) -> StorageResult<()>;

    async fn get_refresh_interval(&self) -> StorageResult<RefreshInterval>;

    async fn save_refresh_interval(&self, interval: &RefreshInterval) -> StorageResult<()>;
}
