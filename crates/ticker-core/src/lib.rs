//! # Ticker Core
//!
//! 라이브 티커 서비스의 핵심 도메인 모델 및 타입을 제공합니다.
//!
//! - 티커, 메시지, 업로드, 사용자, 전역 설정 모델
//! - 저장소 trait 및 인메모리 구현
//! - 설정 관리
//! - 로깅 인프라

pub mod config;
pub mod domain;
pub mod error;
pub mod logging;
pub mod storage;

pub use config::*;
pub use domain::*;
pub use error::*;
pub use logging::*;
pub use storage::{FindOptions, MemoryStorage, Pagination, Storage, StorageError, StorageResult};
