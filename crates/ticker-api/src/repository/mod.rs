//! 영구 저장소 구현.
//!
//! 핸들러와 서비스는 `ticker_core::Storage` trait만 사용합니다.
//! `database.url`이 비어 있으면 인메모리 저장소를 사용합니다.

mod postgres;

pub use postgres::PgStorage;
