//! 라이브 티커 HTTP API 및 실시간 서버.
//!
//! 이 크레이트는 다음을 제공합니다:
//! - 도메인별 공개 조회 API (init, timeline, feed, manifest, media)
//! - 실시간 WebSocket 팬아웃 엔진
//! - 편집자용 관리 API (JWT 인증)
//! - 메시지 발행 파이프라인 (저장 → 브리지 → 실시간 알림)
//! - 공개 응답 캐시 및 Prometheus 메트릭
//!
//! # 모듈 구성
//!
//! - [`state`]: 애플리케이션 공유 상태 (AppState)
//! - [`routes`]: HTTP 엔드포인트
//! - [`auth`]: JWT 인증 및 비밀번호 해싱
//! - [`websocket`]: 실시간 엔진과 클라이언트 세션
//! - [`services`]: 메시지 발행 오케스트레이션
//! - [`cache`]: 공개 응답 캐시
//! - [`repository`]: PostgreSQL 저장소
//! - [`middleware`]: 티커 해석 및 메트릭 미들웨어

pub mod auth;
pub mod cache;
pub mod error;
pub mod metrics;
pub mod middleware;
pub mod repository;
pub mod routes;
pub mod services;
pub mod state;
pub mod types;
pub mod websocket;

pub use auth::{hash_password, verify_password, Claims, JwtAuth};
pub use error::{ApiError, ApiResult};
pub use metrics::setup_metrics_recorder;
pub use middleware::metrics_layer;
pub use routes::create_api_router;
pub use state::AppState;
pub use websocket::{websocket_handler, Engine, EngineConfig};
