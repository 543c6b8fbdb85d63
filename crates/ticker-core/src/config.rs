//! 설정 관리.
//!
//! 기본값 → TOML 파일 → 환경 변수(`TICKER__SECTION__KEY`) 순서로 덮어씁니다.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{TickerError, TickerResult};

/// 설정 파일 경로를 덮어쓰는 환경 변수.
pub const CONFIG_PATH_ENV: &str = "TICKER_CONFIG";

/// 애플리케이션 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    /// 서버 설정
    pub server: ServerConfig,
    /// 데이터베이스 설정
    pub database: DatabaseConfig,
    /// 업로드 저장소 설정
    pub upload: UploadConfig,
    /// 인증 설정
    pub auth: AuthConfig,
    /// 로깅 설정
    pub logging: LoggingConfig,
    /// 실시간 엔진 설정
    pub realtime: RealtimeConfig,
    /// 응답 캐시 설정
    pub cache: CacheConfig,
    /// 브리지 설정
    pub bridges: BridgesConfig,
}

/// 서버 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// 바인딩할 호스트
    pub host: String,
    /// 리스닝할 포트
    pub port: u16,
    /// 허용할 CORS origin 목록 (비어 있으면 모두 허용)
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            cors_origins: Vec::new(),
        }
    }
}

/// 데이터베이스 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL URL. 비어 있으면 인메모리 저장소를 사용합니다.
    pub url: String,
    /// 최대 연결 수
    pub max_connections: u32,
    /// 연결 타임아웃 (초)
    pub connection_timeout_secs: u64,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            max_connections: 10,
            connection_timeout_secs: 30,
        }
    }
}

/// 업로드 저장소 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UploadConfig {
    /// 업로드 루트 디렉토리
    pub path: String,
    /// 공개 미디어 기본 URL
    pub url: String,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            path: "./uploads".to_string(),
            url: "http://localhost:8080".to_string(),
        }
    }
}

/// 인증 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AuthConfig {
    /// JWT 서명 키
    pub jwt_secret: String,
    /// 토큰 유효 시간 (분)
    pub token_ttl_minutes: i64,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            token_ttl_minutes: 60 * 24,
        }
    }
}

/// 로깅 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// 로그 레벨
    pub level: String,
    /// 로그 형식 (pretty, json, compact)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

/// 실시간 엔진 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// broadcast 채널 용량
    pub broadcast_capacity: usize,
    /// register/unregister 채널 용량
    pub register_capacity: usize,
    /// 클라이언트별 송신 큐 용량
    pub client_queue_capacity: usize,
    /// 쓰기 타임아웃 (밀리초)
    pub write_wait_ms: u64,
    /// pong 대기 시간 (밀리초). ping 주기는 이 값의 90%입니다.
    pub pong_wait_ms: u64,
    /// 종료 시 close 프레임 전송 대기 (밀리초)
    pub client_close_wait_ms: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            broadcast_capacity: 256,
            register_capacity: 64,
            client_queue_capacity: 256,
            write_wait_ms: 10_000,
            pong_wait_ms: 60_000,
            client_close_wait_ms: 100,
        }
    }
}

/// 응답 캐시 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CacheConfig {
    /// 공개 엔드포인트 응답 TTL (초)
    pub ttl_secs: u64,
    /// 만료 항목 정리 주기 (초)
    pub cleaning_interval_secs: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: 60,
            cleaning_interval_secs: 300,
        }
    }
}

/// 브리지 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct BridgesConfig {
    pub telegram: TelegramBridgeConfig,
    pub mastodon: MastodonBridgeConfig,
    pub bluesky: BlueskyBridgeConfig,
    pub signal_group: SignalGroupBridgeConfig,
    pub matrix: MatrixBridgeConfig,
}

/// 텔레그램 브리지 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TelegramBridgeConfig {
    pub enabled: bool,
    /// 전역 봇 토큰
    pub token: String,
    /// Bot API 기본 URL
    pub api_url: String,
}

impl Default for TelegramBridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            token: String::new(),
            api_url: "https://api.telegram.org".to_string(),
        }
    }
}

/// 마스토돈 브리지 설정. 서버와 토큰은 티커별로 저장됩니다.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MastodonBridgeConfig {
    pub enabled: bool,
}

/// 블루스카이 브리지 설정.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BlueskyBridgeConfig {
    pub enabled: bool,
    /// PDS 기본 URL
    pub pds_url: String,
}

impl Default for BlueskyBridgeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            pds_url: "https://bsky.social".to_string(),
        }
    }
}

/// 시그널 그룹 브리지 설정 (signal-cli JSON-RPC).
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SignalGroupBridgeConfig {
    pub enabled: bool,
    /// signal-cli JSON-RPC 엔드포인트
    pub api_url: String,
    /// 발신 계정 전화번호
    pub account: String,
    /// 그룹 아바타 파일 경로
    pub avatar: String,
}

/// 매트릭스 브리지 설정.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct MatrixBridgeConfig {
    pub enabled: bool,
    /// 홈서버 URL
    pub homeserver: String,
    pub access_token: String,
    /// 룸 별칭에 사용할 서버 이름
    pub server_name: String,
}

impl AppConfig {
    /// 파일과 환경 변수에서 설정을 로드합니다.
    ///
    /// 파일이 없어도 에러가 아닙니다.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, config::ConfigError> {
        let builder = config::Config::builder()
            // 기본값으로 시작
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            // 파일에서 로드
            .add_source(config::File::from(path.as_ref()).required(false))
            // 환경 변수로 오버라이드
            .add_source(
                config::Environment::with_prefix("TICKER")
                    .separator("__")
                    .try_parsing(true),
            );

        let config = builder.build()?;
        config.try_deserialize()
    }

    /// 기본 경로(`TICKER_CONFIG` 또는 `config/default.toml`)에서 설정을 로드합니다.
    pub fn load_default() -> Result<Self, config::ConfigError> {
        let path = std::env::var(CONFIG_PATH_ENV)
            .unwrap_or_else(|_| "config/default.toml".to_string());
        Self::load(path)
    }

    pub fn uses_memory_storage(&self) -> bool {
        self.database.url.trim().is_empty()
    }

    /// 서버 시작 전에 필수 값을 검사합니다.
    pub fn validate(&self) -> TickerResult<()> {
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(TickerError::Config("auth.jwt_secret must be set".into()));
        }
        if self.auth.token_ttl_minutes <= 0 {
            return Err(TickerError::Config(
                "auth.token_ttl_minutes must be positive".into(),
            ));
        }
        // tokio interval은 0 주기를 허용하지 않음
        if self.cache.cleaning_interval_secs == 0 {
            return Err(TickerError::Config(
                "cache.cleaning_interval_secs must be positive".into(),
            ));
        }
        if self.realtime.pong_wait_ms == 0 {
            return Err(TickerError::Config("realtime.pong_wait_ms must be positive".into()));
        }

        let signal = &self.bridges.signal_group;
        if signal.enabled && (signal.api_url.is_empty() || signal.account.is_empty()) {
            return Err(TickerError::Config(
                "bridges.signal_group requires api_url and account".into(),
            ));
        }
        let matrix = &self.bridges.matrix;
        if matrix.enabled && (matrix.homeserver.is_empty() || matrix.access_token.is_empty()) {
            return Err(TickerError::Config(
                "bridges.matrix requires homeserver and access_token".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();
        assert_eq!(config.realtime.client_queue_capacity, 256);
        assert_eq!(config.realtime.pong_wait_ms, 60_000);
        assert_eq!(config.cache.ttl_secs, 60);
        assert!(config.uses_memory_storage());
        assert!(!config.bridges.telegram.enabled);
    }

    #[test]
    fn test_validate() {
        assert!(AppConfig::default().validate().is_ok());

        let mut config = AppConfig::default();
        config.auth.jwt_secret = "  ".to_string();
        assert!(matches!(config.validate(), Err(TickerError::Config(_))));

        let mut config = AppConfig::default();
        config.cache.cleaning_interval_secs = 0;
        assert!(config.validate().is_err());

        let mut config = AppConfig::default();
        config.bridges.matrix.enabled = true;
        assert!(config.validate().is_err());
        config.bridges.matrix.homeserver = "https://matrix.example".to_string();
        config.bridges.matrix.access_token = "secret".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_missing_file_uses_defaults() {
        let config = AppConfig::load("does/not/exist.toml").unwrap();
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.level, "info");
    }
}
