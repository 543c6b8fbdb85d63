//! 모든 핸들러에서 공유되는 애플리케이션 상태.
//!
//! 구성 요소는 여기서 한 번 만들어지고 `Arc<AppState>`로 핸들러에 주입됩니다.

use std::sync::Arc;
use std::time::Duration;

use ticker_bridge::{Bridges, MediaLoader};
use ticker_core::{AppConfig, Storage};

use crate::cache::ResponseCache;
use crate::services::PublicationService;
use crate::websocket::{Engine, EngineConfig};

/// 애플리케이션 공유 상태.
#[derive(Clone)]
pub struct AppState {
    /// 애플리케이션 설정
    pub config: Arc<AppConfig>,

    /// 영구 저장소 (PostgreSQL 또는 인메모리)
    pub storage: Arc<dyn Storage>,

    /// 실시간 팬아웃 엔진
    pub engine: Arc<Engine>,

    /// 외부 플랫폼 브리지 레지스트리
    pub bridges: Arc<Bridges>,

    /// 메시지 발행 오케스트레이터
    pub publication: Arc<PublicationService>,

    /// 공개 엔드포인트 응답 캐시
    pub cache: ResponseCache,

    /// 서버 시작 시간
    pub started_at: chrono::DateTime<chrono::Utc>,

    /// API 버전
    pub version: String,
}

impl AppState {
    /// 설정과 저장소로 상태를 조립합니다.
    ///
    /// 브리지는 설정에서 켜진 것만 등록됩니다. 엔진은 아직 시작되지 않습니다.
    pub fn new(config: AppConfig, storage: Arc<dyn Storage>) -> Self {
        let media = MediaLoader::new(Arc::clone(&storage), config.upload.path.clone());
        let bridges = Bridges::from_config(&config.bridges, media);
        let engine = Engine::new(EngineConfig::from(&config.realtime));
        let cache = ResponseCache::new(Duration::from_secs(config.cache.ttl_secs));

        Self::assemble(Arc::new(config), storage, engine, Arc::new(bridges), cache)
    }

    /// 브리지 레지스트리를 교체합니다.
    pub fn with_bridges(self, bridges: Bridges) -> Self {
        Self::assemble(
            self.config,
            self.storage,
            self.engine,
            Arc::new(bridges),
            self.cache,
        )
    }

    fn assemble(
        config: Arc<AppConfig>,
        storage: Arc<dyn Storage>,
        engine: Arc<Engine>,
        bridges: Arc<Bridges>,
        cache: ResponseCache,
    ) -> Self {
        let publication = Arc::new(PublicationService::new(
            Arc::clone(&storage),
            Arc::clone(&bridges),
            Arc::clone(&engine),
            config.upload.url.clone(),
            config.upload.path.clone(),
        ));

        Self {
            config,
            storage,
            engine,
            bridges,
            publication,
            cache,
            started_at: chrono::Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}
