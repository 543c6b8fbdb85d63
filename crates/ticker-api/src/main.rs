//! 라이브 티커 API 서버 진입점.
//!
//! 설정은 `config/default.toml`(또는 `TICKER_CONFIG`)과 `TICKER__*` 환경 변수에서 읽습니다.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{http::StatusCode, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use ticker_api::metrics::setup_metrics_recorder;
use ticker_api::repository::PgStorage;
use ticker_api::routes::create_api_router;
use ticker_api::state::AppState;
use ticker_core::{init_logging, AppConfig, LogConfig, MemoryStorage, ServerConfig, Storage};

/// 종료 시 실시간 연결 정리에 주는 시간.
const ENGINE_SHUTDOWN_DEADLINE: Duration = Duration::from_secs(10);

/// CORS 레이어 생성.
///
/// `server.cors_origins`가 비어 있으면 모든 origin을 허용합니다.
fn cors_layer(config: &ServerConfig) -> CorsLayer {
    let origins: Vec<_> = config
        .cors_origins
        .iter()
        .filter_map(|s| s.trim().parse().ok())
        .collect();

    let restricted = !origins.is_empty();
    let allow_origin = if restricted {
        info!("CORS configured with {} allowed origins", origins.len());
        AllowOrigin::list(origins)
    } else {
        if !config.cors_origins.is_empty() {
            warn!("server.cors_origins contains no valid origins, allowing any");
        }
        AllowOrigin::any()
    };

    CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([
            axum::http::Method::GET,
            axum::http::Method::POST,
            axum::http::Method::PUT,
            axum::http::Method::DELETE,
            axum::http::Method::OPTIONS,
        ])
        .allow_headers([
            axum::http::header::CONTENT_TYPE,
            axum::http::header::AUTHORIZATION,
            axum::http::header::ACCEPT,
        ])
        // 와일드카드 origin과 자격 증명은 함께 쓸 수 없음
        .allow_credentials(restricted)
        .max_age(Duration::from_secs(3600))
}

/// /metrics 엔드포인트 핸들러.
async fn metrics_handler(
    axum::extract::State(handle): axum::extract::State<PrometheusHandle>,
) -> String {
    handle.render()
}

/// 전체 라우터 생성.
fn create_router(
    state: Arc<AppState>,
    metrics_handle: PrometheusHandle,
    config: &ServerConfig,
) -> Router {
    let metrics_router = Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metrics_handle);

    Router::new()
        .merge(metrics_router)
        .merge(create_api_router(state))
        .layer(TraceLayer::new_for_http())
        // 전역 타임아웃 (30초) - 408 상태 코드 반환
        .layer(TimeoutLayer::with_status_code(
            StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(30),
        ))
        .layer(cors_layer(config))
}

/// 설정에 따라 저장소를 엽니다.
async fn open_storage(config: &AppConfig) -> anyhow::Result<Arc<dyn Storage>> {
    if config.uses_memory_storage() {
        warn!("database.url not set, using in-memory storage (data is lost on restart)");
        return Ok(Arc::new(MemoryStorage::new()));
    }

    let storage = PgStorage::connect(&config.database)
        .await
        .context("failed to connect to database")?;
    info!("Connected to PostgreSQL");
    Ok(Arc::new(storage))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 파일 로드 (있는 경우)
    let _ = dotenvy::dotenv();

    let config = AppConfig::load_default().context("failed to load configuration")?;
    // LOG_FORMAT이 있으면 환경 변수 설정이 우선
    let log_config = if std::env::var_os("LOG_FORMAT").is_some() {
        LogConfig::from_env()
    } else {
        LogConfig::from(&config.logging)
    };
    init_logging(log_config)
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {}", e))?;

    info!("Starting ticker API server...");

    let metrics_handle = setup_metrics_recorder();
    info!("Prometheus metrics recorder initialized");

    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port)
        .parse()
        .map_err(|e| {
            error!(
                host = %config.server.host,
                port = config.server.port,
                error = %e,
                "Invalid listen address. Check server.host and server.port."
            );
            e
        })?;

    config.validate().context("invalid configuration")?;

    let storage = open_storage(&config).await?;
    let server_config = config.server.clone();
    let sweep_interval = Duration::from_secs(config.cache.cleaning_interval_secs);

    let state = Arc::new(AppState::new(config, storage));
    let _engine_handle = state.engine.start();
    let _sweeper_handle = state.cache.spawn_sweeper(sweep_interval);

    info!(version = %state.version, "Application state initialized");
    info!(bridges = ?state.bridges.names(), "Bridges registered");

    let app = create_router(Arc::clone(&state), metrics_handle, &server_config);

    info!(%addr, "API server listening");
    info!("Metrics available at http://{}/metrics", addr);
    info!("WebSocket available at ws://{}/v1/websocket", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown initiated, cleaning up...");

    if let Err(e) = state.engine.shutdown(ENGINE_SHUTDOWN_DEADLINE).await {
        warn!(error = %e, "Realtime engine did not stop cleanly");
    }
    state.cache.close();

    info!("Server stopped gracefully");

    Ok(())
}

/// Graceful shutdown 시그널 대기.
///
/// Ctrl+C 또는 SIGTERM 시그널을 수신하면 반환합니다.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("Received Ctrl+C, initiating graceful shutdown...");
        }
        _ = terminate => {
            warn!("Received SIGTERM, initiating graceful shutdown...");
        }
    }
}
