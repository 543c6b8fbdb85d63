//! 편집자용 관리 endpoint.
//!
//! - `POST   /v1/admin/login`
//! - `GET    /v1/admin/tickers/{id}/messages`
//! - `POST   /v1/admin/tickers/{id}/messages`
//! - `DELETE /v1/admin/tickers/{id}/messages/{messageId}`
//! - `POST   /v1/admin/tickers/{id}/bridges/sync`
//!
//! 로그인을 제외한 모든 요청은 `Authorization: Bearer <token>`이 필요하며,
//! 사용자에게 배정된 티커만 다룰 수 있습니다 (슈퍼 관리자는 전체).

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    routing::{delete, get, post},
    Json, Router,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use ticker_core::{FindOptions, Message, Ticker};
use tracing::{debug, info, warn};
use uuid::Uuid;
use validator::Validate;

use super::public::TimelineQuery;
use crate::auth::{create_token, verify_password, Claims, JwtAuth};
use crate::error::{success, ApiError, ApiResult, Envelope};
use crate::state::AppState;
use crate::types::PublicTicker;

// ==================== 요청/응답 타입 ====================

#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expire: chrono::DateTime<Utc>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateMessageRequest {
    #[validate(length(min = 1, max = 4096))]
    pub text: String,
    #[serde(default)]
    pub attachments: Vec<Uuid>,
}

#[derive(Debug, Serialize)]
pub struct MessagesResponse {
    pub messages: Vec<Message>,
}

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: Message,
}

#[derive(Debug, Serialize)]
pub struct BridgeSyncResponse {
    pub ticker: PublicTicker,
    pub bridges: Vec<String>,
}

// ==================== 핸들러 ====================

/// `POST /v1/admin/login`
pub async fn login(
    State(state): State<Arc<AppState>>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<LoginResponse>>> {
    let Json(request) = body.map_err(|e| {
        debug!(error = %e, "Invalid login body");
        ApiError::invalid_form()
    })?;
    request.validate().map_err(|_| ApiError::invalid_form())?;

    let mut user = state
        .storage
        .find_user_by_email(&request.email, FindOptions::none())
        .await
        .map_err(|_| ApiError::bad_credentials())?;

    if verify_password(&request.password, &user.encrypted_password).is_err() {
        info!(email = %request.email, "Login failed");
        return Err(ApiError::bad_credentials());
    }

    let claims = Claims::new(user.id, user.email.clone(), state.config.auth.token_ttl_minutes);
    let token = create_token(&claims, &state.config.auth.jwt_secret).map_err(|e| {
        warn!(error = %e, "Failed to issue token");
        ApiError::internal()
    })?;
    let expire = claims.expires_at().ok_or_else(ApiError::internal)?;

    user.last_login = Some(Utc::now());
    if let Err(e) = state.storage.save_user(&mut user).await {
        warn!(user_id = user.id, error = %e, "Failed to record last login");
    }

    info!(user_id = user.id, "User logged in");
    Ok(success(LoginResponse { token, expire }))
}

/// `GET /v1/admin/tickers/{id}/messages`
pub async fn list_messages(
    State(state): State<Arc<AppState>>,
    auth: JwtAuth,
    Path(ticker_id): Path<i64>,
    query: Result<Query<TimelineQuery>, QueryRejection>,
) -> ApiResult<Json<Envelope<MessagesResponse>>> {
    let ticker = load_ticker(&state, &auth, ticker_id).await?;
    let Query(query) = query.map_err(|_| ApiError::invalid_form())?;

    let messages = state
        .storage
        .find_messages_by_ticker(ticker.id, query.pagination(), FindOptions::all())
        .await
        .map_err(|e| {
            warn!(ticker_id, error = %e, "Failed to load messages");
            ApiError::internal()
        })?;

    Ok(success(MessagesResponse { messages }))
}

/// `POST /v1/admin/tickers/{id}/messages`
pub async fn create_message(
    State(state): State<Arc<AppState>>,
    auth: JwtAuth,
    Path(ticker_id): Path<i64>,
    body: Result<Json<CreateMessageRequest>, JsonRejection>,
) -> ApiResult<Json<Envelope<MessageResponse>>> {
    let Json(request) = body.map_err(|_| ApiError::invalid_form())?;
    request.validate().map_err(|_| ApiError::invalid_form())?;

    let ticker = load_ticker(&state, &auth, ticker_id).await?;
    let message = state
        .publication
        .create_message(&ticker, &request.text, &request.attachments)
        .await?;

    Ok(success(MessageResponse { message }))
}

/// `DELETE /v1/admin/tickers/{id}/messages/{messageId}`
pub async fn delete_message(
    State(state): State<Arc<AppState>>,
    auth: JwtAuth,
    Path((ticker_id, message_id)): Path<(i64, i64)>,
) -> ApiResult<Json<Envelope<()>>> {
    let ticker = load_ticker(&state, &auth, ticker_id).await?;
    state.publication.delete_message(&ticker, message_id).await?;

    Ok(success(()))
}

/// `POST /v1/admin/tickers/{id}/bridges/sync`
pub async fn sync_bridges(
    State(state): State<Arc<AppState>>,
    auth: JwtAuth,
    Path(ticker_id): Path<i64>,
) -> ApiResult<Json<Envelope<BridgeSyncResponse>>> {
    let mut ticker = load_ticker(&state, &auth, ticker_id).await?;
    state.publication.sync_bridges(&mut ticker).await?;

    Ok(success(BridgeSyncResponse {
        ticker: PublicTicker::from(&ticker),
        bridges: state.bridges.names().into_iter().map(String::from).collect(),
    }))
}

/// 권한을 확인한 뒤 티커를 불러옵니다.
async fn load_ticker(state: &AppState, auth: &JwtAuth, ticker_id: i64) -> ApiResult<Ticker> {
    auth.require_ticker(ticker_id)?;

    state
        .storage
        .find_ticker_by_id(ticker_id, FindOptions::none().with_websites())
        .await
        .map_err(|e| {
            if !e.is_not_found() {
                warn!(ticker_id, error = %e, "Failed to load ticker");
            }
            ApiError::ticker_not_found()
        })
}

/// 관리 라우터.
pub fn admin_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/login", post(login))
        .route(
            "/tickers/{id}/messages",
            get(list_messages).post(create_message),
        )
        .route("/tickers/{id}/messages/{message_id}", delete(delete_message))
        .route("/tickers/{id}/bridges/sync", post(sync_bridges))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_message_validation() {
        let ok = CreateMessageRequest {
            text: "hi".to_string(),
            attachments: Vec::new(),
        };
        assert!(ok.validate().is_ok());

        let empty = CreateMessageRequest {
            text: String::new(),
            attachments: Vec::new(),
        };
        assert!(empty.validate().is_err());

        let long = CreateMessageRequest {
            text: "x".repeat(4097),
            attachments: Vec::new(),
        };
        assert!(long.validate().is_err());
    }

    #[test]
    fn test_login_validation() {
        let request = LoginRequest {
            email: "not-an-email".to_string(),
            password: "secret".to_string(),
        };
        assert!(request.validate().is_err());
    }
}
