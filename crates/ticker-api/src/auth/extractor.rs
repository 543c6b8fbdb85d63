//! Axum용 JWT 인증 추출기.

use std::sync::Arc;

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use ticker_core::{FindOptions, User};
use tracing::debug;

use super::jwt::decode_token;
use crate::error::ApiError;
use crate::state::AppState;

/// 인증된 관리자.
///
/// `Authorization: Bearer <token>`을 검증하고 담당 티커 목록과 함께 사용자를
/// 불러옵니다.
///
/// ```rust,ignore
/// async fn protected_handler(JwtAuth(user): JwtAuth) -> impl IntoResponse {
///     format!("Hello, {}!", user.email)
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JwtAuth(pub User);

impl JwtAuth {
    /// 사용자가 티커를 편집할 수 있어야 합니다.
    pub fn require_ticker(&self, ticker_id: i64) -> Result<(), ApiError> {
        if self.0.can_edit(ticker_id) {
            Ok(())
        } else {
            Err(ApiError::insufficient_permissions())
        }
    }
}

impl FromRequestParts<Arc<AppState>> for JwtAuth {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(ApiError::unauthorized)?;

        let claims = decode_token(token, &state.config.auth.jwt_secret)
            .map_err(|e| {
                debug!(error = %e, "Rejected token");
                ApiError::unauthorized()
            })?
            .claims;
        let user_id = claims.user_id().ok_or_else(ApiError::unauthorized)?;

        let user = state
            .storage
            .find_user_by_id(user_id, FindOptions::none().with_tickers())
            .await
            .map_err(|e| {
                debug!(user_id, error = %e, "Token user not found");
                ApiError::unauthorized()
            })?;

        Ok(JwtAuth(user))
    }
}
