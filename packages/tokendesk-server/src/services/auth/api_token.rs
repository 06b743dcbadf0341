use axum::{
    extract::{Request, State},
    http::HeaderMap,
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use std::sync::Arc;
use tokendesk_core::Capability;
use tracing::debug;

use crate::db::api_tokens::Model as TokenModel;
use crate::db::token_ops;
use crate::error::AppError;
use crate::services::tokens;
use crate::state::AppState;

/// 已认证的 API 调用方
#[derive(Debug, Clone)]
pub struct ApiPrincipal {
    pub token: TokenModel,
}

impl ApiPrincipal {
    pub fn require(&self, capability: Capability) -> Result<(), AppError> {
        if self.token.permissions().allows(capability) {
            Ok(())
        } else {
            Err(AppError::Forbidden(format!(
                "Token is not allowed to {capability}"
            )))
        }
    }
}

/// 从请求头中提取 Bearer Token
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, AppError> {
    let auth_header = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .ok_or_else(|| AppError::AuthError("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_string())
        .ok_or_else(|| AppError::AuthError("Invalid authorization header format".to_string()))
}

/// 校验 API Token 并返回数据库记录
pub async fn authenticate_api_token(state: &AppState, token: &str) -> Result<TokenModel, AppError> {
    tokens::verify_api_token(&state.config.jwt_secret, token)?;

    let record = token_ops::find_token_by_value(&state.db, token)
        .await?
        .ok_or_else(|| AppError::AuthError("Token not found".to_string()))?;

    if !record.is_usable(Utc::now()) {
        return Err(AppError::AuthError(
            "Token inactive or expired".to_string(),
        ));
    }

    // 更新最后使用时间
    token_ops::touch_last_used(&state.db, record).await
}

/// API Token 授权中间件
pub async fn api_token_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = extract_bearer_token(request.headers())?;
    let record = authenticate_api_token(&state, &token).await?;
    debug!(token_id = record.id, "api token accepted");

    request
        .extensions_mut()
        .insert(ApiPrincipal { token: record });
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use crate::services::tokens::TokenDraft;
    use axum::http::HeaderValue;
    use chrono::Duration;
    use sea_orm::{ActiveModelTrait, Set};
    use tokendesk_core::TokenPermissions;

    #[test]
    fn bearer_header_is_required() {
        let mut headers = HeaderMap::new();
        assert!(extract_bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Token abc"));
        assert!(extract_bearer_token(&headers).is_err());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        assert_eq!(extract_bearer_token(&headers).unwrap(), "abc");
    }

    #[tokio::test]
    async fn accepts_active_token_and_records_use() {
        let state = testing::state().await;
        let owner = testing::user(&state.db, "gina", "gina@shop.test", false).await;
        let token = testing::token(&state.db, &owner, "mobile").await;
        let value = token.token.clone().unwrap();

        let record = authenticate_api_token(&state, &value).await.unwrap();
        assert_eq!(record.id, token.id);
        assert!(record.last_used.is_some());

        let principal = ApiPrincipal { token: record };
        assert!(principal.require(Capability::ReadProducts).is_ok());
        assert!(matches!(
            principal.require(Capability::PlaceOrders),
            Err(AppError::Forbidden(_))
        ));
    }

    #[tokio::test]
    async fn rejects_inactive_and_unknown_tokens() {
        let state = testing::state().await;
        let owner = testing::user(&state.db, "hank", "hank@shop.test", false).await;
        let token = testing::token(&state.db, &owner, "disabled").await;
        let value = token.token.clone().unwrap();

        let mut model: crate::db::api_tokens::ActiveModel = token.into();
        model.is_active = Set(false);
        model.update(&state.db).await.unwrap();
        assert!(matches!(
            authenticate_api_token(&state, &value).await,
            Err(AppError::AuthError(_))
        ));

        let stranger = tokens::generate_api_token(
            testing::SECRET,
            owner.id,
            32,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(authenticate_api_token(&state, &stranger).await.is_err());
    }

    #[tokio::test]
    async fn extending_expiry_revives_existing_token() {
        let state = testing::state().await;
        let owner = testing::user(&state.db, "iris", "iris@shop.test", false).await;
        let mut draft = TokenDraft {
            user_id: Some(owner.id),
            name: "nightly export".to_string(),
            token_length: 32,
            is_active: true,
            expires_at: Some(Utc::now() - Duration::hours(3)),
            permissions: TokenPermissions::default(),
        };
        let expired = tokens::save_token(&state.db, testing::SECRET, draft.clone(), None)
            .await
            .unwrap();
        let value = expired.token.clone().unwrap();
        assert!(matches!(
            authenticate_api_token(&state, &value).await,
            Err(AppError::AuthError(_))
        ));

        // 令牌字符串不变, 只改数据库里的过期时间
        draft.expires_at = Some(Utc::now() + Duration::days(30));
        let extended = tokens::save_token(&state.db, testing::SECRET, draft, Some(expired))
            .await
            .unwrap();
        assert_eq!(extended.token.as_deref(), Some(value.as_str()));

        let record = authenticate_api_token(&state, &value).await.unwrap();
        assert_eq!(record.id, extended.id);
    }
}
