use axum::{Extension, Json, Router, extract::Path, middleware, routing::get};
use std::sync::Arc;
use tokendesk_core::{ApiResponse, Capability, TokenIntrospection};

use crate::error::AppError;
use crate::services::auth::api_token::{ApiPrincipal, api_token_middleware};
use crate::state::AppState;

/// 挂载在 `/api` 下, 需要 API Token
pub(crate) fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/token/introspect", get(introspect))
        .route("/token/capabilities/{capability}", get(check_capability))
        .route_layer(middleware::from_fn_with_state(state, api_token_middleware))
}

/// 返回当前 Token 的归属和能力范围
async fn introspect(
    Extension(principal): Extension<ApiPrincipal>,
) -> Json<ApiResponse<TokenIntrospection>> {
    let token = principal.token;
    Json(ApiResponse::ok(TokenIntrospection {
        token_id: token.id,
        name: token.name.clone(),
        user_id: token.user_id,
        expires_at: token.expires_at,
        capabilities: token.permissions().capabilities(),
    }))
}

/// 403 when the token lacks the capability
async fn check_capability(
    Extension(principal): Extension<ApiPrincipal>,
    Path(capability): Path<Capability>,
) -> Result<Json<ApiResponse<Capability>>, AppError> {
    principal.require(capability)?;
    Ok(Json(ApiResponse::ok(capability)))
}
