use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use rand::Rng;
use rand::distributions::Alphanumeric;
use sea_orm::{ActiveValue, DatabaseConnection, Set};
use serde::{Deserialize, Serialize};
use tokendesk_core::TokenPermissions;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::api_tokens::{self, Model as TokenModel};
use crate::db::token_ops;
use crate::error::AppError;

pub(crate) const API_TOKEN_TYPE: &str = "api_token";
pub(crate) const DEFAULT_TOKEN_LENGTH: i32 = 32;
pub(crate) const MIN_TOKEN_LENGTH: i32 = 16;
pub(crate) const MAX_TOKEN_LENGTH: i32 = 256;

/// API Token 的 JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ApiTokenClaims {
    pub sub: String, // Owner user ID
    pub jti: String, // 随机串, 长度为 token_length
    pub iat: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,
    pub typ: String,
}

/// 表单绑定后的 token, 尚未写入数据库
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct TokenDraft {
    pub user_id: Option<Uuid>,
    pub name: String,
    pub token_length: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub permissions: TokenPermissions,
}

fn random_nonce(length: i32) -> String {
    let length = length.clamp(MIN_TOKEN_LENGTH, MAX_TOKEN_LENGTH) as usize;
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

/// 生成 API Token (HS256)
pub(crate) fn generate_api_token(
    secret: &str,
    owner: Uuid,
    token_length: i32,
    expires_at: Option<DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Result<String, AppError> {
    let claims = ApiTokenClaims {
        sub: owner.to_string(),
        jti: random_nonce(token_length),
        iat: now.timestamp(),
        exp: expires_at.map(|at| at.timestamp()),
        typ: API_TOKEN_TYPE.to_string(),
    };

    encode(
        &Header::new(jsonwebtoken::Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(secret.as_ref()),
    )
    .map_err(|e| {
        error!("Failed to encode API token: {}", e);
        AppError::TokenError("Failed to generate token".to_string())
    })
}

/// 校验签名与类型; 是否启用/过期以数据库记录为准
pub(crate) fn verify_api_token(secret: &str, token: &str) -> Result<ApiTokenClaims, AppError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.set_required_spec_claims(&["sub"]);
    // exp 只是签发时的快照, 编辑后的过期时间在 expires_at 列
    validation.validate_exp = false;

    let token_data = decode::<ApiTokenClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|e| {
        warn!("API token verification failed: {}", e);
        AppError::AuthError("Invalid API token".to_string())
    })?;

    if token_data.claims.typ != API_TOKEN_TYPE {
        return Err(AppError::AuthError("Invalid token type".to_string()));
    }

    Ok(token_data.claims)
}

/// 模型保存路径: 新建时生成 token, 之后的编辑保留原值
pub(crate) async fn save_token(
    db: &DatabaseConnection,
    secret: &str,
    draft: TokenDraft,
    existing: Option<TokenModel>,
) -> Result<TokenModel, AppError> {
    let now = Utc::now();
    let user_id = draft
        .user_id
        .ok_or_else(|| AppError::DatabaseError("API token must belong to a user".to_string()))?;

    let needs_token = existing
        .as_ref()
        .is_none_or(|current| current.token_value().is_none());
    let mut active_model = match existing {
        Some(current) => current.into(),
        None => api_tokens::ActiveModel {
            id: ActiveValue::NotSet,
            last_used: Set(None),
            created_at: Set(now),
            ..Default::default()
        },
    };

    active_model.user_id = Set(user_id);
    active_model.name = Set(draft.name);
    active_model.token_length = Set(draft.token_length);
    active_model.is_active = Set(draft.is_active);
    active_model.expires_at = Set(draft.expires_at);
    active_model.can_read_products = Set(draft.permissions.can_read_products);
    active_model.can_manage_cart = Set(draft.permissions.can_manage_cart);
    active_model.can_place_orders = Set(draft.permissions.can_place_orders);
    active_model.can_manage_wishlist = Set(draft.permissions.can_manage_wishlist);
    active_model.updated_at = Set(now);

    if needs_token {
        let token =
            generate_api_token(secret, user_id, draft.token_length, draft.expires_at, now)?;
        active_model.token = Set(Some(token));
    }

    let saved = if active_model.id.is_not_set() {
        token_ops::insert_token(db, active_model).await?
    } else {
        token_ops::update_token(db, active_model).await?
    };

    if needs_token {
        info!(token_id = saved.id, user_id = %user_id, "generated api token");
    }
    Ok(saved)
}
