use axum::{
    extract::{Request, State},
    http::HeaderMap,
    http::header::{AUTHORIZATION, COOKIE},
    middleware::Next,
    response::Response,
};
use bcrypt::{DEFAULT_COST, hash, verify};
use chrono::{DateTime, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use sea_orm::DatabaseConnection;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::db::user_ops;
use crate::db::users::{Model as UserModel, UserRole};
use crate::error::AppError;
use crate::state::AppState;

pub(crate) const SESSION_COOKIE: &str = "tokendesk_session";
const SESSION_TOKEN_TYPE: &str = "staff_session";

/// 后台登录表单
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// 后台会话 JWT Claims
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SessionClaims {
    pub sub: String,        // User ID
    pub username: String,   // Username
    pub role: UserRole,     // User role
    pub iat: i64,           // 签发时间
    pub exp: i64,           // 过期时间
    pub jti: String,        // JWT ID
    pub token_type: String, // staff_session
}

/// 哈希密码
pub fn hash_password(password: &str) -> Result<String, AppError> {
    hash(password, DEFAULT_COST).map_err(|e| {
        error!("Failed to hash password: {}", e);
        AppError::AuthError("Failed to process password".to_string())
    })
}

/// 验证密码
pub fn verify_password(password: &str, hash: &str) -> Result<bool, AppError> {
    verify(password, hash).map_err(|e| {
        error!("Failed to verify password: {}", e);
        AppError::AuthError("Failed to verify password".to_string())
    })
}

/// 创建账号 (命令行初始化用)
pub async fn create_account(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    staff: bool,
) -> Result<UserModel, AppError> {
    if user_ops::find_user_by_username(db, username).await?.is_some() {
        return Err(AppError::AuthError("Username already exists".to_string()));
    }
    let password_hash = hash_password(password)?;
    let role = if staff { UserRole::Admin } else { UserRole::User };
    let user = user_ops::create_user(db, username, email, &password_hash, role).await?;
    info!(username = %user.username, staff, "account created");
    Ok(user)
}

/// 校验用户名密码, 只有 staff 可以登录后台
pub async fn authenticate(
    db: &DatabaseConnection,
    username: &str,
    password: &str,
) -> Result<UserModel, AppError> {
    let user = user_ops::find_user_by_username(db, username)
        .await?
        .ok_or_else(|| AppError::AuthError("Invalid username or password".to_string()))?;

    if !verify_password(password, &user.password_hash)? {
        return Err(AppError::AuthError(
            "Invalid username or password".to_string(),
        ));
    }
    if !user.is_staff() {
        return Err(AppError::Forbidden(
            "Staff account required".to_string(),
        ));
    }

    info!("Staff logged in: {}", user.username);
    Ok(user)
}

/// 创建后台会话 token
pub fn create_session_token(
    user: &UserModel,
    secret: &str,
    hours: i64,
) -> Result<(String, DateTime<Utc>), AppError> {
    let now = Utc::now();
    let expires_at = now + chrono::Duration::hours(hours);

    let claims = SessionClaims {
        sub: user.id.to_string(),
        username: user.username.clone(),
        role: user.role.clone(),
        iat: now.timestamp(),
        exp: expires_at.timestamp(),
        jti: Uuid::new_v4().to_string(),
        token_type: SESSION_TOKEN_TYPE.to_string(),
    };

    let header = Header::new(jsonwebtoken::Algorithm::HS256);
    let token = encode(&header, &claims, &EncodingKey::from_secret(secret.as_ref())).map_err(
        |e| {
            error!("Failed to encode session JWT: {}", e);
            AppError::AuthError("Failed to create session".to_string())
        },
    )?;

    Ok((token, expires_at))
}

/// 验证后台会话 token
pub fn verify_session_token(secret: &str, token: &str) -> Result<SessionClaims, AppError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.leeway = 60;

    let token_data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &validation,
    )
    .map_err(|e| {
        warn!("Session JWT verification failed: {}", e);
        AppError::AuthError("Invalid session".to_string())
    })?;

    if token_data.claims.token_type != SESSION_TOKEN_TYPE {
        return Err(AppError::AuthError("Invalid token type".to_string()));
    }

    Ok(token_data.claims)
}

/// `Authorization: Bearer` 优先, 其次是会话 cookie
pub fn extract_session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(token) = headers
        .get(AUTHORIZATION)
        .and_then(|header| header.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
    {
        return Some(token.trim().to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|header| header.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, value)| value.to_string())
}

pub fn session_cookie(token: &str, hours: i64) -> String {
    format!(
        "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Strict; Max-Age={}",
        hours * 3600
    )
}

pub fn clear_session_cookie() -> String {
    format!("{SESSION_COOKIE}=; Path=/; HttpOnly; SameSite=Strict; Max-Age=0")
}

/// 当前请求的 staff 用户
pub async fn resolve_staff(state: &AppState, headers: &HeaderMap) -> Result<UserModel, AppError> {
    let token = extract_session_token(headers)
        .ok_or_else(|| AppError::AuthError("Missing session".to_string()))?;
    let claims = verify_session_token(&state.config.jwt_secret, &token)?;

    let user_id: Uuid = claims
        .sub
        .parse()
        .map_err(|_| AppError::AuthError("Invalid user ID".to_string()))?;
    let user = user_ops::find_user_by_id(&state.db, user_id)
        .await?
        .ok_or_else(|| AppError::AuthError("User not found".to_string()))?;

    // 角色可能在会话期间被撤销
    if !user.is_staff() {
        return Err(AppError::Forbidden("Staff account required".to_string()));
    }
    Ok(user)
}

/// 后台页面中间件: 未登录时跳转到登录页
pub async fn staff_page_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = match resolve_staff(&state, request.headers()).await {
        Ok(user) => user,
        Err(AppError::AuthError(_)) => return Err(AppError::LoginRequired),
        Err(err) => return Err(err),
    };
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

/// 后台 JSON 接口中间件
pub async fn staff_api_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let user = resolve_staff(&state, request.headers()).await?;
    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;
    use axum::http::HeaderValue;

    #[test]
    fn extracts_bearer_before_cookie() {
        let mut headers = HeaderMap::new();
        headers.insert(COOKIE, HeaderValue::from_static("theme=dark; tokendesk_session=abc"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc"));

        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(extract_session_token(&headers).as_deref(), Some("xyz"));
    }

    #[test]
    fn missing_or_foreign_credentials() {
        let mut headers = HeaderMap::new();
        assert!(extract_session_token(&headers).is_none());
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic dXNlcjpwYXNz"));
        headers.insert(COOKIE, HeaderValue::from_static("other=1"));
        assert!(extract_session_token(&headers).is_none());
    }

    #[test]
    fn cookie_attributes() {
        let cookie = session_cookie("abc", 2);
        assert!(cookie.starts_with("tokendesk_session=abc;"));
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("Max-Age=7200"));
        assert!(clear_session_cookie().contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn session_round_trip_and_type_check() {
        let state = testing::state().await;
        let admin = testing::user(&state.db, "root", "root@shop.test", true).await;
        let (token, _) = create_session_token(&admin, testing::SECRET, 1).unwrap();
        let claims = verify_session_token(testing::SECRET, &token).unwrap();
        assert_eq!(claims.sub, admin.id.to_string());

        // API token 不能当作会话使用
        let api_token = crate::services::tokens::generate_api_token(
            testing::SECRET,
            admin.id,
            32,
            None,
            Utc::now(),
        )
        .unwrap();
        assert!(verify_session_token(testing::SECRET, &api_token).is_err());
    }

    #[tokio::test]
    async fn only_staff_can_authenticate() {
        let state = testing::state().await;
        create_account(&state.db, "boss", "boss@shop.test", "s3cret-pass", true)
            .await
            .unwrap();
        create_account(&state.db, "shopper", "shopper@shop.test", "s3cret-pass", false)
            .await
            .unwrap();

        assert!(authenticate(&state.db, "boss", "s3cret-pass").await.is_ok());
        assert!(matches!(
            authenticate(&state.db, "boss", "wrong").await,
            Err(AppError::AuthError(_))
        ));
        assert!(matches!(
            authenticate(&state.db, "shopper", "s3cret-pass").await,
            Err(AppError::Forbidden(_))
        ));
        assert!(create_account(&state.db, "boss", "x@shop.test", "pw", true).await.is_err());
    }
}
