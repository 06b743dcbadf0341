use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Redirect};
use sea_orm::DbErr;
use thiserror::Error;
use tracing::{error, warn};

#[derive(Debug, Error)]
pub(crate) enum AppError {
    #[error("Database error: {0}")]
    Db(#[from] DbErr),
    #[error("Database operation error: {0}")]
    DatabaseError(String),
    #[error("Authentication error: {0}")]
    AuthError(String),
    /// 后台页面未登录, 跳转到登录页
    #[error("Login required")]
    LoginRequired,
    #[error("Permission denied: {0}")]
    Forbidden(String),
    #[error("Not found: {0}")]
    NotFound(String),
    #[error("Token error: {0}")]
    TokenError(String),
    #[error("Template error: {0}")]
    TemplateError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> axum::response::Response {
        let (status, message) = match self {
            AppError::Db(err) => {
                error!(error = %err, "database error");
                (StatusCode::INTERNAL_SERVER_ERROR, "database error".to_string())
            }
            AppError::DatabaseError(msg) => {
                error!(error = %msg, "database operation error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::AuthError(msg) => {
                warn!(error = %msg, "authentication error");
                (StatusCode::UNAUTHORIZED, msg)
            }
            AppError::LoginRequired => {
                return Redirect::to("/admin/login").into_response();
            }
            AppError::Forbidden(msg) => {
                warn!(error = %msg, "permission denied");
                (StatusCode::FORBIDDEN, msg)
            }
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            AppError::TokenError(msg) => {
                error!(error = %msg, "token error");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
            AppError::TemplateError(msg) => {
                error!(error = %msg, "template error");
                (StatusCode::INTERNAL_SERVER_ERROR, "template error".to_string())
            }
        };
        (status, Json(serde_json::json!({ "error": message }))).into_response()
    }
}
