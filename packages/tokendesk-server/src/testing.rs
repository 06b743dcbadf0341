//! Shared fixtures for the in-crate tests.

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use std::sync::Arc;
use tokendesk_core::TokenPermissions;

use crate::admin::templates::AdminTemplates;
use crate::bootstrap::config::AppConfig;
use crate::db::api_tokens::Model as TokenModel;
use crate::db::users::{Model as UserModel, UserRole};
use crate::db::{initialize, user_ops};
use crate::services::tokens::{self, TokenDraft};
use crate::state::AppState;

pub(crate) const SECRET: &str = "test_secret_that_is_at_least_32_chars";

/// 内存 SQLite; 单连接, 否则每个连接各有一个数据库
pub(crate) async fn state() -> Arc<AppState> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options.max_connections(1).min_connections(1);
    let db = Database::connect(options).await.unwrap();
    initialize::initial(&db).await.unwrap();

    let config = AppConfig {
        addr: "127.0.0.1:0".parse().unwrap(),
        db_url: "sqlite::memory:".to_string(),
        jwt_secret: SECRET.to_string(),
        session_hours: 1,
    };
    Arc::new(AppState {
        db,
        config,
        templates: AdminTemplates::new().unwrap(),
    })
}

/// 测试用户; 不走 bcrypt, 需要登录的测试请用 `create_account`
pub(crate) async fn user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    staff: bool,
) -> UserModel {
    let role = if staff { UserRole::Admin } else { UserRole::User };
    user_ops::create_user(db, username, email, "!", role)
        .await
        .unwrap()
}

pub(crate) async fn token(db: &DatabaseConnection, owner: &UserModel, name: &str) -> TokenModel {
    let draft = TokenDraft {
        user_id: Some(owner.id),
        name: name.to_string(),
        token_length: 32,
        is_active: true,
        expires_at: None,
        permissions: TokenPermissions::default(),
    };
    tokens::save_token(db, SECRET, draft, None).await.unwrap()
}
