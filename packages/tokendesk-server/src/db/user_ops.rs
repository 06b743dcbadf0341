use crate::db::users::{self, Entity as Users, Model as UserModel, UserRole};
use crate::error::AppError;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use uuid::Uuid;

pub async fn create_user(
    db: &DatabaseConnection,
    username: &str,
    email: &str,
    password_hash: &str,
    role: UserRole,
) -> Result<UserModel, AppError> {
    let now = Utc::now();
    let new_user = users::ActiveModel {
        id: Set(Uuid::new_v4()),
        username: Set(username.to_string()),
        password_hash: Set(password_hash.to_string()),
        email: Set(email.to_string()),
        role: Set(role),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_user
        .insert(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to create user: {e}")))
}

pub async fn find_user_by_username(
    db: &DatabaseConnection,
    username: &str,
) -> Result<Option<UserModel>, AppError> {
    Users::find()
        .filter(users::Column::Username.eq(username))
        .one(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to find user: {e}")))
}

pub async fn find_user_by_id(
    db: &DatabaseConnection,
    user_id: Uuid,
) -> Result<Option<UserModel>, AppError> {
    Users::find_by_id(user_id)
        .one(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to find user: {e}")))
}

/// 用于 token 表单的 owner 下拉框
pub async fn list_users(db: &DatabaseConnection) -> Result<Vec<UserModel>, AppError> {
    Users::find()
        .order_by_asc(users::Column::Username)
        .all(db)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to list users: {e}")))
}
