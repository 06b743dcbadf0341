use chrono::Utc;
use sea_orm::entity::prelude::*;
use tokendesk_core::TokenPermissions;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "api_tokens")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub user_id: Uuid,
    pub name: String,
    pub token: Option<String>,
    pub token_length: i32,
    pub is_active: bool,
    pub expires_at: Option<chrono::DateTime<Utc>>,
    pub last_used: Option<chrono::DateTime<Utc>>,
    pub created_at: chrono::DateTime<Utc>,
    pub updated_at: chrono::DateTime<Utc>,
    pub can_read_products: bool,
    pub can_manage_cart: bool,
    pub can_place_orders: bool,
    pub can_manage_wishlist: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::users::Entity",
        from = "Column::UserId",
        to = "super::users::Column::Id",
        on_delete = "Cascade"
    )]
    User,
}

impl Related<super::users::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::User.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

impl Model {
    /// Token 值, 空字符串视为未生成
    pub fn token_value(&self) -> Option<&str> {
        self.token.as_deref().filter(|value| !value.is_empty())
    }

    pub fn permissions(&self) -> TokenPermissions {
        TokenPermissions {
            can_read_products: self.can_read_products,
            can_manage_cart: self.can_manage_cart,
            can_place_orders: self.can_place_orders,
            can_manage_wishlist: self.can_manage_wishlist,
        }
    }

    pub fn is_expired(&self, now: chrono::DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    /// 可用于 API 认证: 已生成、启用且未过期
    pub fn is_usable(&self, now: chrono::DateTime<Utc>) -> bool {
        self.token_value().is_some() && self.is_active && !self.is_expired(now)
    }
}
