use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// API 能力范围
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    ReadProducts,
    ManageCart,
    PlaceOrders,
    ManageWishlist,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::ReadProducts,
        Capability::ManageCart,
        Capability::PlaceOrders,
        Capability::ManageWishlist,
    ];

    /// Column name of the flag backing this capability.
    pub fn field_name(self) -> &'static str {
        match self {
            Capability::ReadProducts => "can_read_products",
            Capability::ManageCart => "can_manage_cart",
            Capability::PlaceOrders => "can_place_orders",
            Capability::ManageWishlist => "can_manage_wishlist",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Capability::ReadProducts => "read_products",
            Capability::ManageCart => "manage_cart",
            Capability::PlaceOrders => "place_orders",
            Capability::ManageWishlist => "manage_wishlist",
        };
        f.write_str(text)
    }
}

/// Token 权限标记
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPermissions {
    pub can_read_products: bool,
    pub can_manage_cart: bool,
    pub can_place_orders: bool,
    pub can_manage_wishlist: bool,
}

impl Default for TokenPermissions {
    fn default() -> Self {
        Self {
            can_read_products: true,
            can_manage_cart: false,
            can_place_orders: false,
            can_manage_wishlist: false,
        }
    }
}

impl TokenPermissions {
    pub fn allows(&self, capability: Capability) -> bool {
        match capability {
            Capability::ReadProducts => self.can_read_products,
            Capability::ManageCart => self.can_manage_cart,
            Capability::PlaceOrders => self.can_place_orders,
            Capability::ManageWishlist => self.can_manage_wishlist,
        }
    }

    pub fn capabilities(&self) -> Vec<Capability> {
        Capability::ALL
            .into_iter()
            .filter(|capability| self.allows(*capability))
            .collect()
    }
}

/// Token 列表项 (changelist 的 JSON 形式)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenItem {
    pub id: i32,
    pub name: String,
    pub user_id: Uuid,
    pub username: Option<String>,
    pub token_length: i32,
    pub is_active: bool,
    pub expires_at: Option<DateTime<Utc>>,
    pub last_used: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub short_token: String,
    pub permissions: TokenPermissions,
}

/// 分页信息
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageMeta {
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub num_pages: u64,
}

/// Token 自省响应
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenIntrospection {
    pub token_id: i32,
    pub name: String,
    pub user_id: Uuid,
    pub expires_at: Option<DateTime<Utc>>,
    pub capabilities: Vec<Capability>,
}

/// API 响应结构
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub status: String,
    pub data: T,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<PageMeta>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            status: "ok".to_string(),
            data,
            meta: None,
        }
    }

    pub fn with_meta(mut self, meta: PageMeta) -> Self {
        self.meta = Some(meta);
        self
    }
}
