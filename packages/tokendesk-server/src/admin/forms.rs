use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;
use std::collections::BTreeMap;
use tokendesk_core::{Capability, TokenPermissions};
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::db::api_tokens::Model as TokenModel;
use crate::services::tokens::{DEFAULT_TOKEN_LENGTH, TokenDraft};

pub(crate) const MAX_NAME_LEN: usize = 100;
const DATETIME_INPUT_FORMAT: &str = "%Y-%m-%dT%H:%M";

/// 字段名 -> 错误信息
pub(crate) type FormErrors = BTreeMap<&'static str, String>;

/// Change form as posted by the browser. Checkboxes are present only when
/// ticked; read-only fields are not part of the form and are never accepted.
#[derive(Debug, Clone, Default, Deserialize)]
pub(crate) struct TokenForm {
    #[serde(default)]
    pub user: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub token_length: String,
    pub is_active: Option<String>,
    #[serde(default)]
    pub expires_at: String,
    pub can_read_products: Option<String>,
    pub can_manage_cart: Option<String>,
    pub can_place_orders: Option<String>,
    pub can_manage_wishlist: Option<String>,
}

/// Typed values checked by the field validators.
#[derive(Debug, Validate)]
struct CleanedFields {
    #[validate(
        required(message = "This field is required."),
        length(max = 100, message = "Ensure this value has at most 100 characters.")
    )]
    name: Option<String>,
    #[validate(range(min = 16, max = 256, message = "Ensure this value is between 16 and 256."))]
    token_length: i32,
}

/// 校验错误 -> 表单错误; 每个字段只保留第一条
fn collect_errors(validation_errors: &ValidationErrors, errors: &mut FormErrors) {
    let field_errors = validation_errors.field_errors();
    for field in ["name", "token_length"] {
        let message = field_errors
            .get(field)
            .and_then(|list| list.first())
            .map(|error| match error.message.as_ref() {
                Some(message) => message.to_string(),
                None => format!("Invalid value ({}).", error.code),
            });
        if let Some(message) = message {
            errors.entry(field).or_insert(message);
        }
    }
}

fn checked(value: bool) -> Option<String> {
    value.then(|| "on".to_string())
}

impl TokenForm {
    /// Initial values of the add form.
    pub(crate) fn initial() -> Self {
        let permissions = TokenPermissions::default();
        Self {
            token_length: DEFAULT_TOKEN_LENGTH.to_string(),
            is_active: checked(true),
            can_read_products: checked(permissions.can_read_products),
            can_manage_cart: checked(permissions.can_manage_cart),
            can_place_orders: checked(permissions.can_place_orders),
            can_manage_wishlist: checked(permissions.can_manage_wishlist),
            ..Default::default()
        }
    }

    pub(crate) fn from_model(token: &TokenModel) -> Self {
        Self {
            user: token.user_id.to_string(),
            name: token.name.clone(),
            token_length: token.token_length.to_string(),
            is_active: checked(token.is_active),
            expires_at: token
                .expires_at
                .map(|at| at.format(DATETIME_INPUT_FORMAT).to_string())
                .unwrap_or_default(),
            can_read_products: checked(token.can_read_products),
            can_manage_cart: checked(token.can_manage_cart),
            can_place_orders: checked(token.can_place_orders),
            can_manage_wishlist: checked(token.can_manage_wishlist),
        }
    }

    fn permission(&self, capability: Capability) -> &Option<String> {
        match capability {
            Capability::ReadProducts => &self.can_read_products,
            Capability::ManageCart => &self.can_manage_cart,
            Capability::PlaceOrders => &self.can_place_orders,
            Capability::ManageWishlist => &self.can_manage_wishlist,
        }
    }

    pub(crate) fn is_checked(&self, field: &str) -> bool {
        if field == "is_active" {
            return self.is_active.is_some();
        }
        Capability::ALL
            .into_iter()
            .find(|capability| capability.field_name() == field)
            .is_some_and(|capability| self.permission(capability).is_some())
    }

    pub(crate) fn validate(&self) -> Result<TokenDraft, FormErrors> {
        let mut errors = FormErrors::new();

        let user_id = match self.user.trim() {
            "" => None,
            raw => match Uuid::parse_str(raw) {
                Ok(id) => Some(id),
                Err(_) => {
                    errors.insert("user", "Select a valid choice.".to_string());
                    None
                }
            },
        };

        let name = self.name.trim().to_string();
        let token_length = match self.token_length.trim() {
            "" => {
                errors.insert("token_length", "This field is required.".to_string());
                DEFAULT_TOKEN_LENGTH
            }
            raw => raw.parse::<i32>().unwrap_or_else(|_| {
                errors.insert("token_length", "Enter a whole number.".to_string());
                DEFAULT_TOKEN_LENGTH
            }),
        };
        let cleaned = CleanedFields {
            name: (!name.is_empty()).then_some(name),
            token_length,
        };
        if let Err(validation_errors) = cleaned.validate() {
            collect_errors(&validation_errors, &mut errors);
        }

        let expires_at = match parse_datetime(self.expires_at.trim()) {
            Ok(at) => at,
            Err(()) => {
                errors.insert("expires_at", "Enter a valid date/time.".to_string());
                None
            }
        };

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(TokenDraft {
            user_id,
            name: cleaned.name.unwrap_or_default(),
            token_length: cleaned.token_length,
            is_active: self.is_active.is_some(),
            expires_at,
            permissions: TokenPermissions {
                can_read_products: self.permission(Capability::ReadProducts).is_some(),
                can_manage_cart: self.permission(Capability::ManageCart).is_some(),
                can_place_orders: self.permission(Capability::PlaceOrders).is_some(),
                can_manage_wishlist: self.permission(Capability::ManageWishlist).is_some(),
            },
        })
    }
}

/// `datetime-local` value, with or without seconds, read as UTC.
fn parse_datetime(raw: &str) -> Result<Option<DateTime<Utc>>, ()> {
    if raw.is_empty() {
        return Ok(None);
    }
    NaiveDateTime::parse_from_str(raw, DATETIME_INPUT_FORMAT)
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S"))
        .map(|naive| Some(naive.and_utc()))
        .map_err(|_| ())
}
