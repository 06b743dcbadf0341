//! Declarative admin registration for API tokens.
//!
//! Views read everything about which columns to show, filter and search, and
//! how the change form is grouped, from the [`ModelAdmin`] implementation.

/// A named group of fields on the change form.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Fieldset {
    pub title: &'static str,
    pub fields: &'static [&'static str],
    pub classes: &'static [&'static str],
    pub description: Option<&'static str>,
}

impl Fieldset {
    pub(crate) fn is_collapsed(&self) -> bool {
        self.classes.contains(&"collapse")
    }
}

/// How a model is listed and edited in the admin.
pub(crate) trait ModelAdmin {
    fn model_name(&self) -> &'static str;

    /// Plural name used in headings and counters.
    fn verbose_name_plural(&self) -> &'static str;

    fn list_display(&self) -> &'static [&'static str];

    fn list_filter(&self) -> &'static [&'static str] {
        &[]
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn readonly_fields(&self) -> &'static [&'static str] {
        &[]
    }

    fn fieldsets(&self) -> &'static [Fieldset];

    /// Columns that can be sorted from the changelist header.
    fn sortable_fields(&self) -> &'static [&'static str] {
        &[]
    }

    /// Default ordering, `-` prefix for descending.
    fn ordering(&self) -> &'static str {
        "-id"
    }

    fn list_per_page(&self) -> u64 {
        100
    }

    /// Column heading or form label for a field.
    fn label_for(&self, field: &str) -> String {
        humanize(field)
    }

    fn is_readonly(&self, field: &str) -> bool {
        self.readonly_fields().contains(&field)
    }
}

/// `token_length` -> `Token length`
pub(crate) fn humanize(field: &str) -> String {
    let spaced = field.replace('_', " ");
    let mut chars = spaced.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub(crate) struct ApiTokenAdmin;

impl ModelAdmin for ApiTokenAdmin {
    fn model_name(&self) -> &'static str {
        "api token"
    }

    fn verbose_name_plural(&self) -> &'static str {
        "API tokens"
    }

    fn list_display(&self) -> &'static [&'static str] {
        &[
            "name",
            "user",
            "token_length",
            "is_active",
            "expires_at",
            "last_used",
            "created_at",
            "short_token",
            "copy_token_button",
        ]
    }

    fn list_filter(&self) -> &'static [&'static str] {
        &["is_active", "expires_at", "created_at"]
    }

    fn search_fields(&self) -> &'static [&'static str] {
        &["user__username", "user__email", "name"]
    }

    fn readonly_fields(&self) -> &'static [&'static str] {
        &["copy_token_button", "created_at", "updated_at", "last_used"]
    }

    fn fieldsets(&self) -> &'static [Fieldset] {
        &[
            Fieldset {
                title: "Token Configuration",
                fields: &["user", "name", "token_length", "is_active", "expires_at"],
                classes: &[],
                description: Some("Configure API token settings. Token will be auto-generated."),
            },
            Fieldset {
                title: "Generated Token",
                fields: &["copy_token_button", "last_used"],
                classes: &["collapse"],
                description: Some("Auto-generated JWT token for API access."),
            },
            Fieldset {
                title: "API Permissions",
                fields: &[
                    "can_read_products",
                    "can_manage_cart",
                    "can_place_orders",
                    "can_manage_wishlist",
                ],
                classes: &["collapse"],
                description: None,
            },
            Fieldset {
                title: "Timestamps",
                fields: &["created_at", "updated_at"],
                classes: &["collapse"],
                description: None,
            },
        ]
    }

    fn sortable_fields(&self) -> &'static [&'static str] {
        &[
            "name",
            "user",
            "token_length",
            "is_active",
            "expires_at",
            "last_used",
            "created_at",
        ]
    }

    fn ordering(&self) -> &'static str {
        "-created_at"
    }

    fn label_for(&self, field: &str) -> String {
        match field {
            "short_token" => "Token Preview".to_string(),
            "copy_token_button" => "Token".to_string(),
            other => humanize(other),
        }
    }
}
