//! Server-rendered admin pages.
//!
//! Pages are Tera templates compiled into the binary; every page is built
//! from a serializable context, so record values are escaped by the engine.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tera::{Context, Tera};

use crate::admin::changelist::{ChangeListQuery, DateFilter};
use crate::admin::config::{ApiTokenAdmin, Fieldset, ModelAdmin};
use crate::admin::display::{self, EMPTY_VALUE};
use crate::admin::forms::{FormErrors, MAX_NAME_LEN, TokenForm};
use crate::db::api_tokens::Model as TokenModel;
use crate::db::token_ops::TokenPage;
use crate::db::users::Model as UserModel;
use crate::error::AppError;
use crate::services::tokens::{MAX_TOKEN_LENGTH, MIN_TOKEN_LENGTH};

pub(crate) const TOKENS_PATH: &str = "/admin/tokens/";

/// 后台模板集合
#[derive(Clone)]
pub(crate) struct AdminTemplates {
    tera: Tera,
}

impl AdminTemplates {
    pub(crate) fn new() -> Result<Self, AppError> {
        let mut tera = Tera::default();
        tera.add_raw_templates(vec![
            ("admin/base.html", include_str!("../../templates/admin/base.html")),
            ("admin/login.html", include_str!("../../templates/admin/login.html")),
            ("admin/change_list.html", include_str!("../../templates/admin/change_list.html")),
            ("admin/change_form.html", include_str!("../../templates/admin/change_form.html")),
            (
                "admin/delete_confirmation.html",
                include_str!("../../templates/admin/delete_confirmation.html"),
            ),
            ("admin/copy_token.html", include_str!("../../templates/admin/copy_token.html")),
        ])
        .map_err(|e| AppError::TemplateError(format!("failed to load admin templates: {e}")))?;
        Ok(Self { tera })
    }

    pub(crate) fn render<T: Serialize>(&self, name: &str, page: &T) -> Result<String, AppError> {
        let context = Context::from_serialize(page)
            .map_err(|e| AppError::TemplateError(format!("invalid context for {name}: {e}")))?;
        self.tera
            .render(name, &context)
            .map_err(|e| AppError::TemplateError(format!("failed to render {name}: {e}")))
    }
}

#[derive(Serialize)]
struct StaffContext<'a> {
    username: &'a str,
}

impl<'a> From<&'a UserModel> for StaffContext<'a> {
    fn from(user: &'a UserModel) -> Self {
        Self {
            username: &user.username,
        }
    }
}

fn fmt_datetime(value: Option<DateTime<Utc>>) -> String {
    value
        .map(|at| at.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| EMPTY_VALUE.to_string())
}

#[derive(Serialize)]
struct LoginPage<'a> {
    title: &'static str,
    staff: Option<StaffContext<'a>>,
    error: Option<&'a str>,
    username: &'a str,
}

pub(crate) fn login_page(
    templates: &AdminTemplates,
    error: Option<&str>,
    username: &str,
) -> Result<String, AppError> {
    templates.render(
        "admin/login.html",
        &LoginPage {
            title: "Log in",
            staff: None,
            error,
            username,
        },
    )
}

#[derive(Serialize)]
struct HeaderContext {
    label: String,
    url: Option<String>,
    sorted: Option<&'static str>,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum CellContext {
    Link { value: String },
    Boolean { value: bool },
    Text { value: String },
    Html { html: String },
}

#[derive(Serialize)]
struct RowContext {
    id: i32,
    cells: Vec<CellContext>,
}

#[derive(Serialize)]
struct HiddenField {
    name: &'static str,
    value: String,
}

#[derive(Serialize)]
struct FilterChoiceContext {
    label: &'static str,
    url: String,
    selected: bool,
}

#[derive(Serialize)]
struct FilterContext {
    title: String,
    choices: Vec<FilterChoiceContext>,
}

#[derive(Serialize)]
struct PaginationContext {
    total: u64,
    page_number: u64,
    num_pages: u64,
    previous_url: Option<String>,
    next_url: Option<String>,
}

#[derive(Serialize)]
struct ChangeListPage<'a> {
    title: String,
    staff: Option<StaffContext<'a>>,
    model_name: &'static str,
    plural: &'static str,
    search_query: &'a str,
    hidden: Vec<HiddenField>,
    headers: Vec<HeaderContext>,
    rows: Vec<RowContext>,
    filters: Vec<FilterContext>,
    pagination: PaginationContext,
}

fn list_cell(
    templates: &AdminTemplates,
    field: &str,
    token: &TokenModel,
    owner: Option<&UserModel>,
) -> Result<CellContext, AppError> {
    let cell = match field {
        "name" => CellContext::Link {
            value: token.name.clone(),
        },
        "user" => CellContext::Text {
            value: owner
                .map(|user| user.username.clone())
                .unwrap_or_else(|| EMPTY_VALUE.to_string()),
        },
        "token_length" => CellContext::Text {
            value: token.token_length.to_string(),
        },
        "is_active" => CellContext::Boolean {
            value: token.is_active,
        },
        "expires_at" => CellContext::Text {
            value: fmt_datetime(token.expires_at),
        },
        "last_used" => CellContext::Text {
            value: fmt_datetime(token.last_used),
        },
        "created_at" => CellContext::Text {
            value: fmt_datetime(Some(token.created_at)),
        },
        "short_token" => CellContext::Text {
            value: display::short_token(token),
        },
        "copy_token_button" => CellContext::Html {
            html: display::copy_token_button(templates, token)?,
        },
        _ => CellContext::Text {
            value: EMPTY_VALUE.to_string(),
        },
    };
    Ok(cell)
}

fn header_cell(admin: &ApiTokenAdmin, field: &str, query: &ChangeListQuery) -> HeaderContext {
    let label = admin.label_for(field);
    if !admin.sortable_fields().contains(&field) {
        return HeaderContext {
            label,
            url: None,
            sorted: None,
        };
    }
    let ordering = query.ordering();
    let (next, sorted) = if ordering.field == field {
        if ordering.descending {
            (field.to_string(), Some("desc"))
        } else {
            (format!("-{field}"), Some("asc"))
        }
    } else {
        (field.to_string(), None)
    };
    HeaderContext {
        label,
        url: Some(query.link_with("o", Some(&next))),
        sorted,
    }
}

fn filter_choices(field: &str) -> Vec<(&'static str, Option<&'static str>)> {
    match field {
        "is_active" => vec![("All", None), ("Yes", Some("1")), ("No", Some("0"))],
        "expires_at" => {
            let mut choices = vec![("Any date", None)];
            choices.extend(
                DateFilter::BOUNDED
                    .iter()
                    .chain([DateFilter::NoDate, DateFilter::HasDate].iter())
                    .map(|filter| (filter.label(), Some(filter.as_param()))),
            );
            choices
        }
        "created_at" => {
            let mut choices = vec![("Any date", None)];
            choices.extend(
                DateFilter::BOUNDED
                    .iter()
                    .map(|filter| (filter.label(), Some(filter.as_param()))),
            );
            choices
        }
        _ => Vec::new(),
    }
}

fn current_filter_value<'a>(field: &str, query: &'a ChangeListQuery) -> Option<&'a str> {
    match field {
        "is_active" => query.is_active.as_deref(),
        "expires_at" => query.expires_at.as_deref(),
        "created_at" => query.created_at.as_deref(),
        _ => None,
    }
}

fn filter_sidebar(admin: &ApiTokenAdmin, query: &ChangeListQuery) -> Vec<FilterContext> {
    admin
        .list_filter()
        .iter()
        .map(|field| {
            let current = current_filter_value(field, query).filter(|value| !value.is_empty());
            FilterContext {
                title: admin.label_for(field).to_lowercase(),
                choices: filter_choices(field)
                    .into_iter()
                    .map(|(label, value)| FilterChoiceContext {
                        label,
                        url: query.link_with(field, value),
                        selected: current == value,
                    })
                    .collect(),
            }
        })
        .collect()
}

/// 搜索时保留当前的筛选和排序
fn hidden_fields(query: &ChangeListQuery) -> Vec<HiddenField> {
    [
        ("is_active", &query.is_active),
        ("expires_at", &query.expires_at),
        ("created_at", &query.created_at),
        ("o", &query.o),
    ]
    .into_iter()
    .filter_map(|(name, value)| {
        value
            .as_deref()
            .filter(|v| !v.is_empty())
            .map(|value| HiddenField {
                name,
                value: value.to_string(),
            })
    })
    .collect()
}

fn pagination(page: &TokenPage, query: &ChangeListQuery) -> PaginationContext {
    let previous_url = (page.page > 0)
        .then(|| query.link_with("p", Some((page.page - 1).to_string().as_str())));
    let next_url = (page.page + 1 < page.num_pages)
        .then(|| query.link_with("p", Some((page.page + 1).to_string().as_str())));
    PaginationContext {
        total: page.total,
        page_number: page.page + 1,
        num_pages: page.num_pages,
        previous_url,
        next_url,
    }
}

pub(crate) fn changelist_page(
    templates: &AdminTemplates,
    staff: &UserModel,
    page: &TokenPage,
    query: &ChangeListQuery,
) -> Result<String, AppError> {
    let admin = ApiTokenAdmin;
    let headers = admin
        .list_display()
        .iter()
        .map(|field| header_cell(&admin, field, query))
        .collect();

    let mut rows = Vec::with_capacity(page.rows.len());
    for (token, owner) in &page.rows {
        let cells = admin
            .list_display()
            .iter()
            .map(|field| list_cell(templates, field, token, owner.as_ref()))
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(RowContext { id: token.id, cells });
    }

    templates.render(
        "admin/change_list.html",
        &ChangeListPage {
            title: format!("Select {} to change", admin.model_name()),
            staff: Some(staff.into()),
            model_name: admin.model_name(),
            plural: admin.verbose_name_plural(),
            search_query: query.q.as_deref().unwrap_or_default(),
            hidden: hidden_fields(query),
            headers,
            rows,
            filters: filter_sidebar(&admin, query),
            pagination: pagination(page, query),
        },
    )
}

/// Everything the change form needs besides the posted values.
pub(crate) struct ChangeFormContext<'a> {
    pub form: &'a TokenForm,
    pub errors: &'a FormErrors,
    pub existing: Option<&'a TokenModel>,
    pub users: &'a [UserModel],
}

#[derive(Serialize)]
struct OptionContext {
    value: String,
    label: String,
    selected: bool,
}

#[derive(Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum WidgetContext {
    Readonly { value: String },
    Html { html: String },
    Select { options: Vec<OptionContext> },
    Text { value: String, max_length: usize },
    Number { value: String, min: i32, max: i32 },
    Datetime { value: String },
    Checkbox { checked: bool },
}

#[derive(Serialize)]
struct FieldContext {
    name: &'static str,
    label: String,
    error: Option<String>,
    widget: WidgetContext,
}

#[derive(Serialize)]
struct FieldsetContext {
    title: &'static str,
    description: Option<&'static str>,
    collapsed: bool,
    open: bool,
    fields: Vec<FieldContext>,
}

#[derive(Serialize)]
struct ChangeFormPage<'a> {
    title: String,
    staff: Option<StaffContext<'a>>,
    has_errors: bool,
    object_id: Option<i32>,
    fieldsets: Vec<FieldsetContext>,
}

fn readonly_widget(
    templates: &AdminTemplates,
    field: &str,
    existing: Option<&TokenModel>,
) -> Result<WidgetContext, AppError> {
    let Some(token) = existing else {
        return Ok(WidgetContext::Readonly {
            value: EMPTY_VALUE.to_string(),
        });
    };
    let value = match field {
        "copy_token_button" => {
            return Ok(WidgetContext::Html {
                html: display::copy_token_button(templates, token)?,
            });
        }
        "last_used" => fmt_datetime(token.last_used),
        "created_at" => fmt_datetime(Some(token.created_at)),
        "updated_at" => fmt_datetime(Some(token.updated_at)),
        _ => EMPTY_VALUE.to_string(),
    };
    Ok(WidgetContext::Readonly { value })
}

fn input_widget(field: &str, ctx: &ChangeFormContext<'_>) -> WidgetContext {
    let form = ctx.form;
    match field {
        "user" => WidgetContext::Select {
            options: ctx
                .users
                .iter()
                .map(|user| {
                    let value = user.id.to_string();
                    OptionContext {
                        selected: form.user == value,
                        value,
                        label: format!("{} ({})", user.username, user.email),
                    }
                })
                .collect(),
        },
        "name" => WidgetContext::Text {
            value: form.name.clone(),
            max_length: MAX_NAME_LEN,
        },
        "token_length" => WidgetContext::Number {
            value: form.token_length.clone(),
            min: MIN_TOKEN_LENGTH,
            max: MAX_TOKEN_LENGTH,
        },
        "expires_at" => WidgetContext::Datetime {
            value: form.expires_at.clone(),
        },
        checkbox => WidgetContext::Checkbox {
            checked: form.is_checked(checkbox),
        },
    }
}

fn render_fieldset(
    templates: &AdminTemplates,
    admin: &ApiTokenAdmin,
    fieldset: &Fieldset,
    ctx: &ChangeFormContext<'_>,
) -> Result<FieldsetContext, AppError> {
    let mut fields = Vec::with_capacity(fieldset.fields.len());
    for &field in fieldset.fields {
        let widget = if admin.is_readonly(field) {
            readonly_widget(templates, field, ctx.existing)?
        } else {
            input_widget(field, ctx)
        };
        fields.push(FieldContext {
            name: field,
            label: admin.label_for(field),
            error: ctx.errors.get(field).cloned(),
            widget,
        });
    }
    // 有错误的分组不折叠
    let has_errors = fields.iter().any(|field| field.error.is_some());
    Ok(FieldsetContext {
        title: fieldset.title,
        description: fieldset.description,
        collapsed: fieldset.is_collapsed(),
        open: has_errors,
        fields,
    })
}

pub(crate) fn change_form_page(
    templates: &AdminTemplates,
    staff: &UserModel,
    ctx: &ChangeFormContext<'_>,
) -> Result<String, AppError> {
    let admin = ApiTokenAdmin;
    let title = match ctx.existing {
        Some(_) => format!("Change {}", admin.model_name()),
        None => format!("Add {}", admin.model_name()),
    };
    let fieldsets = admin
        .fieldsets()
        .iter()
        .map(|fieldset| render_fieldset(templates, &admin, fieldset, ctx))
        .collect::<Result<Vec<_>, _>>()?;

    templates.render(
        "admin/change_form.html",
        &ChangeFormPage {
            title,
            staff: Some(staff.into()),
            has_errors: !ctx.errors.is_empty(),
            object_id: ctx.existing.map(|token| token.id),
            fieldsets,
        },
    )
}

#[derive(Serialize)]
struct DeletePage<'a> {
    title: &'static str,
    staff: Option<StaffContext<'a>>,
    model_name: &'static str,
    name: &'a str,
    object_id: i32,
}

pub(crate) fn delete_page(
    templates: &AdminTemplates,
    staff: &UserModel,
    token: &TokenModel,
) -> Result<String, AppError> {
    templates.render(
        "admin/delete_confirmation.html",
        &DeletePage {
            title: "Are you sure?",
            staff: Some(staff.into()),
            model_name: ApiTokenAdmin.model_name(),
            name: &token.name,
            object_id: token.id,
        },
    )
}
