use axum::{
    Extension, Form, Json,
    extract::{Path, Query, State},
    http::header::SET_COOKIE,
    response::{Html, IntoResponse, Redirect, Response},
};
use chrono::Utc;
use std::sync::Arc;
use tokendesk_core::{ApiResponse, PageMeta, TokenItem};
use tracing::info;

use crate::admin::changelist::ChangeListQuery;
use crate::admin::display;
use crate::admin::forms::{FormErrors, TokenForm};
use crate::admin::save::save_model;
use crate::admin::templates::{self, ChangeFormContext, TOKENS_PATH};
use crate::db::api_tokens::Model as TokenModel;
use crate::db::users::Model as UserModel;
use crate::db::{token_ops, user_ops};
use crate::error::AppError;
use crate::services::auth::staff::{
    LoginForm, authenticate, clear_session_cookie, create_session_token, session_cookie,
};
use crate::services::tokens::TokenDraft;
use crate::state::AppState;

fn token_item(token: &TokenModel, owner: Option<&UserModel>) -> TokenItem {
    TokenItem {
        id: token.id,
        name: token.name.clone(),
        user_id: token.user_id,
        username: owner.map(|user| user.username.clone()),
        token_length: token.token_length,
        is_active: token.is_active,
        expires_at: token.expires_at,
        last_used: token.last_used,
        created_at: token.created_at,
        short_token: display::short_token(token),
        permissions: token.permissions(),
    }
}

async fn find_or_404(state: &AppState, token_id: i32) -> Result<TokenModel, AppError> {
    token_ops::find_token(&state.db, token_id)
        .await?
        .map(|(token, _)| token)
        .ok_or_else(|| AppError::NotFound(format!("api token {token_id} does not exist")))
}

/// Form validation plus the owner lookup, which needs the database.
async fn clean_form(state: &AppState, form: &TokenForm) -> Result<Result<TokenDraft, FormErrors>, AppError> {
    let draft = match form.validate() {
        Ok(draft) => draft,
        Err(errors) => return Ok(Err(errors)),
    };
    if let Some(user_id) = draft.user_id {
        if user_ops::find_user_by_id(&state.db, user_id).await?.is_none() {
            let mut errors = FormErrors::new();
            errors.insert("user", "Select a valid choice.".to_string());
            return Ok(Err(errors));
        }
    }
    Ok(Ok(draft))
}

async fn render_form(
    state: &AppState,
    staff: &UserModel,
    form: &TokenForm,
    errors: &FormErrors,
    existing: Option<&TokenModel>,
) -> Result<Html<String>, AppError> {
    let users = user_ops::list_users(&state.db).await?;
    let ctx = ChangeFormContext {
        form,
        errors,
        existing,
        users: &users,
    };
    Ok(Html(templates::change_form_page(&state.templates, staff, &ctx)?))
}

/// Token 列表页
pub(crate) async fn changelist(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
    Query(query): Query<ChangeListQuery>,
) -> Result<Html<String>, AppError> {
    let page = token_ops::list_tokens(&state.db, &query, Utc::now()).await?;
    Ok(Html(templates::changelist_page(&state.templates, &staff, &page, &query)?))
}

/// Token 列表 (JSON)
pub(crate) async fn api_changelist(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ChangeListQuery>,
) -> Result<Json<ApiResponse<Vec<TokenItem>>>, AppError> {
    let page = token_ops::list_tokens(&state.db, &query, Utc::now()).await?;
    let items = page
        .rows
        .iter()
        .map(|(token, owner)| token_item(token, owner.as_ref()))
        .collect();

    Ok(Json(ApiResponse::ok(items).with_meta(PageMeta {
        total: page.total,
        page: page.page,
        per_page: page.per_page,
        num_pages: page.num_pages,
    })))
}

pub(crate) async fn add_form(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
) -> Result<Html<String>, AppError> {
    render_form(&state, &staff, &TokenForm::initial(), &FormErrors::new(), None).await
}

pub(crate) async fn add_submit(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
    Form(form): Form<TokenForm>,
) -> Result<Response, AppError> {
    match clean_form(&state, &form).await? {
        Ok(draft) => {
            let token = save_model(&state, &staff, draft, None).await?;
            info!(token_id = token.id, admin = %staff.username, "api token added");
            Ok(Redirect::to(TOKENS_PATH).into_response())
        }
        Err(errors) => Ok(render_form(&state, &staff, &form, &errors, None)
            .await?
            .into_response()),
    }
}

pub(crate) async fn change_form(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
    Path(token_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let token = find_or_404(&state, token_id).await?;
    let form = TokenForm::from_model(&token);
    render_form(&state, &staff, &form, &FormErrors::new(), Some(&token)).await
}

pub(crate) async fn change_submit(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
    Path(token_id): Path<i32>,
    Form(form): Form<TokenForm>,
) -> Result<Response, AppError> {
    let token = find_or_404(&state, token_id).await?;
    match clean_form(&state, &form).await? {
        Ok(draft) => {
            let token = save_model(&state, &staff, draft, Some(token)).await?;
            info!(token_id = token.id, admin = %staff.username, "api token changed");
            Ok(Redirect::to(TOKENS_PATH).into_response())
        }
        Err(errors) => Ok(render_form(&state, &staff, &form, &errors, Some(&token))
            .await?
            .into_response()),
    }
}

pub(crate) async fn delete_confirm(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
    Path(token_id): Path<i32>,
) -> Result<Html<String>, AppError> {
    let token = find_or_404(&state, token_id).await?;
    Ok(Html(templates::delete_page(&state.templates, &staff, &token)?))
}

pub(crate) async fn delete_submit(
    State(state): State<Arc<AppState>>,
    Extension(staff): Extension<UserModel>,
    Path(token_id): Path<i32>,
) -> Result<Redirect, AppError> {
    if !token_ops::delete_token(&state.db, token_id).await? {
        return Err(AppError::NotFound(format!(
            "api token {token_id} does not exist"
        )));
    }
    info!(token_id, admin = %staff.username, "api token deleted");
    Ok(Redirect::to(TOKENS_PATH))
}

pub(crate) async fn login_form(State(state): State<Arc<AppState>>) -> Result<Html<String>, AppError> {
    Ok(Html(templates::login_page(&state.templates, None, "")?))
}

/// 后台登录
pub(crate) async fn login_submit(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    let user = match authenticate(&state.db, &form.username, &form.password).await {
        Ok(user) => user,
        Err(AppError::AuthError(_)) | Err(AppError::Forbidden(_)) => {
            let message = "Please enter the correct username and password for a staff account.";
            let page = templates::login_page(&state.templates, Some(message), &form.username)?;
            return Ok(Html(page).into_response());
        }
        Err(err) => return Err(err),
    };

    let hours = state.config.session_hours;
    let (token, _expires_at) = create_session_token(&user, &state.config.jwt_secret, hours)?;
    Ok((
        [(SET_COOKIE, session_cookie(&token, hours))],
        Redirect::to(TOKENS_PATH),
    )
        .into_response())
}

pub(crate) async fn logout() -> Response {
    (
        [(SET_COOKIE, clear_session_cookie())],
        Redirect::to("/admin/login"),
    )
        .into_response()
}
