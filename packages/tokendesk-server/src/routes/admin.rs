use axum::{
    Router, middleware,
    response::Redirect,
    routing::{get, post},
};
use std::sync::Arc;

use crate::admin::templates::TOKENS_PATH;
use crate::admin::views;
use crate::services::auth::staff::{staff_api_middleware, staff_page_middleware};
use crate::state::AppState;

/// 挂载在 `/admin` 下
pub(crate) fn router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    let pages = Router::new()
        .route("/tokens/", get(views::changelist))
        .route("/tokens/add/", get(views::add_form).post(views::add_submit))
        .route(
            "/tokens/{id}/change/",
            get(views::change_form).post(views::change_submit),
        )
        .route(
            "/tokens/{id}/delete/",
            get(views::delete_confirm).post(views::delete_submit),
        )
        .route_layer(middleware::from_fn_with_state(
            Arc::clone(&state),
            staff_page_middleware,
        ));

    let api = Router::new()
        .route("/api/tokens", get(views::api_changelist))
        .route_layer(middleware::from_fn_with_state(state, staff_api_middleware));

    Router::new()
        .route("/", get(|| async { Redirect::to(TOKENS_PATH) }))
        .route("/login", get(views::login_form).post(views::login_submit))
        .route("/logout", post(views::logout))
        .merge(pages)
        .merge(api)
}
