use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer};
use tracing::Level;

use crate::routes;
use crate::state::AppState;

pub(crate) fn axum_app(state: Arc<AppState>) -> Router {
    Router::new()
        // 公开路由
        .route("/", get(routes::index::handler))
        // 后台页面 (staff 会话)
        .nest("/admin", routes::admin::router(Arc::clone(&state)))
        // API Token 授权的接口
        .nest("/api", routes::api::router(Arc::clone(&state)))
        .with_state(state)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(
                    DefaultOnResponse::new()
                        .level(Level::INFO)
                        .latency_unit(LatencyUnit::Millis),
                ),
        )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::token_ops;
    use crate::db::users::Model as UserModel;
    use crate::services::auth::staff::{self, create_session_token};
    use crate::testing;
    use axum::body::Body;
    use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, LOCATION, SET_COOKIE};
    use axum::http::{Request, StatusCode};
    use axum::response::Response;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    async fn send(state: &Arc<AppState>, request: Request<Body>) -> Response {
        axum_app(Arc::clone(state)).oneshot(request).await.unwrap()
    }

    async fn body_text(response: Response) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn bearer(user: &UserModel) -> String {
        let (token, _) = create_session_token(user, testing::SECRET, 1).unwrap();
        format!("Bearer {token}")
    }

    fn get(uri: &str, auth: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::empty()).unwrap()
    }

    fn post_form(uri: &str, auth: Option<&str>, body: &str) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if let Some(auth) = auth {
            builder = builder.header(AUTHORIZATION, auth);
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    #[tokio::test]
    async fn root_is_public() {
        let state = testing::state().await;
        let response = send(&state, get("/", None)).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn anonymous_pages_redirect_to_login() {
        let state = testing::state().await;
        let response = send(&state, get("/admin/tokens/", None)).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/admin/login");

        // JSON 接口直接返回 401
        let response = send(&state, get("/admin/api/tokens", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn non_staff_users_are_forbidden() {
        let state = testing::state().await;
        let shopper = testing::user(&state.db, "shopper", "shopper@shop.test", false).await;
        let response = send(&state, get("/admin/tokens/", Some(&bearer(&shopper)))).await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn staff_sees_changelist() {
        let state = testing::state().await;
        let admin = testing::user(&state.db, "admin", "admin@shop.test", true).await;
        let owner = testing::user(&state.db, "carol", "carol@shop.test", false).await;
        let token = testing::token(&state.db, &owner, "pos terminal").await;

        let response = send(&state, get("/admin/tokens/?q=carol", Some(&bearer(&admin)))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("pos terminal"));
        assert!(html.contains(&format!(r#"id="token-{}""#, token.id)));

        let response = send(&state, get("/admin/api/tokens", Some(&bearer(&admin)))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["data"][0]["username"], "carol");
        assert_eq!(json["meta"]["total"], 1);
    }

    #[tokio::test]
    async fn malformed_query_values_still_render_changelist() {
        let state = testing::state().await;
        let admin = testing::user(&state.db, "admin", "admin@shop.test", true).await;
        testing::token(&state.db, &admin, "first page").await;
        let auth = bearer(&admin);

        for uri in [
            "/admin/tokens/?p=abc",
            "/admin/tokens/?p=-1&o=bogus&is_active=maybe",
            "/admin/tokens/?p=99",
        ] {
            let response = send(&state, get(uri, Some(&auth))).await;
            assert_eq!(response.status(), StatusCode::OK, "{uri}");
            assert!(body_text(response).await.contains("first page"), "{uri}");
        }

        let response = send(&state, get("/admin/api/tokens?p=abc", Some(&auth))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["meta"]["page"], 0);
    }

    #[tokio::test]
    async fn adding_without_owner_assigns_acting_admin() {
        let state = testing::state().await;
        let admin = testing::user(&state.db, "admin", "admin@shop.test", true).await;

        let response = send(
            &state,
            post_form(
                "/admin/tokens/add/",
                Some(&bearer(&admin)),
                "user=&name=ops+script&token_length=40&is_active=on&expires_at=",
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(response.headers()[LOCATION], "/admin/tokens/");

        let page = token_ops::list_tokens(&state.db, &Default::default(), chrono::Utc::now())
            .await
            .unwrap();
        let (token, owner) = &page.rows[0];
        assert_eq!(token.name, "ops script");
        assert_eq!(token.token_length, 40);
        assert!(!token.can_read_products);
        assert_eq!(owner.as_ref().map(|user| user.id), Some(admin.id));
        assert!(token.token_value().is_some());
    }

    #[tokio::test]
    async fn invalid_form_is_rendered_again() {
        let state = testing::state().await;
        let admin = testing::user(&state.db, "admin", "admin@shop.test", true).await;

        let response = send(
            &state,
            post_form(
                "/admin/tokens/add/",
                Some(&bearer(&admin)),
                &format!("user={}&name=&token_length=8", uuid::Uuid::new_v4()),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        let html = body_text(response).await;
        assert!(html.contains("This field is required."));
        assert!(html.contains("Ensure this value is between 16 and 256."));
    }

    #[tokio::test]
    async fn change_and_delete_existing_token() {
        let state = testing::state().await;
        let admin = testing::user(&state.db, "admin", "admin@shop.test", true).await;
        let owner = testing::user(&state.db, "dave", "dave@shop.test", false).await;
        let token = testing::token(&state.db, &owner, "legacy").await;
        let auth = bearer(&admin);

        let response = send(
            &state,
            post_form(
                &format!("/admin/tokens/{}/change/", token.id),
                Some(&auth),
                &format!("user={}&name=renamed&token_length=32&can_place_orders=on", owner.id),
            ),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let (changed, _) = token_ops::find_token(&state.db, token.id).await.unwrap().unwrap();
        assert_eq!(changed.name, "renamed");
        assert!(!changed.is_active);
        assert!(changed.can_place_orders);
        assert_eq!(changed.token, token.token);

        let uri = format!("/admin/tokens/{}/delete/", token.id);
        let response = send(&state, post_form(&uri, Some(&auth), "")).await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let response = send(&state, post_form(&uri, Some(&auth), "")).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let response = send(&state, get("/admin/tokens/999/change/", Some(&auth))).await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn login_sets_session_cookie() {
        let state = testing::state().await;
        staff::create_account(&state.db, "boss", "boss@shop.test", "correct horse", true)
            .await
            .unwrap();

        let response = send(
            &state,
            post_form("/admin/login", None, "username=boss&password=correct+horse"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        let cookie = response.headers()[SET_COOKIE].to_str().unwrap().to_string();
        assert!(cookie.starts_with("tokendesk_session="));

        let session = cookie.split(';').next().unwrap().to_string();
        let request = Request::builder()
            .uri("/admin/tokens/")
            .header("cookie", session)
            .body(Body::empty())
            .unwrap();
        assert_eq!(send(&state, request).await.status(), StatusCode::OK);

        let response = send(
            &state,
            post_form("/admin/login", None, "username=boss&password=nope"),
        )
        .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(body_text(response).await.contains("errorlist"));
    }

    #[tokio::test]
    async fn api_token_introspection_and_scopes() {
        let state = testing::state().await;
        let owner = testing::user(&state.db, "erin", "erin@shop.test", false).await;
        let token = testing::token(&state.db, &owner, "catalog reader").await;
        let auth = format!("Bearer {}", token.token.clone().unwrap());

        let response = send(&state, get("/api/token/introspect", Some(&auth))).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json: serde_json::Value = serde_json::from_str(&body_text(response).await).unwrap();
        assert_eq!(json["data"]["name"], "catalog reader");
        assert_eq!(json["data"]["capabilities"], serde_json::json!(["read_products"]));

        let allowed = send(&state, get("/api/token/capabilities/read_products", Some(&auth))).await;
        assert_eq!(allowed.status(), StatusCode::OK);
        let denied = send(&state, get("/api/token/capabilities/place_orders", Some(&auth))).await;
        assert_eq!(denied.status(), StatusCode::FORBIDDEN);

        // 没有 token
        let response = send(&state, get("/api/token/introspect", None)).await;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }
}
