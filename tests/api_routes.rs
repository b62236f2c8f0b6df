mod common;

use axum::{
    body::{Body, to_bytes},
    http::{Request, StatusCode, header},
};
use little_lemon_api::{build_app, services::auth_service::issue_token};
use serde_json::{Value, json};
use tower::ServiceExt;

fn request(method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn json_body(response: axum::response::Response) -> anyhow::Result<Value> {
    let bytes = to_bytes(response.into_body(), usize::MAX).await?;
    Ok(serde_json::from_slice(&bytes)?)
}

#[tokio::test]
async fn catalog_reads_are_public_and_writes_are_guarded() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let (customer_token, _) = issue_token(&state.auth, cast.customer.user_id)?;
    let (admin_token, _) = issue_token(&state.auth, cast.admin.user_id)?;
    let app = build_app(state);

    let list = app
        .clone()
        .oneshot(request("GET", "/api/categories", None, None))
        .await?;
    assert_eq!(list.status(), StatusCode::OK);

    let category = json!({ "title": "Drinks", "slug": "drinks" });
    let anonymous = app
        .clone()
        .oneshot(request("POST", "/api/categories", None, Some(category.clone())))
        .await?;
    assert_eq!(anonymous.status(), StatusCode::UNAUTHORIZED);

    let customer = app
        .clone()
        .oneshot(request(
            "POST",
            "/api/categories",
            Some(&customer_token),
            Some(category.clone()),
        ))
        .await?;
    assert_eq!(customer.status(), StatusCode::FORBIDDEN);
    let body = json_body(customer).await?;
    assert!(body["data"]["error"].is_string());

    let created = app
        .clone()
        .oneshot(request("POST", "/api/categories", Some(&admin_token), Some(category)))
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);
    let body = json_body(created).await?;
    assert_eq!(body["data"]["slug"], "drinks");

    let item = json!({ "title": "Lemonade", "price": 350, "category_id": body["data"]["id"] });
    let created = app
        .clone()
        .oneshot(request("POST", "/api/menu-items", Some(&admin_token), Some(item)))
        .await?;
    assert_eq!(created.status(), StatusCode::CREATED);

    let filtered = app
        .oneshot(request("GET", "/api/menu-items?category=drinks&ordering=-price", None, None))
        .await?;
    assert_eq!(filtered.status(), StatusCode::OK);
    let body = json_body(filtered).await?;
    assert_eq!(body["data"]["items"][0]["title"], "Lemonade");
    assert_eq!(body["meta"]["total"], 1);
    Ok(())
}

#[tokio::test]
async fn authenticated_routes_need_a_token() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let app = build_app(state);

    for uri in ["/api/cart/menu-items", "/api/orders", "/api/auth/me"] {
        let response = app.clone().oneshot(request("GET", uri, None, None)).await?;
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED, "{uri}");
    }
    Ok(())
}

#[tokio::test]
async fn featured_and_cart_clear_answer_no_content() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let (manager_token, _) = issue_token(&state.auth, cast.manager.user_id)?;
    let (customer_token, _) = issue_token(&state.auth, cast.customer.user_id)?;
    let app = build_app(state);

    let featured = app
        .clone()
        .oneshot(request("GET", "/api/menu-items/featured", Some(&manager_token), None))
        .await?;
    assert_eq!(featured.status(), StatusCode::NO_CONTENT);

    let refused = app
        .clone()
        .oneshot(request("GET", "/api/menu-items/featured", Some(&customer_token), None))
        .await?;
    assert_eq!(refused.status(), StatusCode::FORBIDDEN);

    for uri in ["/api/cart/menu-items", "/api/cart/menu-items/12"] {
        let cleared = app
            .clone()
            .oneshot(request("DELETE", uri, Some(&customer_token), None))
            .await?;
        assert_eq!(cleared.status(), StatusCode::NO_CONTENT, "{uri}");
    }

    let empty_order = app
        .oneshot(request("POST", "/api/orders", Some(&customer_token), None))
        .await?;
    assert_eq!(empty_order.status(), StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn unknown_paths_get_a_json_not_found() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let app = build_app(state);

    let response = app.oneshot(request("GET", "/api/nope", None, None)).await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await?;
    assert_eq!(body["data"]["path"], "/api/nope");
    Ok(())
}
