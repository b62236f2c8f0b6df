use axum::{
    Extension, Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};

use crate::{
    dto::menu_items::{MenuItemList, MenuItemPatch, MenuItemRequest, SetFeaturedRequest},
    error::AppResult,
    middleware::auth::{AuthUser, catalog_guard},
    models::MenuItem,
    response::ApiResponse,
    routes::params::MenuItemQuery,
    services::menu_service,
    state::AppState,
};

pub fn router(state: AppState) -> Router<AppState> {
    let catalog = Router::new()
        .route("/", get(list_menu_items).post(create_menu_item))
        .route(
            "/{id}",
            get(get_menu_item)
                .put(replace_menu_item)
                .patch(update_menu_item)
                .delete(delete_menu_item),
        )
        .route_layer(middleware::from_fn_with_state(state, catalog_guard));

    // Featured is manager-only for reads too, so it sits outside the catalog guard.
    Router::new()
        .route("/featured", get(get_featured).patch(set_featured))
        .merge(catalog)
}

#[utoipa::path(
    get,
    path = "/api/menu-items",
    params(
        ("category" = Option<String>, Query, description = "Category id or slug"),
        ("search" = Option<String>, Query, description = "Case-insensitive title search"),
        ("ordering" = Option<String>, Query, description = "`price` or `-price`"),
        ("page" = Option<i64>, Query, description = "Page number, default 1"),
        ("per_page" = Option<i64>, Query, description = "Items per page, default 20")
    ),
    responses(
        (status = 200, description = "List menu items", body = ApiResponse<MenuItemList>)
    ),
    tag = "Menu items"
)]
pub async fn list_menu_items(
    State(state): State<AppState>,
    Query(query): Query<MenuItemQuery>,
) -> AppResult<Json<ApiResponse<MenuItemList>>> {
    let resp = menu_service::list_menu_items(&state, query).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/menu-items",
    request_body = MenuItemRequest,
    responses(
        (status = 201, description = "Menu item created", body = ApiResponse<MenuItem>),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Not authenticated"),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu items"
)]
pub async fn create_menu_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Json(payload): Json<MenuItemRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<MenuItem>>)> {
    let resp = menu_service::create_menu_item(&state, &user, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    get,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    responses(
        (status = 200, description = "Menu item", body = ApiResponse<MenuItem>),
        (status = 404, description = "Menu item not found")
    ),
    tag = "Menu items"
)]
pub async fn get_menu_item(
    State(state): State<AppState>,
    Path(id): Path<i32>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::get_menu_item(&state, id).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    put,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    request_body = MenuItemRequest,
    responses(
        (status = 200, description = "Menu item replaced", body = ApiResponse<MenuItem>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Menu item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu items"
)]
pub async fn replace_menu_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<MenuItemRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::replace_menu_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    patch,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    request_body = MenuItemPatch,
    responses(
        (status = 200, description = "Menu item updated", body = ApiResponse<MenuItem>),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Menu item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu items"
)]
pub async fn update_menu_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
    Json(payload): Json<MenuItemPatch>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::update_menu_item(&state, &user, id, payload).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    delete,
    path = "/api/menu-items/{id}",
    params(("id" = i32, Path, description = "Menu item ID")),
    responses(
        (status = 204, description = "Menu item deleted"),
        (status = 400, description = "Menu item is referenced by orders"),
        (status = 404, description = "Menu item not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu items"
)]
pub async fn delete_menu_item(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    menu_service::delete_menu_item(&state, &user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/menu-items/featured",
    responses(
        (status = 200, description = "Item of the day", body = ApiResponse<MenuItem>),
        (status = 204, description = "Nothing is featured"),
        (status = 403, description = "Not a manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu items"
)]
pub async fn get_featured(State(state): State<AppState>, user: AuthUser) -> AppResult<Response> {
    let resp = match menu_service::get_featured(&state, &user).await? {
        Some(item) => Json(ApiResponse::item("Featured menu item", item)).into_response(),
        None => StatusCode::NO_CONTENT.into_response(),
    };
    Ok(resp)
}

#[utoipa::path(
    patch,
    path = "/api/menu-items/featured",
    request_body = SetFeaturedRequest,
    responses(
        (status = 200, description = "Item of the day set", body = ApiResponse<MenuItem>),
        (status = 404, description = "Menu item not found"),
        (status = 403, description = "Not a manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Menu items"
)]
pub async fn set_featured(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<SetFeaturedRequest>,
) -> AppResult<Json<ApiResponse<MenuItem>>> {
    let resp = menu_service::set_featured(&state, &user, payload).await?;
    Ok(Json(resp))
}
