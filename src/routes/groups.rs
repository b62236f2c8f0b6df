use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    routing::{delete, get},
};

use crate::{
    dto::groups::{AddMemberRequest, MemberList},
    error::AppResult,
    middleware::auth::AuthUser,
    models::User,
    response::ApiResponse,
    services::group_service::{self, Roster},
    state::AppState,
};

pub fn manager_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_managers).post(add_manager))
        .route("/{id}", delete(remove_manager))
}

pub fn delivery_crew_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_delivery_crew).post(add_delivery_crew))
        .route("/{id}", delete(remove_delivery_crew))
}

#[utoipa::path(
    get,
    path = "/api/groups/manager/users",
    responses(
        (status = 200, description = "Managers", body = ApiResponse<MemberList>),
        (status = 403, description = "Not an admin")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_managers(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MemberList>>> {
    let resp = group_service::list_members(&state, &user, Roster::Manager).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/manager/users",
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "User added to managers", body = ApiResponse<User>),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_manager(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = group_service::add_member(&state, &user, Roster::Manager, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/manager/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User removed from managers"),
        (status = 403, description = "Not an admin"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_manager(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    group_service::remove_member(&state, &user, Roster::Manager, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/api/groups/delivery-crew/users",
    responses(
        (status = 200, description = "Delivery crew", body = ApiResponse<MemberList>),
        (status = 403, description = "Not a manager")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn list_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
) -> AppResult<Json<ApiResponse<MemberList>>> {
    let resp = group_service::list_members(&state, &user, Roster::DeliveryCrew).await?;
    Ok(Json(resp))
}

#[utoipa::path(
    post,
    path = "/api/groups/delivery-crew/users",
    request_body = AddMemberRequest,
    responses(
        (status = 201, description = "User added to the delivery crew", body = ApiResponse<User>),
        (status = 403, description = "Not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn add_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
    Json(payload): Json<AddMemberRequest>,
) -> AppResult<(StatusCode, Json<ApiResponse<User>>)> {
    let resp = group_service::add_member(&state, &user, Roster::DeliveryCrew, payload).await?;
    Ok((StatusCode::CREATED, Json(resp)))
}

#[utoipa::path(
    delete,
    path = "/api/groups/delivery-crew/users/{id}",
    params(("id" = i32, Path, description = "User ID")),
    responses(
        (status = 204, description = "User removed from the delivery crew"),
        (status = 403, description = "Not a manager"),
        (status = 404, description = "User not found")
    ),
    security(("bearer_auth" = [])),
    tag = "Groups"
)]
pub async fn remove_delivery_crew(
    State(state): State<AppState>,
    user: AuthUser,
    Path(id): Path<i32>,
) -> AppResult<StatusCode> {
    group_service::remove_member(&state, &user, Roster::DeliveryCrew, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
