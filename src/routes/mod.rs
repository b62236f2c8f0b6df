use axum::Router;

use crate::state::AppState;

pub mod auth;
pub mod cart;
pub mod categories;
pub mod doc;
pub mod groups;
pub mod health;
pub mod menu_items;
pub mod orders;
pub mod params;

// The catalog routers need the state up front for their guard layer; the state itself is
// bound at the top level.
pub fn create_api_router(state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/categories", categories::router(state.clone()))
        .nest("/menu-items", menu_items::router(state))
        .nest("/cart/menu-items", cart::router())
        .nest("/orders", orders::router())
        .nest("/groups/manager/users", groups::manager_router())
        .nest("/groups/delivery-crew/users", groups::delivery_crew_router())
        .nest("/auth", auth::router())
}
