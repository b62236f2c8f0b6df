use std::collections::HashMap;

use anyhow::anyhow;
use sea_orm::sea_query::{Alias, Expr, LockType, OnConflict};
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::cart::{AddToCartRequest, CartList},
    entity::{
        cart_items::{
            ActiveModel as CartActive, Column as CartCol, Entity as CartItems, Model as CartModel,
        },
        menu_items::{Column as MenuCol, Entity as MenuItems},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{CartItem, MenuItem},
    response::{ApiResponse, Meta},
    services::menu_service::{find_menu_item, hydrate_menu_items},
    state::AppState,
};

pub async fn list_cart(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<CartList>> {
    let rows = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::Id)
        .all(&state.orm)
        .await?;
    let items = hydrate_cart(&state.orm, rows).await?;
    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success("OK", CartList { items }, Some(meta)))
}

/// Adds `quantity` of a menu item to the caller's cart.
///
/// The first add snapshots the menu price as the row's unit price; later adds grow the
/// quantity and reprice from that stored unit price.
pub async fn add_to_cart(
    state: &AppState,
    user: &AuthUser,
    payload: AddToCartRequest,
) -> AppResult<ApiResponse<CartItem>> {
    if payload.quantity < 1 {
        return Err(AppError::field(
            "quantity",
            "Ensure this value is greater than or equal to 1.",
        ));
    }

    let txn = state.orm.begin().await?;
    let menu_item = find_menu_item(&txn, payload.menuitem_id).await?;

    let existing = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .filter(CartCol::MenuitemId.eq(menu_item.id))
        .lock(LockType::Update)
        .one(&txn)
        .await?;

    // Reject an overflowing total up front; the upsert below does the write.
    if let Some(row) = &existing {
        let quantity = row
            .quantity
            .checked_add(payload.quantity)
            .ok_or_else(|| AppError::field("quantity", "Quantity is too large."))?;
        line_price(quantity, row.unit_price)?;
    }

    let row = upsert_cart_line(
        &txn,
        user.user_id,
        menu_item.id,
        payload.quantity,
        menu_item.price,
    )
    .await?;
    txn.commit().await?;

    tracing::debug!(
        user_id = user.user_id,
        menu_item_id = row.menuitem_id,
        quantity = row.quantity,
        "cart updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_update",
        "cart_items",
        serde_json::json!({ "menu_item_id": row.menuitem_id, "quantity": payload.quantity }),
    )
    .await;

    let mut items = hydrate_cart(&state.orm, vec![row]).await?;
    let item = items
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow!("cart row vanished while loading")))?;
    Ok(ApiResponse::item("Added to cart", item))
}

/// Empties the caller's cart. Returns how many rows were removed.
pub async fn clear_cart(state: &AppState, user: &AuthUser) -> AppResult<u64> {
    let result = CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&state.orm)
        .await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "cart_clear",
        "cart_items",
        serde_json::json!({ "removed": result.rows_affected }),
    )
    .await;

    Ok(result.rows_affected)
}

/// Inserts a cart line, or grows the existing (user, menu item) line by `quantity`.
///
/// Runs as a single `INSERT .. ON CONFLICT DO UPDATE`, so two first adds racing for the same
/// line both land on one row. An existing line keeps its stored unit price.
pub async fn upsert_cart_line<C: ConnectionTrait>(
    conn: &C,
    user_id: i32,
    menuitem_id: i32,
    quantity: i32,
    unit_price: i64,
) -> AppResult<CartModel> {
    let price = line_price(quantity, unit_price)?;
    let grown = Expr::col((CartItems, CartCol::Quantity))
        .add(Expr::col((Alias::new("excluded"), CartCol::Quantity)));

    let row = CartItems::insert(CartActive {
        id: NotSet,
        user_id: Set(user_id),
        menuitem_id: Set(menuitem_id),
        quantity: Set(quantity),
        unit_price: Set(unit_price),
        price: Set(price),
    })
    .on_conflict(
        OnConflict::columns([CartCol::UserId, CartCol::MenuitemId])
            .value(CartCol::Quantity, grown.clone())
            .value(
                CartCol::Price,
                grown.mul(Expr::col((CartItems, CartCol::UnitPrice))),
            )
            .to_owned(),
    )
    .exec_with_returning(conn)
    .await?;
    Ok(row)
}

pub fn line_price(quantity: i32, unit_price: i64) -> AppResult<i64> {
    i64::from(quantity)
        .checked_mul(unit_price)
        .ok_or_else(|| AppError::field("quantity", "Quantity is too large."))
}

async fn hydrate_cart<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<CartModel>,
) -> AppResult<Vec<CartItem>> {
    let menu_ids: Vec<i32> = rows.iter().map(|r| r.menuitem_id).collect();
    let menu_rows = if menu_ids.is_empty() {
        Vec::new()
    } else {
        MenuItems::find()
            .filter(MenuCol::Id.is_in(menu_ids))
            .all(conn)
            .await?
    };
    let menu: HashMap<i32, MenuItem> = hydrate_menu_items(conn, menu_rows)
        .await?
        .into_iter()
        .map(|m| (m.id, m))
        .collect();

    rows.into_iter()
        .map(|row| {
            let menuitem = menu.get(&row.menuitem_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow!("cart row {} lost its menu item", row.id))
            })?;
            Ok(CartItem {
                id: row.id,
                menuitem,
                quantity: row.quantity,
                unit_price: row.unit_price,
                price: row.price,
            })
        })
        .collect()
}
