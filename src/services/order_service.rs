use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use chrono::Utc;
use sea_orm::sea_query::LockType;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::orders::{OrderList, PatchOrderRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        groups::DELIVERY_CREW,
        menu_items::{
            ActiveModel as MenuItemActive, Column as MenuCol, Entity as MenuItems,
            Model as MenuItemModel,
        },
        order_items::{
            ActiveModel as OrderItemActive, Column as OrderItemCol, Entity as OrderItems,
        },
        orders::{
            ActiveModel as OrderActive, Column as OrderCol, Entity as Orders, Model as OrderModel,
            OrderStatus,
        },
        users::{Column as UserCol, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::{MenuItem, Order, OrderItem, User},
    permissions::{Permission, is_manager, require},
    response::{ApiResponse, Meta},
    routes::params::OrderListQuery,
    services::menu_service::hydrate_menu_items,
    state::AppState,
};

/// Which orders `user` may see: managers and admins see every order, delivery crew the
/// orders assigned to them, everyone else their own.
pub fn visible_to(user: &AuthUser) -> Condition {
    if is_manager(user) {
        Condition::all()
    } else if user.in_group(DELIVERY_CREW) {
        Condition::all().add(OrderCol::DeliveryCrewId.eq(user.user_id))
    } else {
        Condition::all().add(OrderCol::UserId.eq(user.user_id))
    }
}

pub async fn list_orders(
    state: &AppState,
    user: &AuthUser,
    query: OrderListQuery,
) -> AppResult<ApiResponse<OrderList>> {
    let window = query.window()?;
    let mut condition = visible_to(user);
    if let Some(status) = query.status {
        condition = condition.add(OrderCol::Status.eq(status));
    }

    let finder = Orders::find()
        .filter(condition)
        .order_by_desc(OrderCol::Date)
        .order_by_desc(OrderCol::Id);

    let total = finder.clone().count(&state.orm).await?;
    let orders = finder
        .limit(window.per_page as u64)
        .offset(window.offset as u64)
        .all(&state.orm)
        .await?;
    let items = hydrate_orders(&state.orm, orders).await?;

    Ok(ApiResponse::success(
        "Orders",
        OrderList { items },
        Some(Meta::for_window(&window, total)),
    ))
}

pub async fn get_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
) -> AppResult<ApiResponse<Order>> {
    let order = Orders::find()
        .filter(visible_to(user))
        .filter(OrderCol::Id.eq(id))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let order = hydrate_order(&state.orm, order).await?;
    Ok(ApiResponse::item("OK", order))
}

/// Turns the caller's cart into an order.
///
/// One transaction covers reading the cart, creating the order and its lines, taking the
/// ordered quantities out of inventory (never below zero) and emptying the cart.
pub async fn place_order(state: &AppState, user: &AuthUser) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;

    let cart = CartItems::find()
        .filter(CartCol::UserId.eq(user.user_id))
        .order_by_asc(CartCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?;

    if cart.is_empty() {
        return Err(AppError::BadRequest("Cart is empty".into()));
    }

    let total = cart.iter().try_fold(0_i64, |sum, row| {
        sum.checked_add(row.price)
            .ok_or_else(|| AppError::BadRequest("Order total is too large".into()))
    })?;

    // Row locks are always taken in menu item id order.
    let menu_ids: BTreeSet<i32> = cart.iter().map(|row| row.menuitem_id).collect();
    let mut stock: HashMap<i32, MenuItemModel> = MenuItems::find()
        .filter(MenuCol::Id.is_in(menu_ids))
        .order_by_asc(MenuCol::Id)
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| (item.id, item))
        .collect();

    let order = OrderActive {
        id: NotSet,
        user_id: Set(user.user_id),
        delivery_crew_id: Set(None),
        status: Set(OrderStatus::Pending),
        total: Set(total),
        date: Set(Utc::now().into()),
    }
    .insert(&txn)
    .await?;

    for row in &cart {
        OrderItemActive {
            id: NotSet,
            order_id: Set(order.id),
            menuitem_id: Set(row.menuitem_id),
            quantity: Set(row.quantity),
            unit_price: Set(row.unit_price),
            price: Set(row.price),
        }
        .insert(&txn)
        .await?;

        let menu_item = stock
            .remove(&row.menuitem_id)
            .ok_or_else(|| AppError::not_found("Menu item"))?;
        if menu_item.inventory < row.quantity {
            tracing::warn!(
                menu_item_id = menu_item.id,
                inventory = menu_item.inventory,
                ordered = row.quantity,
                "ordered more than the inventory holds, flooring at zero"
            );
        }
        let remaining = (menu_item.inventory - row.quantity).max(0);
        let mut active: MenuItemActive = menu_item.into();
        active.inventory = Set(remaining);
        active.update(&txn).await?;
    }

    CartItems::delete_many()
        .filter(CartCol::UserId.eq(user.user_id))
        .exec(&txn)
        .await?;

    txn.commit().await?;

    tracing::info!(
        order_id = order.id,
        user_id = user.user_id,
        total = order.total,
        lines = cart.len(),
        "order placed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_place",
        "orders",
        serde_json::json!({ "order_id": order.id, "total": order.total }),
    )
    .await;

    let order = hydrate_order(&state.orm, order).await?;
    Ok(ApiResponse::item("Order placed", order))
}

/// Partial update of an order.
///
/// Managers and admins assign the crew and set the status directly (the status may skip
/// ahead but never go back). Delivery crew may only mark their own assigned orders
/// delivered. Everyone else is refused.
pub async fn update_order(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: PatchOrderRequest,
) -> AppResult<ApiResponse<Order>> {
    let txn = state.orm.begin().await?;
    let order = Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    let mut active: OrderActive = order.clone().into();
    if is_manager(user) && !payload.is_empty() {
        if let Some(crew) = payload.delivery_crew_id {
            if let Some(crew_id) = crew {
                let exists = Users::find()
                    .filter(UserCol::Id.eq(crew_id))
                    .count(&txn)
                    .await?
                    > 0;
                if !exists {
                    return Err(AppError::field(
                        "delivery_crew_id",
                        format!("Invalid pk \"{crew_id}\" - object does not exist."),
                    ));
                }
            }
            active.delivery_crew_id = Set(crew);
        }
        if let Some(status) = payload.status {
            if !order.status.can_advance_to(status) {
                return Err(AppError::field(
                    "status",
                    format!(
                        "Cannot move an order from {:?} back to {:?}.",
                        order.status, status
                    ),
                ));
            }
            active.status = Set(status);
        }
    } else if user.in_group(DELIVERY_CREW) {
        if order.delivery_crew_id != Some(user.user_id) {
            return Err(AppError::Forbidden("Not your order.".into()));
        }
        if payload.status != Some(OrderStatus::Delivered) || payload.delivery_crew_id.is_some() {
            return Err(AppError::Forbidden(
                "Delivery crew can only mark delivered.".into(),
            ));
        }
        active.status = Set(OrderStatus::Delivered);
    } else {
        return Err(AppError::Forbidden("Not allowed.".into()));
    }

    let updated = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(
        order_id = updated.id,
        status = ?updated.status,
        delivery_crew_id = ?updated.delivery_crew_id,
        actor = user.user_id,
        "order updated"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_update",
        "orders",
        serde_json::json!({
            "order_id": updated.id,
            "status": updated.status,
            "delivery_crew_id": updated.delivery_crew_id,
        }),
    )
    .await;

    let order = hydrate_order(&state.orm, updated).await?;
    Ok(ApiResponse::item("Order updated", order))
}

/// Removes an order and its lines. Inventory is not restored.
pub async fn delete_order(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    require(user, Permission::IsManager)?;

    let txn = state.orm.begin().await?;
    Orders::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Order"))?;

    OrderItems::delete_many()
        .filter(OrderItemCol::OrderId.eq(id))
        .exec(&txn)
        .await?;
    Orders::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "order_delete",
        "orders",
        serde_json::json!({ "order_id": id }),
    )
    .await;

    Ok(())
}

async fn hydrate_order<C: ConnectionTrait>(conn: &C, order: OrderModel) -> AppResult<Order> {
    hydrate_orders(conn, vec![order])
        .await?
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow!("order vanished while loading")))
}

/// Loads customers, crews, lines and menu items for a page of orders.
async fn hydrate_orders<C: ConnectionTrait>(
    conn: &C,
    orders: Vec<OrderModel>,
) -> AppResult<Vec<Order>> {
    if orders.is_empty() {
        return Ok(Vec::new());
    }

    let order_ids: Vec<i32> = orders.iter().map(|o| o.id).collect();
    let lines = OrderItems::find()
        .filter(OrderItemCol::OrderId.is_in(order_ids))
        .order_by_asc(OrderItemCol::Id)
        .all(conn)
        .await?;

    let menu_ids: BTreeSet<i32> = lines.iter().map(|l| l.menuitem_id).collect();
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

    let user_ids: BTreeSet<i32> = orders
        .iter()
        .flat_map(|o| std::iter::once(o.user_id).chain(o.delivery_crew_id))
        .collect();
    let users: HashMap<i32, User> = Users::find()
        .filter(UserCol::Id.is_in(user_ids))
        .all(conn)
        .await?
        .into_iter()
        .map(|u| (u.id, User::from(u)))
        .collect();

    let mut lines_by_order: HashMap<i32, Vec<OrderItem>> = HashMap::new();
    for line in lines {
        let menuitem = menu.get(&line.menuitem_id).cloned().ok_or_else(|| {
            AppError::Internal(anyhow!("order line {} lost its menu item", line.id))
        })?;
        lines_by_order
            .entry(line.order_id)
            .or_default()
            .push(OrderItem {
                id: line.id,
                menuitem,
                quantity: line.quantity,
                unit_price: line.unit_price,
                price: line.price,
            });
    }

    orders
        .into_iter()
        .map(|order| {
            let customer = users.get(&order.user_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow!("order {} lost its customer", order.id))
            })?;
            let delivery_crew = order
                .delivery_crew_id
                .and_then(|crew_id| users.get(&crew_id).cloned());
            Ok(Order {
                id: order.id,
                user: customer,
                delivery_crew,
                status: order.status,
                total: order.total,
                date: order.date.with_timezone(&Utc),
                items: lines_by_order.remove(&order.id).unwrap_or_default(),
            })
        })
        .collect()
}
