use std::collections::{BTreeSet, HashMap};

use anyhow::anyhow;
use sea_orm::sea_query::{Expr, Func, LikeExpr, LockType};
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, Condition, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use crate::{
    audit,
    dto::menu_items::{MenuItemList, MenuItemPatch, MenuItemRequest, SetFeaturedRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        categories::{Column as CategoryCol, Entity as Categories},
        menu_items::{ActiveModel, Column, Entity as MenuItems, Model as MenuItemModel},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
    },
    error::{AppError, AppResult, NON_FIELD_ERRORS},
    middleware::auth::AuthUser,
    models::{Category, MenuItem},
    permissions::{Permission, require},
    response::{ApiResponse, Meta},
    routes::params::{MenuItemQuery, PriceOrdering},
    state::AppState,
};

pub async fn list_menu_items(
    state: &AppState,
    query: MenuItemQuery,
) -> AppResult<ApiResponse<MenuItemList>> {
    let window = query.window()?;
    let mut condition = Condition::all();

    if let Some(category) = query.category.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        // Match by slug and, when the value is numeric, by id; items of either match.
        let mut matching = Condition::any().add(CategoryCol::Slug.eq(category));
        if let Ok(id) = category.parse::<i32>() {
            matching = matching.add(CategoryCol::Id.eq(id));
        }
        let category_ids: Vec<i32> = Categories::find()
            .filter(matching)
            .all(&state.orm)
            .await?
            .into_iter()
            .map(|c| c.id)
            .collect();
        condition = condition.add(Column::CategoryId.is_in(category_ids));
    }

    if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
        let pattern = format!("%{}%", escape_like(&search.to_lowercase()));
        condition = condition.add(
            Expr::expr(Func::lower(Expr::col(Column::Title)))
                .like(LikeExpr::new(pattern).escape('\\')),
        );
    }

    let mut finder = MenuItems::find().filter(condition);
    finder = match query.ordering.as_deref().and_then(PriceOrdering::parse) {
        Some(PriceOrdering::Ascending) => finder.order_by_asc(Column::Price),
        Some(PriceOrdering::Descending) => finder.order_by_desc(Column::Price),
        None => finder,
    };
    finder = finder.order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await?;
    let rows = finder
        .limit(window.per_page as u64)
        .offset(window.offset as u64)
        .all(&state.orm)
        .await?;
    let items = hydrate_menu_items(&state.orm, rows).await?;

    Ok(ApiResponse::success(
        "Menu items",
        MenuItemList { items },
        Some(Meta::for_window(&window, total)),
    ))
}

pub async fn get_menu_item(state: &AppState, id: i32) -> AppResult<ApiResponse<MenuItem>> {
    let item = find_menu_item(&state.orm, id).await?;
    let item = hydrate_menu_item(&state.orm, item).await?;
    Ok(ApiResponse::item("Menu item", item))
}

pub async fn create_menu_item(
    state: &AppState,
    user: &AuthUser,
    payload: MenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    require(user, Permission::IsAdmin)?;
    let patch = MenuItemPatch::from(payload.clone());
    patch.validate()?;
    ensure_category_exists(&state.orm, payload.category_id).await?;
    ensure_unique_title(&state.orm, &payload.title, payload.category_id, None).await?;

    let item = ActiveModel {
        id: NotSet,
        title: Set(payload.title),
        price: Set(payload.price),
        inventory: Set(payload.inventory),
        category_id: Set(payload.category_id),
        featured: Set(false),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(menu_item_id = item.id, price = item.price, "menu item created");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_create",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    let item = hydrate_menu_item(&state.orm, item).await?;
    Ok(ApiResponse::item("Menu item created", item))
}

/// Full replacement (`PUT`).
pub async fn replace_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: MenuItemRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    update_menu_item(state, user, id, payload.into()).await
}

pub async fn update_menu_item(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: MenuItemPatch,
) -> AppResult<ApiResponse<MenuItem>> {
    require(user, Permission::IsAdmin)?;
    payload.validate()?;

    let existing = find_menu_item(&state.orm, id).await?;
    if let Some(category_id) = payload.category_id {
        ensure_category_exists(&state.orm, category_id).await?;
    }
    let title = payload.title.as_deref().unwrap_or(&existing.title);
    let category_id = payload.category_id.unwrap_or(existing.category_id);
    ensure_unique_title(&state.orm, title, category_id, Some(id)).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(price) = payload.price {
        active.price = Set(price);
    }
    if let Some(inventory) = payload.inventory {
        active.inventory = Set(inventory);
    }
    if let Some(category_id) = payload.category_id {
        active.category_id = Set(category_id);
    }
    let item = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_update",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id }),
    )
    .await;

    let item = hydrate_menu_item(&state.orm, item).await?;
    Ok(ApiResponse::item("Updated", item))
}

/// Deletes a menu item and the cart rows holding it. Refused while an order line
/// references the item.
pub async fn delete_menu_item(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    require(user, Permission::IsAdmin)?;

    let txn = state.orm.begin().await?;
    MenuItems::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;

    let referenced = OrderItems::find()
        .filter(OrderItemCol::MenuitemId.eq(id))
        .count(&txn)
        .await?;
    if referenced > 0 {
        return Err(AppError::BadRequest(
            "Cannot delete menu item: it appears in existing orders".into(),
        ));
    }

    CartItems::delete_many()
        .filter(CartCol::MenuitemId.eq(id))
        .exec(&txn)
        .await?;
    MenuItems::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_delete",
        "menu_items",
        serde_json::json!({ "menu_item_id": id }),
    )
    .await;

    Ok(())
}

/// The current item of the day, if one is set.
pub async fn get_featured(state: &AppState, user: &AuthUser) -> AppResult<Option<MenuItem>> {
    require(user, Permission::IsManager)?;
    let item = MenuItems::find()
        .filter(Column::Featured.eq(true))
        .order_by_asc(Column::Id)
        .one(&state.orm)
        .await?;
    match item {
        Some(item) => Ok(Some(hydrate_menu_item(&state.orm, item).await?)),
        None => Ok(None),
    }
}

/// Makes `menuitem_id` the only featured item.
///
/// The clear and the set happen in one transaction with the involved rows locked; the
/// Postgres schema also keeps a partial unique index on featured items, so a concurrent
/// update that would leave two featured items fails instead.
pub async fn set_featured(
    state: &AppState,
    user: &AuthUser,
    payload: SetFeaturedRequest,
) -> AppResult<ApiResponse<MenuItem>> {
    require(user, Permission::IsManager)?;

    let txn = state.orm.begin().await?;
    let item = MenuItems::find_by_id(payload.menuitem_id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))?;

    let previous: Vec<i32> = MenuItems::find()
        .filter(Column::Featured.eq(true))
        .filter(Column::Id.ne(item.id))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|m| m.id)
        .collect();

    if !previous.is_empty() {
        MenuItems::update_many()
            .col_expr(Column::Featured, Expr::value(false))
            .filter(Column::Id.is_in(previous.clone()))
            .exec(&txn)
            .await?;
    }

    let mut active: ActiveModel = item.into();
    active.featured = Set(true);
    let item = active.update(&txn).await?;
    txn.commit().await?;

    tracing::info!(menu_item_id = item.id, ?previous, "featured item changed");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "menu_item_featured",
        "menu_items",
        serde_json::json!({ "menu_item_id": item.id, "previous": previous }),
    )
    .await;

    let item = hydrate_menu_item(&state.orm, item).await?;
    Ok(ApiResponse::item("Featured item set", item))
}

pub(crate) async fn find_menu_item<C: ConnectionTrait>(
    conn: &C,
    id: i32,
) -> AppResult<MenuItemModel> {
    MenuItems::find_by_id(id)
        .one(conn)
        .await?
        .ok_or_else(|| AppError::not_found("Menu item"))
}

/// Attaches categories to menu item rows, keeping the input order.
pub(crate) async fn hydrate_menu_items<C: ConnectionTrait>(
    conn: &C,
    rows: Vec<MenuItemModel>,
) -> AppResult<Vec<MenuItem>> {
    let category_ids: BTreeSet<i32> = rows.iter().map(|m| m.category_id).collect();
    let categories: HashMap<i32, Category> = if category_ids.is_empty() {
        HashMap::new()
    } else {
        Categories::find()
            .filter(CategoryCol::Id.is_in(category_ids))
            .all(conn)
            .await?
            .into_iter()
            .map(|c| (c.id, Category::from(c)))
            .collect()
    };

    rows.into_iter()
        .map(|row| {
            let category = categories.get(&row.category_id).cloned().ok_or_else(|| {
                AppError::Internal(anyhow!(
                    "menu item {} points at missing category {}",
                    row.id,
                    row.category_id
                ))
            })?;
            Ok(menu_item_from_entity(row, category))
        })
        .collect()
}

pub(crate) async fn hydrate_menu_item<C: ConnectionTrait>(
    conn: &C,
    row: MenuItemModel,
) -> AppResult<MenuItem> {
    let mut items = hydrate_menu_items(conn, vec![row]).await?;
    items
        .pop()
        .ok_or_else(|| AppError::Internal(anyhow!("menu item vanished while loading")))
}

fn menu_item_from_entity(model: MenuItemModel, category: Category) -> MenuItem {
    MenuItem {
        id: model.id,
        title: model.title,
        price: model.price,
        inventory: model.inventory,
        featured: model.featured,
        category,
    }
}

async fn ensure_category_exists<C: ConnectionTrait>(conn: &C, category_id: i32) -> AppResult<()> {
    let exists = Categories::find_by_id(category_id).count(conn).await? > 0;
    if exists {
        Ok(())
    } else {
        Err(AppError::field(
            "category_id",
            format!("Invalid pk \"{category_id}\" - object does not exist."),
        ))
    }
}

async fn ensure_unique_title<C: ConnectionTrait>(
    conn: &C,
    title: &str,
    category_id: i32,
    current: Option<i32>,
) -> AppResult<()> {
    let mut finder = MenuItems::find()
        .filter(Column::Title.eq(title))
        .filter(Column::CategoryId.eq(category_id));
    if let Some(id) = current {
        finder = finder.filter(Column::Id.ne(id));
    }
    if finder.count(conn).await? > 0 {
        return Err(AppError::field(
            NON_FIELD_ERRORS,
            "The fields title, category must make a unique set.",
        ));
    }
    Ok(())
}

fn escape_like(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
