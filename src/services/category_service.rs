use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use sea_orm::sea_query::LockType;

use crate::{
    audit,
    dto::categories::{CategoryList, CategoryPatch, CategoryRequest},
    entity::{
        cart_items::{Column as CartCol, Entity as CartItems},
        categories::{ActiveModel, Column, Entity as Categories},
        menu_items::{Column as MenuCol, Entity as MenuItems},
        order_items::{Column as OrderItemCol, Entity as OrderItems},
    },
    error::{AppError, AppResult, FieldErrors},
    middleware::auth::AuthUser,
    models::Category,
    permissions::{Permission, require},
    response::{ApiResponse, Meta},
    routes::params::Pagination,
    state::AppState,
};

pub async fn list_categories(
    state: &AppState,
    pagination: Pagination,
) -> AppResult<ApiResponse<CategoryList>> {
    let window = pagination.normalize()?;
    let finder = Categories::find().order_by_asc(Column::Id);

    let total = finder.clone().count(&state.orm).await?;
    let items = finder
        .limit(window.per_page as u64)
        .offset(window.offset as u64)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(Category::from)
        .collect();

    Ok(ApiResponse::success(
        "Categories",
        CategoryList { items },
        Some(Meta::for_window(&window, total)),
    ))
}

pub async fn get_category(state: &AppState, id: i32) -> AppResult<ApiResponse<Category>> {
    let category = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    Ok(ApiResponse::item("Category", category.into()))
}

pub async fn create_category(
    state: &AppState,
    user: &AuthUser,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    require(user, Permission::IsAdmin)?;
    let patch = CategoryPatch::from(payload);
    patch.validate()?;
    ensure_unique(&state.orm, &patch, None).await?;

    let (Some(title), Some(slug)) = (patch.title, patch.slug) else {
        return Err(AppError::BadRequest("title and slug are required".into()));
    };
    let category = ActiveModel {
        id: NotSet,
        title: Set(title),
        slug: Set(slug),
    }
    .insert(&state.orm)
    .await?;

    tracing::info!(category_id = category.id, slug = %category.slug, "category created");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "category_create",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::item("Category created", category.into()))
}

/// Full replacement (`PUT`): every field is supplied.
pub async fn replace_category(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: CategoryRequest,
) -> AppResult<ApiResponse<Category>> {
    update_category(state, user, id, payload.into()).await
}

pub async fn update_category(
    state: &AppState,
    user: &AuthUser,
    id: i32,
    payload: CategoryPatch,
) -> AppResult<ApiResponse<Category>> {
    require(user, Permission::IsAdmin)?;
    payload.validate()?;

    let existing = Categories::find_by_id(id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;
    ensure_unique(&state.orm, &payload, Some(id)).await?;

    let mut active: ActiveModel = existing.into();
    if let Some(title) = payload.title {
        active.title = Set(title);
    }
    if let Some(slug) = payload.slug {
        active.slug = Set(slug);
    }
    let category = active.update(&state.orm).await?;

    audit::record(
        &state.orm,
        Some(user.user_id),
        "category_update",
        "categories",
        serde_json::json!({ "category_id": category.id }),
    )
    .await;

    Ok(ApiResponse::item("Updated", category.into()))
}

/// Deletes a category together with its menu items and any cart rows holding them.
/// Refused while an order line references one of those items.
pub async fn delete_category(state: &AppState, user: &AuthUser, id: i32) -> AppResult<()> {
    require(user, Permission::IsAdmin)?;

    let txn = state.orm.begin().await?;
    Categories::find_by_id(id)
        .lock(LockType::Update)
        .one(&txn)
        .await?
        .ok_or_else(|| AppError::not_found("Category"))?;

    let item_ids: Vec<i32> = MenuItems::find()
        .filter(MenuCol::CategoryId.eq(id))
        .lock(LockType::Update)
        .all(&txn)
        .await?
        .into_iter()
        .map(|item| item.id)
        .collect();

    if !item_ids.is_empty() {
        let referenced = OrderItems::find()
            .filter(OrderItemCol::MenuitemId.is_in(item_ids.clone()))
            .count(&txn)
            .await?;
        if referenced > 0 {
            return Err(AppError::BadRequest(
                "Cannot delete category: some of its menu items appear in orders".into(),
            ));
        }

        CartItems::delete_many()
            .filter(CartCol::MenuitemId.is_in(item_ids.clone()))
            .exec(&txn)
            .await?;
        MenuItems::delete_many()
            .filter(MenuCol::CategoryId.eq(id))
            .exec(&txn)
            .await?;
    }

    Categories::delete_by_id(id).exec(&txn).await?;
    txn.commit().await?;

    tracing::info!(category_id = id, menu_items = item_ids.len(), "category deleted");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "category_delete",
        "categories",
        serde_json::json!({ "category_id": id, "menu_item_ids": item_ids }),
    )
    .await;

    Ok(())
}

async fn ensure_unique<C: ConnectionTrait>(
    conn: &C,
    patch: &CategoryPatch,
    current: Option<i32>,
) -> AppResult<()> {
    let mut errors = FieldErrors::new();
    let checks = [
        ("title", Column::Title, patch.title.as_deref()),
        ("slug", Column::Slug, patch.slug.as_deref()),
    ];
    for (field, column, value) in checks {
        let Some(value) = value else { continue };
        let mut finder = Categories::find().filter(column.eq(value));
        if let Some(id) = current {
            finder = finder.filter(Column::Id.ne(id));
        }
        if finder.count(conn).await? > 0 {
            errors
                .entry(field.to_string())
                .or_default()
                .push(format!("category with this {field} already exists."));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(AppError::Validation(errors))
    }
}
