#![allow(dead_code)]

use chrono::Utc;
use little_lemon_api::{
    dto::{categories::CategoryRequest, menu_items::MenuItemRequest},
    entity::{
        AuditLogs, CartItems, Categories, Groups, MenuItems, OrderItems, Orders, UserGroups,
        Users, cart_items, groups, user_groups, users,
    },
    middleware::auth::AuthUser,
    models::{Category, MenuItem},
    services::{
        auth_service::hash_password, category_service, group_service::ensure_default_groups,
        menu_service,
    },
    state::AppState,
};
use sea_orm::sea_query::Index;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, ConnectOptions, ConnectionTrait,
    Database, DatabaseConnection, EntityTrait, QueryFilter, Schema, Set,
};

pub const PASSWORD: &str = "lemon-pass-1";
pub const JWT_SECRET: &str = "test-secret";

/// Fresh in-memory database with the schema built from the entities and both groups present.
/// A single connection keeps every query on the same in-memory database.
pub async fn setup_state() -> anyhow::Result<AppState> {
    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    let orm = Database::connect(options).await?;

    create_schema(&orm).await?;
    ensure_default_groups(&orm).await?;

    Ok(AppState::new(orm, JWT_SECRET, 1))
}

async fn create_schema(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let backend = conn.get_database_backend();
    let schema = Schema::new(backend);
    let tables = [
        schema.create_table_from_entity(Users),
        schema.create_table_from_entity(Groups),
        schema.create_table_from_entity(UserGroups),
        schema.create_table_from_entity(Categories),
        schema.create_table_from_entity(MenuItems),
        schema.create_table_from_entity(CartItems),
        schema.create_table_from_entity(Orders),
        schema.create_table_from_entity(OrderItems),
        schema.create_table_from_entity(AuditLogs),
    ];
    for table in &tables {
        conn.execute(backend.build(table)).await?;
    }

    // Composite unique key from the migration; the cart upsert conflicts on it.
    let cart_line = Index::create()
        .name("cart_items_user_id_menuitem_id_key")
        .table(CartItems)
        .col(cart_items::Column::UserId)
        .col(cart_items::Column::MenuitemId)
        .unique()
        .to_owned();
    conn.execute(backend.build(&cart_line)).await?;
    Ok(())
}

pub async fn create_user(state: &AppState, username: &str, is_staff: bool) -> anyhow::Result<i32> {
    let user = users::ActiveModel {
        id: NotSet,
        username: Set(username.to_string()),
        email: Set(format!("{username}@littlelemon.test")),
        password_hash: Set(hash_password(PASSWORD)?),
        is_staff: Set(is_staff),
        created_at: Set(Utc::now().into()),
    }
    .insert(&state.orm)
    .await?;
    Ok(user.id)
}

pub async fn join_group(state: &AppState, user_id: i32, group: &str) -> anyhow::Result<()> {
    let group = Groups::find()
        .filter(groups::Column::Name.eq(group))
        .one(&state.orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("group {group} missing"))?;
    UserGroups::insert(user_groups::ActiveModel {
        user_id: Set(user_id),
        group_id: Set(group.id),
    })
    .exec_without_returning(&state.orm)
    .await?;
    Ok(())
}

pub async fn auth_user(state: &AppState, user_id: i32) -> anyhow::Result<AuthUser> {
    AuthUser::load(&state.orm, user_id)
        .await?
        .ok_or_else(|| anyhow::anyhow!("user {user_id} missing"))
}

/// The usual cast: an admin, a manager, two delivery crew members and two customers.
pub struct Cast {
    pub admin: AuthUser,
    pub manager: AuthUser,
    pub crew: AuthUser,
    pub other_crew: AuthUser,
    pub customer: AuthUser,
    pub other_customer: AuthUser,
}

pub async fn cast(state: &AppState) -> anyhow::Result<Cast> {
    let admin = create_user(state, "admin", true).await?;
    let manager = create_user(state, "mario", false).await?;
    let crew = create_user(state, "adrian", false).await?;
    let other_crew = create_user(state, "sofia", false).await?;
    let customer = create_user(state, "tilly", false).await?;
    let other_customer = create_user(state, "jamie", false).await?;

    join_group(state, manager, groups::MANAGER).await?;
    join_group(state, crew, groups::DELIVERY_CREW).await?;
    join_group(state, other_crew, groups::DELIVERY_CREW).await?;

    Ok(Cast {
        admin: auth_user(state, admin).await?,
        manager: auth_user(state, manager).await?,
        crew: auth_user(state, crew).await?,
        other_crew: auth_user(state, other_crew).await?,
        customer: auth_user(state, customer).await?,
        other_customer: auth_user(state, other_customer).await?,
    })
}

pub async fn category(
    state: &AppState,
    admin: &AuthUser,
    title: &str,
    slug: &str,
) -> anyhow::Result<Category> {
    let resp = category_service::create_category(
        state,
        admin,
        CategoryRequest {
            title: title.into(),
            slug: slug.into(),
        },
    )
    .await?;
    resp.data.ok_or_else(|| anyhow::anyhow!("no category in response"))
}

pub async fn menu_item(
    state: &AppState,
    admin: &AuthUser,
    title: &str,
    price: i64,
    inventory: i32,
    category_id: i32,
) -> anyhow::Result<MenuItem> {
    let resp = menu_service::create_menu_item(
        state,
        admin,
        MenuItemRequest {
            title: title.into(),
            price,
            inventory,
            category_id,
        },
    )
    .await?;
    resp.data.ok_or_else(|| anyhow::anyhow!("no menu item in response"))
}
