use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, Set, sea_query::OnConflict,
};

use little_lemon_api::{
    config,
    db::{create_orm_conn, run_migrations},
    entity::{
        Categories, Groups, MenuItems, UserGroups, Users, categories, groups, menu_items,
        user_groups, users,
    },
    services::{auth_service::hash_password, group_service::ensure_default_groups},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let database_url = config::database_url()?;

    let orm = create_orm_conn(&database_url).await?;
    // Ensure migrations are applied.
    run_migrations(&orm).await?;
    ensure_default_groups(&orm).await?;

    let admin_id = ensure_user(&orm, "admin", "admin@littlelemon.test", "admin1234", true).await?;
    let manager_id =
        ensure_user(&orm, "mario", "mario@littlelemon.test", "manager1234", false).await?;
    let crew_id = ensure_user(&orm, "adrian", "adrian@littlelemon.test", "crew12345", false).await?;
    let customer_id =
        ensure_user(&orm, "tilly", "tilly@example.com", "customer1234", false).await?;

    ensure_member(&orm, manager_id, groups::MANAGER).await?;
    ensure_member(&orm, crew_id, groups::DELIVERY_CREW).await?;
    seed_menu(&orm).await?;

    println!(
        "Seed completed. Admin ID: {admin_id}, Manager ID: {manager_id}, \
         Delivery crew ID: {crew_id}, Customer ID: {customer_id}"
    );
    Ok(())
}

async fn ensure_user(
    orm: &DatabaseConnection,
    username: &str,
    email: &str,
    password: &str,
    is_staff: bool,
) -> anyhow::Result<i32> {
    if let Some(existing) = Users::find()
        .filter(users::Column::Username.eq(username))
        .one(orm)
        .await?
    {
        println!("User {username} already present");
        return Ok(existing.id);
    }

    let user = users::ActiveModel {
        id: NotSet,
        username: Set(username.to_string()),
        email: Set(email.to_string()),
        password_hash: Set(hash_password(password)?),
        is_staff: Set(is_staff),
        created_at: Set(Utc::now().into()),
    }
    .insert(orm)
    .await?;

    println!("Created user {username} (staff={is_staff})");
    Ok(user.id)
}

async fn ensure_member(orm: &DatabaseConnection, user_id: i32, group: &str) -> anyhow::Result<()> {
    let group = Groups::find()
        .filter(groups::Column::Name.eq(group))
        .one(orm)
        .await?
        .ok_or_else(|| anyhow::anyhow!("group {group:?} is missing"))?;

    UserGroups::insert(user_groups::ActiveModel {
        user_id: Set(user_id),
        group_id: Set(group.id),
    })
    .on_conflict(
        OnConflict::columns([user_groups::Column::UserId, user_groups::Column::GroupId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(orm)
    .await?;
    Ok(())
}

async fn seed_menu(orm: &DatabaseConnection) -> anyhow::Result<()> {
    let menu: [(&str, &str, &[(&str, i64, i32)]); 3] = [
        (
            "Appetizers",
            "appetizers",
            &[("Bruschetta", 750, 40), ("Greek Salad", 1250, 30)],
        ),
        (
            "Main Courses",
            "main-courses",
            &[("Grilled Fish", 2000, 15), ("Lemon Chicken", 1850, 20)],
        ),
        (
            "Desserts",
            "desserts",
            &[("Lemon Dessert", 550, 25), ("Baklava", 500, 25)],
        ),
    ];

    for (title, slug, items) in menu {
        let category = match Categories::find()
            .filter(categories::Column::Slug.eq(slug))
            .one(orm)
            .await?
        {
            Some(category) => category,
            None => {
                categories::ActiveModel {
                    id: NotSet,
                    title: Set(title.to_string()),
                    slug: Set(slug.to_string()),
                }
                .insert(orm)
                .await?
            }
        };

        for &(name, price, inventory) in items {
            MenuItems::insert(menu_items::ActiveModel {
                id: NotSet,
                title: Set(name.to_string()),
                price: Set(price),
                inventory: Set(inventory),
                category_id: Set(category.id),
                featured: Set(false),
            })
            .on_conflict(
                OnConflict::columns([menu_items::Column::Title, menu_items::Column::CategoryId])
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(orm)
            .await?;
        }
    }

    println!("Seeded menu");
    Ok(())
}
