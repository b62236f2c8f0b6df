mod common;

use little_lemon_api::{
    dto::{
        cart::AddToCartRequest,
        categories::{CategoryPatch, CategoryRequest},
        menu_items::{MenuItemList, MenuItemPatch, SetFeaturedRequest},
    },
    entity::{CartItems, MenuItems},
    error::AppError,
    response::ApiResponse,
    routes::params::{MenuItemQuery, Pagination},
    services::{cart_service, category_service, menu_service, order_service},
};
use sea_orm::{EntityTrait, PaginatorTrait};

fn titles(resp: ApiResponse<MenuItemList>) -> Vec<String> {
    resp.data
        .map(|list| list.items.into_iter().map(|item| item.title).collect())
        .unwrap_or_default()
}

#[tokio::test]
async fn only_admins_change_the_catalog() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;

    let refused = category_service::create_category(
        &state,
        &cast.manager,
        CategoryRequest {
            title: "Drinks".into(),
            slug: "drinks".into(),
        },
    )
    .await;
    assert!(matches!(refused, Err(AppError::Forbidden(_))));

    let drinks = common::category(&state, &cast.admin, "Drinks", "drinks").await?;
    let lemonade = common::menu_item(&state, &cast.admin, "Lemonade", 350, 20, drinks.id).await?;
    let refused = menu_service::update_menu_item(
        &state,
        &cast.customer,
        lemonade.id,
        MenuItemPatch {
            price: Some(1),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(refused, Err(AppError::Forbidden(_))));
    Ok(())
}

#[tokio::test]
async fn catalog_validation_reports_field_errors() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let mains = common::category(&state, &cast.admin, "Mains", "mains").await?;

    let duplicate = category_service::create_category(
        &state,
        &cast.admin,
        CategoryRequest {
            title: "Other mains".into(),
            slug: "mains".into(),
        },
    )
    .await;
    match duplicate {
        Err(AppError::Validation(fields)) => assert!(fields.contains_key("slug")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let bad_slug = category_service::update_category(
        &state,
        &cast.admin,
        mains.id,
        CategoryPatch {
            slug: Some("Main Courses!".into()),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(bad_slug, Err(AppError::Validation(_))));

    let unknown_category = common::menu_item(&state, &cast.admin, "Soup", 500, 1, 9999).await;
    let err = unknown_category.expect_err("unknown category must be refused");
    match err.downcast_ref::<AppError>() {
        Some(AppError::Validation(fields)) => assert!(fields.contains_key("category_id")),
        other => panic!("expected validation error, got {other:?}"),
    }

    let negative = common::menu_item(&state, &cast.admin, "Soup", -5, 1, mains.id).await;
    assert!(negative.is_err());

    common::menu_item(&state, &cast.admin, "Soup", 500, 1, mains.id).await?;
    let same_title = common::menu_item(&state, &cast.admin, "Soup", 700, 1, mains.id).await;
    assert!(same_title.is_err());
    Ok(())
}

#[tokio::test]
async fn menu_items_filter_search_and_order() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let starters = common::category(&state, &cast.admin, "Starters", "starters").await?;
    let desserts = common::category(&state, &cast.admin, "Desserts", "desserts").await?;

    common::menu_item(&state, &cast.admin, "Bruschetta", 750, 10, starters.id).await?;
    common::menu_item(&state, &cast.admin, "Greek Salad", 1250, 10, starters.id).await?;
    common::menu_item(&state, &cast.admin, "Lemon Dessert", 550, 10, desserts.id).await?;
    common::menu_item(&state, &cast.admin, "Lemon Sorbet", 450, 10, desserts.id).await?;

    let by_slug = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            category: Some("desserts".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(titles(by_slug), vec!["Lemon Dessert", "Lemon Sorbet"]);

    let by_id = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            category: Some(starters.id.to_string()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(titles(by_id), vec!["Bruschetta", "Greek Salad"]);

    let search = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            search: Some("LEMON".into()),
            ordering: Some("price".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(titles(search), vec!["Lemon Sorbet", "Lemon Dessert"]);

    let descending = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            ordering: Some("-price".into()),
            ..Default::default()
        },
    )
    .await?;
    assert_eq!(
        titles(descending),
        vec!["Greek Salad", "Bruschetta", "Lemon Dessert", "Lemon Sorbet"]
    );

    let paged = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            page: Some(2),
            per_page: Some(3),
            ordering: Some("nonsense".into()),
            ..Default::default()
        },
    )
    .await?;
    let meta = paged.meta.clone().expect("meta");
    assert_eq!(meta.total, Some(4));
    assert_eq!(titles(paged), vec!["Lemon Sorbet"]);
    Ok(())
}

#[tokio::test]
async fn page_beyond_the_offset_range_is_rejected() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let starters = common::category(&state, &cast.admin, "Starters", "starters").await?;
    common::menu_item(&state, &cast.admin, "Bruschetta", 750, 10, starters.id).await?;

    let huge = menu_service::list_menu_items(
        &state,
        MenuItemQuery {
            page: Some(i64::MAX),
            per_page: Some(100),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(huge, Err(AppError::BadRequest(_))));

    let categories = category_service::list_categories(
        &state,
        Pagination {
            page: Some(i64::MAX),
            per_page: Some(2),
        },
    )
    .await;
    assert!(matches!(categories, Err(AppError::BadRequest(_))));

    let window = Pagination {
        page: Some(i64::MAX / 100),
        per_page: Some(100),
    }
    .normalize()?;
    assert_eq!(window.offset, (i64::MAX / 100 - 1) * 100);
    Ok(())
}

#[tokio::test]
async fn featuring_an_item_unfeatures_the_previous_one() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let mains = common::category(&state, &cast.admin, "Mains", "mains").await?;
    let a = common::menu_item(&state, &cast.admin, "Grilled Fish", 2000, 5, mains.id).await?;
    let b = common::menu_item(&state, &cast.admin, "Lemon Chicken", 1850, 5, mains.id).await?;

    assert!(menu_service::get_featured(&state, &cast.manager).await?.is_none());

    menu_service::set_featured(&state, &cast.manager, SetFeaturedRequest { menuitem_id: a.id })
        .await?;
    menu_service::set_featured(&state, &cast.manager, SetFeaturedRequest { menuitem_id: b.id })
        .await?;

    let featured: Vec<i32> = MenuItems::find()
        .all(&state.orm)
        .await?
        .into_iter()
        .filter(|m| m.featured)
        .map(|m| m.id)
        .collect();
    assert_eq!(featured, vec![b.id]);

    let current = menu_service::get_featured(&state, &cast.manager)
        .await?
        .expect("featured item");
    assert_eq!(current.id, b.id);

    let refused = menu_service::get_featured(&state, &cast.customer).await;
    assert!(matches!(refused, Err(AppError::Forbidden(_))));

    let missing =
        menu_service::set_featured(&state, &cast.admin, SetFeaturedRequest { menuitem_id: 404 })
            .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    Ok(())
}

#[tokio::test]
async fn deleting_a_category_cascades_until_an_order_references_it() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let specials = common::category(&state, &cast.admin, "Specials", "specials").await?;
    let mains = common::category(&state, &cast.admin, "Mains", "mains").await?;
    let special = common::menu_item(&state, &cast.admin, "Paella", 2400, 3, specials.id).await?;
    let ordered = common::menu_item(&state, &cast.admin, "Moussaka", 1900, 3, mains.id).await?;

    cart_service::add_to_cart(
        &state,
        &cast.customer,
        AddToCartRequest {
            menuitem_id: special.id,
            quantity: 1,
        },
    )
    .await?;

    category_service::delete_category(&state, &cast.admin, specials.id).await?;
    assert!(MenuItems::find_by_id(special.id).one(&state.orm).await?.is_none());
    assert_eq!(CartItems::find().count(&state.orm).await?, 0);

    cart_service::add_to_cart(
        &state,
        &cast.customer,
        AddToCartRequest {
            menuitem_id: ordered.id,
            quantity: 1,
        },
    )
    .await?;
    order_service::place_order(&state, &cast.customer).await?;

    let protected = category_service::delete_category(&state, &cast.admin, mains.id).await;
    assert!(matches!(protected, Err(AppError::BadRequest(_))));
    let protected = menu_service::delete_menu_item(&state, &cast.admin, ordered.id).await;
    assert!(matches!(protected, Err(AppError::BadRequest(_))));
    assert!(MenuItems::find_by_id(ordered.id).one(&state.orm).await?.is_some());
    Ok(())
}

#[tokio::test]
async fn partial_update_keeps_untouched_fields() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let mains = common::category(&state, &cast.admin, "Mains", "mains").await?;
    let item = common::menu_item(&state, &cast.admin, "Risotto", 1500, 8, mains.id).await?;

    let updated = menu_service::update_menu_item(
        &state,
        &cast.admin,
        item.id,
        MenuItemPatch {
            price: Some(1650),
            ..Default::default()
        },
    )
    .await?
    .data
    .expect("menu item");
    assert_eq!(updated.price, 1650);
    assert_eq!(updated.title, "Risotto");
    assert_eq!(updated.inventory, 8);
    assert_eq!(updated.category.id, mains.id);

    let missing = menu_service::get_menu_item(&state, 9999).await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));
    Ok(())
}
