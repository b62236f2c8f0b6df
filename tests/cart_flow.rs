mod common;

use little_lemon_api::{
    dto::{cart::AddToCartRequest, menu_items::MenuItemPatch},
    entity::{CartItems, cart_items},
    error::AppError,
    services::{cart_service, menu_service},
};
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter};

#[tokio::test]
async fn repeat_adds_grow_one_row_at_the_snapshot_price() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let mains = common::category(&state, &cast.admin, "Mains", "mains").await?;
    let fish = common::menu_item(&state, &cast.admin, "Grilled Fish", 2000, 10, mains.id).await?;

    cart_service::add_to_cart(
        &state,
        &cast.customer,
        AddToCartRequest {
            menuitem_id: fish.id,
            quantity: 2,
        },
    )
    .await?;

    // A price change after the first add does not reprice the existing row.
    menu_service::update_menu_item(
        &state,
        &cast.admin,
        fish.id,
        MenuItemPatch {
            price: Some(2500),
            ..Default::default()
        },
    )
    .await?;

    let row = cart_service::add_to_cart(
        &state,
        &cast.customer,
        AddToCartRequest {
            menuitem_id: fish.id,
            quantity: 3,
        },
    )
    .await?
    .data
    .expect("cart row");
    assert_eq!(row.quantity, 5);
    assert_eq!(row.unit_price, 2000);
    assert_eq!(row.price, 10_000);
    assert_eq!(row.menuitem.id, fish.id);

    let cart = cart_service::list_cart(&state, &cast.customer)
        .await?
        .data
        .expect("cart");
    assert_eq!(cart.items.len(), 1);
    Ok(())
}

#[tokio::test]
async fn upserting_an_existing_line_increments_it() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let mains = common::category(&state, &cast.admin, "Mains", "mains").await?;
    let fish = common::menu_item(&state, &cast.admin, "Grilled Fish", 2000, 10, mains.id).await?;

    // Two writers that both missed the existing line still end up on one row.
    let first =
        cart_service::upsert_cart_line(&state.orm, cast.customer.user_id, fish.id, 1, 2000)
            .await?;
    let second =
        cart_service::upsert_cart_line(&state.orm, cast.customer.user_id, fish.id, 2, 2500)
            .await?;

    assert_eq!(second.id, first.id);
    assert_eq!(second.quantity, 3);
    assert_eq!(second.unit_price, 2000);
    assert_eq!(second.price, 6000);

    let rows = CartItems::find()
        .filter(cart_items::Column::UserId.eq(cast.customer.user_id))
        .count(&state.orm)
        .await?;
    assert_eq!(rows, 1);
    Ok(())
}

#[tokio::test]
async fn carts_are_per_user_and_clear_all_at_once() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let desserts = common::category(&state, &cast.admin, "Desserts", "desserts").await?;
    let cake = common::menu_item(&state, &cast.admin, "Lemon Cake", 600, 10, desserts.id).await?;
    let tart = common::menu_item(&state, &cast.admin, "Lemon Tart", 650, 10, desserts.id).await?;

    for (user, item) in [
        (&cast.customer, cake.id),
        (&cast.customer, tart.id),
        (&cast.other_customer, cake.id),
    ] {
        cart_service::add_to_cart(
            &state,
            user,
            AddToCartRequest {
                menuitem_id: item,
                quantity: 1,
            },
        )
        .await?;
    }

    let removed = cart_service::clear_cart(&state, &cast.customer).await?;
    assert_eq!(removed, 2);

    let mine = cart_service::list_cart(&state, &cast.customer).await?.data.expect("cart");
    assert!(mine.items.is_empty());
    let theirs = cart_service::list_cart(&state, &cast.other_customer)
        .await?
        .data
        .expect("cart");
    assert_eq!(theirs.items.len(), 1);

    // Clearing an empty cart is not an error.
    assert_eq!(cart_service::clear_cart(&state, &cast.customer).await?, 0);
    Ok(())
}

#[tokio::test]
async fn bad_cart_requests_are_refused() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;
    let desserts = common::category(&state, &cast.admin, "Desserts", "desserts").await?;
    let cake = common::menu_item(&state, &cast.admin, "Lemon Cake", 600, 10, desserts.id).await?;

    let zero = cart_service::add_to_cart(
        &state,
        &cast.customer,
        AddToCartRequest {
            menuitem_id: cake.id,
            quantity: 0,
        },
    )
    .await;
    assert!(matches!(zero, Err(AppError::Validation(_))));

    let unknown = cart_service::add_to_cart(
        &state,
        &cast.customer,
        AddToCartRequest {
            menuitem_id: 4242,
            quantity: 1,
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    assert_eq!(CartItems::find().count(&state.orm).await?, 0);
    Ok(())
}

#[test]
fn line_price_multiplies_and_rejects_overflow() {
    assert_eq!(cart_service::line_price(3, 1250).ok(), Some(3750));
    assert!(cart_service::line_price(i32::MAX, i64::MAX).is_err());
}
