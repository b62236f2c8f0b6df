mod common;

use little_lemon_api::{
    dto::groups::AddMemberRequest,
    entity::{Groups, UserGroups},
    error::AppError,
    middleware::auth::AuthUser,
    services::group_service::{self, Roster, ensure_default_groups},
    state::AppState,
};
use sea_orm::{EntityTrait, PaginatorTrait};

async fn member_names(
    state: &AppState,
    actor: &AuthUser,
    roster: Roster,
) -> anyhow::Result<Vec<String>> {
    let resp = group_service::list_members(state, actor, roster).await?;
    Ok(resp
        .data
        .map(|list| list.items.into_iter().map(|u| u.username).collect())
        .unwrap_or_default())
}

#[tokio::test]
async fn default_groups_are_created_once() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    ensure_default_groups(&state.orm).await?;
    ensure_default_groups(&state.orm).await?;
    assert_eq!(Groups::find().count(&state.orm).await?, 2);
    Ok(())
}

#[tokio::test]
async fn admins_manage_the_manager_roster() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;

    let resp = group_service::add_member(
        &state,
        &cast.admin,
        Roster::Manager,
        AddMemberRequest {
            username: "tilly".into(),
        },
    )
    .await?;
    assert_eq!(resp.message, "tilly added to Manager");

    // Adding again keeps a single membership.
    group_service::add_member(
        &state,
        &cast.admin,
        Roster::Manager,
        AddMemberRequest {
            username: "tilly".into(),
        },
    )
    .await?;
    assert_eq!(
        member_names(&state, &cast.admin, Roster::Manager).await?,
        vec!["mario", "tilly"]
    );

    // Roles are read from the database, so the promotion applies at once.
    let promoted = common::auth_user(&state, cast.customer.user_id).await?;
    assert!(group_service::list_members(&state, &promoted, Roster::DeliveryCrew)
        .await
        .is_ok());

    group_service::remove_member(&state, &cast.admin, Roster::Manager, cast.customer.user_id)
        .await?;
    // Removing a non-member is a no-op.
    group_service::remove_member(&state, &cast.admin, Roster::Manager, cast.customer.user_id)
        .await?;
    assert_eq!(
        member_names(&state, &cast.admin, Roster::Manager).await?,
        vec!["mario"]
    );

    let refused = group_service::list_members(&state, &cast.manager, Roster::Manager).await;
    assert!(matches!(refused, Err(AppError::Forbidden(_))));
    Ok(())
}

#[tokio::test]
async fn managers_manage_the_delivery_crew() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let cast = common::cast(&state).await?;

    assert_eq!(
        member_names(&state, &cast.manager, Roster::DeliveryCrew).await?,
        vec!["adrian", "sofia"]
    );

    group_service::add_member(
        &state,
        &cast.manager,
        Roster::DeliveryCrew,
        AddMemberRequest {
            username: "jamie".into(),
        },
    )
    .await?;
    group_service::remove_member(&state, &cast.manager, Roster::DeliveryCrew, cast.crew.user_id)
        .await?;
    assert_eq!(
        member_names(&state, &cast.manager, Roster::DeliveryCrew).await?,
        vec!["sofia", "jamie"]
    );

    let unknown = group_service::add_member(
        &state,
        &cast.manager,
        Roster::DeliveryCrew,
        AddMemberRequest {
            username: "nobody".into(),
        },
    )
    .await;
    assert!(matches!(unknown, Err(AppError::NotFound(_))));

    let unknown_id =
        group_service::remove_member(&state, &cast.manager, Roster::DeliveryCrew, 9999).await;
    assert!(matches!(unknown_id, Err(AppError::NotFound(_))));

    let refused = group_service::add_member(
        &state,
        &cast.crew,
        Roster::DeliveryCrew,
        AddMemberRequest {
            username: "tilly".into(),
        },
    )
    .await;
    assert!(matches!(refused, Err(AppError::Forbidden(_))));

    assert_eq!(UserGroups::find().count(&state.orm).await?, 3);
    Ok(())
}
