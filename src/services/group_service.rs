use anyhow::anyhow;
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ActiveValue::NotSet, ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder, Set,
};

use crate::{
    audit,
    dto::groups::{AddMemberRequest, MemberList},
    entity::{
        groups::{self, DELIVERY_CREW, Entity as Groups, MANAGER},
        user_groups::{self, Entity as UserGroups},
        users::{self, Entity as Users},
    },
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
    models::User,
    permissions::{Permission, require},
    response::{ApiResponse, Meta},
    state::AppState,
};

/// The staff rosters that can be managed over the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Roster {
    Manager,
    DeliveryCrew,
}

impl Roster {
    pub fn group_name(self) -> &'static str {
        match self {
            Roster::Manager => MANAGER,
            Roster::DeliveryCrew => DELIVERY_CREW,
        }
    }

    /// Admins manage managers; managers (and admins) manage the delivery crew.
    pub fn required_permission(self) -> Permission {
        match self {
            Roster::Manager => Permission::IsAdmin,
            Roster::DeliveryCrew => Permission::IsManager,
        }
    }
}

/// Creates the "Manager" and "Delivery crew" groups when they are missing. Safe to run on
/// every start.
pub async fn ensure_default_groups<C: ConnectionTrait>(conn: &C) -> AppResult<()> {
    for name in [MANAGER, DELIVERY_CREW] {
        let inserted = Groups::insert(groups::ActiveModel {
            id: NotSet,
            name: Set(name.to_string()),
        })
        .on_conflict(
            OnConflict::column(groups::Column::Name)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
        if inserted > 0 {
            tracing::info!(group = name, "created group");
        }
    }
    Ok(())
}

pub async fn list_members(
    state: &AppState,
    user: &AuthUser,
    roster: Roster,
) -> AppResult<ApiResponse<MemberList>> {
    require(user, roster.required_permission())?;
    let group = find_group(&state.orm, roster).await?;

    let items: Vec<User> = Users::find()
        .inner_join(UserGroups)
        .filter(user_groups::Column::GroupId.eq(group.id))
        .order_by_asc(users::Column::Id)
        .all(&state.orm)
        .await?
        .into_iter()
        .map(User::from)
        .collect();

    let meta = Meta::whole(items.len());
    Ok(ApiResponse::success(
        group.name,
        MemberList { items },
        Some(meta),
    ))
}

/// Adds the user called `username` to the roster. Adding an existing member changes nothing.
pub async fn add_member(
    state: &AppState,
    user: &AuthUser,
    roster: Roster,
    payload: AddMemberRequest,
) -> AppResult<ApiResponse<User>> {
    require(user, roster.required_permission())?;

    let member = Users::find()
        .filter(users::Column::Username.eq(payload.username.trim()))
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let group = find_group(&state.orm, roster).await?;

    UserGroups::insert(user_groups::ActiveModel {
        user_id: Set(member.id),
        group_id: Set(group.id),
    })
    .on_conflict(
        OnConflict::columns([user_groups::Column::UserId, user_groups::Column::GroupId])
            .do_nothing()
            .to_owned(),
    )
    .exec_without_returning(&state.orm)
    .await?;

    tracing::info!(user_id = member.id, group = %group.name, actor = user.user_id, "member added");
    audit::record(
        &state.orm,
        Some(user.user_id),
        "group_member_add",
        "user_groups",
        serde_json::json!({ "user_id": member.id, "group": group.name }),
    )
    .await;

    let message = format!("{} added to {}", member.username, group.name);
    Ok(ApiResponse::item(message, User::from(member)))
}

/// Removes user `member_id` from the roster. Removing a non-member changes nothing.
pub async fn remove_member(
    state: &AppState,
    user: &AuthUser,
    roster: Roster,
    member_id: i32,
) -> AppResult<()> {
    require(user, roster.required_permission())?;

    let member = Users::find_by_id(member_id)
        .one(&state.orm)
        .await?
        .ok_or_else(|| AppError::not_found("User"))?;
    let group = find_group(&state.orm, roster).await?;

    let result = UserGroups::delete_many()
        .filter(user_groups::Column::UserId.eq(member.id))
        .filter(user_groups::Column::GroupId.eq(group.id))
        .exec(&state.orm)
        .await?;

    tracing::info!(
        user_id = member.id,
        group = %group.name,
        removed = result.rows_affected,
        actor = user.user_id,
        "member removed"
    );
    audit::record(
        &state.orm,
        Some(user.user_id),
        "group_member_remove",
        "user_groups",
        serde_json::json!({ "user_id": member.id, "group": group.name }),
    )
    .await;

    Ok(())
}

async fn find_group<C: ConnectionTrait>(conn: &C, roster: Roster) -> AppResult<groups::Model> {
    let name = roster.group_name();
    Groups::find()
        .filter(groups::Column::Name.eq(name))
        .one(conn)
        .await?
        .ok_or_else(|| AppError::Internal(anyhow!("group {name:?} is missing; startup seeds it")))
}
