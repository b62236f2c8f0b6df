use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::{HeaderMap, header, request::Parts},
    middleware::Next,
    response::Response,
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use sea_orm::{ColumnTrait, ConnectionTrait, EntityTrait, QueryFilter, QueryOrder};

use crate::{
    dto::auth::Claims,
    entity::{Groups, Users, groups, user_groups},
    error::{AppError, AppResult},
    permissions::{authorize, catalog_policy, is_safe_method},
    state::AppState,
};

/// The authenticated caller, with roles as they are in the database right now.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: i32,
    pub username: String,
    pub is_staff: bool,
    pub groups: Vec<String>,
}

impl AuthUser {
    pub fn in_group(&self, name: &str) -> bool {
        self.groups.iter().any(|g| g == name)
    }

    /// Loads the identity of `user_id` together with its group names.
    pub async fn load<C: ConnectionTrait>(conn: &C, user_id: i32) -> AppResult<Option<Self>> {
        let Some(user) = Users::find_by_id(user_id).one(conn).await? else {
            return Ok(None);
        };

        let groups = Groups::find()
            .inner_join(user_groups::Entity)
            .filter(user_groups::Column::UserId.eq(user.id))
            .order_by_asc(groups::Column::Id)
            .all(conn)
            .await?
            .into_iter()
            .map(|g| g.name)
            .collect();

        Ok(Some(AuthUser {
            user_id: user.id,
            username: user.username,
            is_staff: user.is_staff,
            groups,
        }))
    }
}

fn bearer_token(headers: &HeaderMap) -> AppResult<Option<&str>> {
    let Some(auth_header) = headers.get(header::AUTHORIZATION) else {
        return Ok(None);
    };

    let auth_str = auth_header
        .to_str()
        .map_err(|_| AppError::Unauthorized("Invalid Authorization header".into()))?;

    let Some(token) = auth_str.strip_prefix("Bearer ") else {
        return Err(AppError::Unauthorized("Invalid Authorization scheme".into()));
    };
    Ok(Some(token.trim()))
}

pub fn decode_token(token: &str, secret: &str) -> AppResult<Claims> {
    let decoded = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|_| AppError::Unauthorized("Invalid or expired token".into()))?;
    Ok(decoded.claims)
}

/// Resolves the caller from the request headers. `None` when no credentials were sent.
pub async fn identify(state: &AppState, headers: &HeaderMap) -> AppResult<Option<AuthUser>> {
    let Some(token) = bearer_token(headers)? else {
        return Ok(None);
    };

    let claims = decode_token(token, &state.auth.jwt_secret)?;
    let user_id = claims
        .sub
        .parse::<i32>()
        .map_err(|_| AppError::Unauthorized("Invalid user id in token".into()))?;

    let user = AuthUser::load(&state.orm, user_id)
        .await?
        .ok_or_else(|| AppError::Unauthorized("User no longer exists".into()))?;
    Ok(Some(user))
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = AppError;
    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let state = AppState::from_ref(state);
        identify(&state, &parts.headers).await?.ok_or_else(|| {
            AppError::Unauthorized("Authentication credentials were not provided.".into())
        })
    }
}

/// Route layer for categories and menu items: reads are open, writes need an admin.
///
/// On writes the resolved caller is stored in the request extensions for the handler.
pub async fn catalog_guard(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let method = req.method().clone();
    let identity = if is_safe_method(&method) {
        None
    } else {
        identify(&state, req.headers()).await?
    };

    authorize(catalog_policy(&method), identity.as_ref(), &method)?;
    if let Some(user) = identity {
        req.extensions_mut().insert(user);
    }
    Ok(next.run(req).await)
}
