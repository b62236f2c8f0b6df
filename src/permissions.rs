//! Capability predicates.
//!
//! Every check is a pure function of the caller's identity and the request method. Endpoints
//! compose them explicitly: a policy is the list of permissions that must all allow the call.

use axum::http::Method;

use crate::{
    entity::groups::{DELIVERY_CREW, MANAGER},
    error::{AppError, AppResult},
    middleware::auth::AuthUser,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    /// Staff accounts.
    IsAdmin,
    /// Staff, or members of the "Manager" group.
    IsManager,
    /// Staff, or members of the "Delivery crew" group.
    IsDeliveryCrew,
    /// Safe (non-mutating) request methods, for anyone.
    ReadOnly,
}

pub fn is_admin(user: &AuthUser) -> bool {
    user.is_staff
}

pub fn is_manager(user: &AuthUser) -> bool {
    user.is_staff || user.in_group(MANAGER)
}

pub fn is_delivery_crew(user: &AuthUser) -> bool {
    user.is_staff || user.in_group(DELIVERY_CREW)
}

pub fn is_safe_method(method: &Method) -> bool {
    matches!(*method, Method::GET | Method::HEAD | Method::OPTIONS)
}

impl Permission {
    pub fn has_permission(self, identity: Option<&AuthUser>, method: &Method) -> bool {
        match self {
            Permission::ReadOnly => is_safe_method(method),
            Permission::IsAdmin => identity.is_some_and(is_admin),
            Permission::IsManager => identity.is_some_and(is_manager),
            Permission::IsDeliveryCrew => identity.is_some_and(is_delivery_crew),
        }
    }

    fn denial(self) -> &'static str {
        match self {
            Permission::IsAdmin => "Only administrators may perform this action.",
            Permission::IsManager => "Only managers may perform this action.",
            Permission::IsDeliveryCrew => "Only delivery crew may perform this action.",
            Permission::ReadOnly => "This resource is read-only.",
        }
    }
}

/// Anyone may read the catalog; only admins change it.
pub fn catalog_policy(method: &Method) -> &'static [Permission] {
    if is_safe_method(method) {
        &[Permission::ReadOnly]
    } else {
        &[Permission::IsAdmin]
    }
}

/// Checks that every permission in `policy` allows the call.
///
/// An anonymous caller that is refused gets `Unauthorized`; an identified one gets `Forbidden`.
pub fn authorize(
    policy: &[Permission],
    identity: Option<&AuthUser>,
    method: &Method,
) -> AppResult<()> {
    for permission in policy {
        if permission.has_permission(identity, method) {
            continue;
        }
        return Err(match identity {
            None => AppError::Unauthorized(
                "Authentication credentials were not provided.".to_string(),
            ),
            Some(user) => {
                tracing::warn!(
                    user_id = user.user_id,
                    permission = ?permission,
                    %method,
                    "permission denied"
                );
                AppError::Forbidden(permission.denial().to_string())
            }
        });
    }
    Ok(())
}

/// Role check for service code, where the method is implied by the operation.
pub fn require(user: &AuthUser, permission: Permission) -> AppResult<()> {
    let method = match permission {
        Permission::ReadOnly => Method::GET,
        _ => Method::POST,
    };
    authorize(&[permission], Some(user), &method)
}
