//! Ownership rules for posts and user records. Pure decisions, no I/O.
//!
//! Admin-only operations (registering, listing and deleting accounts) are
//! gated by the route guard alone and never consult `can_mutate`.

use thiserror::Error;

use crate::auth::Identity;
use crate::db::models::{Role, User};

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum PolicyError {
    #[error("Access denied")]
    Forbidden,

    #[error("Reserved admin account cannot be modified")]
    ProtectedResource,
}

/// An admin may act on anything; everyone else only on what they own.
pub fn can_mutate(identity: &Identity, owner_id: i64) -> bool {
    identity.role == Role::Admin || identity.id == owner_id
}

pub fn ensure_can_mutate(identity: &Identity, owner_id: i64) -> Result<(), PolicyError> {
    if can_mutate(identity, owner_id) {
        Ok(())
    } else {
        Err(PolicyError::Forbidden)
    }
}

/// Only admins may change roles, including their own.
pub fn ensure_role_change_allowed(
    identity: &Identity,
    current: Role,
    requested: Option<Role>,
) -> Result<(), PolicyError> {
    match requested {
        Some(role) if role != current && identity.role != Role::Admin => {
            Err(PolicyError::Forbidden)
        }
        _ => Ok(()),
    }
}

/// The reserved admin cannot be deleted, whoever asks.
pub fn ensure_not_reserved(user: &User) -> Result<(), PolicyError> {
    if user.is_reserved_admin() {
        Err(PolicyError::ProtectedResource)
    } else {
        Ok(())
    }
}

/// The reserved admin keeps its email and role.
pub fn ensure_reserved_fields_unchanged(
    user: &User,
    email: Option<&str>,
    role: Option<Role>,
) -> Result<(), PolicyError> {
    if !user.is_reserved_admin() {
        return Ok(());
    }
    let email_changed = email.is_some_and(|e| !e.eq_ignore_ascii_case(&user.email));
    let role_changed = role.is_some_and(|r| r != user.role);
    if email_changed || role_changed {
        Err(PolicyError::ProtectedResource)
    } else {
        Ok(())
    }
}
