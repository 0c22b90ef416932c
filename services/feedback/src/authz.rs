//! Ownership authorization
//!
//! Pure decisions with no side effects. Handlers call [`require_login`] before
//! any page that needs a session and [`ensure_owner`] before every mutation.

use tracing::warn;

use crate::error::ApiError;

/// Outcome of an ownership check
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny,
}

/// Allow iff a session user is present and owns the resource
pub fn can_mutate(session_user_id: Option<i32>, resource_owner_id: i32) -> Decision {
    match session_user_id {
        Some(user_id) if user_id == resource_owner_id => Decision::Allow,
        _ => Decision::Deny,
    }
}

/// Resolve the session user, or fail with the "must log in" outcome
pub fn require_login(session_user_id: Option<i32>, message: &'static str) -> Result<i32, ApiError> {
    session_user_id.ok_or(ApiError::Unauthenticated(message))
}

/// Fail with `Forbidden` unless `user_id` owns the resource
pub fn ensure_owner(user_id: i32, resource_owner_id: i32) -> Result<(), ApiError> {
    match can_mutate(Some(user_id), resource_owner_id) {
        Decision::Allow => Ok(()),
        Decision::Deny => {
            warn!(
                "User {} denied access to a resource owned by user {}",
                user_id, resource_owner_id
            );
            Err(ApiError::Forbidden)
        }
    }
}
