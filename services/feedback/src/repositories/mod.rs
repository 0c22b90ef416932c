//! Storage ports and their PostgreSQL / in-memory adapters

use async_trait::async_trait;
use common::error::DatabaseError;
use serde::Serialize;
use thiserror::Error;

use crate::models::{Feedback, NewFeedback, NewUser, User};

pub mod feedback;
pub mod memory;
pub mod user;

pub use feedback::FeedbackRepository;
pub use memory::MemoryStore;
pub use user::UserRepository;

/// Column carrying a uniqueness constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UniqueField {
    Username,
    Email,
    Title,
}

impl UniqueField {
    pub fn as_str(&self) -> &'static str {
        match self {
            UniqueField::Username => "username",
            UniqueField::Email => "email",
            UniqueField::Title => "title",
        }
    }

    /// Map a PostgreSQL constraint name from `schema.sql` to its column
    pub fn from_constraint(name: &str) -> Option<Self> {
        match name {
            "users_username_key" => Some(UniqueField::Username),
            "users_email_key" => Some(UniqueField::Email),
            "feedback_title_key" => Some(UniqueField::Title),
            _ => None,
        }
    }
}

/// Errors raised by the user and feedback stores
#[derive(Error, Debug)]
pub enum StoreError {
    /// One or more unique columns already hold the submitted value
    #[error(
        "Duplicate value for {}",
        .0.iter().map(UniqueField::as_str).collect::<Vec<_>>().join(", ")
    )]
    Duplicate(Vec<UniqueField>),

    /// No record matches the requested key
    #[error("Record not found")]
    NotFound,

    /// PostgreSQL failure
    #[error(transparent)]
    Database(#[from] DatabaseError),

    /// Any other backend failure
    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// Type alias for store results
pub type StoreResult<T> = Result<T, StoreError>;

/// Translate a sqlx error, surfacing unique and foreign key violations
pub(crate) fn map_sqlx_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            if let Some(field) = db_err.constraint().and_then(UniqueField::from_constraint) {
                return StoreError::Duplicate(vec![field]);
            }
        }
        if db_err.is_foreign_key_violation() {
            return StoreError::NotFound;
        }
    }
    StoreError::Database(DatabaseError::Query(err))
}

/// Persistence of user accounts
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a user, reporting every unique column that collides
    async fn insert(&self, new_user: &NewUser) -> StoreResult<User>;

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>>;

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>>;

    /// All users in creation order
    async fn list(&self) -> StoreResult<Vec<User>>;

    /// Delete a user together with all the feedback they own, atomically
    async fn delete(&self, id: i32) -> StoreResult<()>;
}

/// Persistence of feedback records
#[async_trait]
pub trait FeedbackStore: Send + Sync {
    /// Create a feedback row; titles are unique across all users
    async fn create(&self, new_feedback: &NewFeedback) -> StoreResult<Feedback>;

    async fn get(&self, id: i32) -> StoreResult<Feedback>;

    /// Replace title and content, keeping the owner
    async fn update(&self, id: i32, title: &str, content: &str) -> StoreResult<Feedback>;

    async fn delete(&self, id: i32) -> StoreResult<()>;

    /// Feedback owned by `username` in insertion order
    async fn list_by_owner(&self, username: &str) -> StoreResult<Vec<Feedback>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_names_map_to_fields() {
        assert_eq!(
            UniqueField::from_constraint("users_username_key"),
            Some(UniqueField::Username)
        );
        assert_eq!(
            UniqueField::from_constraint("users_email_key"),
            Some(UniqueField::Email)
        );
        assert_eq!(
            UniqueField::from_constraint("feedback_title_key"),
            Some(UniqueField::Title)
        );
        assert_eq!(UniqueField::from_constraint("users_pkey"), None);
    }

    #[test]
    fn test_duplicate_error_names_every_field() {
        let err = StoreError::Duplicate(vec![UniqueField::Username, UniqueField::Email]);
        assert_eq!(err.to_string(), "Duplicate value for username, email");
    }
}
