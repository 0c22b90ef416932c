//! User repository for database operations

use async_trait::async_trait;
use common::error::DatabaseError;
use sqlx::{PgPool, Row};
use tracing::info;

use super::{FeedbackRepository, StoreError, StoreResult, UniqueField, UserStore, map_sqlx_error};
use crate::models::{NewUser, User};

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct UserRepository {
    pool: PgPool,
}

impl UserRepository {
    /// Create a new user repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for UserRepository {
    async fn insert(&self, new_user: &NewUser) -> StoreResult<User> {
        info!("Creating new user: {}", new_user.username);

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(DatabaseError::Transaction(e)))?;

        // PostgreSQL stops at the first violated constraint, so look for both
        // collisions up front; the constraints still catch concurrent inserts.
        let taken = sqlx::query(
            r#"
            SELECT username, email
            FROM users
            WHERE username = $1 OR email = $2
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .fetch_all(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        let mut fields = Vec::new();
        if taken
            .iter()
            .any(|row| row.get::<String, _>("username") == new_user.username)
        {
            fields.push(UniqueField::Username);
        }
        if taken
            .iter()
            .any(|row| row.get::<String, _>("email") == new_user.email)
        {
            fields.push(UniqueField::Email);
        }
        if !fields.is_empty() {
            return Err(StoreError::Duplicate(fields));
        }

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, first_name, last_name)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, username, email, password_hash, first_name, last_name
            "#,
        )
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.first_name)
        .bind(&new_user.last_name)
        .fetch_one(&mut *tx)
        .await
        .map_err(map_sqlx_error)?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(DatabaseError::Transaction(e)))?;

        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name
            FROM users
            WHERE username = $1
            "#,
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        sqlx::query_as::<_, User>(
            r#"
            SELECT id, username, email, password_hash, first_name, last_name
            FROM users
            ORDER BY id
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| StoreError::Database(DatabaseError::Transaction(e)))?;

        let username: String =
            sqlx::query_scalar("SELECT username FROM users WHERE id = $1 FOR UPDATE")
                .bind(id)
                .fetch_optional(&mut *tx)
                .await
                .map_err(map_sqlx_error)?
                .ok_or(StoreError::NotFound)?;

        let removed = FeedbackRepository::delete_cascade_for_user(&mut *tx, &username).await?;

        sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await
            .map_err(map_sqlx_error)?;

        tx.commit()
            .await
            .map_err(|e| StoreError::Database(DatabaseError::Transaction(e)))?;

        info!(
            "Deleted user {} and {} feedback item(s)",
            username, removed
        );
        Ok(())
    }
}
