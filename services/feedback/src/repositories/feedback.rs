//! Feedback repository for database operations

use async_trait::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::info;

use super::{FeedbackStore, StoreError, StoreResult, map_sqlx_error};
use crate::models::{Feedback, NewFeedback};

/// PostgreSQL-backed feedback repository
#[derive(Clone)]
pub struct FeedbackRepository {
    pool: PgPool,
}

impl FeedbackRepository {
    /// Create a new feedback repository
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Remove every feedback row owned by `username`.
    ///
    /// Runs on the caller's connection so the user deletion can share the
    /// transaction. Returns the number of rows removed.
    pub async fn delete_cascade_for_user(
        conn: &mut PgConnection,
        username: &str,
    ) -> StoreResult<u64> {
        let result = sqlx::query("DELETE FROM feedback WHERE username = $1")
            .bind(username)
            .execute(conn)
            .await
            .map_err(map_sqlx_error)?;

        Ok(result.rows_affected())
    }
}

#[async_trait]
impl FeedbackStore for FeedbackRepository {
    async fn create(&self, new_feedback: &NewFeedback) -> StoreResult<Feedback> {
        info!(
            "Creating feedback '{}' for {}",
            new_feedback.title, new_feedback.username
        );

        sqlx::query_as::<_, Feedback>(
            r#"
            INSERT INTO feedback (title, content, username)
            VALUES ($1, $2, $3)
            RETURNING id, title, content, username
            "#,
        )
        .bind(&new_feedback.title)
        .bind(&new_feedback.content)
        .bind(&new_feedback.username)
        .fetch_one(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }

    async fn get(&self, id: i32) -> StoreResult<Feedback> {
        sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, title, content, username
            FROM feedback
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: i32, title: &str, content: &str) -> StoreResult<Feedback> {
        sqlx::query_as::<_, Feedback>(
            r#"
            UPDATE feedback
            SET title = $2, content = $3
            WHERE id = $1
            RETURNING id, title, content, username
            "#,
        )
        .bind(id)
        .bind(title)
        .bind(content)
        .fetch_optional(&self.pool)
        .await
        .map_err(map_sqlx_error)?
        .ok_or(StoreError::NotFound)
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM feedback WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_sqlx_error)?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_by_owner(&self, username: &str) -> StoreResult<Vec<Feedback>> {
        sqlx::query_as::<_, Feedback>(
            r#"
            SELECT id, title, content, username
            FROM feedback
            WHERE username = $1
            ORDER BY id
            "#,
        )
        .bind(username)
        .fetch_all(&self.pool)
        .await
        .map_err(map_sqlx_error)
    }
}
