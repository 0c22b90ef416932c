//! Application state shared across handlers

use std::sync::Arc;

use sqlx::PgPool;

use crate::{
    credentials::CredentialStore,
    repositories::{FeedbackRepository, FeedbackStore, MemoryStore, UserRepository, UserStore},
    session::{MemorySessionStore, RedisSessionStore, SessionManager},
};

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub credentials: CredentialStore,
    pub users: Arc<dyn UserStore>,
    pub feedback: Arc<dyn FeedbackStore>,
    pub sessions: SessionManager,
}

impl AppState {
    pub fn new(
        users: Arc<dyn UserStore>,
        feedback: Arc<dyn FeedbackStore>,
        sessions: SessionManager,
    ) -> Self {
        Self {
            credentials: CredentialStore::new(users.clone()),
            users,
            feedback,
            sessions,
        }
    }

    /// PostgreSQL records with Redis-backed sessions
    pub fn postgres(pool: PgPool, sessions: RedisSessionStore, cookie_name: &str) -> Self {
        Self::new(
            Arc::new(UserRepository::new(pool.clone())),
            Arc::new(FeedbackRepository::new(pool)),
            SessionManager::new(Arc::new(sessions), cookie_name),
        )
    }

    /// Everything in process memory
    pub fn in_memory(cookie_name: &str) -> Self {
        let store = Arc::new(MemoryStore::new());
        Self::new(
            store.clone(),
            store,
            SessionManager::new(Arc::new(MemorySessionStore::new()), cookie_name),
        )
    }
}
