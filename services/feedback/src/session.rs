//! Server-side sessions keyed by an opaque cookie token
//!
//! The cookie only carries a random token; the authenticated user id lives in
//! the session store (Redis in production, memory for tests and local runs).

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use common::cache::RedisPool;
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

/// Backend mapping session tokens to user ids
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, token: &str, user_id: i32) -> Result<()>;

    async fn get(&self, token: &str) -> Result<Option<i32>>;

    /// Remove a token; removing an unknown token is not an error
    async fn remove(&self, token: &str) -> Result<()>;
}

/// Sessions stored in Redis under `session:<token>`
#[derive(Clone)]
pub struct RedisSessionStore {
    redis_pool: RedisPool,
    ttl_seconds: Option<u64>,
}

impl RedisSessionStore {
    pub fn new(redis_pool: RedisPool, ttl_seconds: Option<u64>) -> Self {
        Self {
            redis_pool,
            ttl_seconds,
        }
    }

    fn key(token: &str) -> String {
        format!("session:{}", token)
    }
}

#[async_trait]
impl SessionStore for RedisSessionStore {
    async fn insert(&self, token: &str, user_id: i32) -> Result<()> {
        self.redis_pool
            .set(&Self::key(token), &user_id.to_string(), self.ttl_seconds)
            .await
    }

    async fn get(&self, token: &str) -> Result<Option<i32>> {
        let Some(raw) = self.redis_pool.get(&Self::key(token)).await? else {
            return Ok(None);
        };

        match raw.parse() {
            Ok(user_id) => Ok(Some(user_id)),
            Err(_) => {
                warn!("Discarding corrupt session entry");
                self.remove(token).await?;
                Ok(None)
            }
        }
    }

    async fn remove(&self, token: &str) -> Result<()> {
        self.redis_pool.delete(&Self::key(token)).await?;
        Ok(())
    }
}

/// Sessions held in process memory
#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: Mutex<HashMap<String, i32>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live sessions
    pub async fn len(&self) -> usize {
        self.sessions.lock().await.len()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, token: &str, user_id: i32) -> Result<()> {
        self.sessions
            .lock()
            .await
            .insert(token.to_string(), user_id);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<i32>> {
        Ok(self.sessions.lock().await.get(token).copied())
    }

    async fn remove(&self, token: &str) -> Result<()> {
        self.sessions.lock().await.remove(token);
        Ok(())
    }
}

/// Session manager tying the cookie to the session store
#[derive(Clone)]
pub struct SessionManager {
    store: Arc<dyn SessionStore>,
    cookie_name: String,
}

impl SessionManager {
    /// Create a new session manager
    pub fn new(store: Arc<dyn SessionStore>, cookie_name: impl Into<String>) -> Self {
        Self {
            store,
            cookie_name: cookie_name.into(),
        }
    }

    fn token<'a>(&self, jar: &'a CookieJar) -> Option<&'a str> {
        jar.get(&self.cookie_name).map(|cookie| cookie.value())
    }

    /// Start a session for `user_id`, replacing any session the request carried
    pub async fn start(&self, jar: CookieJar, user_id: i32) -> Result<CookieJar> {
        if let Some(previous) = self.token(&jar) {
            self.store.remove(previous).await?;
        }

        let token = Uuid::new_v4().simple().to_string();
        self.store.insert(&token, user_id).await?;
        info!("Started session for user: {}", user_id);

        let cookie = Cookie::build((self.cookie_name.clone(), token))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax);

        Ok(jar.add(cookie))
    }

    /// The user id of the active session, if any
    pub async fn current(&self, jar: &CookieJar) -> Result<Option<i32>> {
        match self.token(jar) {
            Some(token) => self.store.get(token).await,
            None => Ok(None),
        }
    }

    /// End the active session; a no-op when there is none
    pub async fn end(&self, jar: CookieJar) -> Result<CookieJar> {
        let Some(token) = self.token(&jar) else {
            return Ok(jar);
        };

        self.store.remove(token).await?;
        info!("Ended session");

        Ok(jar.remove(Cookie::build((self.cookie_name.clone(), "")).path("/")))
    }
}
