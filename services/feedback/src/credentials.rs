//! Account registration and password authentication

use std::sync::{Arc, OnceLock};

use thiserror::Error;
use tracing::info;

use crate::{
    models::{RegisterForm, User},
    password,
    repositories::{StoreError, UserStore},
};

/// Errors raised while registering or authenticating
#[derive(Error, Debug)]
pub enum CredentialError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("{0}")]
    Hashing(String),
}

/// Digest verified when the username is unknown, so both failure paths cost
/// one Argon2 run.
fn dummy_digest() -> Result<&'static str, CredentialError> {
    static DUMMY: OnceLock<String> = OnceLock::new();

    if let Some(digest) = DUMMY.get() {
        return Ok(digest.as_str());
    }
    let digest = password::hash("feedback-dummy-password")
        .map_err(|e| CredentialError::Hashing(e.to_string()))?;
    Ok(DUMMY.get_or_init(|| digest).as_str())
}

/// Registration and login on top of a user store
#[derive(Clone)]
pub struct CredentialStore {
    users: Arc<dyn UserStore>,
}

impl CredentialStore {
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// Hash the password and persist a new user.
    ///
    /// Fails with [`StoreError::Duplicate`] naming every taken unique field.
    pub async fn register(&self, form: RegisterForm) -> Result<User, CredentialError> {
        let password_hash =
            password::hash(&form.password).map_err(|e| CredentialError::Hashing(e.to_string()))?;

        let user = self.users.insert(&form.into_new_user(password_hash)).await?;
        info!("Registered user: {}", user.username);

        Ok(user)
    }

    /// Return the user if the username exists and the password matches.
    ///
    /// An unknown username and a wrong password both yield `None`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Option<User>, CredentialError> {
        match self.users.find_by_username(username).await? {
            Some(user) if password::verify(&user.password_hash, password) => Ok(Some(user)),
            Some(_) => Ok(None),
            None => {
                password::verify(dummy_digest()?, password);
                Ok(None)
            }
        }
    }
}
