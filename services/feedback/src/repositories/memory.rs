//! In-memory user and feedback storage
//!
//! Serves self-contained runs (`FEEDBACK_STORAGE=memory`) and tests. Both
//! tables sit behind one lock, so every operation is atomic; user deletion
//! stages its cascade on a copy of the tables and only swaps it in once every
//! step has succeeded.

#[cfg(any(test, feature = "test-util"))]
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::{info, warn};

use super::{FeedbackStore, StoreError, StoreResult, UniqueField, UserStore};
use crate::models::{Feedback, NewFeedback, NewUser, User};

#[derive(Debug, Clone, Default)]
struct Tables {
    users: Vec<User>,
    feedback: Vec<Feedback>,
    last_user_id: i32,
    last_feedback_id: i32,
}

impl Tables {
    fn delete_cascade_for_user(&mut self, username: &str) -> usize {
        let before = self.feedback.len();
        self.feedback.retain(|f| f.username != username);
        before - self.feedback.len()
    }

    fn title_taken(&self, title: &str, except_id: Option<i32>) -> bool {
        self.feedback
            .iter()
            .any(|f| f.title == title && Some(f.id) != except_id)
    }
}

/// Users and feedback held in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
    #[cfg(any(test, feature = "test-util"))]
    fail_user_deletes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make user deletion fail after its feedback cascade has been staged.
    ///
    /// Lets tests observe that a failed deletion leaves no partial state.
    #[cfg(any(test, feature = "test-util"))]
    pub fn fail_user_deletes(&self, fail: bool) {
        self.fail_user_deletes.store(fail, Ordering::SeqCst);
    }

    #[cfg(any(test, feature = "test-util"))]
    fn injected_delete_failure(&self) -> bool {
        self.fail_user_deletes.load(Ordering::SeqCst)
    }

    #[cfg(not(any(test, feature = "test-util")))]
    fn injected_delete_failure(&self) -> bool {
        false
    }
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert(&self, new_user: &NewUser) -> StoreResult<User> {
        let mut tables = self.tables.lock().await;

        let mut fields = Vec::new();
        if tables.users.iter().any(|u| u.username == new_user.username) {
            fields.push(UniqueField::Username);
        }
        if tables.users.iter().any(|u| u.email == new_user.email) {
            fields.push(UniqueField::Email);
        }
        if !fields.is_empty() {
            return Err(StoreError::Duplicate(fields));
        }

        tables.last_user_id += 1;
        let user = User {
            id: tables.last_user_id,
            username: new_user.username.clone(),
            email: new_user.email.clone(),
            password_hash: new_user.password_hash.clone(),
            first_name: new_user.first_name.clone(),
            last_name: new_user.last_name.clone(),
        };
        tables.users.push(user.clone());

        info!("Created user {} with id {}", user.username, user.id);
        Ok(user)
    }

    async fn find_by_id(&self, id: i32) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.username == username).cloned())
    }

    async fn list(&self) -> StoreResult<Vec<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.clone())
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let mut staged = tables.clone();

        let username = staged
            .users
            .iter()
            .find(|u| u.id == id)
            .map(|u| u.username.clone())
            .ok_or(StoreError::NotFound)?;

        let removed = staged.delete_cascade_for_user(&username);

        if self.injected_delete_failure() {
            warn!("Injected failure while deleting user {}", username);
            return Err(StoreError::Backend(format!(
                "failed to delete user {}",
                username
            )));
        }

        staged.users.retain(|u| u.id != id);
        *tables = staged;

        info!("Deleted user {} and {} feedback item(s)", username, removed);
        Ok(())
    }
}

#[async_trait]
impl FeedbackStore for MemoryStore {
    async fn create(&self, new_feedback: &NewFeedback) -> StoreResult<Feedback> {
        let mut tables = self.tables.lock().await;

        if tables.title_taken(&new_feedback.title, None) {
            return Err(StoreError::Duplicate(vec![UniqueField::Title]));
        }
        if !tables
            .users
            .iter()
            .any(|u| u.username == new_feedback.username)
        {
            return Err(StoreError::NotFound);
        }

        tables.last_feedback_id += 1;
        let feedback = Feedback {
            id: tables.last_feedback_id,
            title: new_feedback.title.clone(),
            content: new_feedback.content.clone(),
            username: new_feedback.username.clone(),
        };
        tables.feedback.push(feedback.clone());

        Ok(feedback)
    }

    async fn get(&self, id: i32) -> StoreResult<Feedback> {
        let tables = self.tables.lock().await;
        tables
            .feedback
            .iter()
            .find(|f| f.id == id)
            .cloned()
            .ok_or(StoreError::NotFound)
    }

    async fn update(&self, id: i32, title: &str, content: &str) -> StoreResult<Feedback> {
        let mut tables = self.tables.lock().await;

        if !tables.feedback.iter().any(|f| f.id == id) {
            return Err(StoreError::NotFound);
        }
        if tables.title_taken(title, Some(id)) {
            return Err(StoreError::Duplicate(vec![UniqueField::Title]));
        }

        let feedback = tables
            .feedback
            .iter_mut()
            .find(|f| f.id == id)
            .ok_or(StoreError::NotFound)?;
        feedback.title = title.to_string();
        feedback.content = content.to_string();

        Ok(feedback.clone())
    }

    async fn delete(&self, id: i32) -> StoreResult<()> {
        let mut tables = self.tables.lock().await;
        let before = tables.feedback.len();
        tables.feedback.retain(|f| f.id != id);

        if tables.feedback.len() == before {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn list_by_owner(&self, username: &str) -> StoreResult<Vec<Feedback>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .feedback
            .iter()
            .filter(|f| f.username == username)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_user(username: &str, email: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: email.to_string(),
            password_hash: "digest".to_string(),
            first_name: "Ada".to_string(),
            last_name: "Lovelace".to_string(),
        }
    }

    fn new_feedback(title: &str, username: &str) -> NewFeedback {
        NewFeedback {
            title: title.to_string(),
            content: format!("{} body", title),
            username: username.to_string(),
        }
    }

    #[tokio::test]
    async fn test_insert_reports_each_colliding_field() {
        let store = MemoryStore::new();
        store.insert(&new_user("ada", "ada@example.com")).await.unwrap();

        let err = store
            .insert(&new_user("ada", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref f) if f == &[UniqueField::Username]));

        let err = store
            .insert(&new_user("grace", "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref f) if f == &[UniqueField::Email]));

        let err = store
            .insert(&new_user("ada", "ada@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            StoreError::Duplicate(ref f) if f == &[UniqueField::Username, UniqueField::Email]
        ));

        assert_eq!(store.list().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ids_are_assigned_in_order() {
        let store = MemoryStore::new();
        let ada = store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        let grace = store
            .insert(&new_user("grace", "grace@example.com"))
            .await
            .unwrap();

        assert_eq!(ada.id, 1);
        assert_eq!(grace.id, 2);
        assert_eq!(store.find_by_id(2).await.unwrap(), Some(grace));
        assert_eq!(store.find_by_username("nobody").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_feedback_titles_are_globally_unique() {
        let store = MemoryStore::new();
        store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        store
            .insert(&new_user("grace", "grace@example.com"))
            .await
            .unwrap();

        store.create(&new_feedback("Hello", "ada")).await.unwrap();
        let err = store
            .create(&new_feedback("Hello", "grace"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(ref f) if f == &[UniqueField::Title]));
    }

    #[tokio::test]
    async fn test_feedback_requires_existing_owner() {
        let store = MemoryStore::new();
        let err = store
            .create(&new_feedback("Hello", "ghost"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_update_keeps_owner_and_checks_title() {
        let store = MemoryStore::new();
        store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        let first = store.create(&new_feedback("First", "ada")).await.unwrap();
        store.create(&new_feedback("Second", "ada")).await.unwrap();

        let updated = store.update(first.id, "First!", "new body").await.unwrap();
        assert_eq!(updated.username, "ada");
        assert_eq!(updated.title, "First!");
        assert_eq!(store.get(first.id).await.unwrap(), updated);

        // Keeping its own title is not a collision.
        store.update(first.id, "First!", "again").await.unwrap();

        let err = store.update(first.id, "Second", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::Duplicate(_)));

        let err = store.update(99, "Whatever", "x").await.unwrap_err();
        assert!(matches!(err, StoreError::NotFound));
    }

    #[tokio::test]
    async fn test_list_by_owner_keeps_insertion_order() {
        let store = MemoryStore::new();
        store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        store
            .insert(&new_user("grace", "grace@example.com"))
            .await
            .unwrap();

        store.create(&new_feedback("b", "ada")).await.unwrap();
        store.create(&new_feedback("x", "grace")).await.unwrap();
        store.create(&new_feedback("a", "ada")).await.unwrap();

        let titles: Vec<_> = store
            .list_by_owner("ada")
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.title)
            .collect();
        assert_eq!(titles, vec!["b", "a"]);
    }

    #[tokio::test]
    async fn test_delete_feedback() {
        let store = MemoryStore::new();
        store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        let feedback = store.create(&new_feedback("Hello", "ada")).await.unwrap();

        FeedbackStore::delete(&store, feedback.id).await.unwrap();
        assert!(matches!(
            store.get(feedback.id).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            FeedbackStore::delete(&store, feedback.id).await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_user_delete_cascades_to_feedback() {
        let store = MemoryStore::new();
        let ada = store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        store
            .insert(&new_user("grace", "grace@example.com"))
            .await
            .unwrap();
        store.create(&new_feedback("one", "ada")).await.unwrap();
        store.create(&new_feedback("two", "ada")).await.unwrap();
        store.create(&new_feedback("three", "grace")).await.unwrap();

        UserStore::delete(&store, ada.id).await.unwrap();

        assert_eq!(store.find_by_username("ada").await.unwrap(), None);
        assert!(store.list_by_owner("ada").await.unwrap().is_empty());
        assert_eq!(store.list_by_owner("grace").await.unwrap().len(), 1);

        // The freed title can be reused.
        store.create(&new_feedback("one", "grace")).await.unwrap();
    }

    #[tokio::test]
    async fn test_failed_user_delete_leaves_no_partial_state() {
        let store = MemoryStore::new();
        let ada = store.insert(&new_user("ada", "ada@example.com")).await.unwrap();
        store.create(&new_feedback("one", "ada")).await.unwrap();
        store.create(&new_feedback("two", "ada")).await.unwrap();

        store.fail_user_deletes(true);
        let err = UserStore::delete(&store, ada.id).await.unwrap_err();
        assert!(matches!(err, StoreError::Backend(_)));

        assert!(store.find_by_id(ada.id).await.unwrap().is_some());
        assert_eq!(store.list_by_owner("ada").await.unwrap().len(), 2);

        store.fail_user_deletes(false);
        UserStore::delete(&store, ada.id).await.unwrap();
        assert!(store.list_by_owner("ada").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_delete_missing_user() {
        let store = MemoryStore::new();
        assert!(matches!(
            UserStore::delete(&store, 7).await,
            Err(StoreError::NotFound)
        ));
    }
}
