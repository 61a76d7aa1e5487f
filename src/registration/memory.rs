//! In-process store for tests and local runs (`--dsn memory://`).
//!
//! A transaction holds the store mutex for its whole lifetime and mutates a
//! working copy; commit writes the copy back. This makes every unit of work
//! serializable, matching the guarantees the Postgres store gets from its
//! unique index and row locks.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

use super::error::{RegistrationError, Result};
use super::models::{
    Confirmation, ConfirmationToken, Credentials, NewConfirmationToken, NewUser, User,
};
use super::store::{Store, TokenStore, Transaction, UserStore};

#[derive(Clone, Debug, Default)]
struct State {
    // keyed by normalized email
    users: HashMap<String, User>,
    // keyed by token value
    tokens: HashMap<String, ConfirmationToken>,
}

#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of a user by email, outside any transaction.
    pub async fn user(&self, email: &str) -> Option<User> {
        self.state.lock().await.users.get(email).cloned()
    }

    /// Snapshot of a token by value, outside any transaction.
    pub async fn token(&self, token: &str) -> Option<ConfirmationToken> {
        self.state.lock().await.tokens.get(token).cloned()
    }

    pub async fn user_count(&self) -> usize {
        self.state.lock().await.users.len()
    }

    pub async fn token_count(&self) -> usize {
        self.state.lock().await.tokens.len()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let guard = Arc::clone(&self.state).lock_owned().await;
        let working = guard.clone();
        Ok(Box::new(MemoryTransaction { guard, working }))
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}

pub struct MemoryTransaction {
    guard: OwnedMutexGuard<State>,
    working: State,
}

#[async_trait]
impl UserStore for MemoryTransaction {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>> {
        Ok(self.working.users.get(email).cloned())
    }

    async fn save_user(&mut self, user: NewUser) -> Result<User> {
        if self.working.users.contains_key(&user.email) {
            return Err(RegistrationError::EmailTaken);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: user.username,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            enabled: false,
            created_at: user.created_at,
        };
        self.working.users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn enable_user(&mut self, email: &str) -> Result<u64> {
        Ok(self.working.users.get_mut(email).map_or(0, |user| {
            user.enabled = true;
            1
        }))
    }

    async fn load_credentials(&mut self, email: &str) -> Result<Credentials> {
        self.working
            .users
            .get(email)
            .cloned()
            .map(Credentials::from)
            .ok_or(RegistrationError::UserNotFound)
    }
}

#[async_trait]
impl TokenStore for MemoryTransaction {
    async fn save_token(&mut self, token: NewConfirmationToken) -> Result<ConfirmationToken> {
        if self.working.tokens.contains_key(&token.token) {
            return Err(anyhow::anyhow!("duplicate confirmation token").into());
        }
        let token = ConfirmationToken {
            id: Uuid::new_v4(),
            token: token.token,
            created_at: token.created_at,
            expires_at: token.expires_at,
            confirmation: Confirmation::Pending,
            owner: token.owner,
        };
        self.working
            .tokens
            .insert(token.token.clone(), token.clone());
        Ok(token)
    }

    async fn find_token(&mut self, token: &str) -> Result<Option<ConfirmationToken>> {
        Ok(self.working.tokens.get(token).cloned())
    }

    async fn mark_confirmed(&mut self, token: &str, at: DateTime<Utc>) -> Result<u64> {
        match self.working.tokens.get_mut(token) {
            Some(record) if record.confirmation == Confirmation::Pending => {
                record.confirmation = Confirmation::Confirmed { at };
                Ok(1)
            }
            _ => Ok(0),
        }
    }

    async fn latest_token(&mut self, user_id: Uuid) -> Result<Option<ConfirmationToken>> {
        Ok(self
            .working
            .tokens
            .values()
            .filter(|token| token.owner.id == user_id)
            .max_by_key(|token| token.created_at)
            .cloned())
    }
}

#[async_trait]
impl Transaction for MemoryTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        let Self { mut guard, working } = *self;
        *guard = working;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registration::models::{TokenOwner, UserRole};
    use anyhow::Result;
    use chrono::Duration;

    fn new_user(email: &str) -> NewUser {
        NewUser {
            username: "alice".to_string(),
            email: email.to_string(),
            password_hash: "$argon2id$stub".to_string(),
            role: UserRole::User,
            created_at: Utc::now(),
        }
    }

    fn new_token(value: &str, user: &User, created_at: DateTime<Utc>) -> NewConfirmationToken {
        NewConfirmationToken {
            token: value.to_string(),
            created_at,
            expires_at: created_at + Duration::minutes(15),
            owner: TokenOwner {
                id: user.id,
                email: user.email.clone(),
            },
        }
    }

    #[tokio::test]
    async fn uncommitted_writes_are_discarded() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        tx.save_user(new_user("alice@example.com")).await?;
        drop(tx);

        assert_eq!(store.user_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn rollback_discards_writes() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        tx.save_user(new_user("alice@example.com")).await?;
        tx.rollback().await?;

        assert_eq!(store.user_count().await, 0);
        Ok(())
    }

    #[tokio::test]
    async fn commit_persists_and_enforces_unique_email() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let user = tx.save_user(new_user("alice@example.com")).await?;
        assert!(!user.enabled);
        tx.commit().await?;

        let mut tx = store.begin().await?;
        let err = tx.save_user(new_user("alice@example.com")).await;
        assert!(matches!(err, Err(RegistrationError::EmailTaken)));
        Ok(())
    }

    #[tokio::test]
    async fn enable_reports_rows_affected() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        tx.save_user(new_user("alice@example.com")).await?;
        assert_eq!(tx.enable_user("alice@example.com").await?, 1);
        assert_eq!(tx.enable_user("bob@example.com").await?, 0);
        tx.commit().await?;

        assert!(store
            .user("alice@example.com")
            .await
            .is_some_and(|user| user.enabled));
        Ok(())
    }

    #[tokio::test]
    async fn load_credentials_missing_user() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let err = tx.load_credentials("nobody@example.com").await;
        assert!(matches!(err, Err(RegistrationError::UserNotFound)));
        Ok(())
    }

    #[tokio::test]
    async fn mark_confirmed_only_once() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let user = tx.save_user(new_user("alice@example.com")).await?;
        let now = Utc::now();
        tx.save_token(new_token("t1", &user, now)).await?;

        assert_eq!(tx.mark_confirmed("t1", now).await?, 1);
        assert_eq!(tx.mark_confirmed("t1", now).await?, 0);
        assert_eq!(tx.mark_confirmed("missing", now).await?, 0);
        tx.commit().await?;

        let token = store.token("t1").await;
        assert_eq!(
            token.map(|token| token.confirmation),
            Some(Confirmation::Confirmed { at: now })
        );
        Ok(())
    }

    #[tokio::test]
    async fn latest_token_picks_newest() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let user = tx.save_user(new_user("alice@example.com")).await?;
        let now = Utc::now();
        tx.save_token(new_token("old", &user, now - Duration::minutes(30)))
            .await?;
        tx.save_token(new_token("new", &user, now)).await?;

        let latest = tx.latest_token(user.id).await?;
        assert_eq!(latest.map(|token| token.token), Some("new".to_string()));
        assert!(tx.latest_token(Uuid::new_v4()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    async fn duplicate_token_value_rejected() -> Result<()> {
        let store = MemoryStore::new();
        let mut tx = store.begin().await?;
        let user = tx.save_user(new_user("alice@example.com")).await?;
        let now = Utc::now();
        tx.save_token(new_token("dup", &user, now)).await?;
        let err = tx.save_token(new_token("dup", &user, now)).await;
        assert!(matches!(err, Err(RegistrationError::Internal(_))));
        Ok(())
    }
}
