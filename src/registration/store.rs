//! Persistence seams for users and confirmation tokens.
//!
//! All reads and writes go through a [`Transaction`] obtained from
//! [`Store::begin`], so a sign-up or a confirmation is applied as one atomic
//! unit. Dropping a transaction without committing discards its writes.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::error::Result;
use super::models::{ConfirmationToken, Credentials, NewConfirmationToken, NewUser, User};

#[async_trait]
pub trait UserStore: Send {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>>;

    /// Insert a user and assign its identifier.
    ///
    /// # Errors
    /// `EmailTaken` when the email is already registered.
    async fn save_user(&mut self, user: NewUser) -> Result<User>;

    /// Set `enabled = true`; returns the number of rows affected.
    async fn enable_user(&mut self, email: &str) -> Result<u64>;

    /// # Errors
    /// `UserNotFound` when no account has this email.
    async fn load_credentials(&mut self, email: &str) -> Result<Credentials>;
}

#[async_trait]
pub trait TokenStore: Send {
    async fn save_token(&mut self, token: NewConfirmationToken) -> Result<ConfirmationToken>;

    /// Look up a token by value. Implementations lock the row for the rest of
    /// the transaction so concurrent confirmations serialize.
    async fn find_token(&mut self, token: &str) -> Result<Option<ConfirmationToken>>;

    /// Record confirmation of a pending token; returns the number of rows
    /// affected (0 if unknown or already confirmed).
    async fn mark_confirmed(&mut self, token: &str, at: DateTime<Utc>) -> Result<u64>;

    /// Most recently issued token for a user, if any.
    async fn latest_token(&mut self, user_id: Uuid) -> Result<Option<ConfirmationToken>>;
}

#[async_trait]
pub trait Transaction: UserStore + TokenStore {
    async fn commit(self: Box<Self>) -> Result<()>;

    async fn rollback(self: Box<Self>) -> Result<()>;
}

#[async_trait]
pub trait Store: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn Transaction>>;

    /// Cheap liveness probe used by the health endpoint.
    async fn ping(&self) -> Result<()>;
}
