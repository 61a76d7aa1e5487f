//! Registration and confirmation orchestration.

use anyhow::anyhow;
use chrono::Duration;
use secrecy::SecretString;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::clock::{Clock, SystemClock};
use super::email;
use super::error::{RegistrationError, Result};
use super::hasher::CredentialHasher;
use super::models::{
    ConfirmationResult, ConfirmationToken, Credentials, NewConfirmationToken, NewUser,
    TokenOwner, TokenState, User, UserRole,
};
use super::notify::{CONFIRM_EMAIL_TEMPLATE, Notification, NotificationSink};
use super::store::{Store, Transaction};
use super::token;

const DEFAULT_TOKEN_TTL_SECONDS: i64 = 15 * 60;
/// Longest accepted confirmation window, one week.
pub const MAX_TOKEN_TTL_SECONDS: i64 = 7 * 24 * 60 * 60;
const DEFAULT_FRONTEND_BASE_URL: &str = "https://registrar.dev";

#[derive(Clone, Debug)]
pub struct RegistrationConfig {
    frontend_base_url: String,
    token_ttl_seconds: i64,
}

impl RegistrationConfig {
    #[must_use]
    pub fn new(frontend_base_url: String) -> Self {
        Self {
            frontend_base_url,
            token_ttl_seconds: DEFAULT_TOKEN_TTL_SECONDS,
        }
    }

    /// Set the confirmation window.
    ///
    /// # Errors
    /// Returns an error unless `seconds` is in `1..=MAX_TOKEN_TTL_SECONDS`.
    pub fn with_token_ttl_seconds(mut self, seconds: i64) -> anyhow::Result<Self> {
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&seconds) {
            anyhow::bail!(
                "token TTL must be between 1 and {MAX_TOKEN_TTL_SECONDS} seconds, got {seconds}"
            );
        }
        self.token_ttl_seconds = seconds;
        Ok(self)
    }

    #[must_use]
    pub fn frontend_base_url(&self) -> &str {
        &self.frontend_base_url
    }

    #[must_use]
    pub fn token_ttl_seconds(&self) -> i64 {
        self.token_ttl_seconds
    }

    fn token_ttl(&self) -> Result<Duration> {
        Duration::try_seconds(self.token_ttl_seconds)
            .filter(|ttl| *ttl > Duration::zero())
            .ok_or_else(|| anyhow!("token TTL out of range: {}s", self.token_ttl_seconds).into())
    }
}

impl Default for RegistrationConfig {
    fn default() -> Self {
        Self::new(DEFAULT_FRONTEND_BASE_URL.to_string())
    }
}

/// Outcome of a resend request. Callers should not reveal it to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// A new token was issued because none was pending.
    Issued,
    /// The pending token was sent again unchanged.
    Reused,
    /// Unknown, invalid, or already enabled account.
    Noop,
}

#[derive(Clone)]
pub struct RegistrationService {
    store: Arc<dyn Store>,
    hasher: Arc<dyn CredentialHasher>,
    sink: Arc<dyn NotificationSink>,
    clock: Arc<dyn Clock>,
    config: RegistrationConfig,
}

impl RegistrationService {
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        hasher: Arc<dyn CredentialHasher>,
        sink: Arc<dyn NotificationSink>,
        config: RegistrationConfig,
    ) -> Self {
        Self {
            store,
            hasher,
            sink,
            clock: Arc::new(SystemClock),
            config,
        }
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    #[must_use]
    pub fn config(&self) -> &RegistrationConfig {
        &self.config
    }

    /// Liveness of the backing store.
    ///
    /// # Errors
    /// Returns an error if the store cannot be reached.
    pub async fn ping(&self) -> Result<()> {
        self.store.ping().await
    }

    /// Create a disabled account and issue its confirmation token.
    ///
    /// Returns the raw token value. The confirmation link is handed to the
    /// notification sink after commit; a sink failure is logged, not returned.
    ///
    /// # Errors
    /// `InvalidEmail`, `EmailTaken`, or `Internal` for store/hasher failures.
    /// Nothing is persisted on error.
    #[instrument(skip_all)]
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &SecretString,
    ) -> Result<String> {
        let email = email::normalize(email);
        if !email::is_valid(&email) {
            return Err(RegistrationError::InvalidEmail);
        }

        // Must not run while a transaction is open.
        let password_hash = self.hasher.hash(password)?;

        let mut tx = self.store.begin().await?;
        let issued = match self.sign_up(tx.as_mut(), username, &email, password_hash).await {
            Ok(issued) => issued,
            Err(err) => {
                rollback(tx).await;
                return Err(err);
            }
        };
        tx.commit().await?;

        info!(user_id = %issued.owner.id, "user registered");

        self.notify(username, &issued).await;

        Ok(issued.token)
    }

    async fn sign_up(
        &self,
        tx: &mut dyn Transaction,
        username: &str,
        email: &str,
        password_hash: String,
    ) -> Result<ConfirmationToken> {
        // Pre-check only spares the insert; the unique index decides.
        if tx.find_by_email(email).await?.is_some() {
            return Err(RegistrationError::EmailTaken);
        }

        let user = tx
            .save_user(NewUser {
                username: username.to_string(),
                email: email.to_string(),
                password_hash,
                role: UserRole::User,
                created_at: self.clock.now(),
            })
            .await?;

        self.issue_token(tx, &user).await
    }

    async fn issue_token(&self, tx: &mut dyn Transaction, user: &User) -> Result<ConfirmationToken> {
        let created_at = self.clock.now();
        let expires_at = created_at
            .checked_add_signed(self.config.token_ttl()?)
            .ok_or_else(|| anyhow!("token expiry overflows for {created_at}"))?;
        tx.save_token(NewConfirmationToken {
            token: token::generate()?,
            created_at,
            expires_at,
            owner: TokenOwner {
                id: user.id,
                email: user.email.clone(),
            },
        })
        .await
    }

    /// Consume a token and enable its owner.
    ///
    /// # Errors
    /// `TokenNotFound`, `AlreadyConfirmed`, `TokenExpired`, or `Internal`.
    /// On any error neither the token nor the user is modified.
    #[instrument(skip_all)]
    pub async fn confirm(&self, token: &str) -> Result<ConfirmationResult> {
        let token = token.trim();
        if token.is_empty() {
            return Err(RegistrationError::TokenNotFound);
        }

        let mut tx = self.store.begin().await?;
        let result = match self.consume(tx.as_mut(), token).await {
            Ok(result) => result,
            Err(err) => {
                rollback(tx).await;
                return Err(err);
            }
        };
        tx.commit().await?;

        info!("email confirmed");

        Ok(result)
    }

    async fn consume(&self, tx: &mut dyn Transaction, token: &str) -> Result<ConfirmationResult> {
        let record = tx
            .find_token(token)
            .await?
            .ok_or(RegistrationError::TokenNotFound)?;

        let now = self.clock.now();
        match record.state(now) {
            TokenState::Confirmed { .. } => return Err(RegistrationError::AlreadyConfirmed),
            TokenState::Expired => return Err(RegistrationError::TokenExpired),
            TokenState::Pending => {}
        }

        if tx.mark_confirmed(token, now).await? != 1 {
            return Err(anyhow!("confirmation token was not updated").into());
        }

        if tx.enable_user(&record.owner.email).await? != 1 {
            return Err(anyhow!("confirmation token owner {} not found", record.owner.id).into());
        }

        Ok(ConfirmationResult::Confirmed {
            email: record.owner.email,
            confirmed_at: now,
        })
    }

    /// Send the confirmation link again.
    ///
    /// A still-pending token is reused so links already in the user's inbox
    /// keep working; otherwise a fresh token is issued.
    ///
    /// # Errors
    /// Only `Internal` store failures.
    #[instrument(skip_all)]
    pub async fn resend(&self, email: &str) -> Result<ResendOutcome> {
        let email = email::normalize(email);
        if !email::is_valid(&email) {
            return Ok(ResendOutcome::Noop);
        }

        let mut tx = self.store.begin().await?;
        let outcome = match self.pending_token(tx.as_mut(), &email).await {
            Ok(outcome) => outcome,
            Err(err) => {
                rollback(tx).await;
                return Err(err);
            }
        };
        tx.commit().await?;

        let Some((user, token, outcome)) = outcome else {
            debug!("resend skipped");
            return Ok(ResendOutcome::Noop);
        };

        self.notify(&user.username, &token).await;

        Ok(outcome)
    }

    async fn pending_token(
        &self,
        tx: &mut dyn Transaction,
        email: &str,
    ) -> Result<Option<(User, ConfirmationToken, ResendOutcome)>> {
        let Some(user) = tx.find_by_email(email).await? else {
            return Ok(None);
        };
        if user.enabled {
            return Ok(None);
        }

        let now = self.clock.now();
        if let Some(latest) = tx.latest_token(user.id).await? {
            if latest.state(now) == TokenState::Pending {
                return Ok(Some((user, latest, ResendOutcome::Reused)));
            }
        }

        let token = self.issue_token(tx, &user).await?;
        Ok(Some((user, token, ResendOutcome::Issued)))
    }

    /// Stored credential material for an external authentication layer.
    ///
    /// # Errors
    /// `UserNotFound` when no account has this email.
    #[instrument(skip_all)]
    pub async fn credentials(&self, email: &str) -> Result<Credentials> {
        let email = email::normalize(email);
        let mut tx = self.store.begin().await?;
        let result = tx.load_credentials(&email).await;
        rollback(tx).await;
        result
    }

    /// Check a plaintext password against the stored digest for `email`.
    /// Disabled accounts never verify.
    ///
    /// # Errors
    /// `UserNotFound` when no account has this email.
    pub async fn verify_password(&self, email: &str, password: &SecretString) -> Result<bool> {
        let credentials = self.credentials(email).await?;
        Ok(credentials.enabled && self.hasher.verify(password, &credentials.password_hash))
    }

    async fn notify(&self, username: &str, token: &ConfirmationToken) {
        let notification = Notification {
            to_email: token.owner.email.clone(),
            username: username.to_string(),
            template: CONFIRM_EMAIL_TEMPLATE,
            token: token.token.clone(),
            confirm_url: token::confirm_url(self.config.frontend_base_url(), &token.token),
        };

        if let Err(err) = self.sink.deliver(&notification).await {
            warn!(
                user_id = %token.owner.id,
                "confirmation notification not delivered: {err}"
            );
        }
    }
}

async fn rollback(tx: Box<dyn Transaction>) {
    if let Err(err) = tx.rollback().await {
        warn!("transaction rollback failed: {err}");
    }
}
