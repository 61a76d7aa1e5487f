//! Postgres-backed store (`sql/schema.sql`).

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Row};
use tracing::{Instrument, Span};
use uuid::Uuid;

use super::error::{RegistrationError, Result};
use super::models::{
    Confirmation, ConfirmationToken, Credentials, NewConfirmationToken, NewUser, User,
};
use super::store::{Store, TokenStore, Transaction, UserStore};

#[derive(Clone, Debug)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl Store for PgStore {
    async fn begin(&self) -> Result<Box<dyn Transaction>> {
        let tx = self
            .pool
            .begin()
            .await
            .context("failed to begin transaction")?;
        Ok(Box::new(PgTransaction { tx }))
    }

    async fn ping(&self) -> Result<()> {
        let span = db_span("PING", "SELECT 1");
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .instrument(span)
            .await
            .context("failed to ping database")?;
        Ok(())
    }
}

pub struct PgTransaction {
    tx: sqlx::Transaction<'static, Postgres>,
}

fn db_span(operation: &'static str, statement: &'static str) -> Span {
    tracing::info_span!(
        "db.query",
        db.system = "postgresql",
        db.operation = operation,
        db.statement = statement
    )
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    match err {
        sqlx::Error::Database(db_err) => db_err.code().is_some_and(|code| code.as_ref() == "23505"),
        _ => false,
    }
}

#[async_trait]
impl UserStore for PgTransaction {
    async fn find_by_email(&mut self, email: &str) -> Result<Option<User>> {
        let query = r"
            SELECT id, username, email, password_hash, role, enabled, created_at
            FROM users
            WHERE email = $1
        ";
        let user = sqlx::query_as::<_, User>(query)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup user by email")?;
        Ok(user)
    }

    async fn save_user(&mut self, user: NewUser) -> Result<User> {
        let query = r"
            INSERT INTO users
                (username, email, password_hash, role, enabled, created_at)
            VALUES ($1, $2, $3, $4, FALSE, $5)
            RETURNING id, username, email, password_hash, role, enabled, created_at
        ";
        let result = sqlx::query_as::<_, User>(query)
            .bind(&user.username)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(user.created_at)
            .fetch_one(&mut *self.tx)
            .instrument(db_span("INSERT", query))
            .await;

        match result {
            Ok(user) => Ok(user),
            Err(err) if is_unique_violation(&err) => Err(RegistrationError::EmailTaken),
            Err(err) => Err(anyhow::Error::new(err)
                .context("failed to insert user")
                .into()),
        }
    }

    async fn enable_user(&mut self, email: &str) -> Result<u64> {
        let query = "UPDATE users SET enabled = TRUE WHERE email = $1";
        let result = sqlx::query(query)
            .bind(email)
            .execute(&mut *self.tx)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to enable user")?;
        Ok(result.rows_affected())
    }

    async fn load_credentials(&mut self, email: &str) -> Result<Credentials> {
        self.find_by_email(email)
            .await?
            .map(Credentials::from)
            .ok_or(RegistrationError::UserNotFound)
    }
}

#[async_trait]
impl TokenStore for PgTransaction {
    async fn save_token(&mut self, token: NewConfirmationToken) -> Result<ConfirmationToken> {
        let query = r"
            INSERT INTO confirmation_tokens
                (token, created_at, expires_at, user_id)
            VALUES ($1, $2, $3, $4)
            RETURNING id
        ";
        let row = sqlx::query(query)
            .bind(&token.token)
            .bind(token.created_at)
            .bind(token.expires_at)
            .bind(token.owner.id)
            .fetch_one(&mut *self.tx)
            .instrument(db_span("INSERT", query))
            .await
            .context("failed to insert confirmation token")?;

        Ok(ConfirmationToken {
            id: row.get("id"),
            token: token.token,
            created_at: token.created_at,
            expires_at: token.expires_at,
            confirmation: Confirmation::Pending,
            owner: token.owner,
        })
    }

    async fn find_token(&mut self, token: &str) -> Result<Option<ConfirmationToken>> {
        // Row lock makes a concurrent confirm wait and then observe confirmed_at.
        let query = r"
            SELECT confirmation_tokens.id,
                   confirmation_tokens.token,
                   confirmation_tokens.created_at,
                   confirmation_tokens.expires_at,
                   confirmation_tokens.confirmed_at,
                   confirmation_tokens.user_id,
                   users.email
            FROM confirmation_tokens
            JOIN users ON users.id = confirmation_tokens.user_id
            WHERE confirmation_tokens.token = $1
            FOR UPDATE OF confirmation_tokens
        ";
        let record = sqlx::query_as::<_, ConfirmationToken>(query)
            .bind(token)
            .fetch_optional(&mut *self.tx)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup confirmation token")?;
        Ok(record)
    }

    async fn mark_confirmed(&mut self, token: &str, at: DateTime<Utc>) -> Result<u64> {
        let query = r"
            UPDATE confirmation_tokens
            SET confirmed_at = $2
            WHERE token = $1
              AND confirmed_at IS NULL
        ";
        let result = sqlx::query(query)
            .bind(token)
            .bind(at)
            .execute(&mut *self.tx)
            .instrument(db_span("UPDATE", query))
            .await
            .context("failed to mark token confirmed")?;
        Ok(result.rows_affected())
    }

    async fn latest_token(&mut self, user_id: Uuid) -> Result<Option<ConfirmationToken>> {
        let query = r"
            SELECT confirmation_tokens.id,
                   confirmation_tokens.token,
                   confirmation_tokens.created_at,
                   confirmation_tokens.expires_at,
                   confirmation_tokens.confirmed_at,
                   confirmation_tokens.user_id,
                   users.email
            FROM confirmation_tokens
            JOIN users ON users.id = confirmation_tokens.user_id
            WHERE confirmation_tokens.user_id = $1
            ORDER BY confirmation_tokens.created_at DESC
            LIMIT 1
        ";
        let record = sqlx::query_as::<_, ConfirmationToken>(query)
            .bind(user_id)
            .fetch_optional(&mut *self.tx)
            .instrument(db_span("SELECT", query))
            .await
            .context("failed to lookup latest confirmation token")?;
        Ok(record)
    }
}

#[async_trait]
impl Transaction for PgTransaction {
    async fn commit(self: Box<Self>) -> Result<()> {
        self.tx.commit().await.context("failed to commit")?;
        Ok(())
    }

    async fn rollback(self: Box<Self>) -> Result<()> {
        self.tx.rollback().await.context("failed to rollback")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::error::{DatabaseError, ErrorKind};
    use sqlx::postgres::PgPoolOptions;
    use std::borrow::Cow;
    use std::error::Error as StdError;
    use std::fmt;

    #[derive(Debug)]
    struct TestDbError {
        code: Option<&'static str>,
    }

    impl fmt::Display for TestDbError {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            write!(f, "test database error")
        }
    }

    impl StdError for TestDbError {}

    impl DatabaseError for TestDbError {
        fn message(&self) -> &'static str {
            "test database error"
        }

        fn code(&self) -> Option<Cow<'_, str>> {
            self.code.map(Cow::Borrowed)
        }

        fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
            self
        }

        fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
            self
        }

        fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
            self
        }

        fn kind(&self) -> ErrorKind {
            ErrorKind::UniqueViolation
        }
    }

    #[test]
    fn is_unique_violation_matches_sqlstate() {
        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23505"),
        }));
        assert!(is_unique_violation(&err));

        let err = sqlx::Error::Database(Box::new(TestDbError {
            code: Some("23503"),
        }));
        assert!(!is_unique_violation(&err));

        let err = sqlx::Error::RowNotFound;
        assert!(!is_unique_violation(&err));
    }

    #[test]
    fn schema_declares_queried_columns() {
        let schema = include_str!("../../sql/schema.sql");
        for fragment in [
            "CREATE TABLE IF NOT EXISTS users",
            "CREATE TABLE IF NOT EXISTS confirmation_tokens",
            "UNIQUE (email)",
            "UNIQUE (token)",
            "confirmed_at TIMESTAMPTZ,",
            "REFERENCES users (id)",
            "enabled       BOOLEAN NOT NULL DEFAULT FALSE",
        ] {
            assert!(schema.contains(fragment), "missing: {fragment}");
        }
    }

    #[tokio::test]
    async fn ping_fails_without_database() -> anyhow::Result<()> {
        let pool = PgPoolOptions::new()
            .acquire_timeout(std::time::Duration::from_millis(200))
            .connect_lazy("postgres://postgres@127.0.0.1:1/registrar")?;
        let store = PgStore::new(pool);
        let result = store.ping().await;
        assert!(matches!(result, Err(RegistrationError::Internal(_))));
        Ok(())
    }
}
