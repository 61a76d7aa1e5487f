use chrono::{DateTime, Utc};
use sqlx::{FromRow, Row, postgres::PgRow};
use uuid::Uuid;

/// Role assigned to an account. Registration always assigns `User`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UserRole {
    User,
    Admin,
}

impl UserRole {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Admin => "admin",
        }
    }

    /// Parse the persisted `users.role` textual value into a typed enum.
    pub(crate) fn from_db(value: &str) -> Result<Self, sqlx::Error> {
        match value {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(sqlx::Error::Decode(Box::new(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("invalid users.role value: {value}"),
            )))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub enabled: bool,
    pub created_at: DateTime<Utc>,
}

impl<'r> FromRow<'r, PgRow> for User {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            username: row.try_get("username")?,
            email: row.try_get("email")?,
            password_hash: row.try_get("password_hash")?,
            role: UserRole::from_db(&role)?,
            enabled: row.try_get("enabled")?,
            created_at: row.try_get("created_at")?,
        })
    }
}

/// A user about to be persisted; the store assigns the identifier.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub created_at: DateTime<Utc>,
}

/// Stored hashed credential material, for an external authentication layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user_id: Uuid,
    pub email: String,
    pub password_hash: String,
    pub role: UserRole,
    pub enabled: bool,
}

impl From<User> for Credentials {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            email: user.email,
            password_hash: user.password_hash,
            role: user.role,
            enabled: user.enabled,
        }
    }
}

/// Non-owning reference from a token to the account it confirms.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenOwner {
    pub id: Uuid,
    pub email: String,
}

/// Persisted confirmation status. Replaces a nullable `confirmed_at`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirmation {
    Pending,
    Confirmed { at: DateTime<Utc> },
}

impl Confirmation {
    #[must_use]
    pub fn from_confirmed_at(confirmed_at: Option<DateTime<Utc>>) -> Self {
        confirmed_at.map_or(Self::Pending, |at| Self::Confirmed { at })
    }

    #[must_use]
    pub const fn confirmed_at(self) -> Option<DateTime<Utc>> {
        match self {
            Self::Pending => None,
            Self::Confirmed { at } => Some(at),
        }
    }
}

/// Observed state of a token at a point in time. `Expired` is never stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenState {
    Pending,
    Confirmed { at: DateTime<Utc> },
    Expired,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmationToken {
    pub id: Uuid,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub confirmation: Confirmation,
    pub owner: TokenOwner,
}

impl ConfirmationToken {
    /// Resolve the token state at `now`.
    ///
    /// A confirmed token stays confirmed after its window; a pending token is
    /// expired once `now` reaches `expires_at`.
    #[must_use]
    pub fn state(&self, now: DateTime<Utc>) -> TokenState {
        match self.confirmation {
            Confirmation::Confirmed { at } => TokenState::Confirmed { at },
            Confirmation::Pending if now >= self.expires_at => TokenState::Expired,
            Confirmation::Pending => TokenState::Pending,
        }
    }
}

impl<'r> FromRow<'r, PgRow> for ConfirmationToken {
    fn from_row(row: &'r PgRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            id: row.try_get("id")?,
            token: row.try_get("token")?,
            created_at: row.try_get("created_at")?,
            expires_at: row.try_get("expires_at")?,
            confirmation: Confirmation::from_confirmed_at(row.try_get("confirmed_at")?),
            owner: TokenOwner {
                id: row.try_get("user_id")?,
                email: row.try_get("email")?,
            },
        })
    }
}

/// A token about to be persisted, always pending.
#[derive(Debug, Clone)]
pub struct NewConfirmationToken {
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub owner: TokenOwner,
}

/// Successful confirmation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfirmationResult {
    Confirmed {
        email: String,
        confirmed_at: DateTime<Utc>,
    },
}

impl ConfirmationResult {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Confirmed { .. } => "confirmed",
        }
    }
}
