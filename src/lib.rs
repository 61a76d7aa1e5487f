//! # Registrar (sign-up and email confirmation)
//!
//! `registrar` accepts registrations, creates the account disabled, and issues
//! a single-use confirmation token that expires after a fixed window
//! (15 minutes unless configured otherwise). Presenting a valid token enables
//! the account.
//!
//! ## Token lifecycle
//!
//! A token is `Pending` until it is either confirmed (terminal, success) or
//! its window elapses (terminal, failure). Expiry is derived from
//! `expires_at` at read time and never stored. Confirming twice is an error,
//! not a no-op.
//!
//! ## Consistency
//!
//! Sign-up (uniqueness check, user insert, token insert) and confirmation
//! (token lookup, `confirmed_at` update, user enable) each run inside a single
//! store transaction. The database unique index on `users.email` is the
//! authoritative duplicate signal; the pre-check only avoids needless hashing.
//!
//! ## Secrets
//!
//! Plaintext passwords travel as `SecretString` and are only exposed to the
//! Argon2id hasher. Raw token values are never logged.

pub mod api;
pub mod cli;
pub mod registration;

#[allow(clippy::doc_markdown, clippy::needless_raw_string_hashes)]
pub mod built_info {
    include!(concat!(env!("OUT_DIR"), "/built.rs"));
}

pub const GIT_COMMIT_HASH: &str = match built_info::GIT_COMMIT_HASH {
    Some(hash) => hash,
    None => "unknown",
};

pub const APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"),);
