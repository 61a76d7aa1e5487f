//! Registration core: account creation, confirmation tokens, and the
//! confirmation state machine.
//!
//! Collaborators are injected as trait objects so the service can run against
//! Postgres in production and against [`memory::MemoryStore`] in tests:
//!
//! - [`store::Store`] opens a unit of work implementing both
//!   [`store::UserStore`] and [`store::TokenStore`].
//! - [`hasher::CredentialHasher`] turns plaintext into a salted digest.
//! - [`notify::NotificationSink`] delivers the confirmation link out of band.
//! - [`clock::Clock`] supplies "now" for issuance and expiry checks.

pub mod clock;
pub mod email;
pub mod error;
pub mod hasher;
pub mod memory;
pub mod models;
pub mod notify;
pub mod postgres;
pub mod service;
pub mod store;
pub mod token;

pub use error::{RegistrationError, Result};
pub use models::{
    Confirmation, ConfirmationResult, ConfirmationToken, Credentials, TokenState, User, UserRole,
};
pub use service::{RegistrationConfig, RegistrationService, ResendOutcome};
