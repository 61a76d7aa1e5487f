//! Map validated CLI arguments to an action.

use crate::cli::actions::{Action, server::Args};
use crate::cli::commands::{notify, registration};
use anyhow::{Context, Result};

/// Map validated CLI matches to a server action.
///
/// # Errors
/// Returns an error if required arguments are missing or inconsistent.
pub fn handler(matches: &clap::ArgMatches) -> Result<Action> {
    let port = matches.get_one::<u16>("port").copied().unwrap_or(8080);
    let dsn = matches
        .get_one::<String>("dsn")
        .cloned()
        .context("missing required argument: --dsn")?;

    let registration_opts = registration::Options::parse(matches)?;
    let notify_opts = notify::Options::parse(matches)?;

    Ok(Action::Server(Args {
        port,
        dsn,
        frontend_base_url: registration_opts.frontend_base_url,
        token_ttl_seconds: registration_opts.token_ttl_seconds,
        notify_webhook_url: notify_opts.webhook_url,
        notify_max_attempts: notify_opts.max_attempts,
        notify_backoff_base_seconds: notify_opts.backoff_base_seconds,
        notify_backoff_max_seconds: notify_opts.backoff_max_seconds,
    }))
}
