use crate::registration::service::MAX_TOKEN_TTL_SECONDS;
use clap::{Arg, ArgMatches, Command};

pub const ARG_FRONTEND_BASE_URL: &str = "frontend-base-url";
pub const ARG_TOKEN_TTL_SECONDS: &str = "token-ttl-seconds";

#[derive(Debug)]
pub struct Options {
    pub frontend_base_url: String,
    pub token_ttl_seconds: i64,
}

impl Options {
    /// Parse registration arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the base URL is empty or the TTL is out of range.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        let frontend_base_url = matches
            .get_one::<String>(ARG_FRONTEND_BASE_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty())
            .ok_or_else(|| anyhow::anyhow!("missing required argument: --{ARG_FRONTEND_BASE_URL}"))?;

        let token_ttl_seconds = matches
            .get_one::<i64>(ARG_TOKEN_TTL_SECONDS)
            .copied()
            .unwrap_or(900);
        if !(1..=MAX_TOKEN_TTL_SECONDS).contains(&token_ttl_seconds) {
            anyhow::bail!(
                "--{ARG_TOKEN_TTL_SECONDS} must be between 1 and {MAX_TOKEN_TTL_SECONDS}"
            );
        }

        Ok(Self {
            frontend_base_url,
            token_ttl_seconds,
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_FRONTEND_BASE_URL)
                .long(ARG_FRONTEND_BASE_URL)
                .help("Frontend base URL used for confirmation links")
                .env("REGISTRAR_FRONTEND_BASE_URL")
                .default_value("https://registrar.dev"),
        )
        .arg(
            Arg::new(ARG_TOKEN_TTL_SECONDS)
                .long(ARG_TOKEN_TTL_SECONDS)
                .help("Confirmation token TTL in seconds (at most one week)")
                .env("REGISTRAR_TOKEN_TTL_SECONDS")
                .default_value("900")
                .value_parser(clap::value_parser!(i64).range(1..=MAX_TOKEN_TTL_SECONDS)),
        )
}
