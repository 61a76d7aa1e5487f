use clap::{Arg, ArgMatches, Command};

pub const ARG_NOTIFY_WEBHOOK_URL: &str = "notify-webhook-url";
pub const ARG_NOTIFY_MAX_ATTEMPTS: &str = "notify-max-attempts";
pub const ARG_NOTIFY_BACKOFF_BASE_SECONDS: &str = "notify-backoff-base-seconds";
pub const ARG_NOTIFY_BACKOFF_MAX_SECONDS: &str = "notify-backoff-max-seconds";

#[derive(Debug)]
pub struct Options {
    pub webhook_url: Option<String>,
    pub max_attempts: u32,
    pub backoff_base_seconds: u64,
    pub backoff_max_seconds: u64,
}

impl Options {
    /// Parse notification arguments from matches.
    ///
    /// # Errors
    /// Returns an error if the webhook URL is set but not a valid URL.
    pub fn parse(matches: &ArgMatches) -> anyhow::Result<Self> {
        // clap passes through empty strings when the env var is set to ""
        let webhook_url = matches
            .get_one::<String>(ARG_NOTIFY_WEBHOOK_URL)
            .cloned()
            .filter(|v| !v.trim().is_empty());

        if let Some(url) = &webhook_url {
            url::Url::parse(url)
                .map_err(|err| anyhow::anyhow!("invalid --{ARG_NOTIFY_WEBHOOK_URL}: {err}"))?;
        }

        Ok(Self {
            webhook_url,
            max_attempts: matches
                .get_one::<u32>(ARG_NOTIFY_MAX_ATTEMPTS)
                .copied()
                .unwrap_or(5),
            backoff_base_seconds: matches
                .get_one::<u64>(ARG_NOTIFY_BACKOFF_BASE_SECONDS)
                .copied()
                .unwrap_or(1),
            backoff_max_seconds: matches
                .get_one::<u64>(ARG_NOTIFY_BACKOFF_MAX_SECONDS)
                .copied()
                .unwrap_or(60),
        })
    }
}

#[must_use]
pub fn with_args(command: Command) -> Command {
    command
        .arg(
            Arg::new(ARG_NOTIFY_WEBHOOK_URL)
                .long(ARG_NOTIFY_WEBHOOK_URL)
                .help("Webhook that delivers confirmation emails; logs them when unset")
                .env("REGISTRAR_NOTIFY_WEBHOOK_URL"),
        )
        .arg(
            Arg::new(ARG_NOTIFY_MAX_ATTEMPTS)
                .long(ARG_NOTIFY_MAX_ATTEMPTS)
                .help("Max delivery attempts per confirmation message")
                .env("REGISTRAR_NOTIFY_MAX_ATTEMPTS")
                .default_value("5")
                .value_parser(clap::value_parser!(u32)),
        )
        .arg(
            Arg::new(ARG_NOTIFY_BACKOFF_BASE_SECONDS)
                .long(ARG_NOTIFY_BACKOFF_BASE_SECONDS)
                .help("Base delay for delivery retry backoff")
                .env("REGISTRAR_NOTIFY_BACKOFF_BASE_SECONDS")
                .default_value("1")
                .value_parser(clap::value_parser!(u64)),
        )
        .arg(
            Arg::new(ARG_NOTIFY_BACKOFF_MAX_SECONDS)
                .long(ARG_NOTIFY_BACKOFF_MAX_SECONDS)
                .help("Max delay for delivery retry backoff")
                .env("REGISTRAR_NOTIFY_BACKOFF_MAX_SECONDS")
                .default_value("60")
                .value_parser(clap::value_parser!(u64)),
        )
}
