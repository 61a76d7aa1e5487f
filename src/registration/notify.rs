//! Out-of-band delivery of confirmation links.
//!
//! The service hands a [`Notification`] to a [`NotificationSink`] after the
//! sign-up transaction commits. Delivery is not part of the registration
//! guarantee: the user and token exist whether or not the sink succeeds, and
//! a lost message can be re-sent with the same pending token.
//!
//! - `LogSink` logs the recipient and returns `Ok(())` (local dev default).
//! - `WebhookSink` POSTs the message as JSON to an HTTP endpoint that owns the
//!   actual email transport.
//! - `RetryingSink` wraps another sink, returns immediately, and retries in a
//!   background task with exponential backoff and jitter until
//!   `max_attempts` is reached.
use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

pub const CONFIRM_EMAIL_TEMPLATE: &str = "confirm_email";

#[derive(Clone)]
pub struct Notification {
    pub to_email: String,
    pub username: String,
    pub template: &'static str,
    pub token: String,
    pub confirm_url: String,
}

impl fmt::Debug for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Notification")
            .field("to_email", &self.to_email)
            .field("username", &self.username)
            .field("template", &self.template)
            .field("token", &"***")
            .field("confirm_url", &"***")
            .finish()
    }
}

/// Delivery abstraction for confirmation messages.
#[async_trait]
pub trait NotificationSink: Send + Sync {
    /// Deliver a message or return an error.
    async fn deliver(&self, notification: &Notification) -> Result<()>;
}

/// Local dev sink that logs the recipient instead of sending real email.
#[derive(Clone, Debug, Default)]
pub struct LogSink;

#[async_trait]
impl NotificationSink for LogSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        info!(
            to_email = %notification.to_email,
            template = %notification.template,
            "confirmation notification stub"
        );
        Ok(())
    }
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    to_email: &'a str,
    username: &'a str,
    template: &'a str,
    confirm_url: &'a str,
}

/// Hands the message to an HTTP endpoint responsible for sending the email.
#[derive(Clone, Debug)]
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: String) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(Duration::from_secs(10))
            .build()
            .context("failed to build webhook client")?;
        Ok(Self { client, url })
    }
}

#[async_trait]
impl NotificationSink for WebhookSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        let payload = WebhookPayload {
            to_email: &notification.to_email,
            username: &notification.username,
            template: notification.template,
            confirm_url: &notification.confirm_url,
        };

        let response = self
            .client
            .post(&self.url)
            .json(&payload)
            .send()
            .await
            .context("failed to reach notification webhook")?;

        if !response.status().is_success() {
            return Err(anyhow!(
                "{} - notification webhook returned {}",
                self.url,
                response.status()
            ));
        }

        Ok(())
    }
}

#[derive(Clone, Copy, Debug)]
pub struct DeliveryConfig {
    max_attempts: u32,
    backoff_base: Duration,
    backoff_max: Duration,
}

impl DeliveryConfig {
    /// Default retry config: 5 max attempts, 1s->60s exponential backoff with jitter.
    #[must_use]
    pub fn new() -> Self {
        Self {
            max_attempts: 5,
            backoff_base: Duration::from_secs(1),
            backoff_max: Duration::from_secs(60),
        }
    }

    #[must_use]
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    #[must_use]
    pub fn with_backoff_base_seconds(mut self, seconds: u64) -> Self {
        self.backoff_base = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff_max_seconds(mut self, seconds: u64) -> Self {
        self.backoff_max = Duration::from_secs(seconds);
        self
    }

    #[must_use]
    pub fn with_backoff(mut self, base: Duration, max: Duration) -> Self {
        self.backoff_base = base;
        self.backoff_max = max;
        self
    }

    #[must_use]
    pub fn normalize(self) -> Self {
        let max_attempts = self.max_attempts.max(1);
        let backoff_base = if self.backoff_base.is_zero() {
            Duration::from_millis(1)
        } else {
            self.backoff_base
        };
        let backoff_max = if self.backoff_max < backoff_base {
            backoff_base
        } else {
            self.backoff_max
        };
        Self {
            max_attempts,
            backoff_base,
            backoff_max,
        }
    }

    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    #[must_use]
    pub fn backoff_base(&self) -> Duration {
        self.backoff_base
    }

    #[must_use]
    pub fn backoff_max(&self) -> Duration {
        self.backoff_max
    }
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// Retries another sink in a background task.
pub struct RetryingSink {
    inner: Arc<dyn NotificationSink>,
    config: DeliveryConfig,
}

impl RetryingSink {
    #[must_use]
    pub fn new(inner: Arc<dyn NotificationSink>, config: DeliveryConfig) -> Self {
        Self {
            inner,
            config: config.normalize(),
        }
    }

    /// Start delivery in the background; the handle resolves to whether the
    /// message was eventually accepted.
    pub fn spawn_delivery(&self, notification: Notification) -> tokio::task::JoinHandle<bool> {
        let inner = Arc::clone(&self.inner);
        let config = self.config;

        tokio::spawn(async move {
            let mut attempt = 1;
            loop {
                match inner.deliver(&notification).await {
                    Ok(()) => return true,
                    Err(err) if attempt >= config.max_attempts() => {
                        error!(
                            to_email = %notification.to_email,
                            attempts = attempt,
                            "notification delivery failed: {err}"
                        );
                        return false;
                    }
                    Err(err) => {
                        let delay =
                            backoff_delay(attempt, config.backoff_base(), config.backoff_max());
                        warn!(
                            to_email = %notification.to_email,
                            attempt,
                            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                            "notification delivery failed, retrying: {err}"
                        );
                        sleep(delay).await;
                        attempt += 1;
                    }
                }
            }
        })
    }
}

#[async_trait]
impl NotificationSink for RetryingSink {
    async fn deliver(&self, notification: &Notification) -> Result<()> {
        drop(self.spawn_delivery(notification.clone()));
        Ok(())
    }
}

fn backoff_delay(attempt: u32, base: Duration, max: Duration) -> Duration {
    let shift = attempt.saturating_sub(1).min(31);
    let factor = 1u32 << shift;
    let delay = base.checked_mul(factor).unwrap_or(max);
    let capped = if delay > max { max } else { delay };
    jitter_delay(capped)
}

fn jitter_delay(delay: Duration) -> Duration {
    let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
    if delay_ms < 2 {
        return delay;
    }
    let half = delay_ms / 2;
    let jitter = rand::thread_rng().gen_range(0..=half);
    Duration::from_millis(half + jitter)
}
