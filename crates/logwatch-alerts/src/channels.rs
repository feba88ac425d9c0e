//! Notification channels for alert delivery.
//!
//! This module provides the [`NotificationChannel`] trait and implementations
//! for delivering fired alerts. Channels receive an [`AlertPayload`] and own
//! delivery entirely; the throttler never learns whether a send succeeded.

use std::fmt;

use lettre::message::header::ContentType;
use lettre::message::{Mailbox, Message};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{SmtpTransport, Transport};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::error::{AlertError, Result};
use crate::types::AlertPayload;

/// Result of sending a notification.
#[derive(Debug, Clone)]
pub struct NotificationResult {
    /// Whether the notification was sent successfully.
    pub success: bool,
    /// The channel that processed this notification.
    pub channel: String,
    /// Optional message or error description.
    pub message: Option<String>,
}

impl NotificationResult {
    /// Creates a successful result.
    #[must_use]
    pub fn success(channel: impl Into<String>) -> Self {
        Self {
            success: true,
            channel: channel.into(),
            message: None,
        }
    }

    /// Creates a failed result.
    #[must_use]
    pub fn failure(channel: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            success: false,
            channel: channel.into(),
            message: Some(message.into()),
        }
    }

    /// Sets the message.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }
}

/// Trait for notification channels.
///
/// Implement this trait to deliver alerts over a new medium.
pub trait NotificationChannel: Send + Sync + fmt::Debug {
    /// Returns the name of this channel.
    fn name(&self) -> &str;

    /// Sends an alert through this channel.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if the alert cannot be delivered.
    fn send(&self, alert: &AlertPayload) -> Result<NotificationResult>;

    /// Returns true if this channel is enabled.
    fn is_enabled(&self) -> bool {
        true
    }
}

/// SMTP settings for an [`EmailChannel`].
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SmtpConfig {
    /// SMTP relay host.
    pub host: String,
    /// SMTP port, 587 for STARTTLS submission.
    pub port: u16,
    /// Upgrade the connection with STARTTLS. Disable only for local relays.
    pub starttls: bool,
    /// Login user, usually the sender address.
    pub username: Option<String>,
    /// Login password (an app password for Gmail).
    pub password: Option<String>,
    /// Sender address.
    pub from: String,
    /// Recipient addresses. Each one gets its own message.
    pub to: Vec<String>,
}

impl SmtpConfig {
    /// Default SMTP host.
    pub const DEFAULT_HOST: &'static str = "smtp.gmail.com";
    /// Default SMTP submission port.
    pub const DEFAULT_PORT: u16 = 587;

    /// Creates a STARTTLS configuration against the default relay.
    #[must_use]
    pub fn new(from: impl Into<String>, to: Vec<String>) -> Self {
        Self {
            host: Self::DEFAULT_HOST.to_string(),
            port: Self::DEFAULT_PORT,
            starttls: true,
            username: None,
            password: None,
            from: from.into(),
            to,
        }
    }

    /// Sets the relay host and port.
    #[must_use]
    pub fn with_relay(mut self, host: impl Into<String>, port: u16) -> Self {
        self.host = host.into();
        self.port = port;
        self
    }

    /// Sets whether STARTTLS is used.
    #[must_use]
    pub const fn with_starttls(mut self, starttls: bool) -> Self {
        self.starttls = starttls;
        self
    }

    /// Sets login credentials.
    #[must_use]
    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }
}

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("starttls", &self.starttls)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("from", &self.from)
            .field("to", &self.to)
            .finish()
    }
}

/// Email notification channel delivering over SMTP.
pub struct EmailChannel {
    name: String,
    config: SmtpConfig,
    from: Mailbox,
    to: Vec<Mailbox>,
    transport: SmtpTransport,
    enabled: bool,
}

impl EmailChannel {
    /// Creates a new email channel.
    ///
    /// Addresses are validated here; no connection is made until the first send.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidChannel` if there are no recipients, an
    /// address does not parse, or the TLS relay cannot be set up.
    pub fn new(name: impl Into<String>, config: SmtpConfig) -> Result<Self> {
        if config.to.is_empty() {
            return Err(AlertError::InvalidChannel {
                reason: "email channel needs at least one recipient".to_string(),
            });
        }

        let from = parse_mailbox(&config.from)?;
        let to = config
            .to
            .iter()
            .map(|addr| parse_mailbox(addr))
            .collect::<Result<Vec<_>>>()?;

        let builder = if config.starttls {
            SmtpTransport::starttls_relay(&config.host).map_err(|e| {
                AlertError::InvalidChannel {
                    reason: format!("failed to set up SMTP relay '{}': {e}", config.host),
                }
            })?
        } else {
            SmtpTransport::builder_dangerous(&config.host)
        };
        let builder = builder.port(config.port);
        let builder = match (&config.username, &config.password) {
            (Some(user), Some(password)) => {
                builder.credentials(Credentials::new(user.clone(), password.clone()))
            }
            _ => builder,
        };

        Ok(Self {
            name: name.into(),
            from,
            to,
            transport: builder.build(),
            config,
            enabled: true,
        })
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns the recipient addresses.
    #[must_use]
    pub fn recipients(&self) -> &[String] {
        &self.config.to
    }

    /// Returns the sender address.
    #[must_use]
    pub fn sender(&self) -> &str {
        &self.config.from
    }

    /// Subject line for an alert.
    #[must_use]
    pub fn subject(alert: &AlertPayload) -> String {
        format!("🚨 Alert: {} Log from {}", alert.severity, alert.source)
    }

    /// Plain-text body for an alert.
    #[must_use]
    pub fn body(alert: &AlertPayload) -> String {
        format!(
            "Alert: {severity} level log detected\n\
             \n\
             Source: {source}\n\
             Time: {timestamp}\n\
             Severity: {severity}\n\
             Message: {message}\n\
             \n\
             ---\n\
             Cloud Log Monitoring System\n",
            severity = alert.severity,
            source = alert.source,
            timestamp = alert.timestamp,
            message = alert.message,
        )
    }

    /// Builds one message per recipient.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::NotificationFailed` if a message cannot be built.
    pub fn compose(&self, alert: &AlertPayload) -> Result<Vec<Message>> {
        let subject = Self::subject(alert);
        let body = Self::body(alert);

        self.to
            .iter()
            .map(|to| {
                Message::builder()
                    .from(self.from.clone())
                    .to(to.clone())
                    .subject(subject.clone())
                    .header(ContentType::TEXT_PLAIN)
                    .body(body.clone())
                    .map_err(|e| AlertError::NotificationFailed {
                        reason: format!("failed to build email: {e}"),
                    })
            })
            .collect()
    }
}

impl fmt::Debug for EmailChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailChannel")
            .field("name", &self.name)
            .field("config", &self.config)
            .field("enabled", &self.enabled)
            .finish_non_exhaustive()
    }
}

impl NotificationChannel for EmailChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, alert: &AlertPayload) -> Result<NotificationResult> {
        if !self.is_enabled() {
            debug!(channel = %self.name(), "channel is disabled, skipping");
            return Ok(NotificationResult::success(self.name())
                .with_message("channel disabled, notification skipped"));
        }

        let messages = self.compose(alert)?;
        let mut delivered = 0;
        let mut failures = Vec::new();

        for (recipient, message) in self.config.to.iter().zip(&messages) {
            match self.transport.send(message) {
                Ok(_) => delivered += 1,
                Err(e) => {
                    warn!(
                        channel = %self.name(),
                        to = %recipient,
                        error = %e,
                        "email delivery failed"
                    );
                    failures.push(format!("{recipient}: {e}"));
                }
            }
        }

        if delivered > 0 {
            info!(
                channel = %self.name(),
                delivered,
                severity = %alert.severity,
                source = %alert.source,
                "email alert sent"
            );
        }

        delivery_result(self.name(), &self.config.host, delivered, &failures)
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}

/// Folds per-recipient outcomes into one channel result.
///
/// Every recipient failing is an error. Some recipients failing is a
/// non-success result, since the alert already reached the others.
fn delivery_result(
    channel: &str,
    host: &str,
    delivered: usize,
    failures: &[String],
) -> Result<NotificationResult> {
    if failures.is_empty() {
        return Ok(NotificationResult::success(channel)
            .with_message(format!("sent to {delivered} recipient(s)")));
    }

    let detail = failures.join("; ");
    if delivered == 0 {
        return Err(AlertError::NotificationFailed {
            reason: format!("failed to send email via {host}: {detail}"),
        });
    }

    Ok(NotificationResult::failure(
        channel,
        format!(
            "delivered to {delivered} of {} recipient(s), failed: {detail}",
            delivered + failures.len()
        ),
    ))
}

fn parse_mailbox(addr: &str) -> Result<Mailbox> {
    addr.parse().map_err(|e| AlertError::InvalidChannel {
        reason: format!("invalid email address '{addr}': {e}"),
    })
}

/// A channel that logs alerts for debugging.
#[derive(Debug, Clone)]
pub struct LogChannel {
    name: String,
    enabled: bool,
}

impl LogChannel {
    /// Creates a new log channel.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
        }
    }

    /// Sets whether the channel is enabled.
    #[must_use]
    pub const fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }
}

impl Default for LogChannel {
    fn default() -> Self {
        Self::new("log")
    }
}

impl NotificationChannel for LogChannel {
    fn name(&self) -> &str {
        &self.name
    }

    fn send(&self, alert: &AlertPayload) -> Result<NotificationResult> {
        if !self.is_enabled() {
            return Ok(NotificationResult::success(self.name())
                .with_message("channel disabled"));
        }

        error!(
            severity = %alert.severity,
            source = %alert.source,
            timestamp = %alert.timestamp,
            text = %alert.message,
            "ALERT"
        );

        Ok(NotificationResult::success(self.name())
            .with_message("logged to tracing"))
    }

    fn is_enabled(&self) -> bool {
        self.enabled
    }
}
