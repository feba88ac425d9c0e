//! Service configuration.
//!
//! Configuration for the logwatch service, including:
//! - Cooldown window applied per alert signal
//! - Maintenance sweep cadence and retention
//! - Notification channels (tracing log, SMTP email)
//!
//! Every field has a default, so an empty JSON object is a valid file.
//! Email credentials are usually supplied through the environment and merged
//! over the file with [`ServiceConfig::with_email_overrides`].

use std::fmt;
use std::path::Path;
use std::time::Duration;

use logwatch_alerts::{
    AlertManager, AlertManagerConfig, CooldownPolicy, EmailChannel, LogChannel, SmtpConfig,
};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::{LogwatchError, Result};

/// SMTP settings for email alerts.
#[derive(Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EmailConfig {
    /// SMTP relay host.
    pub smtp_host: String,
    /// SMTP port.
    pub smtp_port: u16,
    /// Whether to upgrade the connection with STARTTLS.
    pub starttls: bool,
    /// Sender address, also used as the SMTP login.
    pub sender: Option<String>,
    /// Recipient addresses.
    pub recipients: Vec<String>,
    /// SMTP password.
    pub password: Option<String>,
}

impl Default for EmailConfig {
    fn default() -> Self {
        Self {
            smtp_host: SmtpConfig::DEFAULT_HOST.to_string(),
            smtp_port: SmtpConfig::DEFAULT_PORT,
            starttls: true,
            sender: None,
            recipients: Vec::new(),
            password: None,
        }
    }
}

impl EmailConfig {
    /// Names of the credentials that are still missing.
    #[must_use]
    pub fn missing_credentials(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.sender.as_deref().is_none_or(str::is_empty) {
            missing.push("sender");
        }
        if self.recipients.is_empty() {
            missing.push("recipients");
        }
        if self.password.as_deref().is_none_or(str::is_empty) {
            missing.push("password");
        }
        missing
    }

    /// Returns the SMTP configuration, or `None` while credentials are missing.
    #[must_use]
    pub fn smtp_config(&self) -> Option<SmtpConfig> {
        if !self.missing_credentials().is_empty() {
            return None;
        }
        let sender = self.sender.clone()?;
        let password = self.password.clone()?;

        Some(
            SmtpConfig::new(sender.clone(), self.recipients.clone())
                .with_relay(self.smtp_host.clone(), self.smtp_port)
                .with_starttls(self.starttls)
                .with_credentials(sender, password),
        )
    }
}

impl fmt::Debug for EmailConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EmailConfig")
            .field("smtp_host", &self.smtp_host)
            .field("smtp_port", &self.smtp_port)
            .field("starttls", &self.starttls)
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Main service configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServiceConfig {
    /// Cooldown window per alert signal, in seconds.
    pub cooldown_secs: u64,
    /// How often stale signals are swept, in seconds.
    pub sweep_interval_secs: u64,
    /// Signals idle for this many cooldown windows are swept.
    pub retention_multiple: u32,
    /// Whether fired alerts are also written to the log.
    pub log_alerts: bool,
    /// Email alerting.
    pub email: Option<EmailConfig>,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            cooldown_secs: 30 * 60,
            sweep_interval_secs: 5 * 60,
            retention_multiple: 4,
            log_alerts: true,
            email: None,
        }
    }
}

impl ServiceConfig {
    /// Load configuration from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| {
            LogwatchError::Config(format!(
                "failed to read config file '{}': {e}",
                path.display()
            ))
        })?;

        Self::from_json(&content)
    }

    /// Parse configuration from a JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if the JSON is invalid or fails validation.
    pub fn from_json(content: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(content)
            .map_err(|e| LogwatchError::Config(format!("invalid JSON: {e}")))?;

        config.validate()?;
        Ok(config)
    }

    /// Write the configuration as pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| LogwatchError::Config(format!("failed to serialize config: {e}")))?;
        std::fs::write(path, content + "\n")?;
        Ok(())
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.cooldown_secs == 0 {
            return Err(LogwatchError::Config(
                "cooldown_secs must be greater than 0".to_string(),
            ));
        }

        if self.sweep_interval_secs == 0 {
            return Err(LogwatchError::Config(
                "sweep_interval_secs must be greater than 0".to_string(),
            ));
        }

        if self.retention_multiple == 0 {
            return Err(LogwatchError::Config(
                "retention_multiple must be greater than 0".to_string(),
            ));
        }

        if let Some(email) = &self.email {
            if email.smtp_host.trim().is_empty() {
                return Err(LogwatchError::Config(
                    "email.smtp_host cannot be empty".to_string(),
                ));
            }
            if email.smtp_port == 0 {
                return Err(LogwatchError::Config(
                    "email.smtp_port must be greater than 0".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Merges email credentials over the file configuration.
    ///
    /// `recipients` is a comma-separated list. Any provided value creates the
    /// email section if the file had none.
    #[must_use]
    pub fn with_email_overrides(
        mut self,
        sender: Option<String>,
        recipients: Option<String>,
        password: Option<String>,
    ) -> Self {
        if sender.is_none() && recipients.is_none() && password.is_none() {
            return self;
        }

        let email = self.email.get_or_insert_with(EmailConfig::default);
        if let Some(sender) = sender {
            email.sender = Some(sender);
        }
        if let Some(recipients) = recipients {
            email.recipients = recipients
                .split(',')
                .map(str::trim)
                .filter(|r| !r.is_empty())
                .map(ToString::to_string)
                .collect();
        }
        if let Some(password) = password {
            email.password = Some(password);
        }
        self
    }

    /// Returns the sweep interval.
    #[must_use]
    pub const fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }

    /// Builds the alert manager configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown is invalid.
    pub fn alert_manager_config(&self) -> Result<AlertManagerConfig> {
        Ok(AlertManagerConfig {
            cooldown: CooldownPolicy::from_secs(self.cooldown_secs)?,
            retention_multiple: self.retention_multiple,
        })
    }

    /// Builds an alert manager with the configured channels.
    ///
    /// An email section with missing credentials is skipped with a warning;
    /// alerts are then only logged.
    ///
    /// # Errors
    ///
    /// Returns an error if the cooldown is invalid or the email channel
    /// configuration is rejected.
    pub fn build_manager(&self) -> Result<AlertManager> {
        let manager = AlertManager::with_config(self.alert_manager_config()?);

        if self.log_alerts {
            manager.add_channel(Box::new(LogChannel::default()));
        }

        if let Some(email) = &self.email {
            match email.smtp_config() {
                Some(smtp) => {
                    let channel = EmailChannel::new("email", smtp)?;
                    manager.add_channel(Box::new(channel));
                }
                None => {
                    warn!(
                        missing = ?email.missing_credentials(),
                        "email credentials not configured, email alerts disabled"
                    );
                }
            }
        }

        info!(
            cooldown_secs = self.cooldown_secs,
            channels = ?manager.channel_names(),
            "alert manager ready"
        );

        Ok(manager)
    }
}
