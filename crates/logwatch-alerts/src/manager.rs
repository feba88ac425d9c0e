//! Alert manager tying throttling to notification delivery.
//!
//! This module provides the [`AlertManager`], the main entry point of the
//! alerting system. It runs each log event through the [`AlertThrottler`]
//! and, when a signal fires, hands the alert to every configured channel.
//! Delivery failures are logged and counted here and never reach the
//! throttling decision.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, warn};

use crate::channels::NotificationChannel;
use crate::throttle::{AlertThrottler, CooldownPolicy, Decision};
use crate::types::{AlertPayload, LogEvent};

/// Configuration for the alert manager.
#[derive(Debug, Clone, Copy)]
pub struct AlertManagerConfig {
    /// Cooldown applied per signal.
    pub cooldown: CooldownPolicy,
    /// Signals are swept once they are this many cooldown windows old.
    pub retention_multiple: u32,
}

impl AlertManagerConfig {
    /// Age after which a signal is dropped by [`AlertManager::sweep`].
    #[must_use]
    pub fn retention(&self) -> Duration {
        self.cooldown.window().saturating_mul(self.retention_multiple.max(1))
    }
}

impl Default for AlertManagerConfig {
    fn default() -> Self {
        Self {
            cooldown: CooldownPolicy::default(),
            retention_multiple: 4,
        }
    }
}

/// The result of processing one log event.
#[derive(Debug, Clone)]
pub struct ProcessOutcome {
    /// The throttling decision.
    pub decision: Decision,
    /// Channels that accepted the alert.
    pub notifications_sent: usize,
    /// Channels that failed to deliver the alert.
    pub notification_failures: usize,
}

/// Running totals since the manager was created.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
    /// Events that fired an alert.
    pub fired: u64,
    /// Events suppressed by the cooldown.
    pub suppressed: u64,
    /// Events below the alertable severities.
    pub ignored: u64,
    /// Successful channel deliveries.
    pub notifications_sent: u64,
    /// Failed channel deliveries.
    pub notification_failures: u64,
}

#[derive(Debug, Default)]
struct Counters {
    fired: AtomicU64,
    suppressed: AtomicU64,
    ignored: AtomicU64,
    notifications_sent: AtomicU64,
    notification_failures: AtomicU64,
}

/// The alert manager evaluates log events and dispatches fired alerts.
#[derive(Debug)]
pub struct AlertManager {
    /// Configuration for the manager.
    config: AlertManagerConfig,
    /// Per-signal cooldown gate.
    throttler: AlertThrottler,
    /// Notification channels.
    channels: Arc<RwLock<Vec<Box<dyn NotificationChannel>>>>,
    /// Outcome counters.
    counters: Counters,
}

impl AlertManager {
    /// Creates a new alert manager with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(AlertManagerConfig::default())
    }

    /// Creates a new alert manager with custom configuration.
    #[must_use]
    pub fn with_config(config: AlertManagerConfig) -> Self {
        Self::with_throttler(config, AlertThrottler::new(config.cooldown))
    }

    /// Creates a manager around an existing throttler.
    ///
    /// The throttler's own policy takes precedence over `config.cooldown`.
    #[must_use]
    pub fn with_throttler(mut config: AlertManagerConfig, throttler: AlertThrottler) -> Self {
        config.cooldown = *throttler.policy();
        Self {
            config,
            throttler,
            channels: Arc::new(RwLock::new(Vec::new())),
            counters: Counters::default(),
        }
    }

    /// Returns the configuration.
    #[must_use]
    pub const fn config(&self) -> &AlertManagerConfig {
        &self.config
    }

    /// Returns the throttler.
    #[must_use]
    pub const fn throttler(&self) -> &AlertThrottler {
        &self.throttler
    }

    // ============ Channel Management ============

    /// Adds a notification channel.
    pub fn add_channel(&self, channel: Box<dyn NotificationChannel>) {
        let mut channels = self.channels.write();
        info!(channel = %channel.name(), "added notification channel");
        channels.push(channel);
    }

    /// Returns the number of channels.
    #[must_use]
    pub fn channel_count(&self) -> usize {
        let channels = self.channels.read();
        channels.len()
    }

    /// Returns the names of all channels.
    #[must_use]
    pub fn channel_names(&self) -> Vec<String> {
        let channels = self.channels.read();
        channels.iter().map(|c| c.name().to_string()).collect()
    }

    // ============ Processing ============

    /// Processes an event against the current wall-clock time.
    pub fn process(&self, event: LogEvent) -> ProcessOutcome {
        self.process_at(event, Utc::now())
    }

    /// Processes an event at `now`.
    pub fn process_at(&self, event: LogEvent, now: DateTime<Utc>) -> ProcessOutcome {
        let decision = self.throttler.evaluate(event, now);

        let (sent, failed) = match &decision {
            Decision::Fire(event) => {
                self.counters.fired.fetch_add(1, Ordering::Relaxed);
                self.send_notifications(&event.to_payload())
            }
            Decision::Suppress { .. } => {
                self.counters.suppressed.fetch_add(1, Ordering::Relaxed);
                (0, 0)
            }
            Decision::Ignore => {
                self.counters.ignored.fetch_add(1, Ordering::Relaxed);
                (0, 0)
            }
        };

        ProcessOutcome {
            decision,
            notifications_sent: sent,
            notification_failures: failed,
        }
    }

    /// Sends an alert through every enabled channel.
    ///
    /// Returns `(sent, failed)`.
    fn send_notifications(&self, alert: &AlertPayload) -> (usize, usize) {
        let channels = self.channels.read();
        let mut sent = 0;
        let mut failed = 0;

        for channel in channels.iter().filter(|c| c.is_enabled()) {
            match channel.send(alert) {
                Ok(result) if result.success => {
                    sent += 1;
                    debug!(channel = %channel.name(), "notification sent");
                }
                Ok(result) => {
                    failed += 1;
                    warn!(
                        channel = %channel.name(),
                        detail = ?result.message,
                        "notification not delivered"
                    );
                }
                Err(e) => {
                    failed += 1;
                    error!(channel = %channel.name(), error = %e, "failed to send notification");
                }
            }
        }
        drop(channels);

        if sent == 0 && failed == 0 {
            debug!("no enabled notification channels");
        }

        self.counters
            .notifications_sent
            .fetch_add(sent as u64, Ordering::Relaxed);
        self.counters
            .notification_failures
            .fetch_add(failed as u64, Ordering::Relaxed);

        (sent, failed)
    }

    // ============ Maintenance ============

    /// Drops signals older than the configured retention.
    ///
    /// Returns the number of removed signals.
    pub fn sweep(&self, now: DateTime<Utc>) -> usize {
        let removed = self.throttler.sweep(now, self.config.retention());
        if removed > 0 {
            info!(
                removed,
                tracked = self.throttler.signal_count(),
                "swept stale alert signals"
            );
        }
        removed
    }

    /// Returns the number of tracked signals.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.throttler.signal_count()
    }

    /// Returns a snapshot of the outcome counters.
    #[must_use]
    pub fn stats(&self) -> AlertStats {
        AlertStats {
            fired: self.counters.fired.load(Ordering::Relaxed),
            suppressed: self.counters.suppressed.load(Ordering::Relaxed),
            ignored: self.counters.ignored.load(Ordering::Relaxed),
            notifications_sent: self.counters.notifications_sent.load(Ordering::Relaxed),
            notification_failures: self.counters.notification_failures.load(Ordering::Relaxed),
        }
    }
}

impl Default for AlertManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channels::{LogChannel, NotificationResult};
    use crate::error::{AlertError, Result};
    use crate::types::Severity;
    use chrono::{TimeDelta, TimeZone};
    use parking_lot::Mutex;

    /// Channel recording every alert it receives.
    #[derive(Debug, Default, Clone)]
    struct RecordingChannel {
        received: Arc<Mutex<Vec<AlertPayload>>>,
    }

    impl NotificationChannel for RecordingChannel {
        fn name(&self) -> &str {
            "recording"
        }

        fn send(&self, alert: &AlertPayload) -> Result<NotificationResult> {
            self.received.lock().push(alert.clone());
            Ok(NotificationResult::success(self.name()))
        }
    }

    /// Channel that always fails.
    #[derive(Debug)]
    struct FailingChannel;

    impl NotificationChannel for FailingChannel {
        fn name(&self) -> &str {
            "failing"
        }

        fn send(&self, _alert: &AlertPayload) -> Result<NotificationResult> {
            Err(AlertError::NotificationFailed {
                reason: "smtp login rejected".to_string(),
            })
        }
    }

    /// Channel that reaches only some of its recipients.
    #[derive(Debug)]
    struct PartialChannel;

    impl NotificationChannel for PartialChannel {
        fn name(&self) -> &str {
            "partial"
        }

        fn send(&self, _alert: &AlertPayload) -> Result<NotificationResult> {
            Ok(NotificationResult::failure(
                self.name(),
                "delivered to 1 of 2 recipient(s)",
            ))
        }
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()
    }

    fn error(message: &str) -> LogEvent {
        LogEvent::new(Severity::Error, message, "api")
    }

    mod config_tests {
        use super::*;

        #[test]
        fn default_retention_is_four_windows() {
            let config = AlertManagerConfig::default();
            assert_eq!(config.retention(), Duration::from_secs(4 * 1800));
        }

        #[test]
        fn zero_multiple_keeps_one_window() {
            let config = AlertManagerConfig {
                retention_multiple: 0,
                ..Default::default()
            };
            assert_eq!(config.retention(), Duration::from_secs(1800));
        }

        #[test]
        fn throttler_policy_wins() {
            let throttler = AlertThrottler::new(CooldownPolicy::from_secs(60).unwrap());
            let manager = AlertManager::with_throttler(AlertManagerConfig::default(), throttler);
            assert_eq!(manager.config().cooldown.window(), Duration::from_secs(60));
        }
    }

    mod channel_tests {
        use super::*;

        #[test]
        fn add_channel() {
            let manager = AlertManager::new();
            assert_eq!(manager.channel_count(), 0);

            manager.add_channel(Box::new(LogChannel::default()));
            assert_eq!(manager.channel_count(), 1);
            assert_eq!(manager.channel_names(), vec!["log".to_string()]);
        }
    }

    mod process_tests {
        use super::*;

        #[test]
        fn fire_dispatches_payload() {
            let manager = AlertManager::new();
            let channel = RecordingChannel::default();
            manager.add_channel(Box::new(channel.clone()));

            let outcome = manager.process_at(error("DB down"), t0());

            assert!(outcome.decision.is_fire());
            assert_eq!(outcome.notifications_sent, 1);
            let received = channel.received.lock();
            assert_eq!(received.len(), 1);
            assert_eq!(received[0].message, "DB down");
            assert_eq!(received[0].severity, "ERROR");
        }

        #[test]
        fn suppressed_event_sends_nothing() {
            let manager = AlertManager::new();
            let channel = RecordingChannel::default();
            manager.add_channel(Box::new(channel.clone()));

            manager.process_at(error("DB down"), t0());
            let outcome = manager.process_at(error("DB down"), t0() + TimeDelta::minutes(5));

            assert!(outcome.decision.is_suppress());
            assert_eq!(outcome.notifications_sent, 0);
            assert_eq!(channel.received.lock().len(), 1);
        }

        #[test]
        fn ignored_event_sends_nothing() {
            let manager = AlertManager::new();
            let channel = RecordingChannel::default();
            manager.add_channel(Box::new(channel.clone()));

            let event = LogEvent::new(Severity::Info, "started", "api");
            let outcome = manager.process_at(event, t0());

            assert_eq!(outcome.decision, Decision::Ignore);
            assert!(channel.received.lock().is_empty());
        }

        #[test]
        fn failing_channel_does_not_affect_decision() {
            let manager = AlertManager::new();
            let channel = RecordingChannel::default();
            manager.add_channel(Box::new(FailingChannel));
            manager.add_channel(Box::new(channel.clone()));

            let outcome = manager.process_at(error("DB down"), t0());

            assert!(outcome.decision.is_fire());
            assert_eq!(outcome.notifications_sent, 1);
            assert_eq!(outcome.notification_failures, 1);

            // The failed delivery still counts as the signal's fire.
            let again = manager.process_at(error("DB down"), t0() + TimeDelta::minutes(1));
            assert!(again.decision.is_suppress());
        }

        #[test]
        fn partial_delivery_counts_as_failure() {
            let manager = AlertManager::new();
            let channel = RecordingChannel::default();
            manager.add_channel(Box::new(PartialChannel));
            manager.add_channel(Box::new(channel.clone()));

            let outcome = manager.process_at(error("DB down"), t0());

            assert!(outcome.decision.is_fire());
            assert_eq!(outcome.notifications_sent, 1);
            assert_eq!(outcome.notification_failures, 1);
            assert_eq!(manager.stats().notification_failures, 1);
        }

        #[test]
        fn disabled_channels_are_skipped() {
            let manager = AlertManager::new();
            manager.add_channel(Box::new(LogChannel::default().enabled(false)));

            let outcome = manager.process_at(error("DB down"), t0());

            assert!(outcome.decision.is_fire());
            assert_eq!(outcome.notifications_sent, 0);
            assert_eq!(outcome.notification_failures, 0);
        }

        #[test]
        fn stats_track_outcomes() {
            let manager = AlertManager::new();
            manager.add_channel(Box::new(FailingChannel));

            manager.process_at(error("DB down"), t0());
            manager.process_at(error("DB down"), t0() + TimeDelta::minutes(1));
            manager.process_at(LogEvent::new(Severity::Debug, "x", "api"), t0());

            assert_eq!(
                manager.stats(),
                AlertStats {
                    fired: 1,
                    suppressed: 1,
                    ignored: 1,
                    notifications_sent: 0,
                    notification_failures: 1,
                }
            );
        }
    }

    mod sweep_tests {
        use super::*;

        #[test]
        fn sweep_uses_retention() {
            let manager = AlertManager::new();
            manager.process_at(error("DB down"), t0());

            assert_eq!(manager.sweep(t0() + TimeDelta::hours(1)), 0);
            assert_eq!(manager.signal_count(), 1);

            assert_eq!(manager.sweep(t0() + TimeDelta::hours(3)), 1);
            assert_eq!(manager.signal_count(), 0);
        }
    }
}
