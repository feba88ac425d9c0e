//! Per-signal alert throttling.
//!
//! [`AlertThrottler`] decides, for each log event, whether a notification
//! should fire now or be suppressed because the same signal fired within the
//! cooldown window. Events below the alertable severities are ignored.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, TimeDelta, Utc};
use tracing::{debug, info};

use crate::error::{AlertError, Result};
use crate::store::{InMemorySignalStore, RecordOutcome, SignalStore};
use crate::types::{AlertPayload, LogEvent, SignalKey};

/// Process-wide cooldown configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CooldownPolicy {
    window: Duration,
    window_delta: TimeDelta,
}

impl CooldownPolicy {
    /// Default cooldown window: 30 minutes.
    pub const DEFAULT_WINDOW: Duration = Duration::from_secs(30 * 60);

    /// Creates a policy with the given cooldown window.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidPolicy` if the window is zero or too large
    /// to be represented as a time delta.
    pub fn new(window: Duration) -> Result<Self> {
        if window.is_zero() {
            return Err(AlertError::InvalidPolicy {
                reason: "cooldown window must be greater than zero".to_string(),
            });
        }

        let window_delta = TimeDelta::from_std(window).map_err(|e| AlertError::InvalidPolicy {
            reason: format!("cooldown window out of range: {e}"),
        })?;

        Ok(Self {
            window,
            window_delta,
        })
    }

    /// Creates a policy with a window given in seconds.
    ///
    /// # Errors
    ///
    /// Returns `AlertError::InvalidPolicy` if `secs` is zero.
    pub fn from_secs(secs: u64) -> Result<Self> {
        Self::new(Duration::from_secs(secs))
    }

    /// Returns the cooldown window.
    #[must_use]
    pub const fn window(&self) -> Duration {
        self.window
    }

    /// Returns true if a signal last fired at `last_fired_at` may fire again at `now`.
    ///
    /// The window must have strictly elapsed: at exactly one window after the
    /// last fire the signal is still suppressed, and re-arms on the next
    /// instant. A `now` earlier than `last_fired_at` (clock skew) never
    /// re-arms the signal.
    #[must_use]
    pub fn has_elapsed(&self, last_fired_at: DateTime<Utc>, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(last_fired_at) > self.window_delta
    }

    /// Time left until a signal last fired at `last_fired_at` re-arms.
    #[must_use]
    pub fn remaining(&self, last_fired_at: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
        (self.window_delta - now.signed_duration_since(last_fired_at))
            .to_std()
            .unwrap_or(Duration::ZERO)
    }
}

impl Default for CooldownPolicy {
    fn default() -> Self {
        Self {
            window: Self::DEFAULT_WINDOW,
            window_delta: TimeDelta::minutes(30),
        }
    }
}

/// Outcome of evaluating one log event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// A notification should be sent for this event.
    Fire(LogEvent),
    /// The signal fired recently; no notification.
    Suppress {
        /// The throttled signal.
        key: SignalKey,
        /// Time until the signal may fire again.
        remaining: Duration,
    },
    /// The event's severity is not alertable.
    Ignore,
}

impl Decision {
    /// Returns true for [`Decision::Fire`].
    #[must_use]
    pub const fn is_fire(&self) -> bool {
        matches!(self, Self::Fire(_))
    }

    /// Returns true for [`Decision::Suppress`].
    #[must_use]
    pub const fn is_suppress(&self) -> bool {
        matches!(self, Self::Suppress { .. })
    }

    /// Returns the alert payload of a fire decision.
    #[must_use]
    pub fn payload(&self) -> Option<AlertPayload> {
        match self {
            Self::Fire(event) => Some(event.to_payload()),
            Self::Suppress { .. } | Self::Ignore => None,
        }
    }

    /// Short lowercase name of the outcome.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Fire(_) => "fire",
            Self::Suppress { .. } => "suppress",
            Self::Ignore => "ignore",
        }
    }
}

/// Gatekeeper deciding whether an alert for a log event should go out.
///
/// The throttler owns its [`SignalStore`]. Callers only reach the state
/// through [`AlertThrottler::evaluate`] and [`AlertThrottler::sweep`].
#[derive(Debug, Clone)]
pub struct AlertThrottler {
    policy: CooldownPolicy,
    store: Arc<dyn SignalStore>,
}

impl AlertThrottler {
    /// Creates a throttler backed by a fresh in-memory store.
    #[must_use]
    pub fn new(policy: CooldownPolicy) -> Self {
        Self::with_store(policy, Arc::new(InMemorySignalStore::new()))
    }

    /// Creates a throttler backed by the given store.
    #[must_use]
    pub fn with_store(policy: CooldownPolicy, store: Arc<dyn SignalStore>) -> Self {
        Self { policy, store }
    }

    /// Returns the cooldown policy.
    #[must_use]
    pub const fn policy(&self) -> &CooldownPolicy {
        &self.policy
    }

    /// Decides whether `event` should raise an alert at `now`.
    ///
    /// A fire decision updates the signal's `last_fired_at` before returning,
    /// so concurrent evaluations of the same signal observe it.
    pub fn evaluate(&self, event: LogEvent, now: DateTime<Utc>) -> Decision {
        if !event.severity.is_alertable() {
            debug!(severity = %event.severity, "severity not alertable, ignoring");
            return Decision::Ignore;
        }

        let key = event.signal_key();
        let policy = self.policy;
        let outcome = self.store.record_if(&key, now, &|last| {
            last.is_none_or(|last| policy.has_elapsed(last, now))
        });

        match outcome {
            RecordOutcome::Recorded => {
                info!(
                    signal = %key,
                    severity = %event.severity,
                    source = %event.source,
                    "alert fired"
                );
                Decision::Fire(event)
            }
            RecordOutcome::Rejected { last_fired_at } => {
                let remaining = last_fired_at
                    .map_or(policy.window(), |last| policy.remaining(last, now));
                debug!(
                    signal = %key,
                    remaining_secs = remaining.as_secs(),
                    "alert suppressed, signal fired recently"
                );
                Decision::Suppress { key, remaining }
            }
        }
    }

    /// Removes signals that last fired more than `max_age` before `now`.
    ///
    /// `max_age` is raised to the cooldown window if shorter, so a sweep never
    /// re-arms a signal early. Returns the number of removed signals.
    pub fn sweep(&self, now: DateTime<Utc>, max_age: Duration) -> usize {
        let max_age = max_age.max(self.policy.window());
        let Some(cutoff) = TimeDelta::from_std(max_age)
            .ok()
            .and_then(|age| now.checked_sub_signed(age))
        else {
            return 0;
        };

        let removed = self.store.remove_older_than(cutoff);
        if removed > 0 {
            debug!(removed, remaining = self.store.len(), "swept stale signals");
        }
        removed
    }

    /// Returns the last fire time of a signal.
    #[must_use]
    pub fn last_fired_at(&self, key: &SignalKey) -> Option<DateTime<Utc>> {
        self.store.last_fired_at(key)
    }

    /// Returns all tracked signals with their last fire time.
    #[must_use]
    pub fn signals(&self) -> Vec<(SignalKey, DateTime<Utc>)> {
        self.store.snapshot()
    }

    /// Returns the number of tracked signals.
    #[must_use]
    pub fn signal_count(&self) -> usize {
        self.store.len()
    }
}

impl Default for AlertThrottler {
    fn default() -> Self {
        Self::new(CooldownPolicy::default())
    }
}
