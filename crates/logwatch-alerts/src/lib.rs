//! Alert throttling and notification delivery for logwatch.
//!
//! `logwatch-alerts` decides whether a log event should raise an alert and
//! delivers the alerts that do.
//!
//! # Features
//!
//! - **Per-signal cooldown**: one alert per signal (severity + exact message)
//!   per cooldown window, 30 minutes by default
//! - **Concurrency safe**: racing evaluations of one signal fire exactly once
//! - **Pluggable state**: the signal table sits behind the [`SignalStore`] trait
//! - **Notification channels**: SMTP email and tracing-log channels
//! - **Maintenance sweep**: explicit removal of long-idle signals
//!
//! # Example
//!
//! ```rust
//! use logwatch_alerts::{AlertManager, LogEvent, Severity, channels::LogChannel};
//!
//! let manager = AlertManager::new();
//! manager.add_channel(Box::new(LogChannel::default()));
//!
//! let first = manager.process(LogEvent::new(Severity::Error, "DB down", "api"));
//! assert!(first.decision.is_fire());
//!
//! // The same signal inside the cooldown window is suppressed.
//! let second = manager.process(LogEvent::new(Severity::Error, "DB down", "api"));
//! assert!(second.decision.is_suppress());
//! ```
//!
//! # Using the throttler directly
//!
//! ```rust
//! use chrono::{Duration, Utc};
//! use logwatch_alerts::{AlertThrottler, CooldownPolicy, Decision, LogEvent, Severity};
//!
//! let throttler = AlertThrottler::new(CooldownPolicy::default());
//! let t0 = Utc::now();
//!
//! let event = LogEvent::new(Severity::Error, "DB down", "api");
//! assert!(throttler.evaluate(event.clone(), t0).is_fire());
//!
//! match throttler.evaluate(event, t0 + Duration::minutes(10)) {
//!     Decision::Suppress { remaining, .. } => assert_eq!(remaining.as_secs(), 20 * 60),
//!     other => panic!("unexpected decision: {other:?}"),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(rustdoc::missing_crate_level_docs)]

pub mod channels;
pub mod error;
pub mod manager;
pub mod store;
pub mod throttle;
pub mod types;

// Re-export main types at crate root
pub use channels::{
    EmailChannel, LogChannel, NotificationChannel, NotificationResult, SmtpConfig,
};
pub use error::{AlertError, Result};
pub use manager::{AlertManager, AlertManagerConfig, AlertStats, ProcessOutcome};
pub use store::{InMemorySignalStore, RecordOutcome, SignalStore};
pub use throttle::{AlertThrottler, CooldownPolicy, Decision};
pub use types::{AlertPayload, LogEvent, Severity, SignalKey};
