//! logwatch: a log ingestion service raising throttled alerts.
//!
//! Log records arrive as newline-delimited JSON (Cloud Logging entries, plain
//! records or Pub/Sub envelopes). ERROR and CRITICAL records are passed to a
//! [`logwatch_alerts::AlertManager`], which fires at most one alert per signal
//! per cooldown window and delivers it through the configured channels.
//!
//! # Modules
//!
//! - [`config`]: service configuration file and channel setup
//! - [`record`]: decoding of incoming records
//! - [`ingest`]: the ingest loop and the signal sweeper
//! - [`error`]: error types

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod ingest;
pub mod record;

pub use config::{EmailConfig, ServiceConfig};
pub use error::{LogwatchError, Result};
pub use ingest::{IngestSummary, Ingestor, MIN_SWEEP_INTERVAL, spawn_sweeper};
pub use record::decode_record;
