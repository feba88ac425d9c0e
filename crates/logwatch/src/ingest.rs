//! Ingest loop and maintenance tasks.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use logwatch_alerts::{AlertManager, Decision};
use serde::Serialize;
use tokio::io::{AsyncBufRead, AsyncBufReadExt};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::error::{LogwatchError, Result};
use crate::record::decode_record;

/// Counters for one ingest run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    /// Non-blank lines read.
    pub lines: u64,
    /// Lines decoded into log events.
    pub decoded: u64,
    /// Lines that failed to decode.
    pub rejected: u64,
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

/// Feeds decoded log records into an [`AlertManager`].
#[derive(Debug, Clone)]
pub struct Ingestor {
    manager: Arc<AlertManager>,
}

impl Ingestor {
    /// Creates an ingestor delivering to `manager`.
    #[must_use]
    pub fn new(manager: Arc<AlertManager>) -> Self {
        Self { manager }
    }

    /// Returns the alert manager.
    #[must_use]
    pub fn manager(&self) -> &Arc<AlertManager> {
        &self.manager
    }

    /// Reads newline-delimited JSON records until EOF.
    ///
    /// Undecodable lines are logged and counted, they never stop the run.
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails or a processing task panics.
    pub async fn run<R>(&self, mut reader: R) -> Result<IngestSummary>
    where
        R: AsyncBufRead + Unpin,
    {
        let mut summary = IngestSummary::default();
        let mut buf = Vec::new();
        let mut line_no: u64 = 0;

        loop {
            buf.clear();
            if reader.read_until(b'\n', &mut buf).await? == 0 {
                break;
            }
            line_no += 1;
            if buf.trim_ascii().is_empty() {
                continue;
            }
            summary.lines += 1;

            let line = match std::str::from_utf8(&buf) {
                Ok(line) => line.trim(),
                Err(e) => {
                    warn!(line = line_no, error = %e, "Rejected log record, not UTF-8");
                    summary.rejected += 1;
                    continue;
                }
            };

            let event = match decode_record(line, Utc::now()) {
                Ok(event) => event,
                Err(e) => {
                    warn!(line = line_no, error = %e, "Rejected log record");
                    summary.rejected += 1;
                    continue;
                }
            };
            summary.decoded += 1;

            // Channel delivery may block on SMTP.
            let manager = Arc::clone(&self.manager);
            let outcome = tokio::task::spawn_blocking(move || manager.process(event))
                .await
                .map_err(|e| LogwatchError::Task(e.to_string()))?;

            match outcome.decision {
                Decision::Fire(_) => summary.fired += 1,
                Decision::Suppress { .. } => summary.suppressed += 1,
                Decision::Ignore => summary.ignored += 1,
            }
            summary.notifications_sent += outcome.notifications_sent as u64;
            summary.notification_failures += outcome.notification_failures as u64;
        }

        info!(
            lines = summary.lines,
            rejected = summary.rejected,
            fired = summary.fired,
            suppressed = summary.suppressed,
            "Ingest finished"
        );
        Ok(summary)
    }
}

/// Shortest interval accepted by [`spawn_sweeper`].
pub const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(10);

/// Spawns a task sweeping idle signals every `interval`.
///
/// Intervals shorter than [`MIN_SWEEP_INTERVAL`] are raised to it. The task
/// runs until the returned handle is aborted.
pub fn spawn_sweeper(manager: Arc<AlertManager>, interval: Duration) -> JoinHandle<()> {
    let interval = interval.max(MIN_SWEEP_INTERVAL);
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // The first tick completes immediately.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let removed = manager.sweep(Utc::now());
            debug!(removed, remaining = manager.signal_count(), "Signal sweep");
        }
    })
}
