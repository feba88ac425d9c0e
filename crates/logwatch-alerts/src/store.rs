//! Signal state storage.
//!
//! This module provides the [`SignalStore`] trait, which holds the
//! `last_fired_at` timestamp of every signal the throttler has seen, and
//! [`InMemorySignalStore`], the default process-local implementation.
//!
//! The throttling rule itself lives in [`crate::throttle`]; a store only has
//! to apply an eligibility check and the resulting update atomically per key.

use std::fmt;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::types::SignalKey;

/// Outcome of a conditional record attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The key was eligible and `last_fired_at` now holds the new time.
    Recorded,
    /// The key was not eligible; state is unchanged.
    Rejected {
        /// The stored time that made the key ineligible, if any.
        last_fired_at: Option<DateTime<Utc>>,
    },
}

/// Storage for per-signal fire times.
///
/// Implementations must make [`SignalStore::record_if`] atomic with respect
/// to other calls for the same key: the eligibility check and the update are
/// one step, so two racing callers can never both see `Recorded` for a key
/// whose eligibility depends on the previous fire.
pub trait SignalStore: Send + Sync + fmt::Debug {
    /// Records `now` as the fire time for `key` if `eligible` accepts the
    /// currently stored fire time (`None` for an unseen key).
    fn record_if(
        &self,
        key: &SignalKey,
        now: DateTime<Utc>,
        eligible: &dyn Fn(Option<DateTime<Utc>>) -> bool,
    ) -> RecordOutcome;

    /// Returns the last fire time for a key.
    fn last_fired_at(&self, key: &SignalKey) -> Option<DateTime<Utc>>;

    /// Removes every entry whose fire time is strictly before `cutoff`.
    ///
    /// Returns the number of removed entries.
    fn remove_older_than(&self, cutoff: DateTime<Utc>) -> usize;

    /// Returns all tracked signals with their last fire time.
    fn snapshot(&self) -> Vec<(SignalKey, DateTime<Utc>)>;

    /// Returns the number of tracked signals.
    fn len(&self) -> usize;

    /// Returns true if no signal is tracked.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Process-local signal store backed by a sharded concurrent map.
///
/// Each key lives in one shard, and the check-then-update of
/// [`SignalStore::record_if`] runs under that shard's write lock. Keys in
/// other shards proceed in parallel.
#[derive(Default)]
pub struct InMemorySignalStore {
    signals: DashMap<SignalKey, DateTime<Utc>>,
}

impl InMemorySignalStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl fmt::Debug for InMemorySignalStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InMemorySignalStore")
            .field("signals", &self.signals.len())
            .finish()
    }
}

impl SignalStore for InMemorySignalStore {
    fn record_if(
        &self,
        key: &SignalKey,
        now: DateTime<Utc>,
        eligible: &dyn Fn(Option<DateTime<Utc>>) -> bool,
    ) -> RecordOutcome {
        match self.signals.entry(key.clone()) {
            Entry::Occupied(mut entry) => {
                let last = *entry.get();
                if eligible(Some(last)) {
                    entry.insert(now);
                    RecordOutcome::Recorded
                } else {
                    RecordOutcome::Rejected {
                        last_fired_at: Some(last),
                    }
                }
            }
            Entry::Vacant(entry) => {
                if eligible(None) {
                    entry.insert(now);
                    RecordOutcome::Recorded
                } else {
                    RecordOutcome::Rejected { last_fired_at: None }
                }
            }
        }
    }

    fn last_fired_at(&self, key: &SignalKey) -> Option<DateTime<Utc>> {
        self.signals.get(key).map(|entry| *entry.value())
    }

    fn remove_older_than(&self, cutoff: DateTime<Utc>) -> usize {
        let before = self.signals.len();
        self.signals.retain(|_, last| *last >= cutoff);
        before.saturating_sub(self.signals.len())
    }

    fn snapshot(&self) -> Vec<(SignalKey, DateTime<Utc>)> {
        let mut signals: Vec<_> = self
            .signals
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        signals.sort();
        signals
    }

    fn len(&self) -> usize {
        self.signals.len()
    }
}
