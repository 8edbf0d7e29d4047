//! The shared occurrence cache.
//!
//! One mutex guards everything: the set of upcoming occurrences and, per
//! occurrence, whether its alarm already fired. The fetch driver writes it via
//! [`AlarmCache::reconcile`], the scanner reads and prunes it via
//! [`AlarmCache::scan`]. Each holds the lock for its whole pass.
//!
//! Alarm state lives next to each entry rather than in a separate set, so an
//! occurrence can never be "alarmed" without also being cached, and evicting
//! an entry drops its alarm bookkeeping with it.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::error::GcalertResult;
use crate::occurrence::{Occurrence, OccurrenceKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlarmState {
    /// Waiting for the alarm time.
    Pending,
    /// Notification fired; waiting for the start time to evict.
    Alarmed,
}

/// Counts from one reconcile pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub added: usize,
    pub removed: usize,
    pub retained: usize,
    /// Fetched occurrences dropped because they had already started.
    pub skipped_past: usize,
}

/// Counts from one scan pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScanReport {
    pub fired: usize,
    /// Fires whose notification failed to display. Still counted in `fired`.
    pub failed: usize,
    pub expired: usize,
}

#[derive(Debug, Default)]
pub struct AlarmCache {
    entries: Mutex<HashMap<Occurrence, AlarmState>>,
}

impl AlarmCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    /// Alarm state of the occurrence with this identity, if cached.
    pub fn state(&self, key: &OccurrenceKey) -> Option<AlarmState> {
        self.entries.lock().get(key).copied()
    }

    pub fn is_alarmed(&self, key: &OccurrenceKey) -> bool {
        self.state(key) == Some(AlarmState::Alarmed)
    }

    /// A copy of the cache, ordered by start time then identity.
    pub fn snapshot(&self) -> Vec<(Occurrence, AlarmState)> {
        let mut entries: Vec<(Occurrence, AlarmState)> = self
            .entries
            .lock()
            .iter()
            .map(|(occurrence, state)| (occurrence.clone(), *state))
            .collect();
        entries.sort_by(|(a, _), (b, _)| {
            a.start()
                .cmp(&b.start())
                .then_with(|| a.key().cmp(b.key()))
        });
        entries
    }

    /// Merge a freshly fetched snapshot into the cache.
    ///
    /// Cached occurrences missing from `fetched` are dropped (deleted or
    /// edited upstream). Fetched occurrences not yet cached are added as
    /// pending, but only if they start after `now`. Occurrences present in
    /// both keep their alarm state.
    ///
    /// An edit to any displayed field shows up as a removal plus an addition,
    /// so the edited occurrence starts over as pending and may alarm again.
    pub fn reconcile(&self, fetched: Vec<Occurrence>, now: DateTime<Utc>) -> ReconcileReport {
        let fetched: HashSet<Occurrence> = fetched.into_iter().collect();
        let mut report = ReconcileReport::default();

        let mut entries = self.entries.lock();

        entries.retain(|occurrence, _| {
            let keep = fetched.contains(occurrence);
            if !keep {
                debug!("Event deleted or modified: {}", occurrence);
                report.removed += 1;
            }
            keep
        });

        for occurrence in fetched {
            if entries.contains_key(&occurrence) {
                report.retained += 1;
            } else if occurrence.start() > now {
                debug!("Not seen before, adding: {}", occurrence);
                entries.insert(occurrence, AlarmState::Pending);
                report.added += 1;
            } else {
                debug!("Already started, skipping: {}", occurrence);
                report.skipped_past += 1;
            }
        }

        report
    }

    /// Walk the cache once, firing due alarms and evicting started events.
    ///
    /// An occurrence whose start is at or before `now` is evicted whatever its
    /// state; it never fires late. A pending occurrence whose alarm time has
    /// come is passed to `fire` and marked alarmed, even if `fire` fails, so a
    /// broken display backend does not cause repeated alarms.
    pub fn scan<F>(&self, now: DateTime<Utc>, mut fire: F) -> ScanReport
    where
        F: FnMut(&Occurrence) -> GcalertResult<()>,
    {
        let mut report = ScanReport::default();

        let mut entries = self.entries.lock();

        entries.retain(|occurrence, state| {
            if occurrence.start() <= now {
                debug!("Removing event `{}`", occurrence);
                report.expired += 1;
                return false;
            }

            match state {
                AlarmState::Pending if now >= occurrence.alarm_time() => {
                    info!("***** ALARM: {} *****", occurrence);
                    if let Err(e) = fire(occurrence) {
                        warn!("Failed to send alarm notification: {}", e);
                        report.failed += 1;
                    }
                    *state = AlarmState::Alarmed;
                    report.fired += 1;
                }
                AlarmState::Pending => {
                    debug!("Not yet ready to alert for event `{}`", occurrence);
                }
                AlarmState::Alarmed => {
                    debug!("Already alerted for event `{}`", occurrence);
                }
            }

            true
        });

        report
    }
}
