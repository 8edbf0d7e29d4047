//! The fetch driver: keeps the cache in sync with the calendar service.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use crate::cache::{AlarmCache, ReconcileReport};
use crate::error::GcalertResult;
use crate::occurrence::Occurrence;
use crate::remote::{Authenticator, CalendarService};
use crate::time_format::TimeFormat;

#[derive(Debug, Clone)]
pub struct FetchSettings {
    /// Pause between successful fetch cycles.
    pub query_interval: Duration,
    /// Pause before retrying authentication after a failure.
    pub reconnect_interval: Duration,
    /// How far ahead to look for events.
    pub lookahead_days: u32,
    pub time_format: TimeFormat,
}

enum Connection<S> {
    Disconnected,
    Connected(S),
}

/// What a single driver cycle did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Reconciled(ReconcileReport),
    /// The fetch failed; the cache was left alone.
    ConnectionLost,
    Reconnected,
    ReconnectFailed,
}

pub struct FetchDriver<A: Authenticator> {
    auth: A,
    cache: Arc<AlarmCache>,
    settings: FetchSettings,
    connection: Connection<A::Service>,
}

impl<A: Authenticator> FetchDriver<A> {
    pub fn new(auth: A, cache: Arc<AlarmCache>, settings: FetchSettings) -> Self {
        FetchDriver {
            auth,
            cache,
            settings,
            connection: Connection::Disconnected,
        }
    }

    #[cfg(test)]
    pub(crate) fn is_connected(&self) -> bool {
        matches!(self.connection, Connection::Connected(_))
    }

    /// Try to authenticate. Failure is reported, never fatal.
    pub async fn login(&mut self) -> bool {
        match self.auth.authenticate().await {
            Ok(service) => {
                info!("Logged in to Google Calendar");
                self.connection = Connection::Connected(service);
                true
            }
            Err(e) => {
                warn!("Failed to authenticate to Google: {}", e);
                self.connection = Connection::Disconnected;
                false
            }
        }
    }

    /// Run one cycle, without the trailing query pause.
    ///
    /// Disconnected: wait out the reconnect interval, then log in again.
    /// Connected: fetch the lookahead window and reconcile it into the cache.
    /// A failed fetch disconnects and leaves the cache untouched.
    pub async fn cycle(&mut self) -> CycleOutcome {
        let fetched = match &self.connection {
            Connection::Disconnected => return self.reconnect().await,
            Connection::Connected(service) => {
                let now = Utc::now();
                let until = now
                    .checked_add_signed(chrono::Duration::days(i64::from(self.settings.lookahead_days)))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC);
                fetch_occurrences(service, now, until, &self.settings.time_format).await
            }
        };

        match fetched {
            Ok(occurrences) => {
                let report = self.cache.reconcile(occurrences, Utc::now());
                debug!(
                    added = report.added,
                    removed = report.removed,
                    retained = report.retained,
                    skipped_past = report.skipped_past,
                    "Reconciled"
                );
                CycleOutcome::Reconciled(report)
            }
            Err(e) => {
                warn!("Connection lost ({}), will reconnect.", e);
                self.connection = Connection::Disconnected;
                CycleOutcome::ConnectionLost
            }
        }
    }

    async fn reconnect(&mut self) -> CycleOutcome {
        info!(
            "Not connected, retrying login in {}s",
            self.settings.reconnect_interval.as_secs()
        );
        tokio::time::sleep(self.settings.reconnect_interval).await;

        if self.login().await {
            CycleOutcome::Reconnected
        } else {
            CycleOutcome::ReconnectFailed
        }
    }

    /// Log in, then cycle forever.
    pub async fn run(mut self) {
        self.login().await;

        loop {
            match self.cycle().await {
                CycleOutcome::Reconciled(_) | CycleOutcome::ConnectionLost => {
                    tokio::time::sleep(self.settings.query_interval).await;
                }
                CycleOutcome::Reconnected | CycleOutcome::ReconnectFailed => {}
            }
        }
    }
}

/// Fetch every calendar's events in the window and map them to occurrences.
///
/// Records that fail to parse are skipped and logged; any service error aborts
/// the whole fetch.
pub async fn fetch_occurrences<S: CalendarService>(
    service: &S,
    time_min: DateTime<Utc>,
    time_max: DateTime<Utc>,
    format: &TimeFormat,
) -> GcalertResult<Vec<Occurrence>> {
    let calendars = service.list_calendars().await?;
    let mut occurrences = Vec::new();

    for calendar_id in &calendars {
        debug!("Processing calendar: {}", calendar_id);

        let events = service.list_events(calendar_id, time_min, time_max).await?;
        for event in &events {
            for result in event.occurrences(format) {
                match result {
                    Ok(occurrence) => {
                        debug!("New occurrence: {}", occurrence);
                        occurrences.push(occurrence);
                    }
                    Err(e) => warn!("Skipping reminder for '{}': {}", event.summary, e),
                }
            }
        }

        debug!("Occurrences so far: {}", occurrences.len());
    }

    Ok(occurrences)
}
