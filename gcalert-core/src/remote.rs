//! The boundary to the remote calendar service.
//!
//! Implementations convert every transport or credential problem into
//! [`GcalertError::Auth`](crate::GcalertError::Auth) or
//! [`GcalertError::Fetch`](crate::GcalertError::Fetch); the fetch driver turns
//! those into connection-state transitions.

use std::future::Future;

use chrono::{DateTime, Utc};

use crate::error::GcalertResult;
use crate::raw_event::RawEvent;

/// Produces a logged-in [`CalendarService`].
///
/// May involve interactive consent on first run, and reuses a persisted
/// credential cache afterwards.
pub trait Authenticator {
    type Service: CalendarService;

    fn authenticate(&self) -> impl Future<Output = GcalertResult<Self::Service>> + Send;
}

/// A logged-in calendar service.
pub trait CalendarService {
    /// Ids of all calendars visible to the account.
    fn list_calendars(&self) -> impl Future<Output = GcalertResult<Vec<String>>> + Send;

    /// Events in `[time_min, time_max)`, with recurring events expanded into
    /// single instances.
    fn list_events(
        &self,
        calendar_id: &str,
        time_min: DateTime<Utc>,
        time_max: DateTime<Utc>,
    ) -> impl Future<Output = GcalertResult<Vec<RawEvent>>> + Send;
}
