//! Google Calendar API v3 wire types.
//!
//! Only the fields gcalert reads are modelled. Timestamps are kept as the raw
//! strings Google sends; all-day events come with a bare `date` and no
//! timezone.

use gcalert_core::{RawEvent, RawReminder};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalendarList {
    #[serde(default)]
    pub items: Vec<CalendarListEntry>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CalendarListEntry {
    pub id: String,
    #[serde(default)]
    pub summary: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventList {
    #[serde(default)]
    pub items: Vec<GoogleEvent>,
    pub next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct GoogleEvent {
    #[serde(default)]
    pub summary: String,
    pub location: Option<String>,
    pub status: Option<String>,
    pub start: Option<EventDateTime>,
    pub end: Option<EventDateTime>,
    pub reminders: Option<Reminders>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventDateTime {
    pub date_time: Option<String>,
    pub date: Option<String>,
}

impl EventDateTime {
    fn timestamp(self) -> Option<String> {
        self.date_time.or(self.date)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reminders {
    #[serde(default)]
    pub overrides: Vec<EventReminder>,
}

#[derive(Debug, Deserialize)]
pub struct EventReminder {
    pub method: String,
    pub minutes: i64,
}

/// Response from the OAuth token endpoint (code exchange or refresh).
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_in: i64,
    pub refresh_token: Option<String>,
}

impl GoogleEvent {
    /// `None` for cancelled instances and events missing a start or end.
    ///
    /// Events relying on the calendar's default reminders carry no overrides
    /// and so produce no alarms.
    pub fn into_raw_event(self) -> Option<RawEvent> {
        if self.status.as_deref() == Some("cancelled") {
            return None;
        }

        let start = self.start?.timestamp()?;
        let end = self.end?.timestamp()?;

        let reminders = self
            .reminders
            .map(|r| {
                r.overrides
                    .into_iter()
                    .map(|o| RawReminder {
                        method: o.method,
                        minutes: o.minutes,
                    })
                    .collect()
            })
            .unwrap_or_default();

        Some(RawEvent {
            summary: self.summary,
            location: self.location.filter(|l| !l.is_empty()),
            start,
            end,
            reminders,
        })
    }
}
