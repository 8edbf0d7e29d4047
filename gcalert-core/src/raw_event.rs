//! Events as they come back from the calendar service, before they are turned
//! into occurrences.

use crate::error::{GcalertError, GcalertResult};
use crate::occurrence::Occurrence;
use crate::time_format::TimeFormat;

/// The only reminder method gcalert acts on. Email, SMS etc. are ignored.
pub const POPUP_METHOD: &str = "popup";

const UNTITLED: &str = "(No title)";

/// A reminder override attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawReminder {
    pub method: String,
    pub minutes: i64,
}

impl RawReminder {
    pub fn popup(minutes: i64) -> Self {
        RawReminder {
            method: POPUP_METHOD.to_string(),
            minutes,
        }
    }

    pub fn is_popup(&self) -> bool {
        self.method == POPUP_METHOD
    }
}

/// A single (already expanded) event instance.
///
/// `start`/`end` are kept as the service sent them; they may lack a timezone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawEvent {
    pub summary: String,
    pub location: Option<String>,
    pub start: String,
    pub end: String,
    pub reminders: Vec<RawReminder>,
}

impl RawEvent {
    /// One occurrence per popup reminder.
    ///
    /// Failures are returned per reminder so a single bad record can be
    /// skipped without dropping the rest of the fetch.
    pub fn occurrences(&self, format: &TimeFormat) -> Vec<GcalertResult<Occurrence>> {
        let title = if self.summary.trim().is_empty() {
            UNTITLED
        } else {
            self.summary.as_str()
        };
        let location = self.location.as_deref().unwrap_or_default();

        self.reminders
            .iter()
            .filter(|r| r.is_popup())
            .map(|r| {
                let lead_minutes = u32::try_from(r.minutes).map_err(|_| {
                    GcalertError::parse(&r.minutes.to_string(), "reminder lead time out of range")
                })?;
                Occurrence::new(title, location, &self.start, &self.end, lead_minutes, format)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(reminders: Vec<RawReminder>) -> RawEvent {
        RawEvent {
            summary: "Dentist".to_string(),
            location: Some("Main St 1".to_string()),
            start: "2025-03-20T15:00:00+01:00".to_string(),
            end: "2025-03-20T16:00:00+01:00".to_string(),
            reminders,
        }
    }

    #[test]
    fn test_only_popup_reminders_become_occurrences() {
        let raw = event(vec![
            RawReminder::popup(10),
            RawReminder {
                method: "email".to_string(),
                minutes: 60,
            },
            RawReminder::popup(30),
        ]);

        let occurrences: Vec<Occurrence> = raw
            .occurrences(&TimeFormat::default())
            .into_iter()
            .map(Result::unwrap)
            .collect();

        assert_eq!(occurrences.len(), 2);
        assert_eq!(occurrences[0].lead_minutes(), 10);
        assert_eq!(occurrences[1].lead_minutes(), 30);
        assert_eq!(occurrences[0].location(), Some("Main St 1"));
    }

    #[test]
    fn test_no_overrides_no_occurrences() {
        assert!(event(vec![]).occurrences(&TimeFormat::default()).is_empty());
    }

    #[test]
    fn test_empty_summary_gets_placeholder_title() {
        let mut raw = event(vec![RawReminder::popup(5)]);
        raw.summary = "  ".to_string();

        let results = raw.occurrences(&TimeFormat::default());
        assert_eq!(results[0].as_ref().unwrap().title(), "(No title)");
    }

    #[test]
    fn test_negative_lead_time_is_rejected() {
        let raw = event(vec![RawReminder::popup(-5), RawReminder::popup(5)]);

        let results = raw.occurrences(&TimeFormat::default());
        assert!(matches!(results[0], Err(GcalertError::Parse { .. })));
        assert!(results[1].is_ok());
    }

    #[test]
    fn test_unparseable_start_fails_each_reminder() {
        let mut raw = event(vec![RawReminder::popup(5), RawReminder::popup(15)]);
        raw.start = "whenever".to_string();

        let results = raw.occurrences(&TimeFormat::default());
        assert_eq!(results.len(), 2);
        assert!(results.iter().all(Result::is_err));
    }
}
