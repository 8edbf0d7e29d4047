//! Runs the fetch driver and the alarm scanner side by side.

use std::time::Duration;

use tracing::debug;

use crate::driver::FetchDriver;
use crate::remote::Authenticator;
use crate::scanner::AlarmScanner;

#[derive(Debug, Clone)]
pub struct ScanSettings {
    /// Pause between alarm scans.
    pub alarm_interval: Duration,
    /// Delay before the first scan, so the driver can fill the cache first.
    pub threads_offset: Duration,
}

/// Run both loops until the process exits.
///
/// The scanner gets its own task; the driver runs on the caller's task. They
/// share nothing but the cache behind the scanner's and driver's `Arc`.
pub async fn run<A: Authenticator>(driver: FetchDriver<A>, scanner: AlarmScanner, settings: ScanSettings) {
    debug!("Starting alarm scanner");
    let scanner_task = tokio::spawn(scanner.run(settings.threads_offset, settings.alarm_interval));

    driver.run().await;

    scanner_task.abort();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::AlarmCache;
    use crate::driver::FetchSettings;
    use crate::error::GcalertResult;
    use crate::notifier::{Notice, Notifier};
    use crate::raw_event::{RawEvent, RawReminder};
    use crate::remote::CalendarService;
    use crate::time_format::TimeFormat;
    use chrono::{DateTime, Utc};
    use parking_lot::Mutex;
    use std::sync::Arc;

    struct OneEvent(RawEvent);

    impl Authenticator for OneEvent {
        type Service = OneEventService;

        async fn authenticate(&self) -> GcalertResult<OneEventService> {
            Ok(OneEventService(self.0.clone()))
        }
    }

    struct OneEventService(RawEvent);

    impl CalendarService for OneEventService {
        async fn list_calendars(&self) -> GcalertResult<Vec<String>> {
            Ok(vec!["primary".to_string()])
        }

        async fn list_events(
            &self,
            _calendar_id: &str,
            _time_min: DateTime<Utc>,
            _time_max: DateTime<Utc>,
        ) -> GcalertResult<Vec<RawEvent>> {
            Ok(vec![self.0.clone()])
        }
    }

    #[derive(Default)]
    struct RecordingNotifier(Mutex<Vec<Notice>>);

    impl Notifier for RecordingNotifier {
        fn display(&self, notice: &Notice) -> GcalertResult<()> {
            self.0.lock().push(notice.clone());
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetched_event_alarms_exactly_once() {
        // Starts in two hours with a three hour lead: due on the first scan.
        let start = Utc::now() + chrono::Duration::hours(2);
        let event = RawEvent {
            summary: "Flight".to_string(),
            location: Some("Gate 12".to_string()),
            start: start.to_rfc3339(),
            end: (start + chrono::Duration::hours(3)).to_rfc3339(),
            reminders: vec![RawReminder::popup(180)],
        };

        let cache = Arc::new(AlarmCache::new());
        let notifier = Arc::new(RecordingNotifier::default());
        let driver = FetchDriver::new(
            OneEvent(event),
            Arc::clone(&cache),
            FetchSettings {
                query_interval: Duration::from_secs(180),
                reconnect_interval: Duration::from_secs(300),
                lookahead_days: 3,
                time_format: TimeFormat::default(),
            },
        );
        let scanner = AlarmScanner::new(Arc::clone(&cache), notifier.clone(), "gtk-dialog-info");
        let settings = ScanSettings {
            alarm_interval: Duration::from_secs(30),
            threads_offset: Duration::from_secs(5),
        };

        // Both loops run forever; stop them after several fetches and scans.
        let finished =
            tokio::time::timeout(Duration::from_secs(600), run(driver, scanner, settings)).await;
        assert!(finished.is_err());

        let shown = notifier.0.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].summary, "Flight");
        assert_eq!(cache.len(), 1);
    }
}
