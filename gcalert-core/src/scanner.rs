//! The alarm scanner loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::cache::{AlarmCache, ScanReport};
use crate::notifier::Notifier;

#[derive(Clone)]
pub struct AlarmScanner {
    cache: Arc<AlarmCache>,
    notifier: Arc<dyn Notifier>,
    icon: String,
}

impl AlarmScanner {
    pub fn new(cache: Arc<AlarmCache>, notifier: Arc<dyn Notifier>, icon: impl Into<String>) -> Self {
        AlarmScanner {
            cache,
            notifier,
            icon: icon.into(),
        }
    }

    /// One pass over the cache as of `now`.
    pub fn pass_at(&self, now: DateTime<Utc>) -> ScanReport {
        self.cache
            .scan(now, |occurrence| self.notifier.display(&occurrence.notice(&self.icon)))
    }

    /// Scan forever, `interval` apart, after an initial `offset`.
    ///
    /// Passes run on the blocking pool since the notifier may block on IPC
    /// while the cache lock is held.
    pub async fn run(self, offset: Duration, interval: Duration) {
        tokio::time::sleep(offset).await;

        loop {
            debug!("Running alarm scan");

            let scanner = self.clone();
            match tokio::task::spawn_blocking(move || scanner.pass_at(Utc::now())).await {
                Ok(report) => debug!(
                    fired = report.fired,
                    failed = report.failed,
                    expired = report.expired,
                    remaining = self.cache.len(),
                    "Alarm scan finished"
                ),
                Err(e) => warn!("Alarm scan aborted: {}", e),
            }

            tokio::time::sleep(interval).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{GcalertError, GcalertResult};
    use crate::notifier::Notice;
    use crate::occurrence::Occurrence;
    use crate::time_format::TimeFormat;
    use chrono::TimeZone;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingNotifier {
        shown: Mutex<Vec<Notice>>,
        broken: bool,
    }

    impl Notifier for RecordingNotifier {
        fn display(&self, notice: &Notice) -> GcalertResult<()> {
            self.shown.lock().push(notice.clone());
            if self.broken {
                Err(GcalertError::Notify("org.freedesktop.Notifications not found".to_string()))
            } else {
                Ok(())
            }
        }
    }

    fn seeded_cache(now: DateTime<Utc>) -> Arc<AlarmCache> {
        let start = now + chrono::Duration::minutes(5);
        let occurrence = Occurrence::new(
            "Dentist",
            "Main St 1",
            &start.to_rfc3339(),
            &(start + chrono::Duration::hours(1)).to_rfc3339(),
            10,
            &TimeFormat::default(),
        )
        .unwrap();

        let cache = Arc::new(AlarmCache::new());
        cache.reconcile(vec![occurrence], now);
        cache
    }

    #[test]
    fn test_pass_shows_notice_with_configured_icon() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let scanner = AlarmScanner::new(seeded_cache(now), notifier.clone(), "appointment-soon");

        let report = scanner.pass_at(now);
        assert_eq!(report.fired, 1);

        let shown = notifier.shown.lock();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].summary, "Dentist");
        assert_eq!(shown[0].icon, "appointment-soon");
        assert!(shown[0].body.contains("<b>Where:</b> Main St 1"));
    }

    #[test]
    fn test_broken_backend_does_not_repeat() {
        let now = Utc.with_ymd_and_hms(2025, 3, 20, 12, 0, 0).unwrap();
        let notifier = Arc::new(RecordingNotifier {
            broken: true,
            ..Default::default()
        });
        let scanner = AlarmScanner::new(seeded_cache(now), notifier.clone(), "x");

        assert_eq!(scanner.pass_at(now).failed, 1);
        assert_eq!(scanner.pass_at(now + chrono::Duration::minutes(1)).fired, 0);
        assert_eq!(notifier.shown.lock().len(), 1);
    }
}
