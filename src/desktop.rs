//! Desktop notifications through the freedesktop notification service.

use gcalert_core::{GcalertError, GcalertResult, Notice, Notifier};
use notify_rust::{Notification, Timeout};

const APP_NAME: &str = "gcalert";

pub struct DesktopNotifier;

impl Notifier for DesktopNotifier {
    fn display(&self, notice: &Notice) -> GcalertResult<()> {
        let mut notification = Notification::new();
        notification
            .appname(APP_NAME)
            .summary(&notice.summary)
            .body(&notice.body)
            .icon(&notice.icon);

        if notice.persistent {
            notification.timeout(Timeout::Never);
        }

        notification
            .show()
            .map_err(|e| GcalertError::Notify(e.to_string()))?;

        Ok(())
    }
}
