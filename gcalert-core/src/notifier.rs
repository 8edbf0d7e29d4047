//! Notification payload and the display seam.

use crate::error::GcalertResult;

/// What gets shown on the desktop when an alarm fires.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub summary: String,
    /// Body text with simple markup (`<b>`).
    pub body: String,
    pub icon: String,
    /// Keep the notification up until the user dismisses it.
    pub persistent: bool,
}

/// A display backend for alarm notifications.
///
/// Called with the alarm cache locked, so implementations should return
/// promptly.
pub trait Notifier: Send + Sync {
    fn display(&self, notice: &Notice) -> GcalertResult<()>;
}
