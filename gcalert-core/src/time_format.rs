//! Display format for event times.

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, Local, Utc};

use crate::error::{GcalertError, GcalertResult};

pub const DEFAULT_TIME_FORMAT: &str = "%Y-%m-%d  %H:%M";

/// A validated strftime(3)-style template.
///
/// Validation happens once, up front, so formatting an event time can never
/// fail later on inside the alarm loop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeFormat(String);

impl TimeFormat {
    pub fn new(template: &str) -> GcalertResult<Self> {
        if StrftimeItems::new(template).any(|item| matches!(item, Item::Error)) {
            return Err(GcalertError::Config(format!(
                "Invalid time format '{}'. Must be formatted according to strftime(3)",
                template
            )));
        }

        Ok(TimeFormat(template.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Format `time` in the local timezone of the running process.
    pub fn format(&self, time: &DateTime<Utc>) -> String {
        time.with_timezone(&Local).format(&self.0).to_string()
    }
}

impl Default for TimeFormat {
    fn default() -> Self {
        TimeFormat(DEFAULT_TIME_FORMAT.to_string())
    }
}
