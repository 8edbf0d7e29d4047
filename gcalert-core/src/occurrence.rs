//! The alarm-bearing event occurrence.
//!
//! An [`Occurrence`] is one (event × popup reminder × expanded instance).
//! Identity is by value: two occurrences are the same iff their
//! [`OccurrenceKey`] is equal. There is no server-assigned id involved, so an
//! event edited upstream shows up as a different occurrence.

use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Duration, Local, NaiveDate, NaiveDateTime, TimeZone, Utc};

use crate::error::{GcalertError, GcalertResult};
use crate::notifier::Notice;
use crate::time_format::TimeFormat;

/// Timestamps carrying an explicit offset that RFC 3339 parsing rejects.
const OFFSET_FORMATS: &[&str] = &["%Y-%m-%dT%H:%M:%S%.f%z", "%Y-%m-%d %H:%M:%S%.f%z"];

/// Timestamps without any offset; these get the local timezone attached.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// The identity tuple of an occurrence.
///
/// Start and end are the *formatted* strings, so changing the display format
/// changes identity too.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OccurrenceKey {
    pub title: String,
    pub location: String,
    pub start: String,
    pub end: String,
    pub lead_minutes: u32,
}

#[derive(Debug, Clone)]
pub struct Occurrence {
    key: OccurrenceKey,
    start: DateTime<Utc>,
}

impl Occurrence {
    /// Build an occurrence from raw timestamp strings.
    ///
    /// `start` and `end` are parsed independently; either one failing to parse
    /// is a [`GcalertError::Parse`].
    pub fn new(
        title: impl Into<String>,
        location: impl Into<String>,
        start: &str,
        end: &str,
        lead_minutes: u32,
        format: &TimeFormat,
    ) -> GcalertResult<Self> {
        let start = parse_timestamp(start)?;
        let end = parse_timestamp(end)?;

        Ok(Occurrence {
            key: OccurrenceKey {
                title: title.into(),
                location: location.into(),
                start: format.format(&start),
                end: format.format(&end),
                lead_minutes,
            },
            start,
        })
    }

    pub fn key(&self) -> &OccurrenceKey {
        &self.key
    }

    pub fn title(&self) -> &str {
        &self.key.title
    }

    /// Location, or `None` when the event has none.
    pub fn location(&self) -> Option<&str> {
        if self.key.location.is_empty() {
            None
        } else {
            Some(&self.key.location)
        }
    }

    pub fn start(&self) -> DateTime<Utc> {
        self.start
    }

    pub fn start_str(&self) -> &str {
        &self.key.start
    }

    pub fn end_str(&self) -> &str {
        &self.key.end
    }

    pub fn lead_minutes(&self) -> u32 {
        self.key.lead_minutes
    }

    /// When the alarm should go off: `lead_minutes` before the start.
    pub fn alarm_time(&self) -> DateTime<Utc> {
        self.start - Duration::minutes(i64::from(self.key.lead_minutes))
    }

    /// The desktop notification for this occurrence.
    pub fn notice(&self, icon: &str) -> Notice {
        let body = match self.location() {
            Some(location) => format!(
                "<b>Starting:</b> {}\n<b>Where:</b> {}",
                self.start_str(),
                location
            ),
            None => format!("<b>Starting:</b> {}", self.start_str()),
        };

        Notice {
            summary: self.key.title.clone(),
            body,
            icon: icon.to_string(),
            persistent: true,
        }
    }
}

impl PartialEq for Occurrence {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for Occurrence {}

impl Hash for Occurrence {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key.hash(state);
    }
}

/// Lets the cache be queried by key. Consistent with `Eq` and `Hash`, which
/// only look at the key.
impl Borrow<OccurrenceKey> for Occurrence {
    fn borrow(&self) -> &OccurrenceKey {
        &self.key
    }
}

impl fmt::Display for Occurrence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Title: {}, Location: {}, Start: {}, Alarm_minutes: {}",
            self.key.title, self.key.location, self.key.start, self.key.lead_minutes
        )
    }
}

/// Parse a timestamp as returned by the calendar service.
///
/// Accepts RFC 3339, offset-less date-times and bare dates. Anything without
/// an offset is taken to be in the local timezone; a bare date is local
/// midnight.
pub fn parse_timestamp(input: &str) -> GcalertResult<DateTime<Utc>> {
    let trimmed = input.trim();

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(dt.with_timezone(&Utc));
    }

    if let Some(dt) = OFFSET_FORMATS
        .iter()
        .find_map(|f| DateTime::parse_from_str(trimmed, f).ok())
    {
        return Ok(dt.with_timezone(&Utc));
    }

    let naive = NAIVE_FORMATS
        .iter()
        .find_map(|f| NaiveDateTime::parse_from_str(trimmed, f).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
        .ok_or_else(|| GcalertError::parse(input, "not a recognizable timestamp"))?;

    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .ok_or_else(|| GcalertError::parse(input, "time does not exist in the local timezone"))
}
