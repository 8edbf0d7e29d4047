//! Core of gcalert: the upcoming-occurrence cache and the two loops around it.
//!
//! - `occurrence`: one alarm instance and its value identity
//! - `cache`: the shared cache, reconciled by the fetch side and scanned by the alarm side
//! - `driver`: polls the calendar service and reconciles into the cache
//! - `scanner`: fires due alarms and evicts started occurrences
//! - `remote` / `notifier`: seams to the calendar service and the desktop

pub mod cache;
pub mod driver;
pub mod error;
pub mod notifier;
pub mod occurrence;
pub mod raw_event;
pub mod remote;
pub mod scanner;
pub mod scheduler;
pub mod time_format;

pub use cache::{AlarmCache, AlarmState, ReconcileReport, ScanReport};
pub use driver::{CycleOutcome, FetchDriver, FetchSettings};
pub use error::{GcalertError, GcalertResult};
pub use notifier::{Notice, Notifier};
pub use occurrence::{Occurrence, OccurrenceKey};
pub use raw_event::{RawEvent, RawReminder};
pub use remote::{Authenticator, CalendarService};
pub use scanner::AlarmScanner;
pub use scheduler::ScanSettings;
pub use time_format::TimeFormat;
