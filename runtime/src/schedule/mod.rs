//! Driving the schedule application: login, menu, calendar, date, export.

pub mod calendar;
pub mod downloads;
pub mod locator;
pub mod scripts;
pub mod session;
pub mod targets;

pub use calendar::{AdvanceOutcome, CalendarCursor};
pub use session::{ExportOutcome, NoData, ScheduleSession, SessionState};
