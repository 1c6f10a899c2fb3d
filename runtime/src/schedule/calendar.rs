//! Month-granular calendar navigation.

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use serde::Serialize;
use std::fmt;
use std::sync::OnceLock;

/// Upper bound on month steps per target date.
pub const MAX_CALENDAR_STEPS: usize = 24;

/// The year and month a calendar widget is showing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub struct CalendarCursor {
    pub year: i32,
    pub month: u32,
}

impl CalendarCursor {
    /// Cursor for a month, if `month` is 1..=12.
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(Self { year, month })
    }

    pub fn of(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }

    fn ordinal(self) -> i64 {
        i64::from(self.year) * 12 + i64::from(self.month) - 1
    }

    /// Signed month distance; positive when `target` is later.
    pub fn distance_to(self, target: CalendarCursor) -> i64 {
        target.ordinal() - self.ordinal()
    }

    /// The neighbouring month in `direction`.
    pub fn step(self, direction: StepDirection) -> Self {
        let ordinal = match direction {
            StepDirection::Next => self.ordinal() + 1,
            StepDirection::Previous => self.ordinal() - 1,
        };
        Self {
            year: ordinal.div_euclid(12) as i32,
            month: ordinal.rem_euclid(12) as u32 + 1,
        }
    }

    /// Parse the year/month dropdown labels, e.g. `"2025년"` and `"12월"`.
    pub fn from_selects(year_text: &str, month_text: &str) -> Option<Self> {
        let year = first_number(year_text)?;
        let month = first_number(month_text)?;
        Self::new(i32::try_from(year).ok()?, month)
    }

    /// Parse a header label such as `"2025년 12월"` or `"2025.12"`.
    ///
    /// The year is the first four-digit group and the month is the next
    /// number after it.
    pub fn from_header(label: &str) -> Option<Self> {
        static HEADER: OnceLock<Regex> = OnceLock::new();
        let re = HEADER.get_or_init(|| {
            Regex::new(r"(\d{4})\D+(\d{1,2})(?:\D|$)").expect("calendar header regex is valid")
        });
        let caps = re.captures(label)?;
        let year = caps[1].parse::<i32>().ok()?;
        let month = caps[2].parse::<u32>().ok()?;
        Self::new(year, month)
    }
}

impl fmt::Display for CalendarCursor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

fn first_number(text: &str) -> Option<u32> {
    let digits: String = text
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Next,
    Previous,
}

/// A calendar that can report its month and move one month at a time.
#[async_trait]
pub trait CalendarView: Send {
    async fn read_cursor(&mut self) -> anyhow::Result<CalendarCursor>;
    async fn step(&mut self, direction: StepDirection) -> anyhow::Result<()>;
}

/// How an advance ended. None of these is an error: date selection decides
/// whether the calendar ended up usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdvanceOutcome {
    Reached { steps: usize },
    StepBudgetExhausted { last: CalendarCursor },
    Interrupted { steps: usize, reason: String },
}

/// Step `view` toward `target`, re-reading the cursor before every step.
pub async fn advance_to<V>(view: &mut V, target: CalendarCursor) -> AdvanceOutcome
where
    V: CalendarView + ?Sized,
{
    let mut steps = 0;
    loop {
        let cursor = match view.read_cursor().await {
            Ok(c) => c,
            Err(e) => {
                return AdvanceOutcome::Interrupted {
                    steps,
                    reason: format!("cannot read calendar: {e:#}"),
                }
            }
        };
        let distance = cursor.distance_to(target);
        if distance == 0 {
            return AdvanceOutcome::Reached { steps };
        }
        if steps >= MAX_CALENDAR_STEPS {
            return AdvanceOutcome::StepBudgetExhausted { last: cursor };
        }
        let direction = if distance > 0 {
            StepDirection::Next
        } else {
            StepDirection::Previous
        };
        if let Err(e) = view.step(direction).await {
            return AdvanceOutcome::Interrupted {
                steps,
                reason: format!("cannot step calendar: {e:#}"),
            };
        }
        steps += 1;
    }
}
