//! Recurrence arithmetic — cycles, due dates and overdue gaps.
//!
//! Everything here is pure: the scanner and the chat flows feed in dates
//! and get dates back. Day boundaries are resolved by the caller via
//! [`due_instant`] using the bot's configured timezone.

use chrono::{DateTime, Datelike, Days, Months, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

/// Unit of a recurrence cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CycleUnit {
    Day,
    Week,
    Month,
}

impl std::fmt::Display for CycleUnit {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Day => write!(f, "day"),
            Self::Week => write!(f, "week"),
            Self::Month => write!(f, "month"),
        }
    }
}

/// A recurrence cycle, e.g. "2 weeks".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cycle {
    pub count: u32,
    pub unit: CycleUnit,
}

impl Cycle {
    pub fn new(count: u32, unit: CycleUnit) -> Self {
        Self { count, unit }
    }

    /// Parse a user-entered cycle like `"3 days"` or `"1 week"`.
    ///
    /// Splits on the first space; the count must be a positive integer and
    /// the unit (after stripping one trailing plural `s`) one of
    /// day/week/month. Anything else is `None`; callers branch, they do
    /// not get an error to propagate.
    pub fn parse(text: &str) -> Option<Self> {
        let (count_part, unit_part) = text.split_once(' ')?;
        let count: u32 = count_part.parse().ok()?;
        if count == 0 {
            return None;
        }
        let unit = match unit_part.strip_suffix('s').unwrap_or(unit_part) {
            "day" => CycleUnit::Day,
            "week" => CycleUnit::Week,
            "month" => CycleUnit::Month,
            _ => return None,
        };
        Some(Self { count, unit })
    }
}

impl std::fmt::Display for Cycle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.count, self.unit)
    }
}

/// Add one cycle to an anchor date.
///
/// Month addition clamps the day-of-month (Jan 31 + 1 month = Feb 28/29).
/// Saturates at the calendar maximum instead of wrapping.
pub fn compute_next_due(anchor: NaiveDate, cycle: Cycle) -> NaiveDate {
    match cycle.unit {
        CycleUnit::Day => anchor
            .checked_add_days(Days::new(u64::from(cycle.count)))
            .unwrap_or(NaiveDate::MAX),
        CycleUnit::Week => anchor
            .checked_add_days(Days::new(u64::from(cycle.count) * 7))
            .unwrap_or(NaiveDate::MAX),
        CycleUnit::Month => anchor
            .checked_add_months(Months::new(cycle.count))
            .unwrap_or(NaiveDate::MAX),
    }
}

/// The instant a due date becomes current: midnight of that day in `tz`.
pub fn due_instant(tz: Tz, date: NaiveDate) -> DateTime<Utc> {
    let local = date.and_time(NaiveTime::MIN);
    tz.from_local_datetime(&local)
        .earliest()
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| local.and_utc())
}

/// Whether an event is past due at `now`.
pub fn is_overdue(now: DateTime<Utc>, next_due_at: DateTime<Utc>) -> bool {
    now > next_due_at
}

/// The largest non-zero calendar unit between two dates.
///
/// Reminder severity wording depends on this: years beat months beat
/// weeks beat days, and two instants on the same calendar day are `Today`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gap {
    Today,
    Days(u32),
    Weeks(u32),
    Months(u32),
    Years(u32),
}

pub fn verbal_gap(today: NaiveDate, due: NaiveDate) -> Gap {
    if today == due {
        return Gap::Today;
    }
    let (earlier, later) = if due < today { (due, today) } else { (today, due) };

    let mut months = (later.year() - earlier.year()) * 12
        + (later.month() as i32 - earlier.month() as i32);
    if later.day() < earlier.day() {
        months -= 1;
    }
    if months >= 12 {
        return Gap::Years((months / 12) as u32);
    }
    if months >= 1 {
        return Gap::Months(months as u32);
    }

    let days = (later - earlier).num_days();
    if days >= 7 {
        Gap::Weeks((days / 7) as u32)
    } else {
        Gap::Days(days as u32)
    }
}

impl std::fmt::Display for Gap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn plural(f: &mut std::fmt::Formatter<'_>, n: u32, unit: &str) -> std::fmt::Result {
            if n == 1 {
                write!(f, "1 {unit}")
            } else {
                write!(f, "{n} {unit}s")
            }
        }
        match self {
            Self::Today => write!(f, "today"),
            Self::Days(n) => plural(f, *n, "day"),
            Self::Weeks(n) => plural(f, *n, "week"),
            Self::Months(n) => plural(f, *n, "month"),
            Self::Years(n) => plural(f, *n, "year"),
        }
    }
}
