//! Domain entities: users, events, completion records and shares.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::recurrence::Cycle;

/// Maximum recipients a single event can be shared with.
pub const MAX_EVENT_SHARES: i64 = 4;

/// A bot user, keyed by the messaging platform's user id.
#[derive(Debug, Clone)]
pub struct User {
    pub user_id: String,
    /// Events currently owned by the user.
    pub event_count: i64,
    /// Preferred daily reminder hour (minute is always :00).
    pub notification_slot: u32,
    pub is_premium: bool,
    pub premium_until: Option<DateTime<Utc>>,
    /// False once the user blocks the bot.
    pub is_active: bool,
}

impl User {
    pub fn has_premium_access(&self, now: DateTime<Utc>) -> bool {
        self.premium_until.is_some_and(|until| until > now)
    }

    pub fn reached_free_plan_max(&self, free_plan_max: i64) -> bool {
        self.event_count > free_plan_max
    }

    /// Limited users cannot create events and receive no reminders, but
    /// keep full access to their existing events.
    pub fn is_limited(&self, now: DateTime<Utc>, free_plan_max: i64) -> bool {
        self.reached_free_plan_max(free_plan_max) && !self.has_premium_access(now)
    }
}

/// A recurring item a user tracks.
#[derive(Debug, Clone)]
pub struct Event {
    pub id: Uuid,
    pub user_id: String,
    pub name: String,
    pub reminder_enabled: bool,
    pub cycle: Option<Cycle>,
    /// Latest completion date (day granularity, bot timezone).
    pub last_done_at: NaiveDate,
    /// Present iff the reminder is enabled and a cycle exists; always
    /// `last_done_at + cycle`.
    pub next_due_at: Option<NaiveDate>,
    pub share_count: i64,
    pub is_active: bool,
}

/// One append-only completion log entry.
#[derive(Debug, Clone)]
pub struct CompletionRecord {
    pub id: Uuid,
    pub event_id: Uuid,
    pub user_id: String,
    pub done_at: NaiveDate,
}

impl CompletionRecord {
    pub fn new(event_id: Uuid, user_id: &str, done_at: NaiveDate) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            user_id: user_id.to_string(),
            done_at,
        }
    }
}

/// A grant letting a recipient see and be reminded about someone else's
/// event. Unique per (event, recipient).
#[derive(Debug, Clone)]
pub struct Share {
    pub id: Uuid,
    pub event_id: Uuid,
    pub owner_id: String,
    pub recipient_id: String,
}

impl Share {
    pub fn new(event_id: Uuid, owner_id: &str, recipient_id: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id,
            owner_id: owner_id.to_string(),
            recipient_id: recipient_id.to_string(),
        }
    }
}

/// Lifecycle state of a chat session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Ongoing,
    Completed,
    Aborted,
}

impl SessionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Aborted => "aborted",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "aborted" => Some(Self::Aborted),
            _ => None,
        }
    }
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
