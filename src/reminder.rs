//! Reminder scanner — one pass per notification time slot.
//!
//! Reads events and shares only, never chat sessions. Delivery is
//! at-least-once: re-running the same slot re-sends the same
//! notifications.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Timelike, Utc};
use chrono_tz::Tz;
use serde::Serialize;

use crate::chat::reply::Reply;
use crate::error::Error;
use crate::gateway::{ProfileLookup, PushGateway};
use crate::model::{Event, User};
use crate::recurrence::verbal_gap;
use crate::store::Store;

/// Counters for one scan invocation, logged and returned to the trigger.
#[derive(Debug, Clone, Serialize)]
pub struct ScanSummary {
    pub time_slot: u32,
    pub all_users: usize,
    pub processed_users: usize,
    pub limited_users: usize,
    pub owned_events_sent: usize,
    pub shared_events_sent: usize,
}

pub struct Scanner {
    store: Arc<dyn Store>,
    push: Arc<dyn PushGateway>,
    profiles: Arc<dyn ProfileLookup>,
    timezone: Tz,
    free_plan_max_events: i64,
}

impl Scanner {
    pub fn new(
        store: Arc<dyn Store>,
        push: Arc<dyn PushGateway>,
        profiles: Arc<dyn ProfileLookup>,
        timezone: Tz,
        free_plan_max_events: i64,
    ) -> Self {
        Self {
            store,
            push,
            profiles,
            timezone,
            free_plan_max_events,
        }
    }

    /// Run the scan for the time slot containing `now`.
    pub async fn run(&self, now: DateTime<Utc>) -> Result<ScanSummary, Error> {
        let local = now.with_timezone(&self.timezone);
        let slot = local.hour();
        let today = local.date_naive();

        let users = self.store.list_active_users_by_slot(slot).await?;
        tracing::info!(slot, users = users.len(), "Reminder scan started");

        let mut limited_users = 0;
        let mut owned_events_sent = 0;
        let mut shared_events_sent = 0;

        for user in &users {
            if user.is_limited(now, self.free_plan_max_events) {
                limited_users += 1;
                tracing::info!(user_id = %user.user_id, "Reminders suspended: over free plan quota");
                self.try_push(&user.user_id, &suspended_notice(self.free_plan_max_events))
                    .await;
                continue;
            }
            owned_events_sent += self.remind_owned(user, today).await?;
            shared_events_sent += self.remind_shared(user, today).await?;
        }

        let summary = ScanSummary {
            time_slot: slot,
            all_users: users.len(),
            processed_users: users.len() - limited_users,
            limited_users,
            owned_events_sent,
            shared_events_sent,
        };
        tracing::info!(
            slot = summary.time_slot,
            all_users = summary.all_users,
            processed_users = summary.processed_users,
            limited_users = summary.limited_users,
            owned = summary.owned_events_sent,
            shared = summary.shared_events_sent,
            "Reminder scan completed"
        );
        Ok(summary)
    }

    async fn remind_owned(&self, user: &User, today: NaiveDate) -> Result<usize, Error> {
        let events = self.store.list_overdue_events(&user.user_id, today).await?;
        let mut sent = 0;
        for event in &events {
            let reply = owned_reminder(event, today);
            if self.try_push(&user.user_id, &reply).await {
                sent += 1;
            }
        }
        Ok(sent)
    }

    async fn remind_shared(&self, user: &User, today: NaiveDate) -> Result<usize, Error> {
        let events = self
            .store
            .list_overdue_shared_events(&user.user_id, today)
            .await?;
        let mut sent = 0;
        for event in &events {
            let owner_name = match self.profiles.display_name(&event.user_id).await {
                Ok(name) => name,
                Err(err) => {
                    tracing::warn!(%err, "Profile lookup failed, falling back to id");
                    event.user_id.clone()
                }
            };
            let reply = shared_reminder(event, &owner_name, today);
            if self.try_push(&user.user_id, &reply).await {
                sent += 1;
            }
        }
        Ok(sent)
    }

    /// Push and swallow failures; reminders are best-effort.
    async fn try_push(&self, user_id: &str, reply: &Reply) -> bool {
        match self.push.push(user_id, reply).await {
            Ok(()) => true,
            Err(err) => {
                tracing::warn!(user_id, %err, "Push failed");
                false
            }
        }
    }
}

fn reminder_lines(event: &Event, today: NaiveDate) -> Vec<String> {
    let mut lines = vec![
        format!("Last done: {}", event.last_done_at.format("%Y-%m-%d")),
        format!(
            "Repeats: every {}",
            event
                .cycle
                .map(|c| c.to_string())
                .unwrap_or_else(|| "?".to_string())
        ),
    ];
    if let Some(due) = event.next_due_at {
        let gap = verbal_gap(today, due);
        if gap == crate::recurrence::Gap::Today {
            lines.push("Due: today".to_string());
        } else {
            lines.push(format!("Was due: {}", due.format("%Y-%m-%d")));
            lines.push(format!("Overdue by: {gap}"));
        }
    }
    lines
}

fn owned_reminder(event: &Event, today: NaiveDate) -> Reply {
    Reply::card(
        format!("Time for \"{}\" again", event.name),
        reminder_lines(event, today),
    )
}

fn shared_reminder(event: &Event, owner_name: &str, today: NaiveDate) -> Reply {
    let mut lines = vec![format!("Shared by {owner_name}")];
    lines.extend(reminder_lines(event, today));
    Reply::card(
        format!("{owner_name}'s \"{}\" is due", event.name),
        lines,
    )
}

fn suspended_notice(free_plan_max: i64) -> Reply {
    Reply::card(
        "Reminders suspended",
        vec![
            format!("You're over the free plan limit of {free_plan_max} events."),
            "Delete events you no longer need, or upgrade, and reminders resume automatically.".to_string(),
        ],
    )
}
