//! Backend-agnostic `Store` trait covering sessions, users, events,
//! records and shares.

use async_trait::async_trait;
use chrono::NaiveDate;
use uuid::Uuid;

use crate::chat::session::{ChatSession, Flow};
use crate::error::StoreError;
use crate::model::{CompletionRecord, Event, SessionStatus, Share, User};
use crate::recurrence::Cycle;

#[async_trait]
pub trait Store: Send + Sync {
    // ── Chat sessions ───────────────────────────────────────────────

    /// Insert a new session. Fails with a constraint error if the user
    /// already has an ongoing session.
    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError>;

    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, StoreError>;

    /// The user's single ongoing session, if any.
    async fn get_ongoing_session(&self, user_id: &str) -> Result<Option<ChatSession>, StoreError>;

    /// Persist an advanced flow (payload + current step).
    async fn update_session_flow(&self, id: Uuid, flow: &Flow) -> Result<(), StoreError>;

    /// Terminate a session: step goes NULL, status goes completed/aborted.
    async fn finish_session(&self, id: Uuid, status: SessionStatus) -> Result<(), StoreError>;

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, user_id: &str) -> Result<(), StoreError>;

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError>;

    async fn set_user_active(&self, user_id: &str, active: bool) -> Result<(), StoreError>;

    async fn set_notification_slot(&self, user_id: &str, hour: u32) -> Result<(), StoreError>;

    async fn adjust_event_count(&self, user_id: &str, delta: i64) -> Result<(), StoreError>;

    /// Active users whose notification slot equals `hour`.
    async fn list_active_users_by_slot(&self, hour: u32) -> Result<Vec<User>, StoreError>;

    // ── Events ──────────────────────────────────────────────────────

    async fn create_event(&self, event: &Event) -> Result<(), StoreError>;

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError>;

    async fn get_event_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Event>, StoreError>;

    async fn list_events_by_user(&self, user_id: &str) -> Result<Vec<Event>, StoreError>;

    /// Reminder-enabled events of `user_id` due on or before `today`.
    async fn list_overdue_events(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Event>, StoreError>;

    async fn rename_event(&self, id: Uuid, name: &str) -> Result<(), StoreError>;

    /// Flip the reminder flag. `next_due_at` is set alongside it: `None`
    /// when disabling, the recomputed due date when enabling with a cycle.
    async fn set_reminder_enabled(
        &self,
        id: Uuid,
        enabled: bool,
        next_due_at: Option<NaiveDate>,
    ) -> Result<(), StoreError>;

    async fn set_cycle(
        &self,
        id: Uuid,
        cycle: Cycle,
        next_due_at: NaiveDate,
    ) -> Result<(), StoreError>;

    /// Advance the completion anchor and its derived due date.
    async fn set_last_done(
        &self,
        id: Uuid,
        done_at: NaiveDate,
        next_due_at: Option<NaiveDate>,
    ) -> Result<(), StoreError>;

    async fn adjust_share_count(&self, id: Uuid, delta: i64) -> Result<(), StoreError>;

    async fn set_events_active_by_user(
        &self,
        user_id: &str,
        active: bool,
    ) -> Result<(), StoreError>;

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError>;

    // ── Completion records ──────────────────────────────────────────

    async fn create_record(&self, record: &CompletionRecord) -> Result<(), StoreError>;

    /// Most recent completion dates for an event, newest first.
    async fn list_recent_records(
        &self,
        event_id: Uuid,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, StoreError>;

    /// Returns the number of records deleted.
    async fn delete_records_by_event(&self, event_id: Uuid) -> Result<usize, StoreError>;

    // ── Shares ──────────────────────────────────────────────────────

    async fn create_share(&self, share: &Share) -> Result<(), StoreError>;

    async fn share_exists(&self, event_id: Uuid, recipient_id: &str) -> Result<bool, StoreError>;

    async fn delete_share(&self, event_id: Uuid, recipient_id: &str) -> Result<(), StoreError>;

    /// Returns the number of shares deleted.
    async fn delete_shares_by_event(&self, event_id: Uuid) -> Result<usize, StoreError>;

    async fn list_share_recipients(&self, event_id: Uuid) -> Result<Vec<String>, StoreError>;

    /// Reminder-enabled events shared to `recipient_id` due on or before
    /// `today`.
    async fn list_overdue_shared_events(
        &self,
        recipient_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Event>, StoreError>;
}
