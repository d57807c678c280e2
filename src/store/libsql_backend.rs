//! libSQL `Store` implementation — local file or in-memory databases.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use libsql::{Connection, Database as LibSqlDatabase, params};
use tracing::{debug, info};
use uuid::Uuid;

use crate::chat::session::{ChatSession, Flow};
use crate::error::StoreError;
use crate::model::{CompletionRecord, Event, SessionStatus, Share, User};
use crate::recurrence::Cycle;
use crate::store::migrations;
use crate::store::traits::Store;

const USER_COLUMNS: &str =
    "user_id, event_count, notification_slot, is_premium, premium_until, is_active";
const EVENT_COLUMNS: &str =
    "id, user_id, name, reminder_enabled, cycle, last_done_at, next_due_at, share_count, is_active";
const SESSION_COLUMNS: &str = "id, user_id, payload, status";

/// libSQL database backend.
///
/// Holds a single connection reused for all operations;
/// `libsql::Connection` is `Send + Sync` and safe for concurrent async use.
pub struct LibSqlStore {
    #[allow(dead_code)]
    db: Arc<LibSqlDatabase>,
    conn: Connection,
}

impl LibSqlStore {
    /// Open (or create) a local database file and run migrations.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| StoreError::Open(format!("create database directory: {e}")))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("open libSQL database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        info!(path = %path.display(), "Database opened");
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    /// Create an in-memory database (for tests).
    pub async fn memory() -> Result<Self, StoreError> {
        let db = libsql::Builder::new_local(":memory:")
            .build()
            .await
            .map_err(|e| StoreError::Open(format!("create in-memory database: {e}")))?;
        let conn = db
            .connect()
            .map_err(|e| StoreError::Open(format!("create connection: {e}")))?;

        migrations::run_migrations(&conn).await?;
        Ok(Self {
            db: Arc::new(db),
            conn,
        })
    }

    fn conn(&self) -> &Connection {
        &self.conn
    }
}

// ── Row helpers ─────────────────────────────────────────────────────

fn query_err(op: &str, e: impl std::fmt::Display) -> StoreError {
    let msg = e.to_string();
    if msg.contains("UNIQUE") {
        StoreError::Constraint(format!("{op}: {msg}"))
    } else {
        StoreError::Query(format!("{op}: {msg}"))
    }
}

fn date_to_str(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Convert `Option<String>` to a libsql value (`NULL` when absent).
fn opt_text(s: Option<String>) -> libsql::Value {
    match s {
        Some(s) => libsql::Value::Text(s),
        None => libsql::Value::Null,
    }
}

fn parse_date(op: &str, s: &str) -> Result<NaiveDate, StoreError> {
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .map_err(|e| StoreError::Corrupt(format!("{op}: bad date {s:?}: {e}")))
}

fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
        .ok()
        .map(|ndt| ndt.and_utc())
}

fn parse_uuid(op: &str, s: &str) -> Result<Uuid, StoreError> {
    Uuid::parse_str(s).map_err(|e| StoreError::Corrupt(format!("{op}: bad uuid {s:?}: {e}")))
}

fn row_to_user(op: &str, row: &libsql::Row) -> Result<User, StoreError> {
    let premium_until: Option<String> = row.get::<String>(4).ok();
    Ok(User {
        user_id: row.get::<String>(0).map_err(|e| query_err(op, e))?,
        event_count: row.get::<i64>(1).map_err(|e| query_err(op, e))?,
        notification_slot: row.get::<i64>(2).map_err(|e| query_err(op, e))? as u32,
        is_premium: row.get::<i64>(3).map_err(|e| query_err(op, e))? != 0,
        premium_until: premium_until.as_deref().and_then(parse_datetime),
        is_active: row.get::<i64>(5).map_err(|e| query_err(op, e))? != 0,
    })
}

fn row_to_event(op: &str, row: &libsql::Row) -> Result<Event, StoreError> {
    let id_str: String = row.get(0).map_err(|e| query_err(op, e))?;
    let cycle_str: Option<String> = row.get::<String>(4).ok();
    let cycle = match cycle_str {
        Some(ref s) => Some(
            Cycle::parse(s).ok_or_else(|| StoreError::Corrupt(format!("{op}: bad cycle {s:?}")))?,
        ),
        None => None,
    };
    let last_done: String = row.get(5).map_err(|e| query_err(op, e))?;
    let next_due: Option<String> = row.get::<String>(6).ok();
    Ok(Event {
        id: parse_uuid(op, &id_str)?,
        user_id: row.get::<String>(1).map_err(|e| query_err(op, e))?,
        name: row.get::<String>(2).map_err(|e| query_err(op, e))?,
        reminder_enabled: row.get::<i64>(3).map_err(|e| query_err(op, e))? != 0,
        cycle,
        last_done_at: parse_date(op, &last_done)?,
        next_due_at: next_due.as_deref().map(|s| parse_date(op, s)).transpose()?,
        share_count: row.get::<i64>(7).map_err(|e| query_err(op, e))?,
        is_active: row.get::<i64>(8).map_err(|e| query_err(op, e))? != 0,
    })
}

fn row_to_session(op: &str, row: &libsql::Row) -> Result<ChatSession, StoreError> {
    let id_str: String = row.get(0).map_err(|e| query_err(op, e))?;
    let payload: String = row.get(2).map_err(|e| query_err(op, e))?;
    let status_str: String = row.get(3).map_err(|e| query_err(op, e))?;
    let flow: Flow = serde_json::from_str(&payload)
        .map_err(|e| StoreError::Corrupt(format!("{op}: bad session payload: {e}")))?;
    let status = SessionStatus::parse(&status_str)
        .ok_or_else(|| StoreError::Corrupt(format!("{op}: bad status {status_str:?}")))?;
    Ok(ChatSession {
        id: parse_uuid(op, &id_str)?,
        user_id: row.get::<String>(1).map_err(|e| query_err(op, e))?,
        flow,
        status,
    })
}

async fn collect_events(
    op: &'static str,
    mut rows: libsql::Rows,
) -> Result<Vec<Event>, StoreError> {
    let mut events = Vec::new();
    while let Some(row) = rows.next().await.map_err(|e| query_err(op, e))? {
        events.push(row_to_event(op, &row)?);
    }
    Ok(events)
}

#[async_trait]
impl Store for LibSqlStore {
    // ── Chat sessions ───────────────────────────────────────────────

    async fn create_session(&self, session: &ChatSession) -> Result<(), StoreError> {
        let payload = serde_json::to_string(&session.flow)
            .map_err(|e| StoreError::Query(format!("encode session payload: {e}")))?;
        self.conn()
            .execute(
                "INSERT INTO chat_sessions (id, user_id, chat_type, current_step, payload, status)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
                params![
                    session.id.to_string(),
                    session.user_id.clone(),
                    session.flow.chat_type(),
                    session.flow.step_name(),
                    payload,
                    session.status.as_str(),
                ],
            )
            .await
            .map_err(|e| query_err("create_session", e))?;
        debug!(session_id = %session.id, chat_type = session.flow.chat_type(), "Session created");
        Ok(())
    }

    async fn get_session(&self, id: Uuid) -> Result<Option<ChatSession>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {SESSION_COLUMNS} FROM chat_sessions WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| query_err("get_session", e))?;
        match rows.next().await.map_err(|e| query_err("get_session", e))? {
            Some(row) => Ok(Some(row_to_session("get_session", &row)?)),
            None => Ok(None),
        }
    }

    async fn get_ongoing_session(&self, user_id: &str) -> Result<Option<ChatSession>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM chat_sessions
                     WHERE user_id = ?1 AND status = 'ongoing'"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| query_err("get_ongoing_session", e))?;
        match rows
            .next()
            .await
            .map_err(|e| query_err("get_ongoing_session", e))?
        {
            Some(row) => Ok(Some(row_to_session("get_ongoing_session", &row)?)),
            None => Ok(None),
        }
    }

    async fn update_session_flow(&self, id: Uuid, flow: &Flow) -> Result<(), StoreError> {
        let payload = serde_json::to_string(flow)
            .map_err(|e| StoreError::Query(format!("encode session payload: {e}")))?;
        self.conn()
            .execute(
                "UPDATE chat_sessions
                 SET current_step = ?2, payload = ?3, updated_at = datetime('now')
                 WHERE id = ?1",
                params![id.to_string(), flow.step_name(), payload],
            )
            .await
            .map_err(|e| query_err("update_session_flow", e))?;
        debug!(session_id = %id, step = flow.step_name(), "Session advanced");
        Ok(())
    }

    async fn finish_session(&self, id: Uuid, status: SessionStatus) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE chat_sessions
                 SET current_step = NULL, status = ?2, updated_at = datetime('now')
                 WHERE id = ?1",
                params![id.to_string(), status.as_str()],
            )
            .await
            .map_err(|e| query_err("finish_session", e))?;
        debug!(session_id = %id, status = %status, "Session finished");
        Ok(())
    }

    // ── Users ───────────────────────────────────────────────────────

    async fn create_user(&self, user_id: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO users (user_id) VALUES (?1)",
                params![user_id],
            )
            .await
            .map_err(|e| query_err("create_user", e))?;
        debug!(user_id, "User created");
        Ok(())
    }

    async fn get_user(&self, user_id: &str) -> Result<Option<User>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {USER_COLUMNS} FROM users WHERE user_id = ?1"),
                params![user_id],
            )
            .await
            .map_err(|e| query_err("get_user", e))?;
        match rows.next().await.map_err(|e| query_err("get_user", e))? {
            Some(row) => Ok(Some(row_to_user("get_user", &row)?)),
            None => Ok(None),
        }
    }

    async fn set_user_active(&self, user_id: &str, active: bool) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE users SET is_active = ?2 WHERE user_id = ?1",
                params![user_id, active as i64],
            )
            .await
            .map_err(|e| query_err("set_user_active", e))?;
        Ok(())
    }

    async fn set_notification_slot(&self, user_id: &str, hour: u32) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE users SET notification_slot = ?2 WHERE user_id = ?1",
                params![user_id, hour as i64],
            )
            .await
            .map_err(|e| query_err("set_notification_slot", e))?;
        Ok(())
    }

    async fn adjust_event_count(&self, user_id: &str, delta: i64) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE users SET event_count = event_count + ?2 WHERE user_id = ?1",
                params![user_id, delta],
            )
            .await
            .map_err(|e| query_err("adjust_event_count", e))?;
        Ok(())
    }

    async fn list_active_users_by_slot(&self, hour: u32) -> Result<Vec<User>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {USER_COLUMNS} FROM users
                     WHERE notification_slot = ?1 AND is_active = 1"
                ),
                params![hour as i64],
            )
            .await
            .map_err(|e| query_err("list_active_users_by_slot", e))?;
        let mut users = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| query_err("list_active_users_by_slot", e))?
        {
            users.push(row_to_user("list_active_users_by_slot", &row)?);
        }
        Ok(users)
    }

    // ── Events ──────────────────────────────────────────────────────

    async fn create_event(&self, event: &Event) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO events
                 (id, user_id, name, reminder_enabled, cycle, last_done_at,
                  next_due_at, share_count, is_active)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    event.id.to_string(),
                    event.user_id.clone(),
                    event.name.clone(),
                    event.reminder_enabled as i64,
                    opt_text(event.cycle.map(|c| c.to_string())),
                    date_to_str(event.last_done_at),
                    opt_text(event.next_due_at.map(date_to_str)),
                    event.share_count,
                    event.is_active as i64,
                ],
            )
            .await
            .map_err(|e| query_err("create_event", e))?;
        debug!(event_id = %event.id, name = %event.name, "Event created");
        Ok(())
    }

    async fn get_event(&self, id: Uuid) -> Result<Option<Event>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = ?1"),
                params![id.to_string()],
            )
            .await
            .map_err(|e| query_err("get_event", e))?;
        match rows.next().await.map_err(|e| query_err("get_event", e))? {
            Some(row) => Ok(Some(row_to_event("get_event", &row)?)),
            None => Ok(None),
        }
    }

    async fn get_event_by_name(
        &self,
        user_id: &str,
        name: &str,
    ) -> Result<Option<Event>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                &format!("SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 AND name = ?2"),
                params![user_id, name],
            )
            .await
            .map_err(|e| query_err("get_event_by_name", e))?;
        match rows
            .next()
            .await
            .map_err(|e| query_err("get_event_by_name", e))?
        {
            Some(row) => Ok(Some(row_to_event("get_event_by_name", &row)?)),
            None => Ok(None),
        }
    }

    async fn list_events_by_user(&self, user_id: &str) -> Result<Vec<Event>, StoreError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events WHERE user_id = ?1 ORDER BY created_at"
                ),
                params![user_id],
            )
            .await
            .map_err(|e| query_err("list_events_by_user", e))?;
        collect_events("list_events_by_user", rows).await
    }

    async fn list_overdue_events(
        &self,
        user_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events
                     WHERE user_id = ?1
                       AND reminder_enabled = 1
                       AND next_due_at IS NOT NULL
                       AND next_due_at <= ?2"
                ),
                params![user_id, date_to_str(today)],
            )
            .await
            .map_err(|e| query_err("list_overdue_events", e))?;
        collect_events("list_overdue_events", rows).await
    }

    async fn rename_event(&self, id: Uuid, name: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE events SET name = ?2 WHERE id = ?1",
                params![id.to_string(), name],
            )
            .await
            .map_err(|e| query_err("rename_event", e))?;
        Ok(())
    }

    async fn set_reminder_enabled(
        &self,
        id: Uuid,
        enabled: bool,
        next_due_at: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE events SET reminder_enabled = ?2, next_due_at = ?3 WHERE id = ?1",
                params![id.to_string(), enabled as i64, opt_text(next_due_at.map(date_to_str))],
            )
            .await
            .map_err(|e| query_err("set_reminder_enabled", e))?;
        Ok(())
    }

    async fn set_cycle(
        &self,
        id: Uuid,
        cycle: Cycle,
        next_due_at: NaiveDate,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE events SET cycle = ?2, next_due_at = ?3 WHERE id = ?1",
                params![id.to_string(), cycle.to_string(), date_to_str(next_due_at)],
            )
            .await
            .map_err(|e| query_err("set_cycle", e))?;
        Ok(())
    }

    async fn set_last_done(
        &self,
        id: Uuid,
        done_at: NaiveDate,
        next_due_at: Option<NaiveDate>,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE events SET last_done_at = ?2, next_due_at = ?3 WHERE id = ?1",
                params![
                    id.to_string(),
                    date_to_str(done_at),
                    opt_text(next_due_at.map(date_to_str)),
                ],
            )
            .await
            .map_err(|e| query_err("set_last_done", e))?;
        Ok(())
    }

    async fn adjust_share_count(&self, id: Uuid, delta: i64) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE events SET share_count = share_count + ?2 WHERE id = ?1",
                params![id.to_string(), delta],
            )
            .await
            .map_err(|e| query_err("adjust_share_count", e))?;
        Ok(())
    }

    async fn set_events_active_by_user(
        &self,
        user_id: &str,
        active: bool,
    ) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "UPDATE events SET is_active = ?2 WHERE user_id = ?1",
                params![user_id, active as i64],
            )
            .await
            .map_err(|e| query_err("set_events_active_by_user", e))?;
        Ok(())
    }

    async fn delete_event(&self, id: Uuid) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "DELETE FROM events WHERE id = ?1",
                params![id.to_string()],
            )
            .await
            .map_err(|e| query_err("delete_event", e))?;
        debug!(event_id = %id, "Event deleted");
        Ok(())
    }

    // ── Completion records ──────────────────────────────────────────

    async fn create_record(&self, record: &CompletionRecord) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO records (id, event_id, user_id, done_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    record.id.to_string(),
                    record.event_id.to_string(),
                    record.user_id.clone(),
                    date_to_str(record.done_at),
                ],
            )
            .await
            .map_err(|e| query_err("create_record", e))?;
        Ok(())
    }

    async fn list_recent_records(
        &self,
        event_id: Uuid,
        limit: usize,
    ) -> Result<Vec<NaiveDate>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT done_at FROM records
                 WHERE event_id = ?1 ORDER BY done_at DESC LIMIT ?2",
                params![event_id.to_string(), limit as i64],
            )
            .await
            .map_err(|e| query_err("list_recent_records", e))?;
        let mut dates = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| query_err("list_recent_records", e))?
        {
            let s: String = row.get(0).map_err(|e| query_err("list_recent_records", e))?;
            dates.push(parse_date("list_recent_records", &s)?);
        }
        Ok(dates)
    }

    async fn delete_records_by_event(&self, event_id: Uuid) -> Result<usize, StoreError> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM records WHERE event_id = ?1",
                params![event_id.to_string()],
            )
            .await
            .map_err(|e| query_err("delete_records_by_event", e))?;
        Ok(deleted as usize)
    }

    // ── Shares ──────────────────────────────────────────────────────

    async fn create_share(&self, share: &Share) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "INSERT INTO shares (id, event_id, owner_id, recipient_id)
                 VALUES (?1, ?2, ?3, ?4)",
                params![
                    share.id.to_string(),
                    share.event_id.to_string(),
                    share.owner_id.clone(),
                    share.recipient_id.clone(),
                ],
            )
            .await
            .map_err(|e| query_err("create_share", e))?;
        debug!(share_id = %share.id, event_id = %share.event_id, "Share created");
        Ok(())
    }

    async fn share_exists(&self, event_id: Uuid, recipient_id: &str) -> Result<bool, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT 1 FROM shares WHERE event_id = ?1 AND recipient_id = ?2 LIMIT 1",
                params![event_id.to_string(), recipient_id],
            )
            .await
            .map_err(|e| query_err("share_exists", e))?;
        Ok(rows
            .next()
            .await
            .map_err(|e| query_err("share_exists", e))?
            .is_some())
    }

    async fn delete_share(&self, event_id: Uuid, recipient_id: &str) -> Result<(), StoreError> {
        self.conn()
            .execute(
                "DELETE FROM shares WHERE event_id = ?1 AND recipient_id = ?2",
                params![event_id.to_string(), recipient_id],
            )
            .await
            .map_err(|e| query_err("delete_share", e))?;
        Ok(())
    }

    async fn delete_shares_by_event(&self, event_id: Uuid) -> Result<usize, StoreError> {
        let deleted = self
            .conn()
            .execute(
                "DELETE FROM shares WHERE event_id = ?1",
                params![event_id.to_string()],
            )
            .await
            .map_err(|e| query_err("delete_shares_by_event", e))?;
        Ok(deleted as usize)
    }

    async fn list_share_recipients(&self, event_id: Uuid) -> Result<Vec<String>, StoreError> {
        let mut rows = self
            .conn()
            .query(
                "SELECT recipient_id FROM shares WHERE event_id = ?1 ORDER BY created_at",
                params![event_id.to_string()],
            )
            .await
            .map_err(|e| query_err("list_share_recipients", e))?;
        let mut recipients = Vec::new();
        while let Some(row) = rows
            .next()
            .await
            .map_err(|e| query_err("list_share_recipients", e))?
        {
            recipients.push(row.get::<String>(0).map_err(|e| query_err("list_share_recipients", e))?);
        }
        Ok(recipients)
    }

    async fn list_overdue_shared_events(
        &self,
        recipient_id: &str,
        today: NaiveDate,
    ) -> Result<Vec<Event>, StoreError> {
        let rows = self
            .conn()
            .query(
                &format!(
                    "SELECT {EVENT_COLUMNS} FROM events e
                     WHERE e.reminder_enabled = 1
                       AND e.next_due_at IS NOT NULL
                       AND e.next_due_at <= ?2
                       AND EXISTS (
                           SELECT 1 FROM shares s
                           WHERE s.recipient_id = ?1 AND s.event_id = e.id
                       )"
                ),
                params![recipient_id, date_to_str(today)],
            )
            .await
            .map_err(|e| query_err("list_overdue_shared_events", e))?;
        collect_events("list_overdue_shared_events", rows).await
    }
}
