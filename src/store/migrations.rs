//! Version-tracked schema migrations for the libSQL backend.
//!
//! Each migration has a version number and SQL. `run_migrations()` checks
//! the current version and applies only the new ones sequentially.

use libsql::Connection;

use crate::error::StoreError;

/// A single migration step.
struct Migration {
    version: i64,
    name: &'static str,
    sql: &'static str,
}

/// All migrations in order. Add new versions to the end.
static MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        name: "initial_schema",
        sql: r#"
            CREATE TABLE IF NOT EXISTS users (
                user_id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                event_count INTEGER NOT NULL DEFAULT 0,
                notification_slot INTEGER NOT NULL DEFAULT 9,
                is_premium INTEGER NOT NULL DEFAULT 0,
                premium_until TEXT,
                is_active INTEGER NOT NULL DEFAULT 1
            );
            CREATE INDEX IF NOT EXISTS idx_users_slot
                ON users(notification_slot) WHERE is_active = 1;

            CREATE TABLE IF NOT EXISTS events (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(user_id),
                name TEXT NOT NULL,
                reminder_enabled INTEGER NOT NULL DEFAULT 0,
                cycle TEXT,
                last_done_at TEXT NOT NULL,
                next_due_at TEXT,
                share_count INTEGER NOT NULL DEFAULT 0,
                is_active INTEGER NOT NULL DEFAULT 1,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (user_id, name)
            );
            CREATE INDEX IF NOT EXISTS idx_events_user ON events(user_id);
            CREATE INDEX IF NOT EXISTS idx_events_next_due ON events(next_due_at);

            CREATE TABLE IF NOT EXISTS records (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                user_id TEXT NOT NULL,
                done_at TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_records_event ON records(event_id);

            CREATE TABLE IF NOT EXISTS shares (
                id TEXT PRIMARY KEY,
                event_id TEXT NOT NULL,
                owner_id TEXT NOT NULL,
                recipient_id TEXT NOT NULL,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                UNIQUE (event_id, recipient_id)
            );
            CREATE INDEX IF NOT EXISTS idx_shares_recipient ON shares(recipient_id);

            CREATE TABLE IF NOT EXISTS chat_sessions (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL,
                chat_type TEXT NOT NULL,
                current_step TEXT,
                payload TEXT NOT NULL,
                status TEXT NOT NULL DEFAULT 'ongoing',
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                updated_at TEXT NOT NULL DEFAULT (datetime('now'))
            );
            CREATE INDEX IF NOT EXISTS idx_sessions_user ON chat_sessions(user_id);
            -- One ongoing conversation per user. Concurrent webhook
            -- deliveries would otherwise race get_ongoing_session and
            -- create two.
            CREATE UNIQUE INDEX IF NOT EXISTS idx_sessions_one_ongoing
                ON chat_sessions(user_id) WHERE status = 'ongoing';
        "#,
    },
];

/// Apply all pending migrations.
pub async fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS _migrations (
            version INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            applied_at TEXT NOT NULL DEFAULT (datetime('now'))
        )",
        (),
    )
    .await
    .map_err(|e| StoreError::Migration(format!("create _migrations: {e}")))?;

    let current = current_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > current) {
        conn.execute_batch(migration.sql)
            .await
            .map_err(|e| StoreError::Migration(format!("apply {}: {e}", migration.name)))?;
        conn.execute(
            "INSERT INTO _migrations (version, name) VALUES (?1, ?2)",
            libsql::params![migration.version, migration.name],
        )
        .await
        .map_err(|e| StoreError::Migration(format!("record {}: {e}", migration.name)))?;
        tracing::info!(version = migration.version, name = migration.name, "Migration applied");
    }

    Ok(())
}

async fn current_version(conn: &Connection) -> Result<i64, StoreError> {
    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM _migrations", ())
        .await
        .map_err(|e| StoreError::Migration(format!("read version: {e}")))?;
    match rows.next().await {
        Ok(Some(row)) => row
            .get::<i64>(0)
            .map_err(|e| StoreError::Migration(format!("decode version: {e}"))),
        Ok(None) => Ok(0),
        Err(e) => Err(StoreError::Migration(format!("read version: {e}"))),
    }
}
