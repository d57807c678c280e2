//! Reminder scanner tests against the in-memory store with a recording
//! push gateway.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;
use uuid::Uuid;

use routinely::chat::reply::Reply;
use routinely::error::GatewayError;
use routinely::gateway::{ProfileLookup, PushGateway};
use routinely::model::{Event, Share};
use routinely::recurrence::{Cycle, CycleUnit, compute_next_due};
use routinely::reminder::Scanner;
use routinely::store::{LibSqlStore, Store};

const FREE_PLAN_MAX: i64 = 5;

struct RecordingPush {
    pushes: Mutex<Vec<(String, Reply)>>,
}

#[async_trait]
impl PushGateway for RecordingPush {
    async fn push(&self, user_id: &str, reply: &Reply) -> Result<(), GatewayError> {
        self.pushes
            .lock()
            .await
            .push((user_id.to_string(), reply.clone()));
        Ok(())
    }
}

struct StubProfiles;

#[async_trait]
impl ProfileLookup for StubProfiles {
    async fn display_name(&self, user_id: &str) -> Result<String, GatewayError> {
        Ok(format!("Friend {user_id}"))
    }
}

fn naive(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// 2024-01-09 09:30 in Taipei (01:30 UTC) — slot 9, the default.
fn scan_instant() -> DateTime<Utc> {
    DateTime::parse_from_rfc3339("2024-01-09T01:30:00Z")
        .unwrap()
        .with_timezone(&Utc)
}

async fn setup() -> (Arc<LibSqlStore>, Arc<RecordingPush>, Scanner) {
    let store = Arc::new(LibSqlStore::memory().await.unwrap());
    let push = Arc::new(RecordingPush {
        pushes: Mutex::new(Vec::new()),
    });
    let scanner = Scanner::new(
        store.clone(),
        push.clone(),
        Arc::new(StubProfiles),
        chrono_tz::Asia::Taipei,
        FREE_PLAN_MAX,
    );
    (store, push, scanner)
}

async fn seed_event(
    store: &LibSqlStore,
    user_id: &str,
    name: &str,
    cycle: Cycle,
    last_done: NaiveDate,
) -> Event {
    let event = Event {
        id: Uuid::new_v4(),
        user_id: user_id.to_string(),
        name: name.to_string(),
        reminder_enabled: true,
        cycle: Some(cycle),
        last_done_at: last_done,
        next_due_at: Some(compute_next_due(last_done, cycle)),
        share_count: 0,
        is_active: true,
    };
    store.create_event(&event).await.unwrap();
    store.adjust_event_count(user_id, 1).await.unwrap();
    event
}

fn rendered(reply: &Reply) -> String {
    match reply {
        Reply::Text { text } => text.clone(),
        Reply::Buttons { text, .. } => text.clone(),
        Reply::Card { title, lines } => format!("{title}\n{}", lines.join("\n")),
    }
}

#[tokio::test]
async fn overdue_event_triggers_one_push() {
    let (store, push, scanner) = setup().await;
    store.create_user("u1").await.unwrap();
    // Created 2024-01-01 with a 1-week cycle: due 2024-01-08, overdue on
    // the 9th.
    seed_event(
        &store,
        "u1",
        "喝水",
        Cycle::new(1, CycleUnit::Week),
        naive(2024, 1, 1),
    )
    .await;

    let summary = scanner.run(scan_instant()).await.unwrap();
    assert_eq!(summary.time_slot, 9);
    assert_eq!(summary.all_users, 1);
    assert_eq!(summary.processed_users, 1);
    assert_eq!(summary.limited_users, 0);
    assert_eq!(summary.owned_events_sent, 1);
    assert_eq!(summary.shared_events_sent, 0);

    let pushes = push.pushes.lock().await;
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "u1");
    let body = rendered(&pushes[0].1);
    assert!(body.contains("喝水"));
    assert!(body.contains("1 day")); // overdue by one day
}

#[tokio::test]
async fn not_yet_due_events_stay_quiet() {
    let (store, push, scanner) = setup().await;
    store.create_user("u1").await.unwrap();
    // Due 2024-01-15, scan on the 9th.
    seed_event(
        &store,
        "u1",
        "stretch",
        Cycle::new(2, CycleUnit::Week),
        naive(2024, 1, 1),
    )
    .await;

    let summary = scanner.run(scan_instant()).await.unwrap();
    assert_eq!(summary.owned_events_sent, 0);
    assert!(push.pushes.lock().await.is_empty());
}

#[tokio::test]
async fn shared_events_notify_the_recipient_with_the_owner_name() {
    let (store, push, scanner) = setup().await;
    store.create_user("owner").await.unwrap();
    store.create_user("friend").await.unwrap();
    // Owner sits in a different slot so only the share fires here.
    store.set_notification_slot("owner", 20).await.unwrap();

    let event = seed_event(
        &store,
        "owner",
        "water plants",
        Cycle::new(1, CycleUnit::Week),
        naive(2024, 1, 1),
    )
    .await;
    store
        .create_share(&Share::new(event.id, "owner", "friend"))
        .await
        .unwrap();
    store.adjust_share_count(event.id, 1).await.unwrap();

    let summary = scanner.run(scan_instant()).await.unwrap();
    assert_eq!(summary.all_users, 1);
    assert_eq!(summary.owned_events_sent, 0);
    assert_eq!(summary.shared_events_sent, 1);

    let pushes = push.pushes.lock().await;
    assert_eq!(pushes.len(), 1);
    assert_eq!(pushes[0].0, "friend");
    let body = rendered(&pushes[0].1);
    assert!(body.contains("Friend owner"));
    assert!(body.contains("water plants"));
}

#[tokio::test]
async fn limited_users_get_a_single_suspension_notice() {
    let (store, push, scanner) = setup().await;
    store.create_user("u1").await.unwrap();
    seed_event(
        &store,
        "u1",
        "one",
        Cycle::new(1, CycleUnit::Day),
        naive(2024, 1, 1),
    )
    .await;
    seed_event(
        &store,
        "u1",
        "two",
        Cycle::new(1, CycleUnit::Day),
        naive(2024, 1, 1),
    )
    .await;
    // Push the count over the quota without premium.
    store.adjust_event_count("u1", FREE_PLAN_MAX).await.unwrap();

    let summary = scanner.run(scan_instant()).await.unwrap();
    assert_eq!(summary.limited_users, 1);
    assert_eq!(summary.processed_users, 0);
    assert_eq!(summary.owned_events_sent, 0);

    let pushes = push.pushes.lock().await;
    assert_eq!(pushes.len(), 1);
    assert!(rendered(&pushes[0].1).contains("Reminders suspended"));
}

#[tokio::test]
async fn only_the_matching_slot_and_active_users_are_scanned() {
    let (store, push, scanner) = setup().await;
    store.create_user("late").await.unwrap();
    store.set_notification_slot("late", 21).await.unwrap();
    seed_event(
        &store,
        "late",
        "evening thing",
        Cycle::new(1, CycleUnit::Day),
        naive(2024, 1, 1),
    )
    .await;

    store.create_user("blocked").await.unwrap();
    store.set_user_active("blocked", false).await.unwrap();
    seed_event(
        &store,
        "blocked",
        "never fires",
        Cycle::new(1, CycleUnit::Day),
        naive(2024, 1, 1),
    )
    .await;

    let summary = scanner.run(scan_instant()).await.unwrap();
    assert_eq!(summary.all_users, 0);
    assert!(push.pushes.lock().await.is_empty());
}

#[tokio::test]
async fn rerunning_the_slot_resends_notifications() {
    let (store, push, scanner) = setup().await;
    store.create_user("u1").await.unwrap();
    seed_event(
        &store,
        "u1",
        "喝水",
        Cycle::new(1, CycleUnit::Week),
        naive(2024, 1, 1),
    )
    .await;

    scanner.run(scan_instant()).await.unwrap();
    scanner.run(scan_instant()).await.unwrap();
    // At-least-once: the scan never mutates due dates, so both runs send.
    assert_eq!(push.pushes.lock().await.len(), 2);
}
